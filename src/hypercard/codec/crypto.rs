//! Decryption of the private access stack header.
//!
//! A private access stack has 50 bytes of its STAK block (0x18..0x4A) XORed with a
//! keystream derived from the password. The keystream comes from a Park–Miller style
//! generator [`hash_number`]: 24 big-endian words are XORed at a 2-byte stride, so
//! consecutive words overlap by half. Word `k` is `h^k(key)`.
//!
//! Two ways in:
//! - the password: hash it bit by bit ([`hash_password`]), hash the result 11 more
//!   times to get the key, and check that the decoded password field matches the
//!   password hash re-hashed as a 4-character string;
//! - the hack: the first encrypted word covers the stack size, which is also stored in
//!   clear at offset 0. XORing the two leaves `x ^ (h(x) >> 16)`, whose top half is the
//!   top half of the key. The 65536 candidates for the bottom half are tried in
//!   increasing order and the first one that also decodes a storable user level wins.
//!   The check is weak and may accept a wrong key on crafted files; it exists for
//!   compatibility, not as a security boundary.

use byteorder::{BigEndian, ByteOrder};
use log::{debug, trace};

use crate::hypercard::types::error::Result;
use crate::hypercard::types::window::ByteWindow;

/// Offset of the encrypted span inside the STAK block.
pub const ENCRYPTED_OFFSET: usize = 0x18;

/// Length of the encrypted span.
pub const ENCRYPTED_LENGTH: usize = 0x32;

/// The decrypted span; index 0 is the byte at [`ENCRYPTED_OFFSET`].
pub type DecodedHeader = [u8; ENCRYPTED_LENGTH];

/// Position of the password hash field in the decrypted span (file offset 0x44).
const PASSWORD_HASH_OFFSET: usize = 0x2C;

/// Position of the user level field in the STAK block.
const USER_LEVEL_OFFSET: usize = 0x48;

/// Hashes applied to the password hash before the first keystream word.
const PASSWORD_KEY_ROUNDS: usize = 11;

/// Keystream word covering the user level field (span offset 46).
const USER_LEVEL_KEY_ROUNDS: usize = 23;

/// Value returned by [`hash_password`] when the bit sum is zero ('Bill').
const EMPTY_PASSWORD_HASH: u32 = 0x4269_6C6C;

/// One step of the keystream generator.
pub fn hash_number(x: u32) -> u32 {
    let product = x as u64 * 0x41A7;
    ((product + (product >> 31)) & 0x7FFF_FFFF) as u32
}

/// Applies [`hash_number`] `rounds` times.
pub fn hash_number_times(mut x: u32, rounds: usize) -> u32 {
    for _ in 0..rounds {
        x = hash_number(x);
    }
    x
}

/// Hashes a password, one generator step per bit, most significant bit first.
///
/// The caller is expected to have folded the password to lower case without accents.
pub fn hash_password(password: &[u8]) -> u32 {
    let first = password.first().copied().unwrap_or(0) as u64;
    let mut seed = first + password.len() as u64;
    if seed > 0xFF {
        seed &= 0xFF;
    } else if first > 0x80 {
        seed |= 0xFFFF_FF00;
    }

    let mut state = seed as u32;
    let mut sum: u64 = 0;
    for &c in password {
        for bit in (0..8).rev() {
            state = hash_number(state);
            if (c >> bit) & 1 != 0 {
                sum += state as u64;
            }
        }
    }

    if sum == 0 {
        return EMPTY_PASSWORD_HASH;
    }
    (sum & 0xFFFF_FFFF) as u32
}

/// The value HyperCard stores in the password field of the decrypted header.
pub fn password_check_value(password_hash: u32) -> u32 {
    hash_password(&password_hash.to_be_bytes())
}

/// The first keystream word for a password hash.
pub fn key_from_password_hash(password_hash: u32) -> u32 {
    hash_number_times(password_hash, PASSWORD_KEY_ROUNDS)
}

/// XORs the span with the keystream starting at `key`.
///
/// The operation is its own inverse: it both encrypts and decrypts.
pub fn apply_keystream(span: &[u8; ENCRYPTED_LENGTH], key: u32) -> DecodedHeader {
    let mut output = *span;
    let mut x = key;
    for i in (0..=ENCRYPTED_LENGTH - 4).step_by(2) {
        let word = BigEndian::read_u32(&output[i..i + 4]) ^ x;
        BigEndian::write_u32(&mut output[i..i + 4], word);
        x = hash_number(x);
    }
    output
}

/// Reads the encrypted span from a STAK block.
pub fn encrypted_span(stack: &ByteWindow) -> Result<[u8; ENCRYPTED_LENGTH]> {
    let mut span = [0u8; ENCRYPTED_LENGTH];
    span.copy_from_slice(stack.bytes(ENCRYPTED_OFFSET, ENCRYPTED_LENGTH)?);
    Ok(span)
}

/// Decrypts the span with a password.
///
/// Returns `None` when the password hash check fails.
pub fn decrypt_with_password(stack: &ByteWindow, password: &[u8]) -> Result<Option<DecodedHeader>> {
    let password_hash = hash_password(password);
    let decoded = apply_keystream(&encrypted_span(stack)?, key_from_password_hash(password_hash));

    let expected = password_check_value(password_hash);
    let stored = BigEndian::read_u32(&decoded[PASSWORD_HASH_OFFSET..PASSWORD_HASH_OFFSET + 4]);
    trace!("Password check: expected={:#010x}, stored={:#010x}", expected, stored);

    if stored != expected {
        return Ok(None);
    }
    Ok(Some(decoded))
}

/// Recovers the key without the password.
///
/// Returns `None` if no candidate passes the checks.
pub fn hack(stack: &ByteWindow) -> Result<Option<DecodedHeader>> {
    let stack_size = stack.read_u32(0)?;
    let encrypted_size = stack.read_u32(ENCRYPTED_OFFSET)?;
    let encrypted_level = stack.read_u16(USER_LEVEL_OFFSET)?;

    let xor = stack_size ^ encrypted_size;
    let high = xor & 0xFFFF_0000;
    debug!("Searching keystream start with high half {:#06x}", high >> 16);

    for low in 0..=0xFFFFu32 {
        let candidate = high | low;
        if candidate ^ (hash_number(candidate) >> 16) != xor {
            continue;
        }
        let level_key = hash_number_times(candidate, USER_LEVEL_KEY_ROUNDS);
        let user_level = encrypted_level ^ (level_key & 0xFFFF) as u16;
        trace!("Candidate {:#010x} decodes user level {}", candidate, user_level);
        if user_level <= 5 {
            debug!("Keystream start found: {:#010x}", candidate);
            return Ok(Some(apply_keystream(&encrypted_span(stack)?, candidate)));
        }
    }

    debug!("No keystream start matched");
    Ok(None)
}
