//! Checksums guarding the stack header and the card list.

use byteorder::{BigEndian, ByteOrder};

use super::crypto::{DecodedHeader, ENCRYPTED_LENGTH, ENCRYPTED_OFFSET};
use crate::hypercard::types::error::Result;
use crate::hypercard::types::window::ByteWindow;
use crate::hypercard::utils::rotate_right_3_bits;

/// Size of the checksummed area at the start of the STAK block.
pub const STACK_CHECKSUM_LENGTH: usize = 0x600;

/// Sums the words of the STAK header area. A valid header sums to zero.
///
/// When the header was decrypted, the plaintext words replace the encrypted ones.
/// The span ends in the middle of the word at 0x48, so that word is rebuilt from the
/// decrypted high half and the clear low half.
pub fn stack_checksum(stack: &ByteWindow, decoded: Option<&DecodedHeader>) -> Result<u32> {
    let area = stack.bytes(0, STACK_CHECKSUM_LENGTH)?;
    let mut sum = area
        .chunks_exact(4)
        .fold(0u32, |acc, word| acc.wrapping_add(BigEndian::read_u32(word)));

    if let Some(decoded) = decoded {
        let split = ENCRYPTED_OFFSET + ENCRYPTED_LENGTH - 2;
        for offset in (ENCRYPTED_OFFSET..split).step_by(4) {
            let clear = BigEndian::read_u32(&decoded[offset - ENCRYPTED_OFFSET..]);
            let encrypted = BigEndian::read_u32(&area[offset..]);
            sum = sum.wrapping_add(clear).wrapping_sub(encrypted);
        }
        let high = BigEndian::read_u16(&decoded[split - ENCRYPTED_OFFSET..]) as u32;
        let low = BigEndian::read_u16(&area[split + 2..]) as u32;
        let encrypted = BigEndian::read_u32(&area[split..]);
        sum = sum.wrapping_add((high << 16) | low).wrapping_sub(encrypted);
    }

    Ok(sum)
}

/// Rolling checksum of a LIST block: rotate the running sum with each page id, then add
/// the page's card count.
pub fn list_checksum(pages: impl IntoIterator<Item = (i32, usize)>) -> u32 {
    pages.into_iter().fold(0u32, |acc, (identifier, card_count)| {
        rotate_right_3_bits(acc.wrapping_add(identifier as u32)).wrapping_add(card_count as u32)
    })
}

/// Rolling checksum of a PAGE block over its card ids.
pub fn page_checksum(card_ids: impl IntoIterator<Item = i32>) -> u32 {
    card_ids
        .into_iter()
        .fold(0u32, |acc, identifier| rotate_right_3_bits(acc.wrapping_add(identifier as u32)))
}
