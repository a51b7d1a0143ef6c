//! Stack header (STAK block) parsing.
//!
//! # Structure
//! ```text
//! 0x000  block header (length, "STAK", id, filler)
//! 0x010  format revision
//! 0x014  total file size
//! 0x018  ┐
//!  ...   │ counts, first ids, LIST id, password hash, user level
//! 0x04A  ┘ (encrypted when the stack is private access)
//! 0x04C  protection flags
//! 0x060  version stamps
//! 0x070  checksum slot
//! 0x078  window, screen and scroll geometry
//! 0x1B0  FTBL and STBL ids, card size
//! 0x2C0  40 patterns
//! 0x400  free block table
//! 0x600  stack script
//! ```
//!
//! Parsing happens in two phases: the raw block is located and, if needed, the
//! encrypted span is decoded once; the header is then read from plain values.

use byteorder::{BigEndian, ByteOrder};
use log::{debug, info, trace};

use crate::hypercard::codec::checksum::stack_checksum;
use crate::hypercard::codec::crypto::{self, DecodedHeader, ENCRYPTED_LENGTH, ENCRYPTED_OFFSET};
use crate::hypercard::types::blocktypes::BlockTag;
use crate::hypercard::types::error::{Result, StackError};
use crate::hypercard::types::models::{
    AppVersion, FormatRevision, FreeLocation, Pattern, Point, Size, StackFlags, StackHeader, UserLevel,
    VersionStamps,
};
use crate::hypercard::types::text::MacString;
use crate::hypercard::types::window::ByteWindow;

const REVISION_OFFSET: usize = 0x13;
const FLAGS_OFFSET: usize = 0x4C;
const PATTERN_OFFSET: usize = 0x2C0;
const PATTERN_COUNT: usize = 40;
const FREE_TABLE_OFFSET: usize = 0x400;
const SCRIPT_OFFSET: usize = 0x600;
const DEFAULT_CARD_SIZE: Size = Size { width: 512, height: 342 };

/// The STAK block with its encrypted span decoded.
struct DecodedStack {
    block: ByteWindow,
    decoded: Option<DecodedHeader>,
}

impl DecodedStack {
    /// Reads a word that may lie in the encrypted span.
    fn read_u32(&self, offset: usize) -> Result<u32> {
        match &self.decoded {
            Some(decoded) if (ENCRYPTED_OFFSET..ENCRYPTED_OFFSET + ENCRYPTED_LENGTH - 3).contains(&offset) => {
                Ok(BigEndian::read_u32(&decoded[offset - ENCRYPTED_OFFSET..]))
            }
            _ => self.block.read_u32(offset),
        }
    }

    fn read_i32(&self, offset: usize) -> Result<i32> {
        Ok(self.read_u32(offset)? as i32)
    }

    fn read_u16(&self, offset: usize) -> Result<u16> {
        match &self.decoded {
            Some(decoded) if (ENCRYPTED_OFFSET..ENCRYPTED_OFFSET + ENCRYPTED_LENGTH - 1).contains(&offset) => {
                Ok(BigEndian::read_u16(&decoded[offset - ENCRYPTED_OFFSET..]))
            }
            _ => self.block.read_u16(offset),
        }
    }
}

/// Parses and validates the stack header at the start of `file`.
///
/// `password` is used when the stack is private access. Without one, `hack_encryption`
/// lets the reader recover the key from the header itself.
///
/// # Errors
/// - [`StackError::NotRecognizedFormat`] if the file does not start with a known STAK block
/// - [`StackError::MissingPassword`] / [`StackError::WrongPassword`] for private access stacks
/// - [`StackError::Corrupted`] if the header checksum fails
pub fn parse(file: &ByteWindow, password: Option<&MacString>, hack_encryption: bool) -> Result<StackHeader> {
    let stack = decode(file, password, hack_encryption)?;
    let block = &stack.block;

    // Step 1: Verify the checksum over the plaintext header
    let sum = stack_checksum(block, stack.decoded.as_ref())?;
    trace!("Stack header checksum sum: {:#010x}", sum);
    if sum != 0 {
        return Err(StackError::Corrupted(format!(
            "stack header checksum does not sum to zero ({:#010x})",
            sum
        )));
    }

    // Step 2: Read the fields
    let revision = FormatRevision::try_from(block.read_u8(REVISION_OFFSET)?)?;
    let stack_size = stack.read_u32(0x18)?;
    let free_block_count = stack.read_u32(0x38)?;
    let print_block_id = stack.read_i32(0x40)?;
    let password_hash = stack.read_u32(0x44)?;
    let font_table_id = block.read_i32(0x1B0)?;
    let style_table_id = block.read_i32(0x1B4)?;

    // Each dimension falls back on its own
    let card_size = Size {
        width: match block.read_u16(0x1BA)? {
            0 => DEFAULT_CARD_SIZE.width,
            width => width as i32,
        },
        height: match block.read_u16(0x1B8)? {
            0 => DEFAULT_CARD_SIZE.height,
            height => height as i32,
        },
    };

    let header = StackHeader {
        revision,
        total_size: block.read_u32(0x14)?,
        stack_size,
        master_table_count: stack.read_u32(0x20)?.wrapping_add(1),
        background_count: stack.read_u32(0x24)?,
        first_background_id: stack.read_i32(0x28)?,
        card_count: stack.read_u32(0x2C)?,
        first_card_id: stack.read_i32(0x30)?,
        list_id: stack.read_i32(0x34)?,
        free_block_count,
        free_size: stack.read_u32(0x3C)?,
        print_block_id: (print_block_id != 0).then_some(print_block_id),
        password_hash: (password_hash != 0).then_some(password_hash),
        user_level: UserLevel::try_from(stack.read_u16(0x48)?)?,
        flags: StackFlags::from(block.read_u16(FLAGS_OFFSET)?),
        versions: VersionStamps {
            at_creation: AppVersion::from_code(block.read_u32(0x60)?),
            at_last_compacting: AppVersion::from_code(block.read_u32(0x64)?),
            at_last_modification_since_last_compacting: AppVersion::from_code(block.read_u32(0x68)?),
            at_last_modification: AppVersion::from_code(block.read_u32(0x6C)?),
        },
        marked_card_count: block.read_u32(0x74)?,
        window_rectangle: block.read_rectangle(0x78)?,
        screen_rectangle: block.read_rectangle(0x80)?,
        scroll: Point {
            y: block.read_u16(0x88)? as i32,
            x: block.read_u16(0x8A)? as i32,
        },
        font_table_id: (font_table_id != 0).then_some(font_table_id),
        style_table_id: (style_table_id != 0).then_some(style_table_id),
        card_size,
        patterns: read_patterns(block)?,
        free_locations: read_free_locations(block, free_block_count)?,
        script: read_script(block, stack_size)?,
        was_encrypted: stack.decoded.is_some(),
    };

    info!(
        "Stack header parsed: revision {:?}, {} cards, {} backgrounds",
        header.revision, header.card_count, header.background_count
    );
    Ok(header)
}

/// Locates the STAK block and decodes its encrypted span if the stack is private.
fn decode(file: &ByteWindow, password: Option<&MacString>, hack_encryption: bool) -> Result<DecodedStack> {
    // Reject unknown revisions before anything else
    let revision = file.read_u8(REVISION_OFFSET).map_err(|_| {
        StackError::NotRecognizedFormat(format!("file of {} bytes is too short for a stack", file.len()))
    })?;
    FormatRevision::try_from(revision)?;

    let tag = BlockTag::from_u32(file.read_u32(4)?);
    if tag != BlockTag::STACK {
        return Err(StackError::NotRecognizedFormat(format!("first block is {}, not STAK", tag)));
    }
    let length = file.read_u32(0)? as usize;
    let block = file.sub_window(0, length)?;

    let flags = StackFlags::from(block.read_u16(FLAGS_OFFSET)?);
    if !flags.private_access {
        return Ok(DecodedStack { block, decoded: None });
    }

    let decoded = match password {
        Some(password) => {
            debug!("Decrypting stack header with password");
            let normalized = password.to_lowercase_without_accents();
            crypto::decrypt_with_password(&block, normalized.as_bytes())?.ok_or(StackError::WrongPassword)?
        }
        None if hack_encryption => {
            debug!("Decrypting stack header without password");
            crypto::hack(&block)?.ok_or(StackError::MissingPassword)?
        }
        None => return Err(StackError::MissingPassword),
    };

    Ok(DecodedStack {
        block,
        decoded: Some(decoded),
    })
}

fn read_patterns(block: &ByteWindow) -> Result<Vec<Pattern>> {
    let bytes = block.bytes(PATTERN_OFFSET, PATTERN_COUNT * 8)?;
    Ok(bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut pattern = [0u8; 8];
            pattern.copy_from_slice(chunk);
            pattern
        })
        .collect())
}

fn read_free_locations(block: &ByteWindow, count: u32) -> Result<Vec<FreeLocation>> {
    (0..count as usize)
        .map(|i| {
            let offset = FREE_TABLE_OFFSET + i * 8;
            Ok(FreeLocation {
                offset: block.read_u32(offset)?,
                size: block.read_u32(offset + 4)?,
            })
        })
        .collect()
}

fn read_script(block: &ByteWindow, stack_size: u32) -> Result<MacString> {
    if (stack_size as usize) <= SCRIPT_OFFSET {
        return Ok(MacString::new());
    }
    block.read_string(SCRIPT_OFFSET)
}
