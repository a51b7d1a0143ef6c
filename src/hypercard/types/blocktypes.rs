//! Block tags and the trait shared by every typed block parser.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use super::error::Result;
use super::models::FileVersion;
use super::window::ByteWindow;

/// The four-character type code stored at offset 4 of every block.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockTag(pub [u8; 4]);

impl BlockTag {
    pub const STACK: BlockTag = BlockTag(*b"STAK");
    pub const MASTER: BlockTag = BlockTag(*b"MAST");
    pub const LIST: BlockTag = BlockTag(*b"LIST");
    pub const PAGE: BlockTag = BlockTag(*b"PAGE");
    pub const CARD: BlockTag = BlockTag(*b"CARD");
    pub const BACKGROUND: BlockTag = BlockTag(*b"BKGD");
    pub const BITMAP: BlockTag = BlockTag(*b"BMAP");
    pub const STYLE_TABLE: BlockTag = BlockTag(*b"STBL");
    pub const FONT_TABLE: BlockTag = BlockTag(*b"FTBL");
    pub const FREE: BlockTag = BlockTag(*b"FREE");
    pub const PRINT: BlockTag = BlockTag(*b"PRNT");
    pub const TAIL: BlockTag = BlockTag(*b"TAIL");
    pub const CARD_COLORS: BlockTag = BlockTag(*b"HCcd");
    pub const BACKGROUND_COLORS: BlockTag = BlockTag(*b"HCbg");

    pub fn from_u32(value: u32) -> Self {
        let mut bytes = [0u8; 4];
        BigEndian::write_u32(&mut bytes, value);
        BlockTag(bytes)
    }

    pub fn as_u32(&self) -> u32 {
        BigEndian::read_u32(&self.0)
    }
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.0 {
            let c = if byte.is_ascii_graphic() || byte == b' ' { byte as char } else { '?' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockTag(\"{}\")", self)
    }
}

/// A block kind that can be located in the master directory and parsed on its own.
///
/// Implementors are the decoded form of one block; the catalog uses [`BlockType::TAG`]
/// to validate the block it found before handing the window to [`BlockType::parse`].
pub trait BlockType: Sized {
    /// The tag the block must carry on disk.
    const TAG: BlockTag;

    /// Decodes the block from its window (which starts at the block header).
    fn parse(block: &ByteWindow, version: FileVersion) -> Result<Self>;
}
