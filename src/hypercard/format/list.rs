//! The card list: a LIST block referencing PAGE blocks, which reference the cards.
//!
//! # Structure
//! ```text
//! LIST ── page 1 ── card, card, card...
//!      ├─ page 2 ── card, card...
//!      └─ ...
//! ```
//!
//! Concatenating the pages' card references in LIST order gives the stack order.
//! Both levels carry a rolling checksum of the ids they reference.

use log::{debug, trace, warn};

use crate::hypercard::codec::checksum::{list_checksum, page_checksum};
use crate::hypercard::types::blocktypes::{BlockTag, BlockType};
use crate::hypercard::types::error::{Result, StackError};
use crate::hypercard::types::models::{CardReference, FileVersion, PageReference, SearchHash};
use crate::hypercard::types::window::ByteWindow;

const PAGE_REFERENCES_OFFSET: usize = 0x30;
const PAGE_REFERENCE_SIZE: usize = 6;
const CARD_REFERENCES_OFFSET: usize = 0x18;

/// Decoded LIST block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListBlock {
    pub pages: Vec<PageReference>,
    /// Size of one card reference in the PAGE blocks.
    pub card_reference_size: usize,
    /// Number of search hash values per card reference.
    pub hash_value_count: usize,
}

impl BlockType for ListBlock {
    const TAG: BlockTag = BlockTag::LIST;

    fn parse(block: &ByteWindow, version: FileVersion) -> Result<Self> {
        let page_count = block.read_u32(version.field(0x10))? as usize;
        let card_reference_size = block.read_u16(version.field(0x1C))? as usize;
        let hash_value_count = block.read_u16(version.field(0x20))? as usize;
        let expected = block.read_u32(version.field(0x24))?;

        let pages = (0..page_count)
            .map(|i| {
                let offset = PAGE_REFERENCES_OFFSET + i * PAGE_REFERENCE_SIZE;
                Ok(PageReference {
                    identifier: block.read_i32(offset)?,
                    card_count: block.read_u16(offset + 4)? as usize,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let actual = list_checksum(pages.iter().map(|page| (page.identifier, page.card_count)));
        verify_checksum("LIST", expected, actual, version)?;

        if card_reference_size < 4 {
            return Err(StackError::Corrupted(format!(
                "card reference size {} is smaller than a card id",
                card_reference_size
            )));
        }

        debug!("Card list: {} pages, {}-byte card references", pages.len(), card_reference_size);
        Ok(Self {
            pages,
            card_reference_size,
            hash_value_count,
        })
    }
}

/// Decoded PAGE block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBlock {
    pub list_id: i32,
    pub cards: Vec<CardReference>,
}

impl PageBlock {
    /// Parses a PAGE block. The card count and reference layout come from the LIST.
    pub fn parse(block: &ByteWindow, version: FileVersion, list: &ListBlock, card_count: usize) -> Result<Self> {
        let list_id = block.read_i32(version.field(0x10))?;
        let expected = block.read_u32(version.field(0x14))?;
        let hash_word_count = (list.card_reference_size - 4) / 4;

        let cards = (0..card_count)
            .map(|i| {
                let offset = CARD_REFERENCES_OFFSET + i * list.card_reference_size;
                let flags = block.read_u16(offset + 4)?;
                let words = (0..hash_word_count)
                    .map(|w| block.read_u32(offset + 4 + w * 4))
                    .collect::<Result<Vec<_>>>()?;
                Ok(CardReference {
                    identifier: block.read_i32(offset)?,
                    marked: flags & (1 << 12) != 0,
                    has_text_content: flags & (1 << 13) != 0,
                    is_start_of_background: flags & (1 << 14) != 0,
                    has_name: flags & (1 << 15) != 0,
                    search_hash: SearchHash {
                        words,
                        value_count: list.hash_value_count,
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let actual = page_checksum(cards.iter().map(|card| card.identifier));
        verify_checksum("PAGE", expected, actual, version)?;

        trace!("Page parsed: {} cards", cards.len());
        Ok(Self { list_id, cards })
    }
}

/// Compares a rolling checksum. Version 1 stacks written by early HyperCard releases
/// left it at zero, which is accepted for them only.
fn verify_checksum(context: &str, expected: u32, actual: u32, version: FileVersion) -> Result<()> {
    trace!("{} checksum: expected={:#010x}, actual={:#010x}", context, expected, actual);
    if expected == actual {
        return Ok(());
    }
    if expected == 0 && version == FileVersion::V1 {
        warn!("{} checksum missing in version 1 stack, accepting", context);
        return Ok(());
    }
    Err(StackError::Corrupted(format!(
        "{} checksum mismatch: expected {:#010x}, got {:#010x}",
        context, expected, actual
    )))
}
