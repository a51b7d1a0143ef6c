//! Style table (STBL) and font table (FTBL).

use log::debug;

use crate::hypercard::types::blocktypes::{BlockTag, BlockType};
use crate::hypercard::types::error::Result;
use crate::hypercard::types::models::{FileVersion, FontNameReference, StyleEntry, TextFormatting, TextStyle};
use crate::hypercard::types::window::ByteWindow;

const ENTRIES_OFFSET: usize = 0x18;
const STYLE_ENTRY_SIZE: usize = 0x18;

/// The text styles referenced by formatted part contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleTable {
    pub styles: Vec<StyleEntry>,
}

impl StyleTable {
    /// Finds a style by the number used in formatting runs.
    pub fn style(&self, number: i32) -> Option<&StyleEntry> {
        self.styles.iter().find(|style| style.number == number)
    }

    pub fn formatting(&self, number: i32) -> Option<TextFormatting> {
        self.style(number).map(|style| style.formatting)
    }
}

impl BlockType for StyleTable {
    const TAG: BlockTag = BlockTag::STYLE_TABLE;

    fn parse(block: &ByteWindow, _version: FileVersion) -> Result<Self> {
        let count = block.read_u32(0x10)? as usize;
        let styles = (0..count)
            .map(|i| {
                let offset = ENTRIES_OFFSET + i * STYLE_ENTRY_SIZE;
                let font = block.read_i16(offset + 0xC)?;
                let style = block.read_i16(offset + 0xE)?;
                let size = block.read_i16(offset + 0x10)?;
                Ok(StyleEntry {
                    number: block.read_u32(offset)? as i32,
                    run_count: block.read_u16(offset + 6)? as u32,
                    formatting: TextFormatting {
                        font_id: (font != -1).then_some(font as i32),
                        size: (size != -1).then_some(size as i32),
                        style: (style != -1).then(|| TextStyle(((style as u16) >> 8) as u8)),
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Style table: {} styles", styles.len());
        Ok(Self { styles })
    }
}

/// Names of the fonts used in the stack, by font id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontTable {
    pub fonts: Vec<FontNameReference>,
}

impl FontTable {
    pub fn font(&self, identifier: i32) -> Option<&FontNameReference> {
        self.fonts.iter().find(|font| font.identifier == identifier)
    }
}

impl BlockType for FontTable {
    const TAG: BlockTag = BlockTag::FONT_TABLE;

    fn parse(block: &ByteWindow, _version: FileVersion) -> Result<Self> {
        let count = block.read_u32(0x10)? as usize;
        let mut fonts = Vec::with_capacity(count);
        let mut offset = ENTRIES_OFFSET;

        for _ in 0..count {
            let identifier = block.read_u16(offset)? as i32;
            let name = block.read_string(offset + 2)?;
            offset += 2 + name.len() + 1;
            // Entries are 16-bit aligned
            offset += offset & 1;
            fonts.push(FontNameReference { identifier, name });
        }

        debug!("Font table: {} fonts", fonts.len());
        Ok(Self { fonts })
    }
}
