//! Card (CARD) and background (BKGD) blocks.
//!
//! # Structure
//! ```text
//! block header
//! layer fields     bitmap id, flags, kind-specific ids and counts
//! part list        fixed header + name + script per part
//! content list     text of the parts, keyed by part id
//! name\0 script\0
//! ```
//!
//! Cards and backgrounds share everything but a few fields in the header, so the
//! layout is described by a [`LayerLayout`] and parsed by one function.

use log::trace;

use crate::hypercard::types::blocktypes::{BlockTag, BlockType};
use crate::hypercard::types::error::Result;
use crate::hypercard::types::models::{
    Background, Card, ContentOwner, ContentText, FileVersion, FormattingRun, LayerContents, LayerType, Part,
    PartContent, PartKind, PartStyle, TextAlign, TextStyle,
};
use crate::hypercard::types::text::MacString;
use crate::hypercard::types::window::ByteWindow;

/// Version 2 offsets of the fields whose position differs between cards and backgrounds.
struct LayerLayout {
    part_count: usize,
    next_part_id: usize,
    part_list_size: usize,
    content_count: usize,
    content_list_size: usize,
    parts: usize,
}

const CARD_LAYOUT: LayerLayout = LayerLayout {
    part_count: 0x28,
    next_part_id: 0x2A,
    part_list_size: 0x2C,
    content_count: 0x30,
    content_list_size: 0x32,
    parts: 0x36,
};

const BACKGROUND_LAYOUT: LayerLayout = LayerLayout {
    part_count: 0x24,
    next_part_id: 0x26,
    part_list_size: 0x28,
    content_count: 0x2C,
    content_list_size: 0x2E,
    parts: 0x32,
};

/// A CARD block, before it is matched with its card reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardBlock {
    pub identifier: i32,
    pub page_id: i32,
    pub background_id: i32,
    pub layer: LayerContents,
}

impl CardBlock {
    /// Attaches the `marked` flag kept in the card reference.
    pub fn into_card(self, marked: bool) -> Card {
        Card {
            identifier: self.identifier,
            page_id: self.page_id,
            background_id: self.background_id,
            marked,
            layer: self.layer,
        }
    }
}

impl BlockType for CardBlock {
    const TAG: BlockTag = BlockTag::CARD;

    fn parse(block: &ByteWindow, version: FileVersion) -> Result<Self> {
        Ok(Self {
            identifier: block.read_i32(8)?,
            page_id: block.read_i32(version.field(0x20))?,
            background_id: block.read_i32(version.field(0x24))?,
            layer: parse_layer(block, version, &CARD_LAYOUT)?,
        })
    }
}

impl BlockType for Background {
    const TAG: BlockTag = BlockTag::BACKGROUND;

    fn parse(block: &ByteWindow, version: FileVersion) -> Result<Self> {
        Ok(Self {
            identifier: block.read_i32(8)?,
            card_count: block.read_u32(version.field(0x18))?,
            next_background_id: block.read_i32(version.field(0x1C))?,
            previous_background_id: block.read_i32(version.field(0x20))?,
            layer: parse_layer(block, version, &BACKGROUND_LAYOUT)?,
        })
    }
}

fn parse_layer(block: &ByteWindow, version: FileVersion, layout: &LayerLayout) -> Result<LayerContents> {
    let bitmap_id = block.read_i32(version.field(0x10))?;
    let flags = block.read_u16(version.field(0x14))?;
    let part_count = block.read_u16(version.field(layout.part_count))? as usize;
    let next_available_part_id = block.read_i16(version.field(layout.next_part_id))? as i32;
    let part_list_size = block.read_u32(version.field(layout.part_list_size))? as usize;
    let content_count = block.read_u16(version.field(layout.content_count))? as usize;
    let content_list_size = block.read_u32(version.field(layout.content_list_size))? as usize;

    // Step 1: Parts
    let parts_offset = version.field(layout.parts);
    let mut parts = Vec::with_capacity(part_count);
    let mut offset = parts_offset;
    for _ in 0..part_count {
        let size = block.read_u16(offset)? as usize;
        parts.push(parse_part(&block.sub_window(offset, size)?)?);
        offset += size;
    }

    // Step 2: Contents
    let contents_offset = parts_offset + part_list_size;
    let mut contents = Vec::with_capacity(content_count);
    let mut offset = contents_offset;
    for _ in 0..content_count {
        let (content, size) = parse_content(block, offset)?;
        contents.push(content);
        offset += size;
    }

    // Step 3: Name and script
    let strings_offset = contents_offset + content_list_size;
    let name = read_optional_string(block, strings_offset)?;
    let script = read_optional_string(block, strings_offset + name.len() + 1)?;

    trace!("Layer parsed: {} parts, {} contents", parts.len(), contents.len());
    Ok(LayerContents {
        bitmap_id: (bitmap_id != 0).then_some(bitmap_id),
        cant_delete: flags & (1 << 14) != 0,
        show_picture: flags & (1 << 13) == 0,
        dont_search: flags & (1 << 11) != 0,
        next_available_part_id,
        parts,
        contents,
        name,
        script,
    })
}

/// Reads a string that may be missing at the end of the block.
fn read_optional_string(block: &ByteWindow, offset: usize) -> Result<MacString> {
    if offset >= block.len() {
        return Ok(MacString::new());
    }
    block.read_string(offset)
}

fn parse_part(part: &ByteWindow) -> Result<Part> {
    let flags = part.read_u8(0x05)?;
    let flags2 = part.read_u8(0x0E)?;
    let name = part.read_string(0x1E)?;
    // The name is followed by its terminator and one filler byte
    let script = read_optional_string(part, 0x1E + name.len() + 2)?;

    Ok(Part {
        identifier: part.read_i16(0x02)? as i32,
        kind: PartKind::try_from(part.read_u8(0x04)?)?,
        visible: flags & 0x80 == 0,
        dont_wrap: flags & 0x20 != 0,
        dont_search: flags & 0x10 != 0,
        shared_text: flags & 0x08 != 0,
        fixed_line_height: flags & 0x04 != 0,
        auto_tab: flags & 0x02 != 0,
        lock_text_or_disabled: flags & 0x01 != 0,
        rectangle: part.read_rectangle(0x06)?,
        show_name_or_auto_select: flags2 & 0x80 != 0,
        highlight_or_show_lines: flags2 & 0x40 != 0,
        auto_highlight_or_wide_margins: flags2 & 0x20 != 0,
        shared_highlight_or_multiple_lines: flags2 & 0x10 != 0,
        family: flags2 & 0x0F,
        style: PartStyle::try_from(part.read_u8(0x0F)?)?,
        title_width_or_last_selected_line: part.read_i16(0x10)? as i32,
        icon_or_first_selected_line: part.read_i16(0x12)? as i32,
        text_align: TextAlign::from(part.read_i16(0x14)?),
        text_font_id: part.read_i16(0x16)? as i32,
        text_size: part.read_i16(0x18)? as i32,
        text_style: TextStyle(part.read_u8(0x1A)?),
        text_height: part.read_i16(0x1C)? as i32,
        name,
        script,
    })
}

/// Parses the content record at `offset`, returning it with its padded size.
fn parse_content(block: &ByteWindow, offset: usize) -> Result<(PartContent, usize)> {
    let identifier = block.read_i16(offset)? as i32;
    let length = block.read_u16(offset + 2)? as usize;
    let data = block.sub_window(offset + 4, length)?;

    let owner = if identifier < 0 {
        ContentOwner {
            layer: LayerType::Card,
            part_id: -identifier,
        }
    } else {
        ContentOwner {
            layer: LayerType::Background,
            part_id: identifier,
        }
    };

    let text = if data.is_empty() {
        ContentText::Plain(MacString::new())
    } else if data.read_u8(0)? == 0 {
        ContentText::Plain(data.read_string_with_length(1, length - 1)?)
    } else {
        let formatting_length = (data.read_u16(0)? & 0x7FFF) as usize;
        let run_count = formatting_length.saturating_sub(2) / 4;
        let runs = (0..run_count)
            .map(|i| {
                let run_offset = 2 + i * 4;
                Ok(FormattingRun {
                    offset: data.read_u16(run_offset)? as usize,
                    style_id: data.read_u16(run_offset + 2)? as i32,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let text_length = length.saturating_sub(formatting_length);
        ContentText::Formatted {
            text: data.read_string_with_length(formatting_length.min(length), text_length)?,
            runs,
        }
    };

    let size = 4 + length;
    Ok((PartContent { owner, text }, size + (size & 1)))
}
