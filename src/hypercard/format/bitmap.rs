//! BMAP block header. The pixel data itself is handled by [`codec::woba`](crate::hypercard::codec::woba).

use crate::hypercard::codec::woba;
use crate::hypercard::types::blocktypes::{BlockTag, BlockType};
use crate::hypercard::types::error::Result;
use crate::hypercard::types::image::MaskedImage;
use crate::hypercard::types::models::{FileVersion, Rectangle};
use crate::hypercard::types::window::ByteWindow;

/// Geometry and plane sizes of a bitmap block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapHeader {
    pub card_rectangle: Rectangle,
    pub mask_rectangle: Rectangle,
    pub image_rectangle: Rectangle,
    pub mask_length: usize,
    pub image_length: usize,
    /// Offset of the mask stream; the image stream follows it.
    pub data_offset: usize,
}

impl BitmapHeader {
    pub fn parse(block: &ByteWindow, version: FileVersion) -> Result<Self> {
        Ok(Self {
            card_rectangle: block.read_rectangle(version.field(0x18))?,
            mask_rectangle: block.read_rectangle(version.field(0x20))?,
            image_rectangle: block.read_rectangle(version.field(0x28))?,
            mask_length: block.read_u32(version.field(0x38))? as usize,
            image_length: block.read_u32(version.field(0x3C))? as usize,
            data_offset: version.field(0x40),
        })
    }
}

impl BlockType for MaskedImage {
    const TAG: BlockTag = BlockTag::BITMAP;

    fn parse(block: &ByteWindow, version: FileVersion) -> Result<Self> {
        woba::decode(block, version)
    }
}
