//! Classic Mac OS resource fork reader.
//!
//! Stacks keep their icons, sounds, cursors and fonts in the resource fork of the
//! stack file. The fork is handed over as raw bytes (it lives outside the data fork).
//!
//! # Structure
//! ```text
//! 0x00 data offset, 0x04 map offset, 0x08 data length, 0x0C map length
//!
//! map: 0x1A name list offset
//!      0x1C type count - 1
//!      0x1E types:      type (4), count - 1 (2), reference list offset (2)
//!           references: id (2), name offset (2), attributes + data offset (4), reserved (4)
//! ```

use std::sync::Arc;

use log::debug;

use super::addcolor::AddColorElement;
use crate::hypercard::types::blocktypes::BlockTag;
use crate::hypercard::types::error::Result;
use crate::hypercard::types::models::LayerType;
use crate::hypercard::types::text::MacString;
use crate::hypercard::types::window::ByteWindow;

const MAP_HEADER_LENGTH: usize = 30;
const TYPE_ENTRY_LENGTH: usize = 8;
const REFERENCE_LENGTH: usize = 12;

/// One resource: its four-character type, id, name and data.
#[derive(Debug, Clone)]
pub struct Resource {
    pub resource_type: BlockTag,
    pub identifier: i32,
    pub name: MacString,
    pub data: ByteWindow,
}

/// Every resource of a fork, in map order.
#[derive(Debug, Clone, Default)]
pub struct ResourceFork {
    pub resources: Vec<Resource>,
}

impl ResourceFork {
    pub fn from_bytes(data: impl Into<Arc<[u8]>>) -> Result<Self> {
        Self::parse(&ByteWindow::new(data))
    }

    pub fn parse(fork: &ByteWindow) -> Result<Self> {
        let data_offset = fork.read_u32(0x0)? as usize;
        let map_offset = fork.read_u32(0x4)? as usize;
        let map_length = fork.read_u32(0xC)? as usize;
        let map = fork.sub_window(map_offset, map_length)?;

        let name_list_offset = map.read_u16(0x1A)? as usize;
        let type_count = (map.read_i16(0x1C)? as i32 + 1).max(0) as usize;

        let mut resources = Vec::new();
        for t in 0..type_count {
            let type_offset = MAP_HEADER_LENGTH + t * TYPE_ENTRY_LENGTH;
            let resource_type = BlockTag::from_u32(map.read_u32(type_offset)?);
            let reference_count = map.read_u16(type_offset + 4)? as usize + 1;
            let reference_list_offset = map.read_u16(type_offset + 6)? as usize;

            // Reference list offsets are relative to the type list, which starts 2 bytes
            // before the first type entry
            let mut reference_offset = reference_list_offset + MAP_HEADER_LENGTH - 2;
            for _ in 0..reference_count {
                let identifier = map.read_i16(reference_offset)? as i32;
                let name_offset = map.read_i16(reference_offset + 2)?;
                let resource_data_offset = (map.read_u32(reference_offset + 4)? & 0xFF_FFFF) as usize;

                let name = if name_offset == -1 {
                    MacString::new()
                } else {
                    map.read_pascal_string(name_list_offset + name_offset as u16 as usize)?
                };

                let offset = data_offset + resource_data_offset;
                let length = fork.read_u32(offset)? as usize;
                resources.push(Resource {
                    resource_type,
                    identifier,
                    name,
                    data: fork.sub_window(offset + 4, length)?,
                });

                reference_offset += REFERENCE_LENGTH;
            }
        }

        debug!("Resource fork: {} resources in {} types", resources.len(), type_count);
        Ok(Self { resources })
    }

    pub fn resources_of_type(&self, resource_type: BlockTag) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(move |r| r.resource_type == resource_type)
    }

    pub fn find(&self, resource_type: BlockTag, identifier: i32) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|r| r.resource_type == resource_type && r.identifier == identifier)
    }

    /// The AddColor elements of a card or background, or `None` when the layer is not
    /// colored.
    pub fn add_colors(&self, layer: LayerType, identifier: i32) -> Result<Option<Vec<AddColorElement>>> {
        let resource_type = match layer {
            LayerType::Card => BlockTag::CARD_COLORS,
            LayerType::Background => BlockTag::BACKGROUND_COLORS,
        };
        self.find(resource_type, identifier)
            .map(|resource| AddColorElement::parse_all(&resource.data))
            .transpose()
    }
}
