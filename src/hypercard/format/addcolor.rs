//! AddColor resources (`HCcd` for cards, `HCbg` for backgrounds).
//!
//! The AddColor extension stores the colors of a card or background in the resource
//! fork, in a resource whose id is the layer id. The resource is a flat sequence of
//! elements, drawn in resource order.
//!
//! # Structure
//! ```text
//! element: kind (1): bit 7 set when disabled, bits 0-6 the kind
//!
//! 1 button:           part id (2), bevel (2), color (6)
//! 2 field:            part id (2), bevel (2), color (6)
//! 3 rectangle:        rectangle (8), bevel (2), color (6)
//! 4 picture resource: rectangle (8), transparent (1), name length (1), name
//! 5 picture file:     rectangle (8), transparent (1), name length (1), name
//!
//! color: red (2), green (2), blue (2)
//! ```

use log::trace;

use crate::hypercard::types::error::{Result, StackError};
use crate::hypercard::types::models::Rectangle;
use crate::hypercard::types::text::MacString;
use crate::hypercard::types::window::ByteWindow;

const COLORED_PART_LENGTH: usize = 11;
const COLORED_RECTANGLE_LENGTH: usize = 17;
const PICTURE_HEADER_LENGTH: usize = 11;

/// A 48-bit QuickDraw color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RgbColor {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

impl RgbColor {
    pub const fn new(red: u16, green: u16, blue: u16) -> Self {
        Self { red, green, blue }
    }

    /// The components scaled to `0.0..=1.0`.
    pub fn to_unit(&self) -> [f64; 3] {
        let scale = |component: u16| component as f64 / u16::MAX as f64;
        [scale(self.red), scale(self.green), scale(self.blue)]
    }

    fn read(window: &ByteWindow, offset: usize) -> Result<Self> {
        Ok(Self {
            red: window.read_u16(offset)?,
            green: window.read_u16(offset + 2)?,
            blue: window.read_u16(offset + 4)?,
        })
    }
}

/// One colored element of a card or background.
#[derive(Debug, Clone, PartialEq)]
pub enum AddColorElement {
    Button {
        part_id: i32,
        bevel: u16,
        color: RgbColor,
        enabled: bool,
    },
    Field {
        part_id: i32,
        bevel: u16,
        color: RgbColor,
        enabled: bool,
    },
    Rectangle {
        rectangle: Rectangle,
        bevel: u16,
        color: RgbColor,
        enabled: bool,
    },
    /// A PICT resource drawn in `rectangle`; transparent pictures skip their white pixels.
    PictureResource {
        rectangle: Rectangle,
        transparent: bool,
        name: MacString,
        enabled: bool,
    },
    /// A picture file looked up by name next to the application, the Home stack or the stack.
    PictureFile {
        rectangle: Rectangle,
        transparent: bool,
        file_name: MacString,
        enabled: bool,
    },
}

impl AddColorElement {
    pub fn enabled(&self) -> bool {
        match self {
            AddColorElement::Button { enabled, .. }
            | AddColorElement::Field { enabled, .. }
            | AddColorElement::Rectangle { enabled, .. }
            | AddColorElement::PictureResource { enabled, .. }
            | AddColorElement::PictureFile { enabled, .. } => *enabled,
        }
    }

    /// Decodes every element of an AddColor resource.
    ///
    /// # Errors
    /// `Corrupted` for an unknown element kind, `TruncatedData` for an element cut
    /// short by the end of the resource.
    pub fn parse_all(data: &ByteWindow) -> Result<Vec<AddColorElement>> {
        let mut elements = Vec::new();
        let mut offset = 0;
        while offset < data.len() {
            let (element, length) = Self::parse(data, offset)?;
            elements.push(element);
            offset += length;
        }
        trace!("AddColor resource: {} elements", elements.len());
        Ok(elements)
    }

    /// Decodes the element at `offset`, returning it with its length.
    fn parse(data: &ByteWindow, offset: usize) -> Result<(AddColorElement, usize)> {
        let kind_and_flag = data.read_u8(offset)?;
        let enabled = kind_and_flag & 0x80 == 0;

        let element = match kind_and_flag & 0x7F {
            kind @ (1 | 2) => {
                let part_id = data.read_u16(offset + 1)? as i32;
                let bevel = data.read_u16(offset + 3)?;
                let color = RgbColor::read(data, offset + 5)?;
                let element = if kind == 1 {
                    AddColorElement::Button {
                        part_id,
                        bevel,
                        color,
                        enabled,
                    }
                } else {
                    AddColorElement::Field {
                        part_id,
                        bevel,
                        color,
                        enabled,
                    }
                };
                (element, COLORED_PART_LENGTH)
            }
            3 => {
                let element = AddColorElement::Rectangle {
                    rectangle: data.read_rectangle(offset + 1)?,
                    bevel: data.read_u16(offset + 9)?,
                    color: RgbColor::read(data, offset + 0xB)?,
                    enabled,
                };
                (element, COLORED_RECTANGLE_LENGTH)
            }
            kind @ (4 | 5) => {
                let rectangle = data.read_rectangle(offset + 1)?;
                let transparent = data.read_u8(offset + 9)? != 0;
                let name_length = data.read_u8(offset + 0xA)? as usize;
                let name = data.read_string_with_length(offset + PICTURE_HEADER_LENGTH, name_length)?;
                let element = if kind == 4 {
                    AddColorElement::PictureResource {
                        rectangle,
                        transparent,
                        name,
                        enabled,
                    }
                } else {
                    AddColorElement::PictureFile {
                        rectangle,
                        transparent,
                        file_name: name,
                        enabled,
                    }
                };
                (element, PICTURE_HEADER_LENGTH + name_length)
            }
            other => {
                return Err(StackError::Corrupted(format!(
                    "unknown AddColor element kind {} at offset {}",
                    other, offset
                )))
            }
        };
        Ok(element)
    }
}
