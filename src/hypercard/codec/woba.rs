//! WOBA ("Wrath Of Bill Atkinson") bitmap decoder.
//!
//! A BMAP block holds two 1-bit planes: the image (black pixels) and the mask (white
//! pixels). Each plane is compressed row by row with a small opcode language:
//!
//! ```text
//! 0x00-0x7F  z = low nibble zero bytes, then d = high nibble data bytes
//! 0x80       one uncompressed row
//! 0x81       white row            0x82  black row
//! 0x83 b     row filled with b, remembered for y mod 8
//! 0x84       row filled with the byte remembered for y mod 8
//! 0x85       copy of the row above   0x86  copy of the row two above
//! 0x88-0x8F  set the dx/dy transforms
//! 0xA0-0xBF  repeat count for the next opcode
//! 0xC0-0xDF  (op & 0x1F) * 8 data bytes
//! 0xE0-0xFF  (op & 0x1F) * 16 zero bytes
//! others     end of the plane
//! ```
//!
//! Row opcodes (0x80-0x86) emit whole rows and move on. The byte opcodes fill the row
//! left to right; once it is full the pending `dx` (running XOR along the row) and
//! `dy` (XOR with a row above) transforms are applied to it.

use log::{debug, trace};

use crate::hypercard::format::bitmap::BitmapHeader;
use crate::hypercard::types::error::Result;
use crate::hypercard::types::image::{Bitmap, ImageLayer, MaskedImage};
use crate::hypercard::types::models::{FileVersion, Rectangle};
use crate::hypercard::types::window::ByteWindow;
use crate::hypercard::utils::{down_to_multiple, up_to_multiple};

const INITIAL_PATTERN: [u8; 8] = [0xAA, 0x55, 0xAA, 0x55, 0xAA, 0x55, 0xAA, 0x55];

/// Decodes a BMAP block (the window starts at the block header) into a masked image.
pub fn decode(block: &ByteWindow, version: FileVersion) -> Result<MaskedImage> {
    let header = BitmapHeader::parse(block, version)?;
    let width = header.card_rectangle.width();
    let height = header.card_rectangle.height();

    if block.len() <= header.data_offset {
        debug!("Bitmap block has no data, using bare rectangles");
        return Ok(MaskedImage {
            width,
            height,
            image: ImageLayer::Rectangular(header.image_rectangle),
            mask: ImageLayer::Rectangular(header.mask_rectangle),
        });
    }

    let mask = decode_layer(block, header.data_offset, header.mask_length, header.mask_rectangle)?;
    let image = decode_layer(
        block,
        header.data_offset + header.mask_length,
        header.image_length,
        header.image_rectangle,
    )?;

    Ok(MaskedImage { width, height, image, mask })
}

/// Widens a rectangle horizontally to 32-pixel boundaries.
pub fn aligned_32_bits(rectangle: Rectangle) -> Rectangle {
    Rectangle {
        top: rectangle.top,
        left: down_to_multiple(rectangle.left, 32),
        bottom: rectangle.bottom,
        right: up_to_multiple(rectangle.right, 32),
    }
}

fn decode_layer(block: &ByteWindow, offset: usize, length: usize, rectangle: Rectangle) -> Result<ImageLayer> {
    let rectangle32 = aligned_32_bits(rectangle);

    let bitmap = if length > 0 && !rectangle32.is_empty() {
        let stream = block.sub_window_from(offset)?;
        Some(decode_plane(&stream, rectangle32)?)
    } else {
        None
    };

    // A zero-area rectangle means the plane is absent.
    if rectangle.is_empty() {
        return Ok(ImageLayer::Clear);
    }

    Ok(match bitmap {
        Some(image) => ImageLayer::Bitmap {
            image,
            rectangle: rectangle32,
            real_rectangle_in_image: Rectangle {
                top: 0,
                left: rectangle.left - rectangle32.left,
                bottom: rectangle.height(),
                right: rectangle.left - rectangle32.left + rectangle.width(),
            },
        },
        None => ImageLayer::Rectangular(rectangle),
    })
}

/// Decodes one plane. `rectangle` must already be 32-pixel aligned; the stream starts at
/// the first opcode and may extend past the plane's own data.
pub fn decode_plane(stream: &ByteWindow, rectangle: Rectangle) -> Result<Bitmap> {
    let width = rectangle.width().max(0) as usize;
    let height = rectangle.height().max(0) as usize;
    trace!("Decoding {}x{} plane at ({}, {})", width, height, rectangle.left, rectangle.top);
    PlaneDecoder::new(stream, width, height, rectangle.top).run()
}

/// How the opcode loop left the current row.
enum RowEnd {
    /// The row was filled byte by byte; the transforms apply.
    Filled,
    /// A row opcode already emitted and advanced past its rows.
    Emitted,
    /// An unknown opcode ended the plane.
    EndOfPlane,
}

/// Decoder state, shared by the opcode handlers.
struct PlaneDecoder<'a> {
    stream: &'a ByteWindow,
    position: usize,
    bitmap: Bitmap,
    words_per_row: usize,
    row_width: usize,
    top: i32,
    y: i32,
    bottom: i32,
    /// First word of the current row.
    pixel_index: usize,
    x: usize,
    repeat_count: usize,
    dx: u32,
    dy: usize,
    repeated_bytes: [u8; 8],
}

impl<'a> PlaneDecoder<'a> {
    fn new(stream: &'a ByteWindow, width: usize, height: usize, top: i32) -> Self {
        let bitmap = Bitmap::new(width, height);
        let words_per_row = width / 32;
        Self {
            stream,
            position: 0,
            bitmap,
            words_per_row,
            row_width: words_per_row * 32,
            top,
            y: top,
            bottom: top + height as i32,
            pixel_index: 0,
            x: 0,
            repeat_count: 1,
            dx: 0,
            dy: 0,
            repeated_bytes: INITIAL_PATTERN,
        }
    }

    fn run(mut self) -> Result<Bitmap> {
        while self.y < self.bottom {
            match self.decode_row()? {
                RowEnd::Filled => {
                    self.apply_transforms();
                    self.advance_rows(1);
                }
                RowEnd::Emitted => {}
                RowEnd::EndOfPlane => {
                    trace!("End of plane at row {}", self.y - self.top);
                    break;
                }
            }
        }
        Ok(self.bitmap)
    }

    fn decode_row(&mut self) -> Result<RowEnd> {
        self.x = 0;
        self.repeat_count = 1;

        while self.x < self.row_width {
            let opcode = self.next_byte()?;
            match opcode {
                0x00..=0x7F => self.zeros_then_data(opcode)?,
                0x80 => {
                    self.uncompressed_rows()?;
                    return Ok(RowEnd::Emitted);
                }
                0x81 => {
                    self.advance_rows(self.repeat_count);
                    return Ok(RowEnd::Emitted);
                }
                0x82 => {
                    self.fill_rows(|_| 0xFF);
                    return Ok(RowEnd::Emitted);
                }
                0x83 => {
                    let value = self.next_byte()?;
                    self.repeated_bytes[self.y.rem_euclid(8) as usize] = value;
                    self.fill_rows(|_| value);
                    return Ok(RowEnd::Emitted);
                }
                0x84 => {
                    let pattern = self.repeated_bytes;
                    self.fill_rows(|y| pattern[y.rem_euclid(8) as usize]);
                    return Ok(RowEnd::Emitted);
                }
                0x85 => {
                    self.copy_rows(1);
                    return Ok(RowEnd::Emitted);
                }
                0x86 => {
                    self.copy_rows(2);
                    return Ok(RowEnd::Emitted);
                }
                0x88..=0x8F => self.set_transforms(opcode),
                0xA0..=0xBF => self.repeat_count = (opcode & 0x1F) as usize,
                0xC0..=0xDF => self.data_bytes(opcode)?,
                0xE0..=0xFF => {
                    self.x += (opcode & 0x1F) as usize * 128 * self.repeat_count;
                    self.repeat_count = 1;
                }
                _ => return Ok(RowEnd::EndOfPlane),
            }
        }

        Ok(RowEnd::Filled)
    }

    fn next_byte(&mut self) -> Result<u8> {
        let value = self.stream.read_u8(self.position)?;
        self.position += 1;
        Ok(value)
    }

    fn advance_rows(&mut self, count: usize) {
        self.pixel_index += count * self.words_per_row;
        self.y += count as i32;
    }

    /// ORs a byte into the current row at bit position `x`. Writes that fall outside
    /// the bitmap are dropped.
    fn write_byte(&mut self, x: usize, value: u8) {
        let index = self.pixel_index + x / 32;
        if let Some(word) = self.bitmap.words_mut().get_mut(index) {
            *word |= (value as u32) << (24 - x % 32);
        }
    }

    /// 0x00-0x7F: `z` zero bytes followed by `d` data bytes.
    fn zeros_then_data(&mut self, opcode: u8) -> Result<()> {
        let zero_length = (opcode & 0xF) as usize;
        let data_length = (opcode >> 4) as usize;
        let total_length = zero_length + data_length;
        for i in 0..data_length {
            let value = self.next_byte()?;
            for r in 0..self.repeat_count {
                self.write_byte(self.x + (zero_length + i + r * total_length) * 8, value);
            }
        }
        self.x += total_length * self.repeat_count * 8;
        self.repeat_count = 1;
        Ok(())
    }

    /// 0xC0-0xDF: a run of data bytes.
    fn data_bytes(&mut self, opcode: u8) -> Result<()> {
        let data_length = (opcode & 0x1F) as usize * 8;
        for i in 0..data_length {
            let value = self.next_byte()?;
            for r in 0..self.repeat_count {
                self.write_byte(self.x + (i + r * data_length) * 8, value);
            }
        }
        self.x += data_length * self.repeat_count * 8;
        self.repeat_count = 1;
        Ok(())
    }

    /// 0x80: one row of raw words, duplicated `repeat_count` times.
    fn uncompressed_rows(&mut self) -> Result<()> {
        let words_per_row = self.words_per_row;
        for i in 0..words_per_row {
            let value = self.stream.read_u32(self.position + i * 4)?;
            for r in 0..self.repeat_count {
                let index = self.pixel_index + r * words_per_row + i;
                if let Some(word) = self.bitmap.words_mut().get_mut(index) {
                    *word |= value;
                }
            }
        }
        self.position += words_per_row * 4;
        self.advance_rows(self.repeat_count);
        Ok(())
    }

    /// Fills `repeat_count` rows, each with the byte returned for its `y`.
    fn fill_rows(&mut self, byte_for_row: impl Fn(i32) -> u8) {
        for _ in 0..self.repeat_count {
            let word = u32::from_be_bytes([byte_for_row(self.y); 4]);
            self.set_row(|_, _| word);
            self.advance_rows(1);
        }
    }

    /// 0x85/0x86: copies the row `distance` rows above, `repeat_count` times.
    /// Rows above the top of the plane read as white.
    fn copy_rows(&mut self, distance: usize) {
        for _ in 0..self.repeat_count {
            let back = distance * self.words_per_row;
            if self.pixel_index >= back {
                let source = self.pixel_index - back;
                self.set_row(|words, i| words.get(source + i).copied().unwrap_or(0));
            } else {
                self.set_row(|_, _| 0);
            }
            self.advance_rows(1);
        }
    }

    /// Overwrites the current row word by word.
    fn set_row(&mut self, value: impl Fn(&[u32], usize) -> u32) {
        for i in 0..self.words_per_row {
            let index = self.pixel_index + i;
            let words = self.bitmap.words_mut();
            if index >= words.len() {
                break;
            }
            let word = value(words, i);
            words[index] = word;
        }
    }

    fn set_transforms(&mut self, opcode: u8) {
        let (dx, dy) = match opcode {
            0x88 => (16, 0),
            0x89 => (0, 0),
            0x8A => (0, 1),
            0x8B => (0, 2),
            0x8C => (1, 0),
            0x8D => (1, 1),
            0x8E => (2, 2),
            _ => (8, 0),
        };
        self.dx = dx;
        self.dy = dy;
    }

    fn apply_transforms(&mut self) {
        let start = self.pixel_index;
        let end = start + self.words_per_row;
        if end > self.bitmap.words().len() {
            return;
        }

        if self.dx != 0 {
            apply_dx(&mut self.bitmap.words_mut()[start..end], self.dx);
        }

        if self.dy != 0 && self.dy as i32 <= self.y - self.top {
            let words = self.bitmap.words_mut();
            let back = self.dy * self.words_per_row;
            for i in start..end {
                let above = words[i - back];
                words[i] ^= above;
            }
        }
    }
}

/// Running XOR at stride `dx` along the row: every pixel becomes the XOR of itself and
/// all the pixels `dx`, `2 * dx`, ... to its left. `dx` must divide 32.
fn apply_dx(row: &mut [u32], dx: u32) {
    let mut previous_result = 0u32;
    let mut previous_xor_left = 0u32;

    for word in row.iter_mut() {
        let value = *word;
        let mut xor_left = value;
        let mut xor_right = 0u32;
        for i in 0..32 / dx {
            xor_left ^= value << (dx * i);
            xor_right ^= value >> (dx * i);
        }

        let result = previous_result ^ previous_xor_left ^ xor_right;
        *word = result;
        previous_result = result;
        previous_xor_left = xor_left;
    }
}
