//! Bounds-checked big-endian reads over a shared, immutable byte buffer.
//!
//! Every structure in a stack file is read through a [`ByteWindow`]. A window is an
//! `(offset, length)` view over an `Arc<[u8]>`; narrowing it with
//! [`ByteWindow::sub_window`] clones the `Arc`, never the bytes, so a card, its
//! bitmap and the master directory can all alias the one buffer read from disk.
//!
//! Reads are relative to the window start. Anything that would cross the end of the
//! window fails with [`StackError::TruncatedData`].

use std::fmt;
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};

use super::error::{Result, StackError};
use super::models::{Point, Rectangle};
use super::text::MacString;

/// An immutable view into a shared byte buffer.
#[derive(Clone)]
pub struct ByteWindow {
    data: Arc<[u8]>,
    offset: usize,
    length: usize,
}

impl ByteWindow {
    /// Creates a window spanning the whole buffer.
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        let data = data.into();
        let length = data.len();
        Self { data, offset: 0, length }
    }

    /// Number of bytes visible through this window.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Absolute position of the window start in the backing buffer.
    pub fn absolute_offset(&self) -> usize {
        self.offset
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.offset..self.offset + self.length]
    }

    /// Narrows the window to `length` bytes starting at `offset`.
    pub fn sub_window(&self, offset: usize, length: usize) -> Result<ByteWindow> {
        self.check(offset, length)?;
        Ok(ByteWindow {
            data: Arc::clone(&self.data),
            offset: self.offset + offset,
            length,
        })
    }

    /// Narrows the window to everything from `offset` to the end.
    pub fn sub_window_from(&self, offset: usize) -> Result<ByteWindow> {
        let length = self.length.checked_sub(offset).ok_or(StackError::TruncatedData {
            offset,
            length: 0,
            available: self.length,
        })?;
        self.sub_window(offset, length)
    }

    fn check(&self, offset: usize, length: usize) -> Result<()> {
        match offset.checked_add(length) {
            Some(end) if end <= self.length => Ok(()),
            _ => Err(StackError::TruncatedData {
                offset,
                length,
                available: self.length,
            }),
        }
    }

    /// Borrows `length` bytes at `offset`.
    pub fn bytes(&self, offset: usize, length: usize) -> Result<&[u8]> {
        self.check(offset, length)?;
        let start = self.offset + offset;
        Ok(&self.data[start..start + length])
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        Ok(self.bytes(offset, 1)?[0])
    }

    pub fn read_i8(&self, offset: usize) -> Result<i8> {
        Ok(self.read_u8(offset)? as i8)
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16> {
        Ok(BigEndian::read_u16(self.bytes(offset, 2)?))
    }

    pub fn read_i16(&self, offset: usize) -> Result<i16> {
        Ok(BigEndian::read_i16(self.bytes(offset, 2)?))
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        Ok(BigEndian::read_u32(self.bytes(offset, 4)?))
    }

    pub fn read_i32(&self, offset: usize) -> Result<i32> {
        Ok(BigEndian::read_i32(self.bytes(offset, 4)?))
    }

    /// Reads bit `bit` (0 = least significant) of the 16-bit word at `offset`.
    pub fn read_flag(&self, offset: usize, bit: u32) -> Result<bool> {
        Ok(self.read_u16(offset)? & (1 << bit) != 0)
    }

    /// Reads a 16-bit coordinate.
    ///
    /// Window rectangles sometimes carry a stray flag in bit 15 of a positive value
    /// (top bits `10`), which is masked off. Top bits `11` denote a negative value.
    pub fn read_coordinate(&self, offset: usize) -> Result<i32> {
        let value = self.read_u16(offset)?;
        Ok(match value >> 14 {
            0b10 => (value & 0x7FFF) as i32,
            _ => value as i16 as i32,
        })
    }

    /// Reads a rectangle stored as top, left, bottom, right.
    pub fn read_rectangle(&self, offset: usize) -> Result<Rectangle> {
        Ok(Rectangle {
            top: self.read_coordinate(offset)?,
            left: self.read_coordinate(offset + 2)?,
            bottom: self.read_coordinate(offset + 4)?,
            right: self.read_coordinate(offset + 6)?,
        })
    }

    /// Reads a point stored as vertical then horizontal coordinate.
    pub fn read_point(&self, offset: usize) -> Result<Point> {
        Ok(Point {
            y: self.read_coordinate(offset)?,
            x: self.read_coordinate(offset + 2)?,
        })
    }

    /// Reads a null-terminated string. The terminator must lie inside the window.
    pub fn read_string(&self, offset: usize) -> Result<MacString> {
        let length = self.string_length(offset)?;
        Ok(MacString::from(self.bytes(offset, length)?))
    }

    /// Reads `length` bytes as a string.
    pub fn read_string_with_length(&self, offset: usize, length: usize) -> Result<MacString> {
        Ok(MacString::from(self.bytes(offset, length)?))
    }

    /// Reads a Pascal string: one length byte followed by the characters.
    pub fn read_pascal_string(&self, offset: usize) -> Result<MacString> {
        let length = self.read_u8(offset)? as usize;
        self.read_string_with_length(offset + 1, length)
    }

    /// Length of the null-terminated string at `offset`, terminator excluded.
    pub fn string_length(&self, offset: usize) -> Result<usize> {
        let tail = self.bytes(offset, self.length.saturating_sub(offset))?;
        tail.iter().position(|&b| b == 0).ok_or(StackError::TruncatedData {
            offset,
            length: tail.len() + 1,
            available: self.length,
        })
    }
}

impl fmt::Debug for ByteWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteWindow")
            .field("offset", &self.offset)
            .field("length", &self.length)
            .finish()
    }
}
