//! 1-bit bitmaps and the two-layer images stored in BMAP blocks.

use super::models::Rectangle;

/// A 1-bit bitmap stored as rows of big-endian-ordered 32-bit words.
///
/// Bit 31 of the first word of a row is the leftmost pixel. Set bits are black
/// (or opaque, in a mask).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    words_per_row: usize,
    words: Vec<u32>,
}

impl Bitmap {
    /// Creates a blank bitmap. The width is rounded up to whole words.
    pub fn new(width: usize, height: usize) -> Self {
        let words_per_row = width.div_ceil(32);
        Self {
            width,
            height,
            words_per_row,
            words: vec![0; words_per_row * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn words_per_row(&self) -> usize {
        self.words_per_row
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub(crate) fn words_mut(&mut self) -> &mut [u32] {
        &mut self.words
    }

    pub fn row(&self, y: usize) -> &[u32] {
        &self.words[y * self.words_per_row..(y + 1) * self.words_per_row]
    }

    /// Returns the pixel at `(x, y)`; out-of-range pixels are unset.
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let word = self.words[y * self.words_per_row + x / 32];
        word & (0x8000_0000 >> (x % 32)) != 0
    }

    /// Number of set pixels in the whole bitmap.
    pub fn count_set(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// One plane (image or mask) of a [`MaskedImage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLayer {
    /// No pixel set.
    Clear,
    /// Every pixel of the rectangle set.
    Rectangular(Rectangle),
    /// A decoded bitmap covering `rectangle` (widened to 32-pixel boundaries).
    /// Only the pixels inside `real_rectangle_in_image` are meaningful; it is
    /// expressed in bitmap coordinates.
    Bitmap {
        image: Bitmap,
        rectangle: Rectangle,
        real_rectangle_in_image: Rectangle,
    },
}

impl ImageLayer {
    /// Whether the pixel at card coordinates `(x, y)` is set.
    pub fn is_set(&self, x: i32, y: i32) -> bool {
        match self {
            ImageLayer::Clear => false,
            ImageLayer::Rectangular(rectangle) => rectangle.contains(x, y),
            ImageLayer::Bitmap { image, rectangle, real_rectangle_in_image } => {
                let (bx, by) = (x - rectangle.left, y - rectangle.top);
                real_rectangle_in_image.contains(bx, by) && image.get(bx as usize, by as usize)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pixel {
    Black,
    White,
    Transparent,
}

/// A card or background picture: an image plane over a mask plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedImage {
    pub width: i32,
    pub height: i32,
    pub image: ImageLayer,
    pub mask: ImageLayer,
}

impl MaskedImage {
    /// Combines both planes at card coordinates `(x, y)`.
    pub fn pixel(&self, x: i32, y: i32) -> Pixel {
        if self.image.is_set(x, y) {
            Pixel::Black
        } else if self.mask.is_set(x, y) {
            Pixel::White
        } else {
            Pixel::Transparent
        }
    }
}
