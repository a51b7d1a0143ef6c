//! Iterators for sequential access to the cards, backgrounds and bitmaps of a stack.
//!
//! The card iterators are layered, each one enriching the previous:
//!
//! 1. [`CardReferenceIterator`] - Card references in stack order, one page at a time
//! 2. [`CardIterator`] - The decoded cards
//!
//! Backgrounds are reached through their circular `next` links by
//! [`BackgroundIterator`], and bitmaps through the master directory by
//! [`BitmapIterator`].
//!
//! # Example
//! ```no_run
//! # use hypercard_reader::StackReader;
//! # let reader = StackReader::new("Home", None, true).unwrap();
//! for card in reader.iter_cards() {
//!     let card = card.unwrap();
//!     println!("{}: {}", card.identifier, card.layer.name);
//! }
//! ```

use std::vec::IntoIter;

use log::trace;

use super::codec::woba;
use super::reader::StackReader;
use super::types::error::{Result, StackError};
use super::types::image::MaskedImage;
use super::types::models::{Background, Card, CardReference};
use super::types::window::ByteWindow;

/// Iterator over the card references of the stack, in stack order.
///
/// Created by [`StackReader::iter_card_references()`](crate::StackReader::iter_card_references).
pub struct CardReferenceIterator<'a> {
    reader: &'a StackReader,
    page_idx: usize,
    current_cards: IntoIter<CardReference>,
}

impl<'a> CardReferenceIterator<'a> {
    pub(super) fn new(reader: &'a StackReader) -> Self {
        Self {
            reader,
            page_idx: 0,
            current_cards: Vec::new().into_iter(),
        }
    }

    /// Transforms this iterator to load each referenced card.
    pub fn with_cards(self) -> CardIterator<'a> {
        CardIterator {
            reader: self.reader,
            references: self,
        }
    }
}

impl<'a> Iterator for CardReferenceIterator<'a> {
    type Item = Result<CardReference>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // Try to get next reference from current page
            if let Some(reference) = self.current_cards.next() {
                return Some(Ok(reference));
            }

            // Check if all pages have been processed
            let pages = self.reader.page_references();
            if self.page_idx >= pages.len() {
                return None;
            }

            // Load next page
            match self.reader.read_page(&pages[self.page_idx]) {
                Ok(page) => {
                    self.current_cards = page.cards.into_iter();
                    self.page_idx += 1;
                }
                Err(e) => {
                    // Stop after reporting the failure
                    self.page_idx = pages.len();
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Iterator over the decoded cards, in stack order.
///
/// Created by [`CardReferenceIterator::with_cards()`].
pub struct CardIterator<'a> {
    reader: &'a StackReader,
    references: CardReferenceIterator<'a>,
}

impl<'a> Iterator for CardIterator<'a> {
    type Item = Result<Card>;

    fn next(&mut self) -> Option<Self::Item> {
        let reference = match self.references.next()? {
            Ok(reference) => reference,
            Err(e) => return Some(Err(e)),
        };
        Some(self.reader.read_card(&reference))
    }
}

/// Iterator over the backgrounds, following the circular `next` links.
///
/// Starts at the first background declared in the header and stops when the links
/// come back to it. A chain that runs longer than the declared background count
/// without closing is reported as [`StackError::Corrupted`].
///
/// Created by [`StackReader::iter_backgrounds()`](crate::StackReader::iter_backgrounds).
pub struct BackgroundIterator<'a> {
    reader: &'a StackReader,
    first_id: i32,
    next_id: Option<i32>,
    visited: usize,
    limit: usize,
}

impl<'a> BackgroundIterator<'a> {
    pub(super) fn new(reader: &'a StackReader) -> Self {
        let first_id = reader.header.first_background_id;
        Self {
            reader,
            first_id,
            next_id: Some(first_id),
            visited: 0,
            limit: (reader.header.background_count as usize).max(1),
        }
    }
}

impl<'a> Iterator for BackgroundIterator<'a> {
    type Item = Result<Background>;

    fn next(&mut self) -> Option<Self::Item> {
        let identifier = self.next_id.take()?;

        if self.visited >= self.limit {
            return Some(Err(StackError::Corrupted(format!(
                "background chain does not return to {} within {} backgrounds",
                self.first_id, self.limit
            ))));
        }

        let background = match self.reader.background(identifier) {
            Ok(background) => background,
            Err(e) => return Some(Err(e)),
        };
        self.visited += 1;

        trace!("Background {} -> {}", identifier, background.next_background_id);
        if background.next_background_id != self.first_id {
            self.next_id = Some(background.next_background_id);
        }
        Some(Ok(background))
    }
}

/// Iterator over every bitmap block of the file, yielding `(bitmap id, image)`.
///
/// Created by [`StackReader::iter_bitmaps()`](crate::StackReader::iter_bitmaps).
pub struct BitmapIterator<'a> {
    reader: &'a StackReader,
    blocks: IntoIter<ByteWindow>,
}

impl<'a> BitmapIterator<'a> {
    pub(super) fn new(reader: &'a StackReader, blocks: Vec<ByteWindow>) -> Self {
        Self {
            reader,
            blocks: blocks.into_iter(),
        }
    }
}

impl<'a> Iterator for BitmapIterator<'a> {
    type Item = Result<(i32, MaskedImage)>;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.blocks.next()?;
        let decode = || -> Result<(i32, MaskedImage)> {
            let identifier = block.read_i32(8)?;
            Ok((identifier, woba::decode(&block, self.reader.version())?))
        };
        Some(decode())
    }
}
