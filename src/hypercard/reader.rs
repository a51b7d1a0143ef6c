use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info};

use super::codec::woba;
use super::format::header;
use super::format::layer::CardBlock;
use super::format::list::{ListBlock, PageBlock};
use super::format::master::MasterDirectory;
use super::format::styles::{FontTable, StyleTable};
use super::iter::{BackgroundIterator, BitmapIterator, CardIterator, CardReferenceIterator};
use super::types::blocktypes::{BlockTag, BlockType};
use super::types::error::Result;
use super::types::image::MaskedImage;
use super::types::models::*;
use super::types::text::MacString;
use super::types::window::ByteWindow;

/// The main reader for HyperCard stack files.
///
/// The whole data fork is read into memory once; every block is then decoded on
/// demand from windows over that shared buffer. Supports stacks from HyperCard 1.x
/// and 2.x, including private access stacks.
#[derive(Debug)]
pub struct StackReader {
    file: ByteWindow,
    pub header: StackHeader,
    master: MasterDirectory,
    list: ListBlock,
    styles: StyleTable,
    fonts: FontTable,
}

impl StackReader {
    /// Read a stack from the given path.
    ///
    /// # Arguments
    /// * `path` - File path to the stack (its data fork)
    /// * `password` - Optional password for private access stacks
    /// * `hack_encryption` - Recover the header key without the password when none is given
    ///
    /// # Errors
    /// Returns an error if:
    /// - File cannot be read
    /// - File is not a stack of a known format revision
    /// - The stack is private access and cannot be decrypted
    /// - A checksum fails or a required block is missing
    pub fn new(path: impl AsRef<Path>, password: Option<&str>, hack_encryption: bool) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening stack file: {}", path.display());
        let data = fs::read(path)?;
        let password = password.map(MacString::from_unicode);
        Self::from_bytes(data, password.as_ref().map(|p| p.as_bytes()), hack_encryption)
    }

    /// Read a stack from its data fork bytes. The password is in Mac OS Roman.
    pub fn from_bytes(data: impl Into<Arc<[u8]>>, password: Option<&[u8]>, hack_encryption: bool) -> Result<Self> {
        let file = ByteWindow::new(data);
        let password = password.map(MacString::from);

        // Step 1: Header, with decryption and checksum
        let header = header::parse(&file, password.as_ref(), hack_encryption)?;
        let version = header.version();

        // Step 2: Master directory, right after the stack block
        let master = MasterDirectory::new(&file, header.stack_size as usize, header.master_table_count as usize)?;

        // Step 3: Style and font tables
        let styles = match header.style_table_id {
            Some(identifier) => master.load::<StyleTable>(identifier, version)?,
            None => StyleTable::default(),
        };
        let fonts = match header.font_table_id {
            Some(identifier) => master.load::<FontTable>(identifier, version)?,
            None => FontTable::default(),
        };

        // Step 4: Card list
        let list = master.load::<ListBlock>(header.list_id, version)?;

        info!(
            "Stack opened: {} pages, {} styles, {} fonts",
            list.pages.len(),
            styles.styles.len(),
            fonts.fonts.len()
        );

        Ok(Self {
            file,
            header,
            master,
            list,
            styles,
            fonts,
        })
    }

    pub fn header(&self) -> &StackHeader {
        &self.header
    }

    pub fn version(&self) -> FileVersion {
        self.header.version()
    }

    /// The master directory, for direct block access.
    pub fn master(&self) -> &MasterDirectory {
        &self.master
    }

    /// The whole data fork.
    pub fn data(&self) -> &ByteWindow {
        &self.file
    }

    pub fn styles(&self) -> &StyleTable {
        &self.styles
    }

    pub fn fonts(&self) -> &FontTable {
        &self.fonts
    }

    pub fn font_name(&self, identifier: i32) -> Option<&MacString> {
        self.fonts.font(identifier).map(|font| &font.name)
    }

    /// Resolves the formatting of a run against the style table.
    pub fn formatting(&self, run: &FormattingRun) -> Option<TextFormatting> {
        self.styles.formatting(run.style_id)
    }

    /// The pages of the card list, in stack order.
    pub fn page_references(&self) -> &[PageReference] {
        &self.list.pages
    }

    /// Loads and verifies one PAGE block of the card list.
    pub fn read_page(&self, page: &PageReference) -> Result<PageBlock> {
        debug!("Reading page {} ({} cards)", page.identifier, page.card_count);
        let block = self.master.locate(BlockTag::PAGE, page.identifier)?;
        PageBlock::parse(&block, self.version(), &self.list, page.card_count)
    }

    /// Returns an iterator over the card references, in stack order.
    ///
    /// Pages are loaded one at a time. Chain with `.with_cards()` to load the cards.
    pub fn iter_card_references(&self) -> CardReferenceIterator<'_> {
        CardReferenceIterator::new(self)
    }

    /// Returns an iterator over the cards, in stack order.
    ///
    /// This is a shortcut for `reader.iter_card_references().with_cards()`.
    pub fn iter_cards(&self) -> CardIterator<'_> {
        self.iter_card_references().with_cards()
    }

    /// Convenience method: all the card references.
    pub fn card_references(&self) -> Result<Vec<CardReference>> {
        self.iter_card_references().collect()
    }

    /// Convenience method: all the cards. Decodes every card block.
    pub fn cards(&self) -> Result<Vec<Card>> {
        self.iter_cards().collect()
    }

    /// Loads a card from a reference, which carries its `marked` flag.
    pub fn read_card(&self, reference: &CardReference) -> Result<Card> {
        let block = self.load::<CardBlock>(reference.identifier)?;
        Ok(block.into_card(reference.marked))
    }

    /// Loads a card by id. The `marked` flag is looked up in the card list; a card
    /// missing from the list is unmarked, a page that fails to load is an error.
    pub fn card(&self, identifier: i32) -> Result<Card> {
        let block = self.load::<CardBlock>(identifier)?;
        let mut marked = false;
        for reference in self.iter_card_references() {
            let reference = reference?;
            if reference.identifier == identifier {
                marked = reference.marked;
                break;
            }
        }
        Ok(block.into_card(marked))
    }

    /// Returns an iterator over the backgrounds, following the `next` links from the
    /// first background until they loop back to it.
    pub fn iter_backgrounds(&self) -> BackgroundIterator<'_> {
        BackgroundIterator::new(self)
    }

    /// Convenience method: all the backgrounds, in link order.
    pub fn backgrounds(&self) -> Result<Vec<Background>> {
        self.iter_backgrounds().collect()
    }

    pub fn background(&self, identifier: i32) -> Result<Background> {
        self.load::<Background>(identifier)
    }

    /// Decodes the bitmap block with the given id.
    pub fn bitmap(&self, identifier: i32) -> Result<MaskedImage> {
        let block = self.master.locate(BlockTag::BITMAP, identifier)?;
        woba::decode(&block, self.version())
    }

    /// Decodes the picture of a card or background, if it has one.
    pub fn layer_image(&self, layer: &LayerContents) -> Result<Option<MaskedImage>> {
        layer.bitmap_id.map(|identifier| self.bitmap(identifier)).transpose()
    }

    /// Returns an iterator over every bitmap block in the file, in directory order.
    pub fn iter_bitmaps(&self) -> Result<BitmapIterator<'_>> {
        let blocks = self.master.blocks_of(BlockTag::BITMAP)?;
        Ok(BitmapIterator::new(self, blocks))
    }

    /// Locates and parses a block of this stack.
    pub fn load<T: BlockType>(&self, identifier: i32) -> Result<T> {
        self.master.load::<T>(identifier, self.version())
    }
}
