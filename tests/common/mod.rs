//! Synthetic stack files for the integration tests.
//!
//! [`StackBuilder`] lays out a complete data fork: the STAK block (checksummed and,
//! with a password, encrypted), the master directory, the card list and whatever
//! cards, backgrounds, bitmaps and tables the test adds.

#![allow(dead_code)]

use hypercard_reader::hypercard::codec::crypto;
use hypercard_reader::MacString;

pub const STACK_SIZE: usize = 0x800;
pub const MASTER_SIZE: usize = 0x200;
pub const FIRST_BLOCK_OFFSET: usize = STACK_SIZE + MASTER_SIZE;
pub const LIST_ID: i32 = block_id(8, 0x4C);

/// An identifier landing in table 0 at `slot`.
pub const fn block_id(slot: u8, check: u8) -> i32 {
    ((slot as i32) << 8) | check as i32
}

pub fn page_id(index: usize) -> i32 {
    block_id(9 + index as u8, 0x50 + index as u8)
}

pub fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

pub fn put_i16(buf: &mut [u8], offset: usize, value: i16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

pub fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

pub fn put_i32(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

pub fn get_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

/// Writes a rectangle as top, left, bottom, right.
pub fn put_rect(buf: &mut [u8], offset: usize, rect: (i16, i16, i16, i16)) {
    put_i16(buf, offset, rect.0);
    put_i16(buf, offset + 2, rect.1);
    put_i16(buf, offset + 4, rect.2);
    put_i16(buf, offset + 6, rect.3);
}

/// A zeroed block with its header filled in.
pub fn new_block(tag: &[u8; 4], id: i32, length: usize) -> Vec<u8> {
    let mut block = vec![0u8; length];
    put_u32(&mut block, 0, length as u32);
    block[4..8].copy_from_slice(tag);
    put_i32(&mut block, 8, id);
    block
}

/// Appends bytes to a block and updates its length field.
pub fn extend_block(block: &mut Vec<u8>, bytes: &[u8]) {
    block.extend_from_slice(bytes);
    let length = block.len() as u32;
    put_u32(block, 0, length);
}

// --- Parts and contents ---

#[derive(Clone)]
pub struct PartSpec {
    pub id: i16,
    pub kind: u8,
    pub flags: u8,
    pub rect: (i16, i16, i16, i16),
    pub flags2: u8,
    pub style: u8,
    pub title_width: i16,
    pub icon: i16,
    pub text_align: i16,
    pub text_font: i16,
    pub text_size: i16,
    pub text_style: u8,
    pub text_height: i16,
    pub name: &'static str,
    pub script: &'static str,
}

impl PartSpec {
    pub fn button(id: i16, name: &'static str) -> Self {
        Self {
            id,
            kind: 1,
            flags: 0,
            rect: (10, 20, 30, 120),
            flags2: 0x80,
            style: 3,
            title_width: 0,
            icon: 0,
            text_align: 1,
            text_font: 0,
            text_size: 12,
            text_style: 0,
            text_height: 16,
            name,
            script: "",
        }
    }

    pub fn field(id: i16, name: &'static str) -> Self {
        Self {
            id,
            kind: 2,
            flags: 0,
            rect: (50, 20, 150, 300),
            flags2: 0,
            style: 7,
            title_width: 0,
            icon: 0,
            text_align: 0,
            text_font: 3,
            text_size: 9,
            text_style: 0,
            text_height: 12,
            name,
            script: "",
        }
    }

    pub fn record(&self) -> Vec<u8> {
        let mut record = vec![0u8; 0x1E];
        put_i16(&mut record, 0x02, self.id);
        record[0x04] = self.kind;
        record[0x05] = self.flags;
        put_rect(&mut record, 0x06, self.rect);
        record[0x0E] = self.flags2;
        record[0x0F] = self.style;
        put_i16(&mut record, 0x10, self.title_width);
        put_i16(&mut record, 0x12, self.icon);
        put_i16(&mut record, 0x14, self.text_align);
        put_i16(&mut record, 0x16, self.text_font);
        put_i16(&mut record, 0x18, self.text_size);
        record[0x1A] = self.text_style;
        put_i16(&mut record, 0x1C, self.text_height);
        record.extend_from_slice(self.name.as_bytes());
        record.extend_from_slice(&[0, 0]);
        record.extend_from_slice(self.script.as_bytes());
        record.push(0);
        if record.len() % 2 == 1 {
            record.push(0);
        }
        let size = record.len() as u16;
        put_u16(&mut record, 0, size);
        record
    }
}

fn content_record(part_id: i16, data: Vec<u8>) -> Vec<u8> {
    let mut record = Vec::with_capacity(4 + data.len() + 1);
    record.extend_from_slice(&part_id.to_be_bytes());
    record.extend_from_slice(&(data.len() as u16).to_be_bytes());
    record.extend_from_slice(&data);
    if record.len() % 2 == 1 {
        record.push(0);
    }
    record
}

/// Unformatted text. A negative id is a card part.
pub fn plain_content(part_id: i16, text: &str) -> Vec<u8> {
    let mut data = vec![0u8];
    data.extend_from_slice(text.as_bytes());
    content_record(part_id, data)
}

/// Text with `(offset, style id)` runs.
pub fn formatted_content(part_id: i16, runs: &[(u16, u16)], text: &str) -> Vec<u8> {
    let formatting_length = 2 + runs.len() * 4;
    let mut data = Vec::new();
    data.extend_from_slice(&(0x8000u16 | formatting_length as u16).to_be_bytes());
    for &(offset, style) in runs {
        data.extend_from_slice(&offset.to_be_bytes());
        data.extend_from_slice(&style.to_be_bytes());
    }
    data.extend_from_slice(text.as_bytes());
    content_record(part_id, data)
}

// --- Layers ---

#[derive(Clone, Default)]
pub struct LayerSpec {
    pub id: i32,
    pub name: &'static str,
    pub script: &'static str,
    pub bitmap_id: i32,
    pub flags: u16,
    pub parts: Vec<PartSpec>,
    pub contents: Vec<Vec<u8>>,
    /// Cards only
    pub background_id: i32,
    pub marked: bool,
    /// Backgrounds only; 0 links back to the first background
    pub next_background_id: i32,
    pub card_count: u32,
}

impl LayerSpec {
    pub fn card(id: i32, background_id: i32) -> Self {
        Self {
            id,
            background_id,
            ..Default::default()
        }
    }

    pub fn background(id: i32) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

// --- Bitmaps ---

/// A BMAP block in the version 2 layout.
pub fn bitmap_block(
    id: i32,
    card: (i16, i16, i16, i16),
    mask: (i16, i16, i16, i16),
    image: (i16, i16, i16, i16),
    mask_stream: &[u8],
    image_stream: &[u8],
) -> Vec<u8> {
    let mut block = new_block(b"BMAP", id, 0x40);
    put_rect(&mut block, 0x18, card);
    put_rect(&mut block, 0x20, mask);
    put_rect(&mut block, 0x28, image);
    put_u32(&mut block, 0x38, mask_stream.len() as u32);
    put_u32(&mut block, 0x3C, image_stream.len() as u32);
    let mut data = mask_stream.to_vec();
    data.extend_from_slice(image_stream);
    extend_block(&mut block, &data);
    block
}

// --- Tables ---

/// `(number, font, style flags, size)`; -1 means inherit.
pub fn style_table_block(id: i32, styles: &[(u32, i16, i16, i16)]) -> Vec<u8> {
    let mut block = new_block(b"STBL", id, 0x18 + styles.len() * 0x18);
    put_u32(&mut block, 0x10, styles.len() as u32);
    for (i, &(number, font, style, size)) in styles.iter().enumerate() {
        let offset = 0x18 + i * 0x18;
        put_u32(&mut block, offset, number);
        put_u16(&mut block, offset + 6, 1);
        put_i16(&mut block, offset + 0xC, font);
        put_i16(&mut block, offset + 0xE, style);
        put_i16(&mut block, offset + 0x10, size);
    }
    block
}

pub fn font_table_block(id: i32, fonts: &[(u16, &str)]) -> Vec<u8> {
    let mut block = new_block(b"FTBL", id, 0x18);
    put_u32(&mut block, 0x10, fonts.len() as u32);
    let mut entries = Vec::new();
    for &(font_id, name) in fonts {
        entries.extend_from_slice(&font_id.to_be_bytes());
        entries.extend_from_slice(name.as_bytes());
        entries.push(0);
        if entries.len() % 2 == 1 {
            entries.push(0);
        }
    }
    extend_block(&mut block, &entries);
    block
}

// --- Whole stacks ---

pub struct StackBuilder {
    pub revision: u8,
    pub flags: u16,
    pub password: Option<&'static str>,
    pub user_level: u16,
    pub background_count: Option<u32>,
    pub style_table_id: i32,
    pub font_table_id: i32,
    pub card_size: (u16, u16),
    /// Vertical then horizontal scroll, as stored.
    pub scroll: (u16, u16),
    pub creation_version: u32,
    pub card_reference_size: usize,
    /// Writes 0 instead of the LIST and PAGE checksums.
    pub omit_list_checksums: bool,
    /// Added to the stored LIST checksum.
    pub list_checksum_error: u32,
    /// Added to the stored PAGE checksums.
    pub page_checksum_error: u32,
    backgrounds: Vec<LayerSpec>,
    pages: Vec<Vec<LayerSpec>>,
    blocks: Vec<Vec<u8>>,
}

impl Default for StackBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StackBuilder {
    pub fn new() -> Self {
        Self {
            revision: 10,
            flags: 0,
            password: None,
            user_level: 5,
            background_count: None,
            style_table_id: 0,
            font_table_id: 0,
            card_size: (0, 0),
            scroll: (0, 0),
            creation_version: 0,
            card_reference_size: 8,
            omit_list_checksums: false,
            list_checksum_error: 0,
            page_checksum_error: 0,
            backgrounds: Vec::new(),
            pages: vec![Vec::new()],
            blocks: Vec::new(),
        }
    }

    pub fn version1() -> Self {
        Self {
            revision: 8,
            ..Self::new()
        }
    }

    fn is_v2(&self) -> bool {
        self.revision >= 9
    }

    /// Rebases a version 2 field offset onto the builder's layout.
    fn field(&self, v2_offset: usize) -> usize {
        if self.is_v2() {
            v2_offset
        } else {
            v2_offset - 4
        }
    }

    pub fn add_background(&mut self, background: LayerSpec) -> &mut Self {
        self.backgrounds.push(background);
        self
    }

    /// Adds a card to the current page.
    pub fn add_card(&mut self, card: LayerSpec) -> &mut Self {
        if let Some(page) = self.pages.last_mut() {
            page.push(card);
        }
        self
    }

    /// Starts a new page; following cards go there.
    pub fn new_page(&mut self) -> &mut Self {
        self.pages.push(Vec::new());
        self
    }

    pub fn add_block(&mut self, block: Vec<u8>) -> &mut Self {
        self.blocks.push(block);
        self
    }

    fn first_background_id(&self) -> i32 {
        self.backgrounds.first().map(|b| b.id).unwrap_or(0)
    }

    /// `counts` is the version 2 offset of the part count; the other counts follow it.
    fn layer_block(&self, tag: &[u8; 4], layer: &LayerSpec, counts: usize) -> Vec<u8> {
        let fixed_length = self.field(counts + 0x0E);
        let mut block = new_block(tag, layer.id, fixed_length);
        put_i32(&mut block, self.field(0x10), layer.bitmap_id);
        put_u16(&mut block, self.field(0x14), layer.flags);

        let parts: Vec<u8> = layer.parts.iter().flat_map(|p| p.record()).collect();
        let contents: Vec<u8> = layer.contents.iter().flatten().copied().collect();
        let next_part_id = layer.parts.iter().map(|p| p.id).max().unwrap_or(0) + 1;

        put_u16(&mut block, self.field(counts), layer.parts.len() as u16);
        put_i16(&mut block, self.field(counts + 0x02), next_part_id);
        put_u32(&mut block, self.field(counts + 0x04), parts.len() as u32);
        put_u16(&mut block, self.field(counts + 0x08), layer.contents.len() as u16);
        put_u32(&mut block, self.field(counts + 0x0A), contents.len() as u32);

        let mut tail = parts;
        tail.extend_from_slice(&contents);
        tail.extend_from_slice(layer.name.as_bytes());
        tail.push(0);
        tail.extend_from_slice(layer.script.as_bytes());
        tail.push(0);
        extend_block(&mut block, &tail);
        block
    }

    fn card_block(&self, layer: &LayerSpec, page: i32) -> Vec<u8> {
        let mut block = self.layer_block(b"CARD", layer, 0x28);
        put_i32(&mut block, self.field(0x20), page);
        put_i32(&mut block, self.field(0x24), layer.background_id);
        block
    }

    fn background_block(&self, layer: &LayerSpec) -> Vec<u8> {
        let mut block = self.layer_block(b"BKGD", layer, 0x24);
        let next = if layer.next_background_id == 0 {
            self.first_background_id()
        } else {
            layer.next_background_id
        };
        put_u32(&mut block, self.field(0x18), layer.card_count);
        put_i32(&mut block, self.field(0x1C), next);
        block
    }

    fn list_block(&self) -> Vec<u8> {
        let mut block = new_block(b"LIST", LIST_ID, 0x30 + self.pages.len() * 6);
        put_u32(&mut block, self.field(0x10), self.pages.len() as u32);
        put_u16(&mut block, self.field(0x1C), self.card_reference_size as u16);
        put_u16(&mut block, self.field(0x20), 4);

        let mut checksum = 0u32;
        for (i, page) in self.pages.iter().enumerate() {
            let offset = 0x30 + i * 6;
            put_i32(&mut block, offset, page_id(i));
            put_u16(&mut block, offset + 4, page.len() as u16);
            checksum = checksum.wrapping_add(page_id(i) as u32).rotate_right(3).wrapping_add(page.len() as u32);
        }
        let stored = if self.omit_list_checksums {
            0
        } else {
            checksum.wrapping_add(self.list_checksum_error)
        };
        put_u32(&mut block, self.field(0x24), stored);
        block
    }

    fn page_block(&self, index: usize) -> Vec<u8> {
        let cards = &self.pages[index];
        let mut block = new_block(b"PAGE", page_id(index), 0x18 + cards.len() * self.card_reference_size);
        put_i32(&mut block, self.field(0x10), LIST_ID);

        let mut checksum = 0u32;
        for (i, card) in cards.iter().enumerate() {
            let offset = 0x18 + i * self.card_reference_size;
            put_i32(&mut block, offset, card.id);
            let marked = if card.marked { 1u16 << 12 } else { 0 };
            let named = if card.name.is_empty() { 0 } else { 1u16 << 15 };
            let flags = marked | named;
            put_u16(&mut block, offset + 4, flags);
            checksum = checksum.wrapping_add(card.id as u32).rotate_right(3);
        }
        let stored = if self.omit_list_checksums {
            0
        } else {
            checksum.wrapping_add(self.page_checksum_error)
        };
        put_u32(&mut block, self.field(0x14), stored);
        block
    }

    /// Lays out every block and returns the data fork.
    pub fn build(&self) -> Vec<u8> {
        // Step 1: Collect the blocks
        let mut blocks = vec![self.list_block()];
        blocks.extend((0..self.pages.len()).map(|i| self.page_block(i)));
        blocks.extend(self.backgrounds.iter().map(|b| self.background_block(b)));
        for (i, page) in self.pages.iter().enumerate() {
            blocks.extend(page.iter().map(|card| self.card_block(card, page_id(i))));
        }
        blocks.extend(self.blocks.iter().cloned());

        // Step 2: Place them after the master directory, 32-byte aligned
        let mut master = new_block(b"MAST", -1, MASTER_SIZE);
        let mut placed = Vec::new();
        let mut offset = FIRST_BLOCK_OFFSET;
        for block in blocks {
            let id = get_u32(&block, 8) as i32;
            let slot = ((id >> 8) & 0x7F) as usize;
            assert!(id >> 15 == 0 && slot >= 8, "test block id {:#x} outside table 0", id);
            assert_eq!(get_u32(&master, slot * 4), 0, "two test blocks share slot {}", slot);
            put_u32(&mut master, slot * 4, (((offset / 32) as u32) << 8) | (id as u32 & 0xFF));
            let length = block.len();
            placed.push((offset, block));
            offset += length.div_ceil(32) * 32;
        }
        let total_size = offset;

        // Step 3: The stack header
        let stack = self.stack_block(total_size);

        let mut file = vec![0u8; total_size];
        file[..STACK_SIZE].copy_from_slice(&stack);
        file[STACK_SIZE..STACK_SIZE + MASTER_SIZE].copy_from_slice(&master);
        for (offset, block) in placed {
            file[offset..offset + block.len()].copy_from_slice(&block);
        }
        file
    }

    fn stack_block(&self, total_size: usize) -> Vec<u8> {
        let card_count: usize = self.pages.iter().map(|p| p.len()).sum();
        let first_card = self.pages.iter().flatten().next().map(|c| c.id).unwrap_or(0);

        let mut stack = new_block(b"STAK", -1, STACK_SIZE);
        put_u32(&mut stack, 0x10, self.revision as u32);
        put_u32(&mut stack, 0x14, total_size as u32);
        put_u32(&mut stack, 0x18, STACK_SIZE as u32);
        put_u32(&mut stack, 0x20, 0);
        put_u32(&mut stack, 0x24, self.background_count.unwrap_or(self.backgrounds.len() as u32));
        put_i32(&mut stack, 0x28, self.first_background_id());
        put_u32(&mut stack, 0x2C, card_count as u32);
        put_i32(&mut stack, 0x30, first_card);
        put_i32(&mut stack, 0x34, LIST_ID);
        put_u16(&mut stack, 0x48, self.user_level);
        put_u32(&mut stack, 0x60, self.creation_version);
        put_u16(&mut stack, 0x88, self.scroll.0);
        put_u16(&mut stack, 0x8A, self.scroll.1);
        put_i32(&mut stack, 0x1B0, self.font_table_id);
        put_i32(&mut stack, 0x1B4, self.style_table_id);
        put_u16(&mut stack, 0x1B8, self.card_size.1);
        put_u16(&mut stack, 0x1BA, self.card_size.0);
        for (i, byte) in stack[0x2C0..0x2C0 + 320].iter_mut().enumerate() {
            *byte = if (i / 8) % 2 == 0 { 0xAA } else { 0x55 };
        }

        let mut flags = self.flags;
        let password_hash = self.password.map(|password| {
            let normalized = MacString::from(password).to_lowercase_without_accents();
            crypto::hash_password(normalized.as_bytes())
        });
        if let Some(hash) = password_hash {
            flags |= 1 << 13;
            put_u32(&mut stack, 0x44, crypto::password_check_value(hash));
        }
        put_u16(&mut stack, 0x4C, flags);

        // The checksum covers the plaintext
        let sum = stack[..0x600]
            .chunks_exact(4)
            .fold(0u32, |acc, w| acc.wrapping_add(u32::from_be_bytes([w[0], w[1], w[2], w[3]])));
        put_u32(&mut stack, 0x70, 0u32.wrapping_sub(sum));

        if let Some(hash) = password_hash {
            let mut span = [0u8; crypto::ENCRYPTED_LENGTH];
            span.copy_from_slice(&stack[0x18..0x18 + crypto::ENCRYPTED_LENGTH]);
            let encrypted = crypto::apply_keystream(&span, crypto::key_from_password_hash(hash));
            stack[0x18..0x18 + crypto::ENCRYPTED_LENGTH].copy_from_slice(&encrypted);
        }
        stack
    }
}
