//! The master directory (MAST block): where every block lives in the file.
//!
//! # Structure
//! ```text
//! MAST block
//! ┌──────────────────────────────┐
//! │ table 0: 128 slots × 4 bytes │ ← slots 0-7 overlap the block header
//! ├──────────────────────────────┤
//! │ table 1: 128 slots × 4 bytes │
//! ├──────────────────────────────┤
//! │ ...                          │
//! └──────────────────────────────┘
//!
//! slot value: [ offset / 32 (24 bits) | check byte (8 bits) ]
//! block id:   [ table (17 bits) | slot (7 bits) | check byte (8 bits) ]
//! ```
//!
//! An identifier picks its table and slot directly; the check byte stored in the slot
//! must match the low byte of the identifier. The located block's tag and identifier
//! are then compared with the request, so a stale slot can never hand back the wrong
//! block.

use log::{debug, trace};

use crate::hypercard::types::blocktypes::{BlockTag, BlockType};
use crate::hypercard::types::error::{Result, StackError};
use crate::hypercard::types::models::FileVersion;
use crate::hypercard::types::window::ByteWindow;

const TABLE_SIZE: usize = 0x200;
const BLOCK_ALIGNMENT: usize = 32;
const RECORDS_OFFSET: usize = 0x20;

/// A block identifier split into its directory coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockIdentifier {
    pub table_index: i32,
    pub slot_index: usize,
    pub check_byte: u8,
}

impl From<i32> for BlockIdentifier {
    fn from(identifier: i32) -> Self {
        Self {
            table_index: identifier >> 15,
            slot_index: ((identifier >> 8) & 0x7F) as usize,
            check_byte: (identifier & 0xFF) as u8,
        }
    }
}

/// One used slot of the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterRecord {
    pub check_byte: u8,
    pub offset: usize,
}

impl MasterRecord {
    fn from_slot(value: u32) -> Self {
        Self {
            check_byte: (value & 0xFF) as u8,
            offset: (value >> 8) as usize * BLOCK_ALIGNMENT,
        }
    }
}

/// Block lookup over a file.
#[derive(Debug, Clone)]
pub struct MasterDirectory {
    file: ByteWindow,
    master: ByteWindow,
    table_count: usize,
}

impl MasterDirectory {
    /// Opens the MAST block at `offset` in `file`.
    pub fn new(file: &ByteWindow, offset: usize, table_count: usize) -> Result<Self> {
        let length = (file.read_u32(offset)? & 0x0FFF_FFFF) as usize;
        let master = file.sub_window(offset, length)?;
        debug!("Master directory at {:#x}: {} bytes, {} tables", offset, length, table_count);
        Ok(Self {
            file: file.clone(),
            master,
            table_count,
        })
    }

    pub fn table_count(&self) -> usize {
        self.table_count
    }

    /// Finds the block with the given tag and identifier.
    ///
    /// Returns a window over the whole block, header included.
    pub fn locate(&self, tag: BlockTag, identifier: i32) -> Result<ByteWindow> {
        let not_found = || StackError::BlockNotFound { tag, identifier };
        let coordinates = BlockIdentifier::from(identifier);

        if coordinates.table_index < 0 || coordinates.table_index as usize >= self.table_count {
            return Err(not_found());
        }

        let slot_offset = coordinates.table_index as usize * TABLE_SIZE + coordinates.slot_index * 4;
        let slot = self.master.read_u32(slot_offset).map_err(|_| not_found())?;
        if slot == 0 {
            return Err(not_found());
        }

        let record = MasterRecord::from_slot(slot);
        if record.check_byte != coordinates.check_byte {
            trace!(
                "Check byte mismatch for {} {}: slot has {:#04x}",
                tag,
                identifier,
                record.check_byte
            );
            return Err(not_found());
        }

        let block = self.block_at(record.offset)?;
        let found = BlockTag::from_u32(block.read_u32(4)?);
        let found_identifier = block.read_i32(8)?;
        if found != tag || found_identifier != identifier {
            return Err(StackError::TypeMismatch {
                expected: tag,
                expected_identifier: identifier,
                found,
                found_identifier,
            });
        }

        trace!("Located {} {} at {:#x}", tag, identifier, record.offset);
        Ok(block)
    }

    /// Locates and parses a block.
    pub fn load<T: BlockType>(&self, identifier: i32, version: FileVersion) -> Result<T> {
        let block = self.locate(T::TAG, identifier)?;
        T::parse(&block, version)
    }

    /// Every used slot, in directory order.
    pub fn records(&self) -> Result<Vec<MasterRecord>> {
        let mut records = Vec::new();
        let mut offset = RECORDS_OFFSET;
        while offset + 4 <= self.master.len() {
            let value = self.master.read_u32(offset)?;
            if value != 0 {
                records.push(MasterRecord::from_slot(value));
            }
            offset += 4;
        }
        Ok(records)
    }

    /// Windows over every block with the given tag, in directory order.
    ///
    /// Slots pointing outside the file are skipped.
    pub fn blocks_of(&self, tag: BlockTag) -> Result<Vec<ByteWindow>> {
        let mut blocks = Vec::new();
        for record in self.records()? {
            if record.offset == 0 || record.offset + 12 > self.file.len() {
                continue;
            }
            if BlockTag::from_u32(self.file.read_u32(record.offset + 4)?) == tag {
                blocks.push(self.block_at(record.offset)?);
            }
        }
        Ok(blocks)
    }

    fn block_at(&self, offset: usize) -> Result<ByteWindow> {
        let length = self.file.read_u32(offset)? as usize;
        self.file.sub_window(offset, length)
    }
}
