//! Block parsing layer for stack files.
//!
//! This module sits between the raw [`ByteWindow`](crate::hypercard::types::window::ByteWindow)
//! reads and the high-level [`StackReader`](crate::hypercard::reader::StackReader).
//!
//! # Module Organization
//!
//! - [`header`]: Stack header (STAK), including decryption and checksum
//! - [`master`]: Master directory (MAST), the block catalog
//! - [`list`]: Card list (LIST and PAGE)
//! - [`layer`]: Cards (CARD) and backgrounds (BKGD) with their parts and contents
//! - [`styles`]: Style table (STBL) and font table (FTBL)
//! - [`bitmap`]: Bitmap block (BMAP) header
//! - [`resources`]: The resource fork that accompanies the stack
//! - [`addcolor`]: Card and background colors stored in the resource fork
//!
//! # Architecture
//!
//! ```text
//! Data fork:
//! ┌─────────────────┐
//! │  STAK           │ ← header::parse()
//! ├─────────────────┤
//! │  MAST           │ ← master::MasterDirectory
//! ├─────────────────┤
//! │  LIST, PAGE...  │ ← list
//! │  BKGD, CARD...  │ ← layer
//! │  BMAP...        │ ← bitmap + codec::woba
//! │  STBL, FTBL     │ ← styles
//! │  FREE, TAIL     │
//! └─────────────────┘
//! ```

pub mod addcolor;
pub mod bitmap;
pub mod header;
pub mod layer;
pub mod list;
pub mod master;
pub mod resources;
pub mod styles;
