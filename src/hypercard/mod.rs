//! Core stack reader module.

pub mod codec;
pub mod format;
pub mod iter;
pub mod reader;
pub mod types;
pub mod utils;

pub use reader::StackReader;
pub use types::error::{Result, StackError};
