//! Custom error types for the hypercard-reader crate.

use thiserror::Error;

use super::blocktypes::BlockTag;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum StackError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// The file does not start with a stack block of a known format revision.
    #[error("Not a recognized stack format: {0}")]
    NotRecognizedFormat(String),

    /// A checksum failed or the block structure is internally inconsistent.
    #[error("Corrupted stack: {0}")]
    Corrupted(String),

    /// The stack header is encrypted and no password was given (or the hack failed).
    #[error("Private access stack requires a password, but none was provided.")]
    MissingPassword,

    /// The password did not produce the hash stored in the decrypted header.
    #[error("Wrong password for private access stack.")]
    WrongPassword,

    /// No master directory slot matches the requested identifier.
    #[error("Block {tag} with ID {identifier} not found in the master directory")]
    BlockNotFound { tag: BlockTag, identifier: i32 },

    /// The located block does not carry the requested tag or identifier.
    #[error("Block mismatch: expected {expected} ID {expected_identifier}, found {found} ID {found_identifier}")]
    TypeMismatch {
        expected: BlockTag,
        expected_identifier: i32,
        found: BlockTag,
        found_identifier: i32,
    },

    /// A read went past the end of its byte window.
    #[error("Truncated data: {length} bytes at offset {offset:#x} exceed a window of {available} bytes")]
    TruncatedData {
        offset: usize,
        length: usize,
        available: usize,
    },
}

impl StackError {
    /// Returns `true` when the caller may retry with another password.
    ///
    /// Every other failure means the file itself cannot be read as a stack.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StackError::MissingPassword | StackError::WrongPassword)
    }
}

/// A convenience `Result` type alias using the crate's `StackError` type.
pub type Result<T> = std::result::Result<T, StackError>;
