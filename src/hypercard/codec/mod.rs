//! Codec layer: checksums, header decryption and bitmap decompression.
//!
//! # Submodules
//!
//! - [`checksum`][]: Stack header sum and the LIST/PAGE rolling checksums
//! - [`crypto`][]: Private access header decryption (password and hack)
//! - [`woba`][]: WOBA bitmap decoder

pub mod checksum;
pub mod crypto;
pub mod woba;
