//! Foundational data structures, error types, and the byte window every parser reads through.

pub mod blocktypes;
pub mod error;
pub mod image;
pub mod models;
pub mod text;
pub mod window;
