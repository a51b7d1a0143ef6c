//! # hypercard-reader
//!
//! A reader for HyperCard stack files.
//! Supports stacks from HyperCard 1.x and 2.x, private access stacks (with the
//! password or without it), and the WOBA-compressed card and background pictures.
//!
//! **Note:** Reading only. Stacks cannot be modified or written.
pub mod hypercard;

// Re-export the main types for convenience
pub use hypercard::{
    codec::woba,
    format::{
        addcolor::{AddColorElement, RgbColor},
        resources::{Resource, ResourceFork},
    },
    reader::StackReader,
    types::{
        blocktypes::BlockTag,
        error::{Result, StackError},
        image::{Bitmap, ImageLayer, MaskedImage, Pixel},
        models::{
            Background, Card, CardReference, FileVersion, LayerContents, Part, PartContent, Rectangle,
            StackHeader,
        },
        text::MacString,
        window::ByteWindow,
    },
};
