//! Storage layer - persisting tree images.
//!
//! - [`image_file`] - Whole-file read/write of a serialized tree

pub mod image_file;
