//! Image file - whole-file I/O for serialized trees.
//!
//! A tree image is written and read as one unit; there is no paging or
//! partial access. The codec decides what the bytes mean.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use crate::common::Result;

/// Write `image` to `path`, creating or truncating the file.
///
/// # Durability
/// Calls `fsync()` before returning so a successful save is on disk.
///
/// # Errors
/// Returns `Error::Io` if the file cannot be opened or written.
pub fn write_image<P: AsRef<Path>>(path: P, image: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    file.write_all(image)?;
    file.sync_all()?; // fsync for durability

    Ok(())
}

/// Read the complete contents of the image file at `path`.
///
/// # Errors
/// Returns `Error::Io` if the file doesn't exist or cannot be read.
pub fn read_image<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;

    let expected = file.metadata()?.len() as usize;
    let mut image = Vec::with_capacity(expected);
    file.read_to_end(&mut image)?;

    Ok(image)
}
