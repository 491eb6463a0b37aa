use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::error::Result;
use crate::helpers::open_flags::OpenFlags;

/// Opens a region file for reading and writing.
pub fn open_region_file(path: &Path, flags: OpenFlags) -> Result<File> {
    Ok(OpenOptions::new()
        .read(true)
        .write(true)
        .create(flags.contains(OpenFlags::CREATE))
        .truncate(flags.contains(OpenFlags::TRUNCATE))
        .open(path)?)
}
