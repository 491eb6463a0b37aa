//! Reading and writing region files: up to 32x32 compressed chunks stored in
//! 4 KiB sectors behind an 8 KiB location/timestamp header.
//!
//! ```no_run
//! use regionstore::{OpenFlags, RegionFile};
//!
//! let mut region = RegionFile::open_with("r.0.0.mca", OpenFlags::CREATE)?;
//! region.write_chunk(3, 7, &b"payload".to_vec())?;
//! let bytes: Vec<u8> = region.read_chunk(3, 7)?;
//! # Ok::<(), regionstore::RegionError>(())
//! ```

pub mod error;
pub mod helpers;
pub mod region;
pub mod storage;

pub use error::{FormatError, RegionError, Result};
pub use helpers::open_flags::OpenFlags;
pub use helpers::sectors::{SECTOR_SIZE, bytes_to_sectors};
pub use region::iter::{ChunkIter, RegionChunk};
pub use region::region_file::{ChunkMetadata, Ownership, RegionFile};
pub use storage::chunk_header::ChunkHeader;
pub use storage::compression::CompressionType;
pub use storage::payload::ChunkPayload;
pub use storage::region_header::HeaderEntry;
pub use storage::status::ChunkStatus;
