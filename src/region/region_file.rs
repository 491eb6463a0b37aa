use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use tracing::{debug, warn};

use crate::error::{FormatError, RegionError, Result};
use crate::helpers::helper::{current_unix_time, read_up_to};
use crate::helpers::open_flags::OpenFlags;
use crate::helpers::sectors::{
    CHUNK_HEADER_SIZE, MAX_SECTOR_COUNT, MAX_SECTOR_OFFSET, REGION_HEADER_SIZE, REGION_WIDTH,
    SECTOR_SIZE, bytes_to_sectors, sector_to_bytes,
};
use crate::region::iter::ChunkIter;
use crate::storage::allocator::allocate;
use crate::storage::chunk_header::{ChunkHeader, ChunkHeaderTable};
use crate::storage::compression::{CompressionType, compress, decompress};
use crate::storage::file::open_region_file;
use crate::storage::payload::ChunkPayload;
use crate::storage::region_header::{HeaderEntry, RegionHeader};
use crate::storage::status::ChunkStatus;

/// Whether the region file closes its backing handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Ownership {
    /// Opened from a path; closed when the region file goes away.
    Owned,
    /// Supplied by the caller; handed back by [`RegionFile::close`].
    Borrowed,
}

/// Location, length and status of a chunk that has a location entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub x: usize,
    pub z: usize,
    pub length: Option<u32>,
    pub compression: Option<u8>,
    pub status: ChunkStatus,
}

/// A region file: up to 32x32 compressed chunks in 4 KiB sectors.
///
/// Both header tables are kept in memory and rebuilt from disk after every
/// write and unlink. Every operation seeks before it reads or writes.
pub struct RegionFile<S> {
    source: S,
    ownership: Ownership,
    path: Option<PathBuf>,
    header: RegionHeader,
    chunk_headers: ChunkHeaderTable,
    size: u64,
    missing_header: bool,
    compression_level: Compression,
}

impl RegionFile<File> {
    /// Opens an existing region file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, OpenFlags::empty())
    }

    pub fn open_with(path: impl AsRef<Path>, flags: OpenFlags) -> Result<Self> {
        let path = path.as_ref();
        let file = open_region_file(path, flags)?;
        Self::with_source(file, Ownership::Owned, Some(path.to_path_buf()))
    }
}

impl<S: Read + Write + Seek> RegionFile<S> {
    /// Wraps a handle owned by the caller. Pass `&mut File` to keep using the
    /// file after the region file is dropped.
    pub fn from_handle(handle: S) -> Result<Self> {
        Self::with_source(handle, Ownership::Borrowed, None)
    }

    fn with_source(source: S, ownership: Ownership, path: Option<PathBuf>) -> Result<Self> {
        let mut region = Self {
            source,
            ownership,
            path,
            header: RegionHeader::empty(),
            chunk_headers: ChunkHeaderTable::empty(),
            size: 0,
            missing_header: false,
            compression_level: Compression::default(),
        };

        match region.reparse() {
            Ok(()) => {}
            Err(RegionError::Format(FormatError::NoRegionHeader)) => {
                warn!(
                    size = region.size,
                    region = %region,
                    "region file is too small to have a header; treating it as empty"
                );
            }
            Err(e) => return Err(e),
        }

        Ok(region)
    }

    /// Rebuilds both header tables from disk.
    ///
    /// # Errors
    /// [`FormatError::NoRegionHeader`] when the file is not empty but smaller
    /// than the two header sectors. The region is still usable afterwards,
    /// with every slot `NotCreated`.
    pub fn reparse(&mut self) -> Result<()> {
        let size = self.source.seek(SeekFrom::End(0))?;

        let header = match RegionHeader::read_from(&mut self.source, size) {
            Ok(header) => header,
            Err(RegionError::Format(FormatError::NoRegionHeader)) => {
                self.size = size;
                self.missing_header = true;
                self.header = RegionHeader::empty();
                self.chunk_headers = ChunkHeaderTable::empty();
                return Err(FormatError::NoRegionHeader.into());
            }
            Err(e) => return Err(e),
        };
        let chunk_headers = ChunkHeaderTable::read_from(&mut self.source, &header, size)?;

        self.size = size;
        self.missing_header = false;
        self.header = header;
        self.chunk_headers = chunk_headers;

        debug!(size = self.size, chunks = self.chunk_count(), "parsed region header");
        Ok(())
    }

    /// Reads and decodes the chunk at `(x, z)`.
    ///
    /// # Errors
    /// - [`RegionError::NotCreated`] if the slot holds no chunk.
    /// - [`RegionError::Format`] if the location entry, the chunk header or
    ///   the compressed data is invalid.
    ///
    /// A chunk whose length does not fit the sectors reserved for it is still
    /// read, using the length stored in front of the chunk.
    pub fn read_chunk<T: ChunkPayload>(&mut self, x: usize, z: usize) -> Result<T> {
        check_coords(x, z)?;
        let entry = *self.header.entry(x, z);

        match entry.status {
            ChunkStatus::Ok => {}
            ChunkStatus::NotCreated => return Err(RegionError::NotCreated { x, z }),
            ChunkStatus::InHeader => return Err(region_header_error(x, z, "is in the region header")),
            ChunkStatus::MismatchedLengths => return Err(region_header_error(x, z, "has zero length")),
            _ => return Err(region_header_error(x, z, "is partially/completely outside the file")),
        }

        let chunk = *self.chunk_headers.get(x, z);
        match chunk.status {
            ChunkStatus::ZeroLength => {
                return Err(chunk_header_error(x, z, "the length of the chunk is 0"));
            }
            ChunkStatus::MismatchedLengths => {
                warn!(
                    x,
                    z,
                    length = ?chunk.length,
                    sectors = entry.sectors,
                    "chunk length does not match the region header; reading it anyway"
                );
            }
            _ => {}
        }

        let (length, compression_id) = match (chunk.length, chunk.compression) {
            (Some(length), Some(compression)) if length > 1 => (length, compression),
            _ => return Err(chunk_header_error(x, z, "chunk length is 0 bytes")),
        };

        let compression = CompressionType::from_id(compression_id).ok_or(
            FormatError::UnknownCompression {
                x,
                z,
                id: compression_id,
            },
        )?;

        // the stored length includes the compression byte
        let expected = length as u64 - 1;
        self.source
            .seek(SeekFrom::Start(sector_to_bytes(entry.offset) + CHUNK_HEADER_SIZE))?;
        let data = read_up_to(&mut self.source, expected)?;
        if (data.len() as u64) < expected {
            return Err(chunk_data_error(
                x,
                z,
                format!("chunk is truncated: expected {expected} bytes, found {}", data.len()),
            ));
        }

        let raw = decompress(compression, &data).map_err(|e| chunk_data_error(x, z, e.to_string()))?;
        T::deserialize(&raw).map_err(|message| chunk_data_error(x, z, message))
    }

    /// Compresses and stores `payload` at `(x, z)`, replacing any existing chunk.
    ///
    /// # Behavior
    /// - The chunk is written where [`allocate`] decides: in place, in the
    ///   first large enough gap, or past the end of the file.
    /// - Chunk bytes are written before the location entry is updated.
    /// - The timestamp entry is set to the current time.
    /// - Both header tables are rebuilt afterwards.
    pub fn write_chunk<T: ChunkPayload>(&mut self, x: usize, z: usize, payload: &T) -> Result<()> {
        check_coords(x, z)?;

        let data = compress(&payload.serialize(), self.compression_level)?;
        let sectors = bytes_to_sectors(data.len() as u64 + CHUNK_HEADER_SIZE);
        if sectors > MAX_SECTOR_COUNT as u64 {
            return Err(FormatError::ChunkTooLarge { x, z, sectors }.into());
        }

        let current = *self.header.entry(x, z);
        let allocation = allocate(&self.header, &current, sectors, self.size);
        if allocation.sector > MAX_SECTOR_OFFSET as u64 {
            return Err(FormatError::RegionFull {
                x,
                z,
                sector: allocation.sector,
            }
            .into());
        }

        debug!(
            x,
            z,
            sector = allocation.sector,
            sectors = allocation.sectors,
            kind = ?allocation.kind,
            "writing chunk"
        );

        self.source
            .seek(SeekFrom::Start(allocation.sector * SECTOR_SIZE))?;
        self.source.write_all(&(data.len() as u32 + 1).to_be_bytes())?;
        self.source.write_all(&[CompressionType::Zlib.id()])?;
        self.source.write_all(&data)?;

        if allocation.pad_end {
            // only the last byte of the allocation is written
            self.source
                .seek(SeekFrom::Start((allocation.sector + allocation.sectors) * SECTOR_SIZE - 1))?;
            self.source.write_all(&[0])?;
        }

        RegionHeader::write_location(
            &mut self.source,
            x,
            z,
            allocation.sector as u32,
            allocation.sectors as u8,
        )?;
        RegionHeader::write_timestamp(&mut self.source, x, z, current_unix_time())?;
        self.source.flush()?;

        self.reparse()
    }

    /// Removes the chunk at `(x, z)` from the header tables.
    ///
    /// The chunk bytes stay on disk; their sectors become free space for
    /// later writes. A file without a header has nothing to unlink.
    pub fn unlink_chunk(&mut self, x: usize, z: usize) -> Result<()> {
        check_coords(x, z)?;
        if self.size < REGION_HEADER_SIZE {
            return Ok(());
        }

        RegionHeader::write_location(&mut self.source, x, z, 0, 0)?;
        RegionHeader::write_timestamp(&mut self.source, x, z, 0)?;
        self.source.flush()?;

        debug!(x, z, "unlinked chunk");
        self.reparse()
    }

    /// Every slot with a nonzero location offset, readable or not.
    pub fn chunk_coords(&self) -> Vec<ChunkMetadata> {
        let mut chunks = Vec::new();
        for x in 0..REGION_WIDTH {
            for z in 0..REGION_WIDTH {
                if self.header.entry(x, z).offset > 0 {
                    let chunk = self.chunk_headers.get(x, z);
                    chunks.push(ChunkMetadata {
                        x,
                        z,
                        length: chunk.length,
                        compression: chunk.compression,
                        status: chunk.status,
                    });
                }
            }
        }
        chunks
    }

    /// Number of defined chunks, including corrupt ones.
    pub fn chunk_count(&self) -> usize {
        self.header.iter().filter(|(_, _, e)| e.offset > 0).count()
    }

    /// Lazily reads every chunk listed by [`chunk_coords`](Self::chunk_coords).
    ///
    /// Chunks with format errors are skipped. Any other error is yielded once
    /// and ends the iteration.
    pub fn iter_chunks<T: ChunkPayload>(&mut self) -> ChunkIter<'_, S, T> {
        let coords = self.chunk_coords();
        ChunkIter::new(self, coords)
    }

    /// Last write time of `(x, z)` in unix seconds, 0 if never written.
    pub fn timestamp(&self, x: usize, z: usize) -> Result<u32> {
        check_coords(x, z)?;
        Ok(self.header.entry(x, z).timestamp)
    }

    pub fn header_entry(&self, x: usize, z: usize) -> Result<HeaderEntry> {
        check_coords(x, z)?;
        Ok(*self.header.entry(x, z))
    }

    pub fn chunk_header(&self, x: usize, z: usize) -> Result<ChunkHeader> {
        check_coords(x, z)?;
        Ok(*self.chunk_headers.get(x, z))
    }

    /// File size in bytes as of the last parse.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// `true` if the last parse found a non-empty file too small for a header.
    pub fn is_missing_header(&self) -> bool {
        self.missing_header
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn compression_level(&self) -> Compression {
        self.compression_level
    }

    /// zlib level (0-9) used for chunks written from now on.
    pub fn set_compression_level(&mut self, level: u32) {
        self.compression_level = Compression::new(level.min(9));
    }

    /// Flushes and releases the region file. An owned file is closed; a
    /// borrowed handle is returned to the caller.
    pub fn close(mut self) -> Result<Option<S>> {
        self.source.flush()?;
        match self.ownership {
            Ownership::Owned => Ok(None),
            Ownership::Borrowed => Ok(Some(self.source)),
        }
    }

    /// Direct access to the backing handle. Writing through it leaves the
    /// in-memory tables stale until the next [`reparse`](Self::reparse).
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Gives back the backing handle regardless of ownership.
    pub fn into_inner(self) -> S {
        self.source
    }
}

fn check_coords(x: usize, z: usize) -> Result<()> {
    if x >= REGION_WIDTH || z >= REGION_WIDTH {
        return Err(RegionError::InvalidCoordinate { x, z });
    }
    Ok(())
}

fn region_header_error(x: usize, z: usize, reason: &'static str) -> RegionError {
    FormatError::RegionHeader { x, z, reason }.into()
}

fn chunk_header_error(x: usize, z: usize, reason: &'static str) -> RegionError {
    FormatError::ChunkHeader { x, z, reason }.into()
}

fn chunk_data_error(x: usize, z: usize, message: String) -> RegionError {
    FormatError::ChunkData { x, z, message }.into()
}

impl<S> fmt::Display for RegionFile<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "RegionFile({:?})", path.display().to_string()),
            None => write!(f, "RegionFile(<{:?} handle>)", self.ownership),
        }
    }
}

impl<S> fmt::Debug for RegionFile<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionFile")
            .field("path", &self.path)
            .field("ownership", &self.ownership)
            .field("size", &self.size)
            .field("missing_header", &self.missing_header)
            .finish_non_exhaustive()
    }
}
