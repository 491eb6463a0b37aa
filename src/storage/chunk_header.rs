use std::io::{Read, Seek, SeekFrom};

use crate::error::Result;
use crate::helpers::helper::{read_u8, read_u32_be};
use crate::helpers::sectors::{CHUNK_HEADER_SIZE, SLOT_COUNT, sector_to_bytes};
use crate::storage::region_header::{HeaderEntry, RegionHeader, slot_index};
use crate::storage::status::ChunkStatus;

/// The 5 bytes stored in front of every chunk, plus the derived fine status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Bytes following the length field, compression byte included.
    pub length: Option<u32>,
    pub compression: Option<u8>,
    pub status: ChunkStatus,
}

impl ChunkHeader {
    pub fn absent(status: ChunkStatus) -> Self {
        Self {
            length: None,
            compression: None,
            status,
        }
    }

    /// Derives the chunk header of one slot from its location entry.
    ///
    /// Only slots whose coarse status is `Ok` are trusted enough to read.
    /// `OutOfFile` slots are read on a best-effort basis when the 5 header
    /// bytes still lie within the file, but keep their status.
    pub fn read_for<R: Read + Seek>(
        reader: &mut R,
        entry: &HeaderEntry,
        file_size: u64,
    ) -> Result<Self> {
        match entry.status {
            ChunkStatus::NotCreated => Ok(Self::absent(ChunkStatus::NotCreated)),
            ChunkStatus::Ok => {
                let (length, compression) = read_raw(reader, entry.offset)?;
                Ok(Self {
                    length: Some(length),
                    compression: Some(compression),
                    status: ChunkStatus::classify_chunk_length(length, entry.sectors),
                })
            }
            ChunkStatus::OutOfFile => {
                if sector_to_bytes(entry.offset) + CHUNK_HEADER_SIZE <= file_size {
                    let (length, compression) = read_raw(reader, entry.offset)?;
                    Ok(Self {
                        length: Some(length),
                        compression: Some(compression),
                        status: ChunkStatus::OutOfFile,
                    })
                } else {
                    Ok(Self::absent(ChunkStatus::OutOfFile))
                }
            }
            other => Ok(Self::absent(other)),
        }
    }
}

fn read_raw<R: Read + Seek>(reader: &mut R, offset: u32) -> Result<(u32, u8)> {
    reader.seek(SeekFrom::Start(sector_to_bytes(offset)))?;
    let length = read_u32_be(reader)?;
    let compression = read_u8(reader)?;
    Ok((length, compression))
}

/// Chunk headers of all 1024 slots, rebuilt whenever the region header is.
#[derive(Debug, Clone)]
pub struct ChunkHeaderTable {
    headers: Vec<ChunkHeader>,
}

impl ChunkHeaderTable {
    pub fn empty() -> Self {
        Self {
            headers: vec![ChunkHeader::absent(ChunkStatus::NotCreated); SLOT_COUNT],
        }
    }

    pub fn read_from<R: Read + Seek>(
        reader: &mut R,
        region_header: &RegionHeader,
        file_size: u64,
    ) -> Result<Self> {
        let mut headers = Vec::with_capacity(SLOT_COUNT);
        for (_, _, entry) in region_header.iter() {
            headers.push(ChunkHeader::read_for(reader, entry, file_size)?);
        }
        Ok(Self { headers })
    }

    pub fn get(&self, x: usize, z: usize) -> &ChunkHeader {
        &self.headers[slot_index(x, z)]
    }
}
