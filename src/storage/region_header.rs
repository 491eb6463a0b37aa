use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{FormatError, Result};
use crate::helpers::helper::u32_be_at;
use crate::helpers::sectors::{REGION_HEADER_SIZE, REGION_WIDTH, SECTOR_SIZE, SLOT_COUNT};
use crate::storage::status::ChunkStatus;

/// One slot of the location + timestamp tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderEntry {
    /// First sector of the chunk, counted from the start of the file (24 bits).
    pub offset: u32,
    /// Number of sectors reserved for the chunk.
    pub sectors: u8,
    /// Unix seconds of the last write.
    pub timestamp: u32,
    pub status: ChunkStatus,
}

impl HeaderEntry {
    pub const NOT_CREATED: HeaderEntry = HeaderEntry {
        offset: 0,
        sectors: 0,
        timestamp: 0,
        status: ChunkStatus::NotCreated,
    };

    pub fn new(offset: u32, sectors: u8, timestamp: u32, file_size: u64) -> Self {
        Self {
            offset,
            sectors,
            timestamp,
            status: ChunkStatus::classify_region_entry(offset, sectors, file_size),
        }
    }
}

/// Index of `(x, z)` in both header tables.
pub fn slot_index(x: usize, z: usize) -> usize {
    x + z * REGION_WIDTH
}

/// Packs a location entry as `(offset << 8) | sectors`, big-endian.
pub fn encode_location(offset: u32, sectors: u8) -> [u8; 4] {
    ((offset << 8) | sectors as u32).to_be_bytes()
}

pub fn decode_location(raw: u32) -> (u32, u8) {
    (raw >> 8, (raw & 0xFF) as u8)
}

/// In-memory copy of the 8 KiB region header.
///
/// The table is only ever built as a whole from the file; statuses are never
/// patched individually.
#[derive(Debug, Clone)]
pub struct RegionHeader {
    entries: Vec<HeaderEntry>,
}

impl RegionHeader {
    pub const SIZE: usize = REGION_HEADER_SIZE as usize;

    /// A header where every slot is `NotCreated`.
    pub fn empty() -> Self {
        Self {
            entries: vec![HeaderEntry::NOT_CREATED; SLOT_COUNT],
        }
    }

    /// Reads and classifies both tables.
    ///
    /// # Behavior
    /// - A 0-byte file is an empty region and parses without error.
    /// - A file that is not empty but smaller than the two header sectors
    ///   fails with [`FormatError::NoRegionHeader`]; callers that want to
    ///   keep going use [`RegionHeader::empty`] in that case.
    /// - Otherwise each slot gets its status from
    ///   [`ChunkStatus::classify_region_entry`].
    pub fn read_from<R: Read + Seek>(reader: &mut R, file_size: u64) -> Result<Self> {
        if file_size == 0 {
            return Ok(Self::empty());
        }
        if file_size < REGION_HEADER_SIZE {
            return Err(FormatError::NoRegionHeader.into());
        }

        reader.seek(SeekFrom::Start(0))?;
        let mut buf = vec![0u8; Self::SIZE];
        reader.read_exact(&mut buf)?;

        let timestamps = SECTOR_SIZE as usize;
        let entries = (0..SLOT_COUNT)
            .map(|index| {
                let (offset, sectors) = decode_location(u32_be_at(&buf, 4 * index));
                let timestamp = u32_be_at(&buf, timestamps + 4 * index);
                HeaderEntry::new(offset, sectors, timestamp, file_size)
            })
            .collect();

        Ok(Self { entries })
    }

    pub fn entry(&self, x: usize, z: usize) -> &HeaderEntry {
        &self.entries[slot_index(x, z)]
    }

    /// All slots with their coordinates, in table order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &HeaderEntry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (index % REGION_WIDTH, index / REGION_WIDTH, entry))
    }

    /// Overwrites the location field of `(x, z)` on disk.
    pub fn write_location<W: Write + Seek>(
        writer: &mut W,
        x: usize,
        z: usize,
        offset: u32,
        sectors: u8,
    ) -> Result<()> {
        writer.seek(SeekFrom::Start(4 * slot_index(x, z) as u64))?;
        writer.write_all(&encode_location(offset, sectors))?;
        Ok(())
    }

    /// Overwrites the timestamp field of `(x, z)` on disk.
    pub fn write_timestamp<W: Write + Seek>(
        writer: &mut W,
        x: usize,
        z: usize,
        timestamp: u32,
    ) -> Result<()> {
        writer.seek(SeekFrom::Start(SECTOR_SIZE + 4 * slot_index(x, z) as u64))?;
        writer.write_all(&timestamp.to_be_bytes())?;
        Ok(())
    }
}
