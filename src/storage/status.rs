use crate::helpers::sectors::{HEADER_SECTORS, SECTOR_SIZE};

/// Classification of a chunk slot.
///
/// The same enum is used for the coarse status (derived from the location
/// table and the file size) and for the fine status (additionally derived
/// from the 5 bytes in front of the chunk). `ZeroLength` only appears as a
/// fine status.
#[repr(i8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ChunkStatus {
    /// Location entry has a zero sector count, or the chunk length does not
    /// fit in the sectors reserved for it.
    MismatchedLengths = -4,
    /// Chunk header stores a length of 0.
    ZeroLength = -3,
    /// Chunk offset points inside the two header sectors.
    InHeader = -2,
    /// Chunk lies partially or completely past the end of the file.
    OutOfFile = -1,
    Ok = 0,
    NotCreated = 1,
}

impl ChunkStatus {
    pub fn code(self) -> i8 {
        self as i8
    }

    pub fn from_code(v: i8) -> Option<Self> {
        match v {
            -4 => Some(ChunkStatus::MismatchedLengths),
            -3 => Some(ChunkStatus::ZeroLength),
            -2 => Some(ChunkStatus::InHeader),
            -1 => Some(ChunkStatus::OutOfFile),
            0 => Some(ChunkStatus::Ok),
            1 => Some(ChunkStatus::NotCreated),
            _ => None,
        }
    }

    pub fn is_error(self) -> bool {
        self.code() < 0
    }

    /// Coarse status of a location table entry. The checks run in a fixed
    /// order and the first match wins, so `offset == 1, sectors == 0` is
    /// `MismatchedLengths`, not `InHeader`.
    pub fn classify_region_entry(offset: u32, sectors: u8, file_size: u64) -> Self {
        if offset == 0 && sectors == 0 {
            ChunkStatus::NotCreated
        } else if sectors == 0 {
            ChunkStatus::MismatchedLengths
        } else if offset < HEADER_SECTORS && offset != 0 {
            ChunkStatus::InHeader
        } else if (offset as u64 + sectors as u64) * SECTOR_SIZE > file_size {
            ChunkStatus::OutOfFile
        } else {
            ChunkStatus::Ok
        }
    }

    /// Fine status of a chunk whose coarse status is `Ok`, given the length
    /// stored in front of the chunk.
    pub fn classify_chunk_length(length: u32, sectors: u8) -> Self {
        if length == 0 {
            ChunkStatus::ZeroLength
        } else if length as u64 + 4 > sectors as u64 * SECTOR_SIZE {
            ChunkStatus::MismatchedLengths
        } else {
            ChunkStatus::Ok
        }
    }
}
