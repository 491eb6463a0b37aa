/// Size of one allocation unit in a region file.
pub const SECTOR_SIZE: u64 = 4096;

/// The location table and the timestamp table each fill one sector.
pub const HEADER_SECTORS: u32 = 2;
pub const REGION_HEADER_SIZE: u64 = SECTOR_SIZE * HEADER_SECTORS as u64;

/// 4 bytes of length + 1 byte of compression id in front of every chunk.
pub const CHUNK_HEADER_SIZE: u64 = 5;

pub const REGION_WIDTH: usize = 32;
pub const SLOT_COUNT: usize = REGION_WIDTH * REGION_WIDTH;

/// The location table stores the sector count in a single byte.
pub const MAX_SECTOR_COUNT: u32 = 0xFF;
/// ...and the sector offset in the remaining 24 bits.
pub const MAX_SECTOR_OFFSET: u32 = 0xFF_FFFF;

/// Number of `SECTOR_SIZE` sectors needed to hold `bytes` bytes.
pub fn bytes_to_sectors(bytes: u64) -> u64 {
    bytes_to_sectors_with(bytes, SECTOR_SIZE)
}

/// Ceiling division of `bytes` by `sector_size`, integer arithmetic only.
pub fn bytes_to_sectors_with(bytes: u64, sector_size: u64) -> u64 {
    if bytes == 0 {
        return 0;
    }
    (bytes + sector_size - 1) / sector_size
}

/// Byte position of the first byte of `sector`.
pub fn sector_to_bytes(sector: u32) -> u64 {
    sector as u64 * SECTOR_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bytes_need_no_sectors() {
        assert_eq!(bytes_to_sectors(0), 0);
    }

    #[test]
    fn rounds_up_to_whole_sectors() {
        assert_eq!(bytes_to_sectors(1), 1);
        assert_eq!(bytes_to_sectors(4095), 1);
        assert_eq!(bytes_to_sectors(4096), 1);
        assert_eq!(bytes_to_sectors(4097), 2);
        assert_eq!(bytes_to_sectors(8192), 2);
        assert_eq!(bytes_to_sectors(8193), 3);
    }

    #[test]
    fn sectors_cover_bytes_with_less_than_one_sector_of_slack() {
        for n in (0..50_000u64).step_by(7).chain([u32::MAX as u64, 1 << 40]) {
            let covered = bytes_to_sectors(n) * SECTOR_SIZE;
            assert!(covered >= n, "n={n}");
            assert!(covered - n < SECTOR_SIZE, "n={n}");
        }
    }

    #[test]
    fn custom_sector_size() {
        assert_eq!(bytes_to_sectors_with(10, 3), 4);
        assert_eq!(bytes_to_sectors_with(9, 3), 3);
        assert_eq!(bytes_to_sectors_with(0, 3), 0);
    }
}
