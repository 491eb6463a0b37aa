use crate::helpers::sectors::{HEADER_SECTORS, SECTOR_SIZE, bytes_to_sectors};
use crate::storage::region_header::{HeaderEntry, RegionHeader};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AllocationKind {
    /// The chunk fits in the sectors it already owns.
    InPlace,
    /// The chunk goes into free space between two allocated chunks.
    Gap,
    /// The chunk goes past the current end of the file.
    Append,
}

/// Where a chunk of `sectors` sectors will be written.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub sector: u64,
    pub sectors: u64,
    /// The allocation reaches past the end of the file, which must be extended
    /// to its last byte after writing.
    pub pad_end: bool,
    pub kind: AllocationKind,
}

/// Chooses a place for a chunk of `sectors` sectors that replaces `current`.
///
/// # Order
/// 1. A healthy (or not yet created) slot whose reserved sectors are enough
///    is reused in place, unless it starts inside the header.
/// 2. Otherwise the first gap between allocated chunks that is large enough
///    is used.
/// 3. Otherwise the chunk is appended past the end of the file.
///
/// A slot with any error status is never trusted: its chunk always goes to
/// the end of the file.
pub fn allocate(
    header: &RegionHeader,
    current: &HeaderEntry,
    sectors: u64,
    file_size: u64,
) -> Allocation {
    if !current.status.is_error() {
        // offset 0 with sectors set classifies as Ok but would overwrite the tables
        let outside_header = current.offset as u64 >= HEADER_SECTORS as u64;
        if outside_header && sectors <= current.sectors as u64 {
            return Allocation {
                sector: current.offset as u64,
                sectors,
                pad_end: false,
                kind: AllocationKind::InPlace,
            };
        }

        let used: Vec<(u64, u64)> = header
            .iter()
            .filter(|(_, _, e)| e.offset != 0)
            .map(|(_, _, e)| (e.offset as u64, e.sectors as u64))
            .collect();

        // a gap bounded by an entry past EOF can itself end past EOF
        if let Some(sector) = find_free_gap(used, sectors) {
            return Allocation {
                sector,
                sectors,
                pad_end: (sector + sectors) * SECTOR_SIZE > file_size,
                kind: AllocationKind::Gap,
            };
        }
    }

    Allocation {
        sector: append_sector(file_size),
        sectors,
        pad_end: true,
        kind: AllocationKind::Append,
    }
}

/// First-fit scan over `(offset, sectors)` pairs of allocated chunks.
///
/// The pairs are sorted here; callers may pass them in any order. When the
/// first chunk does not start right after the header, a zero-length entry at
/// sector 2 is put in front so the space after the header is also considered.
/// The space after the last chunk is never a gap.
pub fn find_free_gap(mut used: Vec<(u64, u64)>, sectors: u64) -> Option<u64> {
    used.sort_unstable();

    let first_data_sector = HEADER_SECTORS as u64;
    if used.first().map(|&(offset, _)| offset) != Some(first_data_sector) {
        used.insert(0, (first_data_sector, 0));
    }

    for pair in used.windows(2) {
        let (offset, length) = pair[0];
        let (next_offset, _) = pair[1];
        let end = offset + length;

        // overlapping chunks leave a negative gap
        let free = next_offset as i64 - end as i64;
        if free >= sectors as i64 {
            if end <= 1 {
                // a corrupt entry pointing into the header
                continue;
            }
            return Some(end);
        }
    }

    None
}

/// Sector used when appending to a file of `file_size` bytes. Never lands
/// inside the header, even for an empty or truncated file.
pub fn append_sector(file_size: u64) -> u64 {
    (bytes_to_sectors(file_size) + 1).max(HEADER_SECTORS as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::region_header::{encode_location, slot_index};
    use crate::storage::status::ChunkStatus;
    use std::io::Cursor;

    fn header_with(slots: &[(usize, usize, u32, u8)], file_size: u64) -> RegionHeader {
        let mut buf = vec![0u8; 2 * SECTOR_SIZE as usize];
        for &(x, z, offset, sectors) in slots {
            let i = 4 * slot_index(x, z);
            buf[i..i + 4].copy_from_slice(&encode_location(offset, sectors));
        }
        RegionHeader::read_from(&mut Cursor::new(buf), file_size).unwrap()
    }

    #[test]
    fn empty_region_has_no_gap() {
        assert_eq!(find_free_gap(vec![], 1), None);
    }

    #[test]
    fn space_after_header_is_a_gap() {
        assert_eq!(find_free_gap(vec![(5, 1)], 3), Some(2));
        assert_eq!(find_free_gap(vec![(5, 1)], 4), None);
    }

    #[test]
    fn first_fit_between_chunks() {
        let used = vec![(9, 1), (2, 2), (4, 1), (7, 1)];
        // free: 5..7 (2 sectors), 8..9 (1 sector)
        assert_eq!(find_free_gap(used.clone(), 1), Some(5));
        assert_eq!(find_free_gap(used.clone(), 2), Some(5));
        assert_eq!(find_free_gap(used, 3), None);
    }

    #[test]
    fn overlapping_chunks_do_not_open_a_gap() {
        assert_eq!(find_free_gap(vec![(2, 4), (3, 4)], 1), None);
    }

    #[test]
    fn candidates_inside_header_are_skipped() {
        assert_eq!(find_free_gap(vec![(1, 0), (5, 1)], 1), None);
    }

    #[test]
    fn append_never_lands_in_header() {
        assert_eq!(append_sector(0), 2);
        assert_eq!(append_sector(100), 2);
        assert_eq!(append_sector(2 * SECTOR_SIZE), 3);
        assert_eq!(append_sector(3 * SECTOR_SIZE), 4);
        assert_eq!(append_sector(3 * SECTOR_SIZE + 1), 5);
    }

    #[test]
    fn in_place_when_it_fits() {
        let header = RegionHeader::empty();
        let current = HeaderEntry::new(4, 2, 0, 6 * SECTOR_SIZE);
        let alloc = allocate(&header, &current, 2, 6 * SECTOR_SIZE);
        assert_eq!(alloc.kind, AllocationKind::InPlace);
        assert_eq!(alloc.sector, 4);
        assert!(!alloc.pad_end);
    }

    #[test]
    fn new_chunk_in_empty_region_appends_after_header() {
        let header = RegionHeader::empty();
        let alloc = allocate(&header, &HeaderEntry::NOT_CREATED, 1, 0);
        assert_eq!(alloc.kind, AllocationKind::Append);
        assert_eq!(alloc.sector, 2);
        assert!(alloc.pad_end);
    }

    #[test]
    fn untrusted_slot_always_appends() {
        let header = RegionHeader::empty();
        let size = 10 * SECTOR_SIZE;
        let current = HeaderEntry::new(1, 4, 0, size);
        assert_eq!(current.status, ChunkStatus::InHeader);
        let alloc = allocate(&header, &current, 1, size);
        assert_eq!(alloc.kind, AllocationKind::Append);
        assert_eq!(alloc.sector, 11);
    }

    #[test]
    fn slot_at_offset_zero_is_not_reused_in_place() {
        let size = 3 * SECTOR_SIZE;
        let header = header_with(&[(0, 0, 2, 1), (1, 0, 0, 1)], size);
        let current = *header.entry(1, 0);
        assert_eq!(current.status, ChunkStatus::Ok);

        let alloc = allocate(&header, &current, 1, size);
        assert_ne!(alloc.kind, AllocationKind::InPlace);
        assert_eq!(alloc.sector, 4);
    }

    #[test]
    fn gap_reaching_past_eof_is_padded() {
        let size = 3 * SECTOR_SIZE;
        let header = header_with(&[(0, 0, 2, 1), (1, 0, 100, 1)], size);
        assert_eq!(header.entry(1, 0).status, ChunkStatus::OutOfFile);

        let alloc = allocate(&header, &HeaderEntry::NOT_CREATED, 1, size);
        assert_eq!(alloc.kind, AllocationKind::Gap);
        assert_eq!(alloc.sector, 3);
        assert!(alloc.pad_end);
    }

    #[test]
    fn gap_inside_the_file_is_not_padded() {
        let size = 5 * SECTOR_SIZE;
        let header = header_with(&[(0, 0, 2, 1), (1, 0, 4, 1)], size);
        let alloc = allocate(&header, &HeaderEntry::NOT_CREATED, 1, size);
        assert_eq!((alloc.kind, alloc.sector), (AllocationKind::Gap, 3));
        assert!(!alloc.pad_end);
    }
}
