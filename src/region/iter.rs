use std::io::{Read, Seek, Write};
use std::marker::PhantomData;
use std::vec;

use tracing::debug;

use crate::error::Result;
use crate::region::region_file::{ChunkMetadata, RegionFile};
use crate::storage::payload::ChunkPayload;

/// A decoded chunk together with its coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionChunk<T> {
    pub x: usize,
    pub z: usize,
    pub payload: T,
}

/// Iterator returned by [`RegionFile::iter_chunks`].
pub struct ChunkIter<'a, S, T> {
    region: &'a mut RegionFile<S>,
    coords: vec::IntoIter<ChunkMetadata>,
    failed: bool,
    _payload: PhantomData<T>,
}

impl<'a, S, T> ChunkIter<'a, S, T> {
    pub(crate) fn new(region: &'a mut RegionFile<S>, coords: Vec<ChunkMetadata>) -> Self {
        Self {
            region,
            coords: coords.into_iter(),
            failed: false,
            _payload: PhantomData,
        }
    }
}

impl<S, T> Iterator for ChunkIter<'_, S, T>
where
    S: Read + Write + Seek,
    T: ChunkPayload,
{
    type Item = Result<RegionChunk<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        for meta in self.coords.by_ref() {
            match self.region.read_chunk::<T>(meta.x, meta.z) {
                Ok(payload) => {
                    return Some(Ok(RegionChunk {
                        x: meta.x,
                        z: meta.z,
                        payload,
                    }));
                }
                Err(e) if e.is_format_error() => {
                    debug!(x = meta.x, z = meta.z, error = %e, "skipping unreadable chunk");
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::region_header::{encode_location, slot_index};
    use std::io::{self, Cursor, SeekFrom};

    #[test]
    fn skips_corrupt_chunks() {
        let mut region = RegionFile::from_handle(Cursor::new(Vec::new())).unwrap();
        region.write_chunk(0, 0, &b"first".to_vec()).unwrap();
        region.write_chunk(4, 1, &b"second".to_vec()).unwrap();

        // point (9, 9) into the header
        let mut raw = region.into_inner().into_inner();
        let i = 4 * slot_index(9, 9);
        raw[i..i + 4].copy_from_slice(&encode_location(1, 1));
        let mut region = RegionFile::from_handle(Cursor::new(raw)).unwrap();
        assert_eq!(region.chunk_count(), 3);

        let chunks: Vec<_> = region
            .iter_chunks::<Vec<u8>>()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], RegionChunk { x: 0, z: 0, payload: b"first".to_vec() });
        assert_eq!(chunks[1], RegionChunk { x: 4, z: 1, payload: b"second".to_vec() });
    }

    #[test]
    fn each_call_starts_over() {
        let mut region = RegionFile::from_handle(Cursor::new(Vec::new())).unwrap();
        region.write_chunk(2, 2, &b"again".to_vec()).unwrap();
        assert_eq!(region.iter_chunks::<Vec<u8>>().count(), 1);
        assert_eq!(region.iter_chunks::<Vec<u8>>().count(), 1);
    }

    /// Fails every read once armed, like a disk going away.
    struct FlakyDisk {
        inner: Cursor<Vec<u8>>,
        broken: bool,
    }

    impl Read for FlakyDisk {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.broken {
                return Err(io::Error::new(io::ErrorKind::Other, "device unplugged"));
            }
            self.inner.read(buf)
        }
    }

    impl Write for FlakyDisk {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for FlakyDisk {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn io_errors_end_the_iteration() {
        let mut region = RegionFile::from_handle(FlakyDisk {
            inner: Cursor::new(Vec::new()),
            broken: false,
        })
        .unwrap();
        region.write_chunk(0, 0, &b"a".to_vec()).unwrap();
        region.write_chunk(1, 0, &b"b".to_vec()).unwrap();

        // the tables stay in memory, only chunk reads hit the disk
        region.get_mut().broken = true;

        let mut iter = region.iter_chunks::<Vec<u8>>();
        let first = iter.next().unwrap();
        assert!(first.is_err());
        assert!(!first.unwrap_err().is_format_error());
        assert!(iter.next().is_none());
    }
}
