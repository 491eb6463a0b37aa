use std::io::{self, Read};

/// Seconds since the unix epoch, truncated to the 32 bits the timestamp table holds.
pub fn current_unix_time() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

pub fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b)?;
    Ok(b[0])
}

// Region files are big-endian throughout.
pub fn read_u32_be<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_be_bytes(b))
}

pub fn u32_be_at(buf: &[u8], pos: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&buf[pos..pos + 4]);
    u32::from_be_bytes(b)
}

/// Reads up to `len` bytes, stopping early at end of input instead of failing.
pub fn read_up_to<R: Read>(r: &mut R, len: u64) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len.min(1 << 20) as usize);
    r.take(len).read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian() {
        let bytes = [0x00, 0x00, 0x02, 0x01, 0x07];
        let mut r = &bytes[..];
        assert_eq!(read_u32_be(&mut r).unwrap(), 0x0201);
        assert_eq!(read_u8(&mut r).unwrap(), 7);
        assert!(read_u8(&mut r).is_err());
    }

    #[test]
    fn short_input_is_not_an_error() {
        let bytes = [1u8, 2, 3];
        let mut r = &bytes[..];
        assert_eq!(read_up_to(&mut r, 10).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn slice_lookup() {
        let buf = [9u8, 0, 0, 1, 0];
        assert_eq!(u32_be_at(&buf, 1), 256);
    }
}
