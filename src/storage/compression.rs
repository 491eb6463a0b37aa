use std::io::{self, Read, Write};

use flate2::read::GzDecoder;
use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};

/// Compression byte stored after the chunk length.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompressionType {
    Gzip = 1,
    Zlib = 2,
}

impl CompressionType {
    pub fn from_id(v: u8) -> Option<Self> {
        match v {
            1 => Some(CompressionType::Gzip),
            2 => Some(CompressionType::Zlib),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

pub fn decompress(compression: CompressionType, data: &[u8]) -> io::Result<Vec<u8>> {
    match compression {
        CompressionType::Gzip => {
            let mut decompressed = Vec::new();
            GzDecoder::new(data).read_to_end(&mut decompressed)?;
            Ok(decompressed)
        }
        CompressionType::Zlib => inflate_zlib(data),
    }
}

/// Inflates a complete zlib stream. Input that ends before the end of the
/// stream is an error rather than a short result.
fn inflate_zlib(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut inflater = Decompress::new(true);
    let mut out = Vec::with_capacity(data.len().saturating_mul(4).max(64));

    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity());
        }

        let (before_in, before_out) = (inflater.total_in(), inflater.total_out());
        let status = inflater
            .decompress_vec(&data[before_in as usize..], &mut out, FlushDecompress::Finish)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if status == Status::StreamEnd {
            return Ok(out);
        }

        let stalled = inflater.total_in() == before_in && inflater.total_out() == before_out;
        if stalled && out.len() < out.capacity() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "compressed stream ends early",
            ));
        }
    }
}

/// Chunks are always written zlib-compressed.
pub fn compress(data: &[u8], level: Compression) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), level);
    encoder.write_all(data)?;
    encoder.finish()
}
