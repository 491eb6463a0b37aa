use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegionError>;

/// The region file bytes are not valid for the expected format.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The file is too small to hold the two header tables.
    #[error("the region file is too small in size to have a header")]
    NoRegionHeader,

    /// The location table entry of a chunk is inconsistent.
    #[error("chunk {x},{z}: {reason}")]
    RegionHeader { x: usize, z: usize, reason: &'static str },

    /// The length/compression bytes in front of a chunk are invalid.
    #[error("chunk {x},{z}: {reason}")]
    ChunkHeader { x: usize, z: usize, reason: &'static str },

    /// Decompression or payload decoding failed. The underlying message is
    /// kept for diagnostics only.
    #[error("chunk {x},{z} has corrupt data: {message}")]
    ChunkData { x: usize, z: usize, message: String },

    #[error("chunk {x},{z}: unknown chunk compression/format ({id})")]
    UnknownCompression { x: usize, z: usize, id: u8 },

    #[error("chunk {x},{z} needs {sectors} sectors, more than a location entry can address")]
    ChunkTooLarge { x: usize, z: usize, sectors: u64 },

    #[error("chunk {x},{z} would be placed at sector {sector}, past the addressable range")]
    RegionFull { x: usize, z: usize, sector: u64 },
}

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Format(#[from] FormatError),

    /// Not a format error: the slot simply holds no chunk yet.
    #[error("chunk {x},{z} is not created")]
    NotCreated { x: usize, z: usize },

    #[error("coordinate {x},{z} is outside the 32x32 region")]
    InvalidCoordinate { x: usize, z: usize },
}

impl RegionError {
    pub fn is_format_error(&self) -> bool {
        matches!(self, RegionError::Format(_))
    }

    pub fn is_not_created(&self) -> bool {
        matches!(self, RegionError::NotCreated { .. })
    }

    pub fn format_error(&self) -> Option<&FormatError> {
        match self {
            RegionError::Format(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_helpers() {
        let missing = RegionError::NotCreated { x: 1, z: 2 };
        assert!(missing.is_not_created());
        assert!(!missing.is_format_error());

        let corrupt: RegionError = FormatError::ChunkData {
            x: 3,
            z: 4,
            message: "invalid deflate stream".into(),
        }
        .into();
        assert!(corrupt.is_format_error());
        assert!(matches!(corrupt.format_error(), Some(FormatError::ChunkData { x: 3, z: 4, .. })));

        let io: RegionError = io::Error::new(io::ErrorKind::Other, "disk").into();
        assert!(!io.is_format_error());
        assert!(!io.is_not_created());
    }

    #[test]
    fn messages_name_the_coordinate() {
        let err = RegionError::from(FormatError::RegionHeader {
            x: 5,
            z: 7,
            reason: "is in the region header",
        });
        assert_eq!(err.to_string(), "chunk 5,7: is in the region header");
    }
}
