/// Codec for the uncompressed bytes of a chunk.
///
/// The region file never looks inside a chunk; it hands decompressed bytes
/// to `deserialize` and stores whatever `serialize` returns.
pub trait ChunkPayload: Sized {
    fn serialize(&self) -> Vec<u8>;
    fn deserialize(payload: &[u8]) -> Result<Self, String>;
}

/// Raw chunk bytes, passed through unchanged.
impl ChunkPayload for Vec<u8> {
    fn serialize(&self) -> Vec<u8> {
        self.clone()
    }

    fn deserialize(payload: &[u8]) -> Result<Self, String> {
        Ok(payload.to_vec())
    }
}
