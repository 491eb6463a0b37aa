pub mod allocator;
pub mod chunk_header;
pub mod compression;
pub mod file;
pub mod payload;
pub mod region_header;
pub mod status;
