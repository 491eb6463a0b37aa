pub mod iter;
pub mod region_file;
