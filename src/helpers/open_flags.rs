use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u8 {
        /// Create the region file if it does not exist yet
        const CREATE   = 0b0000_0001;

        /// Discard any existing content (implies an empty region)
        const TRUNCATE = 0b0000_0010;
    }
}

impl Default for OpenFlags {
    fn default() -> Self {
        OpenFlags::empty()
    }
}
