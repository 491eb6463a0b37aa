pub mod helper;
pub mod open_flags;
pub mod sectors;
