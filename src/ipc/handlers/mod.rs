pub mod core;
pub mod import;
pub mod preview;
pub mod records;
pub mod upload;
