//! Live adapters for real external interactions.

pub mod clock;
pub mod directory;
pub mod filesystem;
