//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the sync core and an external
//! system (the flat-file directory, the directory service, the wall clock).
//! Implementations live in `src/adapters/`.

pub mod clock;
pub mod directory;
pub mod filesystem;

pub use clock::Clock;
pub use directory::{Attributes, Directory, DirectoryEntry, DirectoryError, Scope};
pub use filesystem::FileSystem;
