//! In-process adapters for running the engine without external systems.

pub mod clock;
pub mod directory;
pub mod filesystem;

pub use clock::CountingClock;
pub use directory::{MemoryDirectory, Mutation};
pub use filesystem::MemoryFileSystem;
