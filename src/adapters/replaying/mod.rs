//! Replaying adapters that answer from recorded cassettes.

pub mod directory;

pub use directory::ReplayingDirectory;
