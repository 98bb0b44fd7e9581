//! Cassettes: recorded directory conversations for offline replay.
//!
//! A live run with `AMSYNC_RECORD=<file>` captures every directory call and
//! its result; `--replay <file>` later serves the same answers without a
//! server, which is how directory-side bugs get reproduced.

pub mod format;
pub mod recorder;
pub mod replayer;
pub mod session;
