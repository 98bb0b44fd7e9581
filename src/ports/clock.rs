//! Clock port for the replication settle delay.

use std::time::Duration;

/// Blocks the caller for a while.
///
/// Abstracting the wait lets tests run the engine without sleeping and
/// count how often it settled.
pub trait Clock: Send + Sync {
    /// Blocks for `duration`.
    fn sleep(&self, duration: Duration);
}

impl<T: Clock + ?Sized> Clock for std::sync::Arc<T> {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}
