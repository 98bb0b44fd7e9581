//! Clock that never blocks and counts how often it was asked to.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::ports::clock::Clock;

/// Clock whose `sleep` returns immediately.
#[derive(Default)]
pub struct CountingClock {
    sleeps: AtomicUsize,
}

impl CountingClock {
    /// Creates a clock with a zero count.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `sleep` calls so far.
    #[must_use]
    pub fn sleeps(&self) -> usize {
        self.sleeps.load(Ordering::SeqCst)
    }
}

impl Clock for CountingClock {
    fn sleep(&self, _duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
    }
}
