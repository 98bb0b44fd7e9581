//! Live clock that really sleeps.

use std::time::Duration;

use crate::ports::clock::Clock;

/// Live clock backed by `std::thread::sleep`.
pub struct LiveClock;

impl Clock for LiveClock {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
