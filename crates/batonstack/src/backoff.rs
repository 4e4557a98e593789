use std::hint;
use std::thread;
use std::time::Duration;

/// Adaptive backoff for blocking waits on a permit.
///
/// Progressively increases wait time: spin with PAUSE → yield to OS → sleep.
/// Unlike a lock-free retry loop, a permit wait never gives up, so the last
/// stage keeps sleeping for [`Backoff::SLEEP`] until the caller succeeds.
/// Works across processes because it only touches local state.
#[derive(Debug)]
pub struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6; // 2^6 = 64 spins max before yielding
    const YIELD_LIMIT: u32 = 10; // Then sleep

    /// Sleep interval once spinning and yielding are exhausted.
    pub const SLEEP: Duration = Duration::from_micros(50);

    /// Creates a new backoff instance.
    #[inline]
    pub fn new() -> Self {
        Self { step: 0 }
    }

    /// Light spin with PAUSE hints.
    #[inline]
    pub fn spin(&mut self) {
        let spins = 1 << self.step.min(Self::SPIN_LIMIT);
        for _ in 0..spins {
            hint::spin_loop();
        }
        if self.step <= Self::SPIN_LIMIT {
            self.step += 1;
        }
    }

    /// Heavier backoff: spin, then yield, then sleep.
    #[inline]
    pub fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            self.spin();
        } else if self.step <= Self::YIELD_LIMIT {
            thread::yield_now();
            self.step += 1;
        } else {
            thread::sleep(Self::SLEEP);
        }
    }

    /// Check whether the wait has reached the sleeping stage.
    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.step > Self::YIELD_LIMIT
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
