//! Counting permit usable from any process that maps the same memory.
//!
//! A [`Permit`] is a bare atomic counter: it owns no pointers, file
//! descriptors or OS handles, so placing it in a `MAP_SHARED` page makes it a
//! cross-process permit without any further setup. Short waits go through the
//! adaptive [`Backoff`]; once it reaches its sleeping stage, Linux waiters park
//! on a shared futex over the counter and other targets keep sleeping.

use crate::Backoff;
use std::sync::atomic::{AtomicU32, Ordering};

// =============================================================================
// MEMORY ORDERING
// =============================================================================
//
// release():  fetch_add on `count`. Everything the releasing participant
//             wrote to the shared stack happens-before the matching acquire.
// acquire():  CAS decrement with Acquire. Observes every write made before
//             the release that produced the unit it took.
//
// The permit therefore doubles as the publication barrier for the stack
// slots, which are plain (non-atomic) memory.
//
// Parking uses SeqCst on both sides: a waiter bumps `waiters` then re-reads
// `count`, a releaser bumps `count` then reads `waiters`. At least one of them
// sees the other, and FUTEX_WAIT re-checks `count == 0` in the kernel.
//
// =============================================================================

/// A counting permit acting as a hand-off token.
#[derive(Debug)]
#[repr(C)]
pub struct Permit {
    count: AtomicU32,
    waiters: AtomicU32,
}

impl Permit {
    /// Creates a permit with `initial` available units.
    pub const fn new(initial: u32) -> Self {
        Self {
            count: AtomicU32::new(initial),
            waiters: AtomicU32::new(0),
        }
    }

    /// Takes one unit, blocking until one is available.
    pub fn acquire(&self) {
        let mut backoff = Backoff::new();
        loop {
            if self.try_acquire() {
                return;
            }
            if backoff.is_sleeping() {
                self.park();
            } else {
                backoff.snooze();
            }
        }
    }

    /// Takes one unit if available. Never blocks.
    pub fn try_acquire(&self) -> bool {
        let mut current = self.count.load(Ordering::Relaxed);
        while current > 0 {
            match self.count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
        false
    }

    /// Returns one unit, waking a waiter if any.
    #[inline]
    pub fn release(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
        if self.waiters.load(Ordering::SeqCst) > 0 {
            self.wake_one();
        }
    }

    /// Returns the number of units currently available.
    #[inline]
    pub fn available(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    /// Returns the number of participants parked on the permit.
    #[inline]
    pub fn parked(&self) -> u32 {
        self.waiters.load(Ordering::Acquire)
    }

    /// Sleeps until `count` may have become non-zero.
    fn park(&self) {
        self.waiters.fetch_add(1, Ordering::SeqCst);
        if self.count.load(Ordering::SeqCst) == 0 {
            self.futex_wait();
        }
        self.waiters.fetch_sub(1, Ordering::SeqCst);
    }

    #[cfg(target_os = "linux")]
    fn futex_wait(&self) {
        // SAFETY: `count` is a valid, aligned u32 for the lifetime of self.
        // Not FUTEX_PRIVATE: waiters may live in other processes sharing the
        // mapping. Spurious returns (EAGAIN, EINTR) are handled by the caller.
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.count.as_ptr(),
                libc::FUTEX_WAIT,
                0_u32,
                std::ptr::null::<libc::timespec>(),
            );
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn futex_wait(&self) {
        std::thread::sleep(Backoff::SLEEP);
    }

    #[cfg(target_os = "linux")]
    fn wake_one(&self) {
        // SAFETY: same address as futex_wait; waking never touches the value
        unsafe {
            libc::syscall(libc::SYS_futex, self.count.as_ptr(), libc::FUTEX_WAKE, 1_i32);
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn wake_one(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_try_acquire_counts_down() {
        let permit = Permit::new(2);
        assert!(permit.try_acquire());
        assert!(permit.try_acquire());
        assert!(!permit.try_acquire());
        assert_eq!(permit.available(), 0);

        permit.release();
        assert_eq!(permit.available(), 1);
    }

    #[test]
    fn test_acquire_blocks_until_release() {
        let permit = Arc::new(Permit::new(0));
        let acquired = Arc::new(AtomicBool::new(false));

        let waiter = {
            let permit = Arc::clone(&permit);
            let acquired = Arc::clone(&acquired);
            thread::spawn(move || {
                permit.acquire();
                acquired.store(true, Ordering::Release);
            })
        };

        thread::sleep(std::time::Duration::from_millis(20));
        assert!(!acquired.load(Ordering::Acquire));

        permit.release();
        waiter.join().unwrap();
        assert!(acquired.load(Ordering::Acquire));
        assert_eq!(permit.available(), 0);
    }

    #[test]
    fn test_parked_waiter_is_woken_by_release() {
        let permit = Arc::new(Permit::new(0));

        let waiter = {
            let permit = Arc::clone(&permit);
            thread::spawn(move || permit.acquire())
        };

        // Long enough for the backoff to run out and the waiter to park
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while permit.parked() == 0 && std::time::Instant::now() < deadline {
            thread::sleep(std::time::Duration::from_millis(1));
        }

        permit.release();
        waiter.join().unwrap();
        assert_eq!(permit.available(), 0);
        assert_eq!(permit.parked(), 0);
    }

    #[test]
    fn test_release_without_waiters_only_counts() {
        let permit = Permit::new(0);
        permit.release();
        permit.release();
        assert_eq!(permit.parked(), 0);
        assert_eq!(permit.available(), 2);
    }
}
