//! Loom-based concurrency tests for the baton hand-off.
//!
//! Run with: `cargo test -p batonstack --features loom --test loom_tests --release`
//!
//! Loom exhaustively explores thread interleavings. The stack lives in a
//! `loom::cell::UnsafeCell`, so any two turns touching it concurrently fail
//! the model.

#![cfg(feature = "loom")]

use loom::cell::UnsafeCell;
use loom::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use loom::sync::Arc;
use loom::thread;

/// Simplified region for loom testing.
///
/// Same permits, flag, gate and occupancy mirror as the real region, with a
/// small `Vec` standing in for the inline stack.
struct LoomRegion {
    produce: AtomicUsize,
    consume: AtomicUsize,
    terminating: AtomicBool,
    gate: AtomicBool,
    occupancy: AtomicUsize,
    stack: UnsafeCell<Vec<u64>>,
    capacity: usize,
}

unsafe impl Send for LoomRegion {}
unsafe impl Sync for LoomRegion {}

impl LoomRegion {
    fn new(capacity: usize) -> Self {
        Self {
            produce: AtomicUsize::new(1),
            consume: AtomicUsize::new(0),
            terminating: AtomicBool::new(false),
            gate: AtomicBool::new(false),
            occupancy: AtomicUsize::new(0),
            stack: UnsafeCell::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    fn acquire(permit: &AtomicUsize) {
        loop {
            let current = permit.load(Ordering::Relaxed);
            if current > 0
                && permit
                    .compare_exchange(current, current - 1, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            {
                return;
            }
            thread::yield_now();
        }
    }

    fn enter(&self) {
        while self
            .gate
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            thread::yield_now();
        }
    }

    fn leave(&self, hand_to: &AtomicUsize) {
        self.gate.store(false, Ordering::Release);
        hand_to.fetch_add(1, Ordering::Release);
    }

    /// Producer turn: push up to `n`, optionally raise the flag, hand over.
    fn produce(&self, first: u64, n: usize, last: bool) -> usize {
        Self::acquire(&self.produce);
        self.enter();
        let pushed = self.stack.with_mut(|stack| {
            // SAFETY: gate closed, loom verifies no concurrent access
            let stack = unsafe { &mut *stack };
            let mut pushed = 0;
            while pushed < n && stack.len() < self.capacity {
                stack.push(first + pushed as u64);
                pushed += 1;
                self.occupancy.store(stack.len(), Ordering::Release);
            }
            pushed
        });
        if last {
            self.terminating.store(true, Ordering::Release);
        }
        self.leave(&self.consume);
        pushed
    }

    /// Full consumer loop with the draining pass. Returns items popped.
    fn consume_until_terminal(&self, batch: usize) -> Vec<u64> {
        let mut popped = Vec::new();
        loop {
            if self.terminating.load(Ordering::Acquire) {
                self.consume.fetch_add(1, Ordering::Release);
                if self.occupancy.load(Ordering::Acquire) == 0 {
                    return popped;
                }
            }
            Self::acquire(&self.consume);
            self.enter();
            self.stack.with_mut(|stack| {
                // SAFETY: gate closed, loom verifies no concurrent access
                let stack = unsafe { &mut *stack };
                for _ in 0..batch {
                    match stack.pop() {
                        Some(v) => popped.push(v),
                        None => break,
                    }
                    self.occupancy.store(stack.len(), Ordering::Release);
                }
            });
            self.leave(&self.produce);
        }
    }
}

/// One producer cycle, one consumer: every item is popped in LIFO order.
#[test]
fn loom_single_cycle_single_consumer() {
    loom::model(|| {
        let region = Arc::new(LoomRegion::new(2));
        let consumer_region = Arc::clone(&region);

        let consumer = thread::spawn(move || consumer_region.consume_until_terminal(2));

        let pushed = region.produce(1, 3, true);
        assert_eq!(pushed, 2, "capacity 2 must cut the batch");

        let popped = consumer.join().unwrap();
        assert_eq!(popped, vec![2, 1]);
        assert_eq!(region.occupancy.load(Ordering::SeqCst), 0);
    });
}

/// Two cycles with a one-item consumer batch: the second cycle can only
/// start after the consumer hands the produce permit back.
#[test]
fn loom_two_cycles_alternate() {
    loom::model(|| {
        let region = Arc::new(LoomRegion::new(4));
        let consumer_region = Arc::clone(&region);

        let consumer = thread::spawn(move || consumer_region.consume_until_terminal(1));

        let a = region.produce(1, 1, false);
        let b = region.produce(2, 1, true);

        let popped = consumer.join().unwrap();
        assert_eq!(popped.len(), a + b);
        assert_eq!(popped, vec![1, 2]);
    });
}

/// Zero cycles, two consumers: the termination-only hand-off releases both.
#[test]
fn loom_zero_cycles_two_consumers_terminate() {
    let mut builder = loom::model::Builder::new();
    builder.preemption_bound = Some(2);
    builder.check(|| {
        let region = Arc::new(LoomRegion::new(2));
        let a = Arc::clone(&region);
        let b = Arc::clone(&region);

        let ca = thread::spawn(move || a.consume_until_terminal(1));
        let cb = thread::spawn(move || b.consume_until_terminal(1));

        region.produce(0, 0, true);

        assert!(ca.join().unwrap().is_empty());
        assert!(cb.join().unwrap().is_empty());
    });
}
