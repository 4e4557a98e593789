use crate::invariants::{
    debug_assert_conserved, debug_assert_exclusive_turn, debug_assert_signalled_once,
};
use crate::{Backoff, BoundedStack, Permit};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

// =============================================================================
// HAND-OFF PROTOCOL
// =============================================================================
//
// The region holds two permits that form a single-token relay:
//
//   produce_permit (initially 1) ── producer turn ──▶ consume_permit (+1)
//   consume_permit (initially 0) ── consumer turn ──▶ produce_permit (+1)
//
// A participant must take its own permit before touching the stack and only
// releases the counterpart's permit after its batch is finished, so while
// the protocol is followed exactly one turn is open at a time.
//
// ## Occupancy
//
// Every push and pop stores the new length into `occupancy` (Release). The
// producer raises `terminating` after its final pushes, so a consumer that
// loads the flag with Acquire also sees the final length and never mistakes
// an unpublished batch for an empty stack.
//
// ## Turn exit order
//
// 1. Fold the turn's push/pop counts into the statistics
// 2. Open the gate (Release)
// 3. Release the counterpart permit
//
// Releasing the permit last means the next participant can never find the
// gate still closed while the protocol is in its strict alternation phase.
//
// ## Termination window
//
// Once `terminating` is set, every consumer pass releases `consume_permit`
// before re-checking emptiness. The permit count inflates and several
// consumers may hold a consume permit at the same time. The gate serializes
// them: it is uncontended before termination (INV-EXCL-01) and only ever
// waited on inside the termination window.
//
// =============================================================================

/// Memory block shared by the producer and every consumer.
///
/// Contains only atomics and inline storage, so a region written into a
/// shared mapping is usable from forked processes as-is.
#[repr(C)]
pub struct SharedRegion<T, const N: usize> {
    produce_permit: CachePadded<Permit>,
    consume_permit: CachePadded<Permit>,
    terminating: CachePadded<AtomicBool>,
    gate: CachePadded<AtomicBool>,
    /// Stack length as of the last push or pop
    occupancy: AtomicUsize,
    capacity: usize,
    stats: StatsCells,
    stack: UnsafeCell<BoundedStack<T, N>>,
}

// Safety: the stack is only reached through a Turn, and a Turn is only
// created after taking a permit and closing the gate.
unsafe impl<T: Send, const N: usize> Send for SharedRegion<T, N> {}
unsafe impl<T: Send, const N: usize> Sync for SharedRegion<T, N> {}

#[repr(C)]
#[derive(Default)]
struct StatsCells {
    pushed: AtomicU64,
    popped: AtomicU64,
    turns: AtomicU64,
    contended_turns: AtomicU64,
    contended_before_termination: AtomicU64,
}

/// Point-in-time copy of the region counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionStats {
    /// Items pushed by the producer across all turns.
    pub pushed: u64,
    /// Items popped by consumers across all turns.
    pub popped: u64,
    /// Turns opened by any participant.
    pub turns: u64,
    /// Turns that found another turn still open.
    pub contended_turns: u64,
    /// Overlapping turns observed before termination was signalled.
    pub contended_before_termination: u64,
}

impl<T: Copy, const N: usize> SharedRegion<T, N> {
    /// Creates a region whose stack uses all `N` slots.
    pub fn new() -> Self {
        Self::from_stack(BoundedStack::new())
    }

    /// Creates a region whose stack is limited to `capacity` slots.
    ///
    /// Returns `None` unless `1 ≤ capacity ≤ N`.
    pub fn with_capacity(capacity: usize) -> Option<Self> {
        BoundedStack::with_capacity(capacity).map(Self::from_stack)
    }

    fn from_stack(stack: BoundedStack<T, N>) -> Self {
        Self {
            produce_permit: CachePadded::new(Permit::new(1)),
            consume_permit: CachePadded::new(Permit::new(0)),
            terminating: CachePadded::new(AtomicBool::new(false)),
            gate: CachePadded::new(AtomicBool::new(false)),
            occupancy: AtomicUsize::new(0),
            capacity: stack.capacity(),
            stats: StatsCells::default(),
            stack: UnsafeCell::new(stack),
        }
    }

    // ---------------------------------------------------------------------
    // STATUS
    // ---------------------------------------------------------------------

    /// Returns the stack capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true once the producer has signalled its final cycle.
    #[inline]
    pub fn is_terminating(&self) -> bool {
        self.terminating.load(Ordering::Acquire)
    }

    /// Stack length as of the last push or pop. Readable without a permit.
    #[inline]
    pub fn occupancy(&self) -> usize {
        self.occupancy.load(Ordering::Acquire)
    }

    /// Returns true if the stack was empty after the last push or pop.
    #[inline]
    pub fn is_drained(&self) -> bool {
        self.occupancy() == 0
    }

    /// Available units on the produce and consume permits, in that order.
    pub fn permits(&self) -> (u32, u32) {
        (
            self.produce_permit.available(),
            self.consume_permit.available(),
        )
    }

    /// Returns a snapshot of the region counters.
    pub fn stats(&self) -> RegionStats {
        RegionStats {
            pushed: self.stats.pushed.load(Ordering::Acquire),
            popped: self.stats.popped.load(Ordering::Acquire),
            turns: self.stats.turns.load(Ordering::Acquire),
            contended_turns: self.stats.contended_turns.load(Ordering::Acquire),
            contended_before_termination: self
                .stats
                .contended_before_termination
                .load(Ordering::Acquire),
        }
    }

    // ---------------------------------------------------------------------
    // PROTOCOL PRIMITIVES
    // ---------------------------------------------------------------------

    /// Blocks on the produce permit and opens a producer turn.
    ///
    /// Dropping the turn releases the consume permit exactly once.
    pub fn produce_turn(&self) -> Turn<'_, T, N> {
        self.produce_permit.acquire();
        self.enter();
        Turn::new(self, &self.consume_permit)
    }

    /// Blocks on the consume permit and opens a consumer turn.
    ///
    /// Dropping the turn releases the produce permit exactly once.
    pub fn consume_turn(&self) -> Turn<'_, T, N> {
        self.consume_permit.acquire();
        self.enter();
        Turn::new(self, &self.produce_permit)
    }

    /// Raises the termination flag. Only the producer calls this, once.
    pub(crate) fn signal_termination(&self) {
        let was_set = self.terminating.swap(true, Ordering::Release);

        // INV-TERM-01: Single Termination Signal
        debug_assert_signalled_once!(was_set);
    }

    /// Adds one unit to the consume permit outside of any turn.
    ///
    /// Used by draining consumers to pass the baton to a blocked sibling.
    pub(crate) fn pass_consume_permit(&self) {
        self.consume_permit.release();
    }

    fn enter(&self) {
        self.stats.turns.fetch_add(1, Ordering::Relaxed);
        if self.try_close_gate() {
            return;
        }

        let terminating = self.is_terminating();

        // INV-EXCL-01: One Active Turn Outside Termination
        debug_assert_exclusive_turn!(true, terminating);

        self.stats.contended_turns.fetch_add(1, Ordering::Relaxed);
        if !terminating {
            self.stats
                .contended_before_termination
                .fetch_add(1, Ordering::Relaxed);
        }

        let mut backoff = Backoff::new();
        while !self.try_close_gate() {
            backoff.snooze();
        }
    }

    #[inline]
    fn try_close_gate(&self) -> bool {
        self.gate
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

impl<T: Copy, const N: usize> Default for SharedRegion<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive access to the shared stack for one batch.
///
/// Read-only stack queries are available through `Deref`; mutation goes
/// through [`push`](Turn::push) and [`pop`](Turn::pop) so the region can
/// account for every item. Dropping the turn hands the baton over.
pub struct Turn<'a, T: Copy, const N: usize> {
    region: &'a SharedRegion<T, N>,
    hand_to: &'a Permit,
    pushed: u64,
    popped: u64,
}

impl<'a, T: Copy, const N: usize> Turn<'a, T, N> {
    fn new(region: &'a SharedRegion<T, N>, hand_to: &'a Permit) -> Self {
        Self {
            region,
            hand_to,
            pushed: 0,
            popped: 0,
        }
    }

    #[inline]
    fn stack_mut(&mut self) -> &mut BoundedStack<T, N> {
        // SAFETY: the gate is closed for the lifetime of this turn, and the
        // &mut borrow of self rules out outstanding Deref borrows
        unsafe { &mut *self.region.stack.get() }
    }

    /// Pushes onto the shared stack. Panics if the stack is full.
    #[inline]
    pub fn push(&mut self, value: T) {
        let stack = self.stack_mut();
        stack.push(value);
        let len = stack.len();
        self.region.occupancy.store(len, Ordering::Release);
        self.pushed += 1;
    }

    /// Pops from the shared stack. Panics if the stack is empty.
    #[inline]
    pub fn pop(&mut self) -> T {
        let stack = self.stack_mut();
        let value = stack.pop();
        let len = stack.len();
        self.region.occupancy.store(len, Ordering::Release);
        self.popped += 1;
        value
    }

    /// Raises the termination flag before this turn hands over.
    pub(crate) fn signal_termination(&self) {
        self.region.signal_termination();
    }
}

impl<T: Copy, const N: usize> Deref for Turn<'_, T, N> {
    type Target = BoundedStack<T, N>;

    fn deref(&self) -> &Self::Target {
        // SAFETY: the gate is closed for the lifetime of this turn
        unsafe { &*self.region.stack.get() }
    }
}

impl<T: Copy, const N: usize> Drop for Turn<'_, T, N> {
    fn drop(&mut self) {
        let stats = &self.region.stats;

        let pushed = stats.pushed.fetch_add(self.pushed, Ordering::AcqRel) + self.pushed;
        let popped = stats.popped.fetch_add(self.popped, Ordering::AcqRel) + self.popped;

        // INV-CONS-01: Conservation
        debug_assert_conserved!(pushed, popped);

        self.region.gate.store(false, Ordering::Release);
        self.hand_to.release();
    }
}
