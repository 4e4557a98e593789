//! Debug assertion macros for the baton protocol invariants.
//!
//! Only active in debug builds (`#[cfg(debug_assertions)]`), so there is
//! zero overhead in release builds.
//!
//! Used by `BoundedStack<T, N>`, `SharedRegion<T, N>` and the protocol loops.

// =============================================================================
// INV-CAP-01: Bounded Size
// =============================================================================

/// Assert that the stack length never exceeds its capacity.
///
/// **Invariant**: `0 ≤ len ≤ capacity`
///
/// Used in: `BoundedStack::push()` after incrementing `len`
macro_rules! debug_assert_bounded_len {
    ($len:expr, $capacity:expr) => {
        debug_assert!(
            $len <= $capacity,
            "INV-CAP-01 violated: len {} exceeds capacity {}",
            $len,
            $capacity
        )
    };
}

// =============================================================================
// INV-EXCL-01: One Active Turn Outside Termination
// =============================================================================

/// Assert that the stack gate was free when a turn started before termination.
///
/// **Invariant**: while `terminating == false`, the permits alone guarantee
/// that at most one participant holds a turn.
///
/// Used in: `SharedRegion::enter()` when the gate was contended
macro_rules! debug_assert_exclusive_turn {
    ($contended:expr, $terminating:expr) => {
        debug_assert!(
            !$contended || $terminating,
            "INV-EXCL-01 violated: two turns overlapped before termination was signalled"
        )
    };
}

// =============================================================================
// INV-TERM-01: Single Termination Signal
// =============================================================================

/// Assert that the termination flag is only raised once.
///
/// **Invariant**: `terminating` goes false → true exactly once, never back.
///
/// Used in: `SharedRegion::signal_termination()`
macro_rules! debug_assert_signalled_once {
    ($was_set:expr) => {
        debug_assert!(
            !$was_set,
            "INV-TERM-01 violated: termination signalled more than once"
        )
    };
}

// =============================================================================
// INV-CONS-01: Conservation
// =============================================================================

/// Assert that consumers never pop more than the producer pushed.
///
/// **Invariant**: `popped ≤ pushed` at every turn boundary
///
/// Used in: `Turn::drop()` after publishing counters
macro_rules! debug_assert_conserved {
    ($pushed:expr, $popped:expr) => {
        debug_assert!(
            $popped <= $pushed,
            "INV-CONS-01 violated: popped {} items but only {} were pushed",
            $popped,
            $pushed
        )
    };
}

pub(crate) use debug_assert_bounded_len;
pub(crate) use debug_assert_conserved;
pub(crate) use debug_assert_exclusive_turn;
pub(crate) use debug_assert_signalled_once;
