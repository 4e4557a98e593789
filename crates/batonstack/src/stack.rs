//! Fixed-capacity LIFO storage with inline slots.
//!
//! [`BoundedStack<T, N>`] embeds its buffer directly in the struct (no heap
//! allocation), so a stack placed inside a shared mapping is itself shared:
//! the slots live at the same address in every participant.
//!
//! The stack has no interior synchronization. Callers are expected to hold
//! exclusive access (see [`Turn`](crate::Turn)) and to check
//! [`is_full`](BoundedStack::is_full) / [`is_empty`](BoundedStack::is_empty)
//! before pushing or popping.

use crate::invariants::debug_assert_bounded_len;
use std::fmt;
use std::mem::MaybeUninit;

/// A fixed-capacity LIFO stack with compile-time storage size `N`.
///
/// The runtime capacity may be lowered below `N` with
/// [`with_capacity`](Self::with_capacity); the storage footprint stays `N`
/// slots, which keeps the layout identical for every run.
///
/// # Memory Layout
///
/// ```text
/// ┌──────────────────────────────────────────────┐
/// │ len: usize         ← occupied slots          │
/// │ capacity: usize    ← 1..=N                   │
/// ├──────────────────────────────────────────────┤
/// │ items: [MaybeUninit<T>; N]                   │
/// │   items[0..len) initialized, top = len - 1   │
/// └──────────────────────────────────────────────┘
/// ```
#[repr(C)]
pub struct BoundedStack<T, const N: usize> {
    len: usize,
    capacity: usize,
    items: [MaybeUninit<T>; N],
}

impl<T: Copy, const N: usize> BoundedStack<T, N> {
    /// Evaluated once per `N` when a stack of that size is instantiated.
    const NONZERO: () = assert!(N > 0, "BoundedStack capacity must be > 0");

    /// Creates an empty stack using all `N` slots.
    ///
    /// A zero `N` is rejected when the crate using it is compiled:
    ///
    /// ```compile_fail
    /// use batonstack::BoundedStack;
    ///
    /// static EMPTY: BoundedStack<u8, 0> = BoundedStack::new();
    /// ```
    pub const fn new() -> Self {
        let () = Self::NONZERO;

        Self {
            len: 0,
            capacity: N,
            // SAFETY: an array of MaybeUninit<T> does not require initialization
            items: unsafe { MaybeUninit::uninit().assume_init() },
        }
    }

    /// Creates an empty stack limited to `capacity` slots.
    ///
    /// Returns `None` unless `1 ≤ capacity ≤ N`.
    pub const fn with_capacity(capacity: usize) -> Option<Self> {
        if capacity == 0 || capacity > N {
            return None;
        }
        let mut stack = Self::new();
        stack.capacity = capacity;
        Some(stack)
    }

    /// Returns the maximum number of items the stack accepts.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of items currently stored.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no items are stored.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if another push would exceed the capacity.
    #[inline]
    pub const fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    /// Returns the most recently pushed item that has not been popped yet.
    #[inline]
    pub fn peek_top(&self) -> Option<T> {
        let top = self.len.checked_sub(1)?;
        // SAFETY: items[0..len) are initialized
        Some(unsafe { self.items[top].assume_init() })
    }

    /// Pushes an item on top of the stack.
    ///
    /// # Panics
    ///
    /// Panics if the stack is full. Callers must check [`is_full`](Self::is_full) first.
    #[inline]
    pub fn push(&mut self, value: T) {
        assert!(
            !self.is_full(),
            "push on a full stack (capacity {})",
            self.capacity
        );
        self.items[self.len] = MaybeUninit::new(value);
        self.len += 1;

        // INV-CAP-01: Bounded Size
        debug_assert_bounded_len!(self.len, self.capacity);
    }

    /// Removes and returns the top item.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty. Callers must check [`is_empty`](Self::is_empty) first.
    #[inline]
    pub fn pop(&mut self) -> T {
        assert!(!self.is_empty(), "pop on an empty stack");
        self.len -= 1;
        // SAFETY: the slot at the old top was initialized by push()
        unsafe { self.items[self.len].assume_init() }
    }
}

impl<T: Copy, const N: usize> Default for BoundedStack<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + fmt::Debug, const N: usize> fmt::Debug for BoundedStack<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // SAFETY: items[0..len) are initialized
        let items = self.items[..self.len]
            .iter()
            .map(|slot| unsafe { slot.assume_init() });
        f.debug_struct("BoundedStack")
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .field("items", &items.collect::<Vec<_>>())
            .finish()
    }
}
