//! Property-based tests for the stack and the permit hand-off.
//!
//! The stack is checked against a `Vec` model under arbitrary guarded
//! push/pop sequences; the region is checked for conservation when a single
//! thread alternates turns with arbitrary batch sizes.

use batonstack::{BoundedStack, SharedRegion};
use proptest::prelude::*;

const CAP: usize = 16;

#[derive(Debug, Clone)]
enum Op {
    Push(u64),
    Pop,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![any::<u64>().prop_map(Op::Push), Just(Op::Pop)]
}

// =============================================================================
// INV-CAP-01: Bounded Size
// "0 ≤ len ≤ capacity"
// =============================================================================

proptest! {
    /// Guarded operations never push the length past capacity
    #[test]
    fn prop_len_bounded(
        capacity in 1usize..=CAP,
        ops in prop::collection::vec(op(), 0..200),
    ) {
        let mut stack = BoundedStack::<u64, CAP>::with_capacity(capacity).unwrap();

        for op in ops {
            match op {
                Op::Push(v) if !stack.is_full() => stack.push(v),
                Op::Pop if !stack.is_empty() => {
                    stack.pop();
                }
                _ => {}
            }
            prop_assert!(stack.len() <= stack.capacity(),
                "INV-CAP-01 violated: len {} > capacity {}", stack.len(), stack.capacity());
            prop_assert_eq!(stack.is_full(), stack.len() == capacity);
            prop_assert_eq!(stack.is_empty(), stack.len() == 0);
        }
    }
}

// =============================================================================
// LIFO: the top is always the most recently pushed, not yet popped item
// =============================================================================

proptest! {
    /// Stack agrees with a Vec model on every step
    #[test]
    fn prop_matches_vec_model(
        ops in prop::collection::vec(op(), 0..200),
    ) {
        let mut stack = BoundedStack::<u64, CAP>::new();
        let mut model: Vec<u64> = Vec::new();

        for op in ops {
            match op {
                Op::Push(v) => {
                    if !stack.is_full() {
                        stack.push(v);
                        model.push(v);
                    }
                }
                Op::Pop => {
                    if !stack.is_empty() {
                        prop_assert_eq!(Some(stack.pop()), model.pop());
                    }
                }
            }
            prop_assert_eq!(stack.peek_top(), model.last().copied());
            prop_assert_eq!(stack.len(), model.len());
        }
    }

    /// Pushing a sequence then popping everything returns it reversed
    #[test]
    fn prop_pop_order_is_reverse_push_order(
        items in prop::collection::vec(any::<u64>(), 0..=CAP),
    ) {
        let mut stack = BoundedStack::<u64, CAP>::new();
        for &v in &items {
            stack.push(v);
        }
        let mut popped = Vec::with_capacity(items.len());
        while !stack.is_empty() {
            popped.push(stack.pop());
        }
        popped.reverse();
        prop_assert_eq!(popped, items);
    }
}

// =============================================================================
// Conservation across alternating turns
// =============================================================================

proptest! {
    /// Alternating producer/consumer turns keep pushed - popped == occupancy
    #[test]
    fn prop_turns_conserve_items(
        batches in prop::collection::vec((0usize..10, 0usize..10), 1..64),
    ) {
        let region = SharedRegion::<u64, 8>::new();
        let mut next = 0u64;

        for (push, pop) in batches {
            {
                let mut turn = region.produce_turn();
                for _ in 0..push {
                    if turn.is_full() {
                        break;
                    }
                    next += 1;
                    turn.push(next);
                }
            }
            {
                let mut turn = region.consume_turn();
                for _ in 0..pop {
                    if turn.is_empty() {
                        break;
                    }
                    turn.pop();
                }
            }

            let stats = region.stats();
            prop_assert!(stats.popped <= stats.pushed);
            prop_assert_eq!(stats.pushed - stats.popped, region.occupancy() as u64);
            prop_assert!(region.occupancy() <= region.capacity());
            prop_assert_eq!(region.permits(), (1, 0));
            prop_assert_eq!(stats.contended_turns, 0);
        }
    }
}
