//! Batch-size policies.
//!
//! The protocol asks its policy how many items to push or pop at the start
//! of every turn. It never inspects the choice beyond stopping early on a
//! full or empty stack.

use crate::BatchRange;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Chooses the size of the next batch.
pub trait BatchPolicy {
    /// Returns how many items the next turn should try to move.
    fn next_batch(&mut self) -> usize;
}

impl<F> BatchPolicy for F
where
    F: FnMut() -> usize,
{
    fn next_batch(&mut self) -> usize {
        self()
    }
}

/// Uniformly random batch sizes drawn from a [`BatchRange`].
#[derive(Debug, Clone)]
pub struct RandomBatches {
    rng: SmallRng,
    range: BatchRange,
}

impl RandomBatches {
    /// Seeds from OS entropy. Each participant should own its own instance.
    pub fn from_entropy(range: BatchRange) -> Self {
        Self {
            rng: SmallRng::from_entropy(),
            range,
        }
    }

    /// Deterministic sequence for reproducible runs.
    pub fn seeded(range: BatchRange, seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            range,
        }
    }
}

impl BatchPolicy for RandomBatches {
    fn next_batch(&mut self) -> usize {
        self.rng.gen_range(self.range.min..=self.range.max)
    }
}

/// Always the same batch size.
#[derive(Debug, Clone, Copy)]
pub struct FixedBatches(pub usize);

impl BatchPolicy for FixedBatches {
    fn next_batch(&mut self) -> usize {
        self.0
    }
}

/// Plays back a list of sizes, then repeats a fallback size forever.
#[derive(Debug, Clone)]
pub struct ScriptedBatches {
    script: Vec<usize>,
    next: usize,
    then: usize,
}

impl ScriptedBatches {
    /// Creates a policy yielding `script` in order, then `then`.
    pub fn new(script: impl Into<Vec<usize>>, then: usize) -> Self {
        Self {
            script: script.into(),
            next: 0,
            then,
        }
    }
}

impl BatchPolicy for ScriptedBatches {
    fn next_batch(&mut self) -> usize {
        let size = self.script.get(self.next).copied().unwrap_or(self.then);
        self.next += 1;
        size
    }
}
