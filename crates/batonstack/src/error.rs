//! Error types for supervised runs.

use std::io;
use thiserror::Error;

/// Rejected configuration settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A run needs at least one consumer.
    #[error("at least one consumer is required")]
    NoConsumers,

    /// Stack capacity outside `1..=max`.
    #[error("stack capacity {requested} is outside 1..={max}")]
    StackCapacity {
        /// The requested capacity.
        requested: usize,
        /// The largest supported capacity.
        max: usize,
    },

    /// Batch range with `min > max`.
    #[error("batch range {min}..={max} is empty")]
    BatchRange {
        /// Lower bound.
        min: usize,
        /// Upper bound.
        max: usize,
    },
}

/// Errors that abort a supervised run.
#[derive(Debug, Error)]
pub enum BatonError {
    /// The configuration was rejected before anything was started.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The shared region could not be mapped.
    #[error("failed to map shared region")]
    Map(#[source] io::Error),

    /// A consumer participant could not be created. Already spawned
    /// consumers are left as they are.
    #[error("failed to spawn consumer {index}")]
    Spawn {
        /// Index of the consumer that failed to start.
        index: usize,
        #[source]
        source: io::Error,
    },

    /// A consumer did not reach its terminal state cleanly.
    #[error("consumer {index} failed: {detail}")]
    ConsumerFailed {
        /// Index of the failed consumer.
        index: usize,
        /// What went wrong (panic message or exit status).
        detail: String,
    },
}

impl BatonError {
    /// Returns `true` if the run failed before any participant was started.
    #[inline]
    pub fn is_startup(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Map(_))
    }
}
