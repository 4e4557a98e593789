//! batonstack - Bounded-Stack Producer/Consumer Hand-off
//!
//! One producer and a fixed pool of consumers share a fixed-capacity LIFO
//! stack placed in memory visible to all of them. Access alternates through
//! two counting permits used as a single baton: the producer pushes a batch
//! and hands the baton to one consumer, which pops a batch and hands it back.
//!
//! # Key Features
//!
//! - Process-shareable region: only atomics and inline storage, placed in an
//!   anonymous `MAP_SHARED` mapping so forked consumers see the same stack
//! - RAII turns: acquiring a permit yields a [`Turn`], dropping it releases
//!   the counterpart permit exactly once
//! - Termination handshake that drains the stack and lets every consumer exit
//! - Consumers as threads or forked processes ([`ExecutionMode`])
//!
//! # Example
//!
//! ```
//! use batonstack::{FixedBatches, Producer, Consumer, SharedRegion, TracingReporter};
//!
//! let region = SharedRegion::<u64, 16>::new();
//!
//! // One producer cycle pushing three items, then the termination signal
//! let produced = Producer::new(&region, 1, FixedBatches(3), TracingReporter).run();
//! assert_eq!(produced.produced, 3);
//!
//! // A single consumer drains the stack and terminates
//! let consumed = Consumer::new(&region, 0, FixedBatches(9), TracingReporter).run();
//! assert_eq!(consumed.consumed, 3);
//! assert!(region.is_drained());
//! ```

mod backoff;
mod config;
mod error;
mod invariants;
mod mapping;
mod permit;
mod policy;
mod protocol;
mod region;
mod report;
mod stack;
mod supervisor;

pub use backoff::Backoff;
pub use config::{BatchRange, Config, MAX_STACK_CAPACITY, REFERENCE_CONFIG};
pub use error::{BatonError, ConfigError};
pub use mapping::SharedMapping;
pub use permit::Permit;
pub use policy::{BatchPolicy, FixedBatches, RandomBatches, ScriptedBatches};
pub use protocol::{Consumer, ConsumerState, ConsumerSummary, Producer, ProducerSummary};
pub use region::{RegionStats, SharedRegion, Turn};
pub use report::{Event, Participant, Reporter, Role, TracingReporter};
pub use stack::BoundedStack;
pub use supervisor::{ExecutionMode, RunRegion, RunSummary, Supervisor};
