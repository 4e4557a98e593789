//! Progress reporting.
//!
//! The protocol loops describe what they do through a [`Reporter`]. The
//! default [`TracingReporter`] turns every event into a `tracing` event; tests
//! substitute a recording implementation.

use std::fmt;
use tracing::{debug, info};

/// Which side of the hand-off a participant plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The single producer.
    Producer,
    /// One of the consumers.
    Consumer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Producer => f.write_str("producer"),
            Self::Consumer => f.write_str("consumer"),
        }
    }
}

/// Identity of a participant, used only for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Participant {
    /// Producer or consumer.
    pub role: Role,
    /// Consumer index, `0` for the producer.
    pub index: usize,
    /// OS process id of the context running this participant.
    pub pid: u32,
}

impl Participant {
    /// Identity for the calling context. Call it after any `fork`.
    pub fn current(role: Role, index: usize) -> Self {
        Self {
            role,
            index,
            pid: std::process::id(),
        }
    }

    /// The producer running in this process.
    pub fn producer() -> Self {
        Self::current(Role::Producer, 0)
    }

    /// Consumer `index` running in this process.
    pub fn consumer(index: usize) -> Self {
        Self::current(Role::Consumer, index)
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            Role::Producer => write!(f, "[PID: {}] producer", self.pid),
            Role::Consumer => write!(f, "[PID: {}] consumer#{}", self.pid, self.index),
        }
    }
}

/// Something worth reporting during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The producer is about to push up to `size` items in `cycle`.
    ProduceBatch { cycle: usize, size: usize },
    /// One item pushed; `produced` is the running total.
    Produced { cycle: usize, item: u64, produced: u64 },
    /// The stack filled up after `pushed` items of `cycle`.
    StackFull { cycle: usize, pushed: usize },
    /// The termination flag was raised in `cycle` (`0` for a run without cycles).
    TerminationSignalled { cycle: usize },
    /// The producer left its loop.
    ProducerDone { cycles: usize, produced: u64 },
    /// A consumer is about to pop up to `size` items.
    ConsumeBatch { size: usize },
    /// One item popped; `consumed` is this consumer's running total.
    Consumed { item: u64, consumed: u64 },
    /// The stack ran empty after `popped` items of the current batch.
    StackEmptied { popped: usize },
    /// The consumer observed the termination flag for the first time.
    Draining,
    /// The consumer reached its terminal state.
    ConsumerDone { consumed: u64 },
}

/// Receives protocol events.
pub trait Reporter: Send + Sync {
    /// Called for every event, on the participant's own execution context.
    fn report(&self, who: &Participant, event: Event);
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn report(&self, who: &Participant, event: Event) {
        (**self).report(who, event);
    }
}

/// Forwards events to `tracing`.
///
/// Batch-level events are logged at `INFO`, per-item events at `DEBUG`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, who: &Participant, event: Event) {
        let pid = who.pid;
        let role = who.role;
        let index = who.index;
        match event {
            Event::ProduceBatch { cycle, size } => {
                info!(pid, %role, cycle, size, "{who} producing batch");
            }
            Event::Produced { cycle, item, produced } => {
                debug!(pid, %role, cycle, item, produced, "{who} produced {item}");
            }
            Event::StackFull { cycle, pushed } => {
                info!(
                    pid,
                    %role,
                    cycle,
                    pushed,
                    "{who} stack full, batch {cycle} had {pushed} items"
                );
            }
            Event::TerminationSignalled { cycle } => {
                info!(pid, %role, cycle, "{who} will not produce any more");
            }
            Event::ProducerDone { cycles, produced } => {
                info!(pid, %role, cycles, produced, "{who} finished");
            }
            Event::ConsumeBatch { size } => {
                info!(pid, %role, index, size, "{who} consuming batch");
            }
            Event::Consumed { item, consumed } => {
                debug!(pid, %role, index, item, consumed, "{who} consumed {item}");
            }
            Event::StackEmptied { popped } => {
                info!(pid, %role, index, popped, "{who} stack empty, batch had {popped} items");
            }
            Event::Draining => {
                info!(pid, %role, index, "{who} draining");
            }
            Event::ConsumerDone { consumed } => {
                info!(pid, %role, index, consumed, "{who} finished");
            }
        }
    }
}
