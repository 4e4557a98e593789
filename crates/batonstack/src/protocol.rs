//! Producer and consumer loops of the baton hand-off.
//!
//! Both roles receive the region as an explicit handle and only ever touch
//! the stack inside a [`Turn`](crate::Turn). Items are the producer's running
//! production count, starting at 1.

use crate::report::{Event, Participant, Reporter};
use crate::{BatchPolicy, SharedRegion};

/// What a producer did over its whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerSummary {
    /// Cycles executed.
    pub cycles: usize,
    /// Items pushed.
    pub produced: u64,
    /// Batches cut short by a full stack.
    pub full_stops: usize,
}

/// What one consumer did before reaching its terminal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerSummary {
    /// Consumer index.
    pub index: usize,
    /// Turns taken on the consume permit.
    pub turns: usize,
    /// Items popped.
    pub consumed: u64,
    /// Batches cut short by an empty stack.
    pub empty_stops: usize,
    /// Times the consume permit was passed on while draining.
    pub drain_passes: usize,
}

/// Consumer lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// Termination not yet observed; every pass blocks on the consume permit.
    Waiting,
    /// Termination observed, stack not yet empty.
    Draining,
    /// Termination observed with an empty stack. No further stack access.
    Terminal,
}

/// The producing side: pushes batches for a fixed number of cycles.
pub struct Producer<'a, const N: usize, P, R> {
    region: &'a SharedRegion<u64, N>,
    cycle_limit: usize,
    policy: P,
    reporter: R,
    identity: Participant,
}

impl<'a, const N: usize, P, R> Producer<'a, N, P, R>
where
    P: BatchPolicy,
    R: Reporter,
{
    /// Creates a producer bound to `region`.
    pub fn new(
        region: &'a SharedRegion<u64, N>,
        cycle_limit: usize,
        policy: P,
        reporter: R,
    ) -> Self {
        Self {
            region,
            cycle_limit,
            policy,
            reporter,
            identity: Participant::producer(),
        }
    }

    /// Runs every cycle, raising the termination flag on the last one.
    ///
    /// With a cycle limit of zero the producer still takes one turn, pushes
    /// nothing and raises the flag, so that consumers can terminate.
    pub fn run(mut self) -> ProducerSummary {
        let mut summary = ProducerSummary::default();

        if self.cycle_limit == 0 {
            let turn = self.region.produce_turn();
            turn.signal_termination();
            self.emit(Event::TerminationSignalled { cycle: 0 });
            drop(turn);
        }

        for cycle in 1..=self.cycle_limit {
            let mut turn = self.region.produce_turn();

            let size = self.policy.next_batch();
            self.emit(Event::ProduceBatch { cycle, size });

            for pushed in 0..size {
                if turn.is_full() {
                    summary.full_stops += 1;
                    self.emit(Event::StackFull { cycle, pushed });
                    break;
                }
                summary.produced += 1;
                let item = summary.produced;
                turn.push(item);
                self.emit(Event::Produced {
                    cycle,
                    item,
                    produced: summary.produced,
                });
            }

            // Flag must be visible before the consume permit is released
            if cycle == self.cycle_limit {
                turn.signal_termination();
                self.emit(Event::TerminationSignalled { cycle });
            }

            summary.cycles = cycle;
            drop(turn);
        }

        self.emit(Event::ProducerDone {
            cycles: summary.cycles,
            produced: summary.produced,
        });
        summary
    }

    fn emit(&self, event: Event) {
        self.reporter.report(&self.identity, event);
    }
}

/// The consuming side: pops batches until it observes termination with an
/// empty stack.
///
/// # Draining
///
/// Once the termination flag is up, every pass through the loop first adds
/// one unit to the consume permit (so a sibling blocked on it can proceed)
/// and only then re-checks emptiness. A draining consumer's next acquire
/// therefore never blocks: it spins through pass, check, turn until the
/// stack is empty. Whoever is blocked on the permit when the flag flips
/// competes with the spinning consumers for the final batches, so the drain
/// order depends on scheduling.
pub struct Consumer<'a, const N: usize, P, R> {
    region: &'a SharedRegion<u64, N>,
    policy: P,
    reporter: R,
    identity: Participant,
    state: ConsumerState,
    summary: ConsumerSummary,
}

impl<'a, const N: usize, P, R> Consumer<'a, N, P, R>
where
    P: BatchPolicy,
    R: Reporter,
{
    /// Creates consumer `index` bound to `region`.
    ///
    /// The reported pid is taken here, so construct the consumer inside the
    /// context (thread or child process) that will run it.
    pub fn new(
        region: &'a SharedRegion<u64, N>,
        index: usize,
        policy: P,
        reporter: R,
    ) -> Self {
        Self {
            region,
            policy,
            reporter,
            identity: Participant::consumer(index),
            state: ConsumerState::Waiting,
            summary: ConsumerSummary {
                index,
                ..ConsumerSummary::default()
            },
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConsumerState {
        self.state
    }

    /// Loops until the terminal state is reached.
    pub fn run(mut self) -> ConsumerSummary {
        while self.step() != ConsumerState::Terminal {}
        self.emit(Event::ConsumerDone {
            consumed: self.summary.consumed,
        });
        self.summary
    }

    /// One pass of the consumer loop.
    ///
    /// Blocks on the consume permit unless the pass ends in the terminal
    /// state. Calling `step` after reaching [`ConsumerState::Terminal`] is a
    /// no-op.
    pub fn step(&mut self) -> ConsumerState {
        if self.state == ConsumerState::Terminal {
            return self.state;
        }

        if self.region.is_terminating() {
            if self.state == ConsumerState::Waiting {
                self.state = ConsumerState::Draining;
                self.emit(Event::Draining);
            }
            self.region.pass_consume_permit();
            self.summary.drain_passes += 1;
            if self.region.is_drained() {
                self.state = ConsumerState::Terminal;
                return self.state;
            }
        }

        let mut turn = self.region.consume_turn();
        self.summary.turns += 1;

        let size = self.policy.next_batch();
        self.emit(Event::ConsumeBatch { size });

        for popped in 0..size {
            if turn.is_empty() {
                self.summary.empty_stops += 1;
                self.emit(Event::StackEmptied { popped });
                break;
            }
            let item = turn.pop();
            self.summary.consumed += 1;
            self.emit(Event::Consumed {
                item,
                consumed: self.summary.consumed,
            });
        }

        drop(turn);
        self.state
    }

    fn emit(&self, event: Event) {
        self.reporter.report(&self.identity, event);
    }
}
