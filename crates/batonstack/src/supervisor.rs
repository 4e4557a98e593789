//! Run orchestration: region setup, consumer spawning, producer, join.

use crate::protocol::{Consumer, ConsumerSummary, Producer, ProducerSummary};
use crate::report::{Reporter, Role};
use crate::{
    BatchPolicy, BatonError, Config, ConfigError, RegionStats, SharedMapping, SharedRegion,
    MAX_STACK_CAPACITY,
};
use std::any::Any;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info};

/// Region type used by supervised runs.
pub type RunRegion = SharedRegion<u64, MAX_STACK_CAPACITY>;

/// How consumer participants are started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One OS thread per consumer.
    #[default]
    Threads,
    /// One forked child process per consumer, sharing the region through a
    /// `MAP_SHARED` mapping.
    #[cfg(unix)]
    Processes,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Producer totals.
    pub producer: ProducerSummary,
    /// Per-consumer totals, in index order. Only available in
    /// [`ExecutionMode::Threads`]; forked consumers report through the
    /// region statistics instead.
    pub consumers: Vec<ConsumerSummary>,
    /// Region counters after every participant has finished.
    pub stats: RegionStats,
    /// Items left on the stack.
    pub remaining: usize,
}

impl RunSummary {
    /// Returns true if every pushed item was popped and the stack is empty.
    pub fn is_conserved(&self) -> bool {
        self.remaining == 0 && self.stats.pushed == self.stats.popped
    }
}

/// Creates the shared region, starts the consumers, runs the producer on the
/// calling context and waits for every consumer to terminate.
///
/// # Example
///
/// ```
/// use batonstack::{Config, RandomBatches, Supervisor, TracingReporter};
/// use std::sync::Arc;
///
/// let config = Config::default().with_cycle_limit(16);
/// let summary = Supervisor::new(config)
///     .run(
///         |_, index| RandomBatches::seeded(config.batch_range, index as u64),
///         Arc::new(TracingReporter),
///     )
///     .unwrap();
/// assert!(summary.is_conserved());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Supervisor {
    config: Config,
    mode: ExecutionMode,
}

impl Supervisor {
    /// Creates a supervisor running consumers as threads.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            mode: ExecutionMode::default(),
        }
    }

    /// Selects how consumers are started.
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Executes one complete run.
    ///
    /// `policies` is called once per participant, with `(Role::Consumer, i)`
    /// for every consumer before the producer's `(Role::Producer, 0)`.
    ///
    /// A spawn failure returns immediately; consumers that were already
    /// started are not stopped or joined.
    pub fn run<P, F, R>(&self, mut policies: F, reporter: Arc<R>) -> Result<RunSummary, BatonError>
    where
        P: BatchPolicy + Send + 'static,
        F: FnMut(Role, usize) -> P,
        R: Reporter + 'static,
    {
        self.config.validate()?;

        let region = RunRegion::with_capacity(self.config.stack_capacity).ok_or(
            ConfigError::StackCapacity {
                requested: self.config.stack_capacity,
                max: MAX_STACK_CAPACITY,
            },
        )?;
        let region = Arc::new(SharedMapping::new(region).map_err(BatonError::Map)?);

        info!(
            consumers = self.config.consumer_count,
            cycles = self.config.cycle_limit,
            capacity = self.config.stack_capacity,
            mode = ?self.mode,
            "starting run"
        );

        let (producer, consumers) = match self.mode {
            ExecutionMode::Threads => self.run_threads(&region, &mut policies, &reporter)?,
            #[cfg(unix)]
            ExecutionMode::Processes => {
                let producer = self.run_processes(&region, &mut policies, &reporter)?;
                (producer, Vec::new())
            }
        };

        let summary = RunSummary {
            producer,
            consumers,
            stats: region.stats(),
            remaining: region.occupancy(),
        };
        info!(
            produced = summary.stats.pushed,
            consumed = summary.stats.popped,
            remaining = summary.remaining,
            contended_turns = summary.stats.contended_turns,
            "run complete"
        );
        Ok(summary)
    }

    fn run_threads<P, F, R>(
        &self,
        region: &Arc<SharedMapping<RunRegion>>,
        policies: &mut F,
        reporter: &Arc<R>,
    ) -> Result<(ProducerSummary, Vec<ConsumerSummary>), BatonError>
    where
        P: BatchPolicy + Send + 'static,
        F: FnMut(Role, usize) -> P,
        R: Reporter + 'static,
    {
        let mut handles = Vec::with_capacity(self.config.consumer_count);
        for index in 0..self.config.consumer_count {
            let policy = policies(Role::Consumer, index);
            let region = Arc::clone(region);
            let reporter = Arc::clone(reporter);

            let handle = thread::Builder::new()
                .name(format!("consumer-{index}"))
                .spawn(move || {
                    let region: &RunRegion = &region;
                    Consumer::new(region, index, policy, &*reporter).run()
                })
                .map_err(|source| BatonError::Spawn { index, source })?;
            debug!(index, "spawned consumer thread");
            handles.push(handle);
        }

        let producer = Producer::new(
            &***region,
            self.config.cycle_limit,
            policies(Role::Producer, 0),
            &**reporter,
        )
        .run();

        let mut consumers = Vec::with_capacity(handles.len());
        for (index, handle) in handles.into_iter().enumerate() {
            let summary = handle.join().map_err(|panic| BatonError::ConsumerFailed {
                index,
                detail: panic_message(panic.as_ref()),
            })?;
            consumers.push(summary);
        }
        Ok((producer, consumers))
    }

    #[cfg(unix)]
    fn run_processes<P, F, R>(
        &self,
        region: &Arc<SharedMapping<RunRegion>>,
        policies: &mut F,
        reporter: &Arc<R>,
    ) -> Result<ProducerSummary, BatonError>
    where
        P: BatchPolicy + Send + 'static,
        F: FnMut(Role, usize) -> P,
        R: Reporter + 'static,
    {
        let mut children = Vec::with_capacity(self.config.consumer_count);
        for index in 0..self.config.consumer_count {
            let policy = policies(Role::Consumer, index);

            // SAFETY: the child only runs the consumer loop on the shared
            // mapping and leaves through _exit, skipping the parent's destructors
            match unsafe { libc::fork() } {
                -1 => {
                    return Err(BatonError::Spawn {
                        index,
                        source: std::io::Error::last_os_error(),
                    })
                }
                0 => {
                    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        Consumer::new(&***region, index, policy, &**reporter).run()
                    }));
                    let code = i32::from(outcome.is_err());
                    // SAFETY: terminates the child without unwinding into the parent's frames
                    unsafe { libc::_exit(code) }
                }
                pid => {
                    debug!(index, pid, "forked consumer process");
                    children.push(pid);
                }
            }
        }

        let producer = Producer::new(
            &***region,
            self.config.cycle_limit,
            policies(Role::Producer, 0),
            &**reporter,
        )
        .run();

        for (index, pid) in children.into_iter().enumerate() {
            wait_for_child(index, pid)?;
        }
        Ok(producer)
    }
}

#[cfg(unix)]
fn wait_for_child(index: usize, pid: libc::pid_t) -> Result<(), BatonError> {
    let mut status: libc::c_int = 0;
    loop {
        // SAFETY: pid is a child of this process and status is a valid out-pointer
        let rc = unsafe { libc::waitpid(pid, &mut status, 0) };
        if rc != -1 {
            break;
        }
        let err = std::io::Error::last_os_error();
        if err.kind() != std::io::ErrorKind::Interrupted {
            return Err(BatonError::ConsumerFailed {
                index,
                detail: format!("waitpid failed: {err}"),
            });
        }
    }

    if libc::WIFEXITED(status) && libc::WEXITSTATUS(status) == 0 {
        debug!(index, pid, "consumer process exited");
        Ok(())
    } else {
        Err(BatonError::ConsumerFailed {
            index,
            detail: format!("abnormal exit status {status:#x}"),
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "consumer panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedBatches, TracingReporter};

    #[test]
    fn test_invalid_config_fails_before_start() {
        let err = Supervisor::new(Config::default().with_consumer_count(0))
            .run(|_, _| FixedBatches(1), Arc::new(TracingReporter))
            .unwrap_err();
        assert!(err.is_startup());
        assert!(matches!(err, BatonError::Config(ConfigError::NoConsumers)));
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(3_u8);
        assert_eq!(panic_message(boxed.as_ref()), "consumer panicked");
    }
}
