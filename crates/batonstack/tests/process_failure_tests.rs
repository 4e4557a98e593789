//! A forked consumer that dies is reported as a failed run.
//!
//! Lives in its own test binary so that no sibling test thread is running
//! while the supervisor forks.

#![cfg(unix)]

use batonstack::{BatchPolicy, BatonError, Config, ExecutionMode, Role, Supervisor, TracingReporter};
use std::sync::Arc;

/// Producer pushes one item per cycle; every consumer panics on its first
/// turn.
struct FailingConsumers(Role);

impl BatchPolicy for FailingConsumers {
    fn next_batch(&mut self) -> usize {
        match self.0 {
            Role::Producer => 1,
            Role::Consumer => panic!("policy boom"),
        }
    }
}

#[test]
fn test_panicking_consumer_process_fails_the_run() {
    let config = Config::default().with_cycle_limit(1).with_consumer_count(1);

    let err = Supervisor::new(config)
        .with_mode(ExecutionMode::Processes)
        .run(|role, _| FailingConsumers(role), Arc::new(TracingReporter))
        .unwrap_err();

    // The child catches the panic and leaves with _exit(1)
    match err {
        BatonError::ConsumerFailed { index, detail } => {
            assert_eq!(index, 0);
            assert!(detail.contains("exit status"), "detail: {detail}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
