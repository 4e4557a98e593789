//! Reference run: one producer, two consumers, 512 cycles over a 256-slot stack.
//!
//! Run with: `cargo run -p batonstack --bin prod_cons`
//! Per-item lines: `RUST_LOG=debug cargo run -p batonstack --bin prod_cons`

use batonstack::{Config, ExecutionMode, RandomBatches, Supervisor, TracingReporter};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = Config::default();

    #[cfg(unix)]
    let mode = ExecutionMode::Processes;
    #[cfg(not(unix))]
    let mode = ExecutionMode::Threads;

    let result = Supervisor::new(config).with_mode(mode).run(
        |_, _| RandomBatches::from_entropy(config.batch_range),
        Arc::new(TracingReporter),
    );

    match result {
        Ok(summary) => {
            info!(
                produced = summary.stats.pushed,
                consumed = summary.stats.popped,
                conserved = summary.is_conserved(),
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, source = ?std::error::Error::source(&err), "run aborted");
            ExitCode::FAILURE
        }
    }
}
