//! Structured logging for the logredact CLI.
//!
//! Logs always go to stderr, either through the `fmt` layer for people or
//! through [`JsonlLayer`] for pipelines. A run span carries `run_id` and
//! `stage` so the JSONL records of one invocation can be correlated.

pub mod config;
pub mod events;
pub mod layer;

pub use config::{verbosity_level, LogConfig, LogFormat};
pub use events::{event_names, Stage};
pub use layer::JsonlLayer;

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the logging subsystem.
///
/// Must be called once at startup; later calls are ignored. The level in
/// `config` already accounts for `RUST_LOG`.
pub fn init_logging(config: &LogConfig) {
    // Event targets are dotted names rather than module paths, so a single
    // global directive is all the filter needs.
    let filter = EnvFilter::default().add_directive(config.level.into());

    match config.format {
        LogFormat::Human => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(std::io::stderr().is_terminal());
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init();
        }
        LogFormat::Jsonl => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(JsonlLayer::stderr())
                .try_init();
        }
    }
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("run-{}", &uuid.simple().to_string()[..12])
}

/// Span enclosing one command; its fields are picked up by [`JsonlLayer`].
pub fn run_span(run_id: &str, stage: Stage) -> tracing::Span {
    tracing::info_span!("run", run_id = %run_id, stage = %stage)
}
