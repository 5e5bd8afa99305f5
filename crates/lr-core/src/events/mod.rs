//! Progress event emission.
//!
//! The streaming processor reports progress through
//! [`lr_redact::ProgressObserver`]. [`EmitterObserver`] turns those callbacks
//! into [`ProgressEvent`]s and hands them to a [`ProgressEmitter`], which
//! either writes JSONL or logs through tracing.

use chrono::{DateTime, Utc};
use lr_redact::{BatchProgress, LogFormat, ProgressObserver, RunSummary};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::logging::event_names as log_names;

/// Standard progress event names.
pub mod event_names {
    pub const RUN_STARTED: &str = "run_started";
    pub const FORMAT_DETECTED: &str = "format_detected";
    pub const BATCH_PROCESSED: &str = "batch_processed";
    pub const RUN_FINISHED: &str = "run_finished";
    pub const RUN_INTERRUPTED: &str = "run_interrupted";
}

/// Phase of the run an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Detect,
    Redact,
    Report,
}

/// Progress counters for a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Structured progress event for pipeline consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub event: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, Value>,
}

impl ProgressEvent {
    pub fn new(event: impl Into<String>, phase: Phase) -> Self {
        Self {
            event: event.into(),
            timestamp: Utc::now(),
            run_id: None,
            phase,
            progress: None,
            elapsed_ms: None,
            details: HashMap::new(),
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_progress(mut self, current: u64, total: Option<u64>) -> Self {
        self.progress = Some(Progress { current, total });
        self
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = Some(elapsed_ms);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.insert(key.into(), v);
        }
        self
    }

    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error":"serialization_failed","event":"{}"}}"#,
                self.event
            )
        })
    }

    /// Event emitted once the run has finished or been interrupted.
    pub fn from_summary(summary: &RunSummary) -> Self {
        let name = if summary.interrupted {
            event_names::RUN_INTERRUPTED
        } else {
            event_names::RUN_FINISHED
        };
        ProgressEvent::new(name, Phase::Report)
            .with_progress(summary.lines_processed, Some(summary.lines_processed))
            .with_elapsed_ms(seconds_to_ms(summary.elapsed_seconds))
            .with_detail("batches", summary.batches)
            .with_detail("total_redactions", summary.total_redactions())
            .with_detail("bytes_written", summary.bytes_written)
    }
}

fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds * 1000.0).max(0.0).round() as u64
}

/// Trait for emitting progress events.
pub trait ProgressEmitter: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// JSONL writer for progress events.
pub struct JsonlWriter<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonlWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> ProgressEmitter for JsonlWriter<W> {
    fn emit(&self, event: ProgressEvent) {
        let line = event.to_jsonl();
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            let _ = writer.flush();
        }
    }
}

/// Emits progress as log records.
///
/// Batch progress is logged at info. The engine already logs format and
/// completion at info itself, so those events drop to debug here.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEmitter;

impl ProgressEmitter for TracingEmitter {
    fn emit(&self, event: ProgressEvent) {
        let current = event.progress.map(|p| p.current).unwrap_or(0);
        let details = serde_json::to_string(&event.details).unwrap_or_default();
        match event.phase {
            Phase::Detect => tracing::debug!(
                target: log_names::FORMAT_DETECTED,
                details = %details,
                "{}",
                event.event
            ),
            Phase::Redact => tracing::info!(
                target: log_names::BATCH_PROCESSED,
                lines_processed = current,
                elapsed_ms = event.elapsed_ms.unwrap_or(0),
                details = %details,
                "{}",
                event.event
            ),
            Phase::Report => tracing::debug!(
                target: log_names::RUN_FINISHED,
                lines_processed = current,
                details = %details,
                "{}",
                event.event
            ),
        }
    }
}

/// Adapts streaming callbacks into progress events.
pub struct EmitterObserver {
    run_id: String,
    emitter: Arc<dyn ProgressEmitter>,
}

impl EmitterObserver {
    pub fn new(run_id: impl Into<String>, emitter: Arc<dyn ProgressEmitter>) -> Self {
        Self {
            run_id: run_id.into(),
            emitter,
        }
    }

    /// Forward an event, stamping it with this run's ID.
    pub fn emit(&self, mut event: ProgressEvent) {
        if event.run_id.is_none() {
            event.run_id = Some(self.run_id.clone());
        }
        self.emitter.emit(event);
    }
}

impl ProgressObserver for EmitterObserver {
    fn on_format_detected(&mut self, format: LogFormat, forced: bool) {
        self.emit(
            ProgressEvent::new(event_names::FORMAT_DETECTED, Phase::Detect)
                .with_detail("format", format)
                .with_detail("forced", forced),
        );
    }

    fn on_batch(&mut self, progress: &BatchProgress) {
        self.emit(
            ProgressEvent::new(event_names::BATCH_PROCESSED, Phase::Redact)
                .with_progress(progress.lines_processed, None)
                .with_elapsed_ms(seconds_to_ms(progress.elapsed_seconds))
                .with_detail("batch", progress.batch_index)
                .with_detail("batch_lines", progress.batch_lines)
                .with_detail("bytes_processed", progress.bytes_processed)
                .with_detail("lines_per_second", progress.lines_per_second.round()),
        );
    }
}
