//! Event vocabulary for structured logs.
//!
//! CLI events use a dotted name from [`event_names`] as their tracing
//! target; the engine emits `format.detected`, `batch.processed`,
//! `pattern.skipped` and the run terminators itself.

use serde::Serialize;

/// Where in a run an event happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Argument parsing and config resolution.
    Init,
    Detect,
    Redact,
    /// Final flush and summary.
    Report,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Detect => "detect",
            Stage::Redact => "redact",
            Stage::Report => "report",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub mod event_names {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";
    pub const RUN_INTERRUPTED: &str = "run.interrupted";
    pub const RUN_FAILED: &str = "run.failed";

    pub const FORMAT_DETECTED: &str = "format.detected";
    pub const BATCH_PROCESSED: &str = "batch.processed";

    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const CONFIG_ERROR: &str = "config.error";

    pub const INTERNAL_ERROR: &str = "internal_error";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names_agree() {
        for stage in [Stage::Init, Stage::Detect, Stage::Redact, Stage::Report] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
        }
    }
}
