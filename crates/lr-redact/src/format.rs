//! Log format detection.
//!
//! A stream is either newline-delimited JSON records (the structured
//! format written by recent server versions and hosted clusters) or
//! free-text log lines. Detection samples the first few non-empty lines
//! and never fails: absence of evidence means freeform.

use crate::RedactionError;
use serde::{Deserialize, Serialize};

/// Number of non-empty lines sampled by default.
pub const DEFAULT_SAMPLE_LINES: usize = 5;

/// Shape of a log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    Structured,
    /// Human-oriented text lines.
    Freeform,
}

impl LogFormat {
    /// All formats, in display order.
    pub const ALL: [LogFormat; 2] = [LogFormat::Structured, LogFormat::Freeform];
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "structured" | "json" | "jsonl" | "atlas" => Ok(LogFormat::Structured),
            "freeform" | "text" | "onprem" | "legacy" => Ok(LogFormat::Freeform),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Structured => write!(f, "structured"),
            LogFormat::Freeform => write!(f, "freeform"),
        }
    }
}

/// Classifies a stream from a peek at its leading lines.
#[derive(Debug, Clone, Copy)]
pub struct FormatDetector {
    sample_lines: usize,
}

impl FormatDetector {
    /// Create a detector sampling up to `sample_lines` non-empty lines.
    pub fn new(sample_lines: usize) -> Self {
        Self {
            sample_lines: sample_lines.max(1),
        }
    }

    /// Maximum number of non-empty lines inspected.
    pub fn sample_lines(&self) -> usize {
        self.sample_lines
    }

    /// Classify the stream from its leading lines.
    ///
    /// The first sampled line that parses as a JSON object classifies the
    /// whole stream as structured. Blank lines are skipped and do not count
    /// toward the sample.
    pub fn detect<'a, I>(&self, lines: I) -> LogFormat
    where
        I: IntoIterator<Item = &'a str>,
    {
        for line in lines
            .into_iter()
            .filter(|l| !l.trim().is_empty())
            .take(self.sample_lines)
        {
            match parse_record(line) {
                Ok(()) => return LogFormat::Structured,
                Err(err) => {
                    tracing::trace!(target: "format.sample_rejected", error = %err);
                }
            }
        }
        LogFormat::Freeform
    }
}

impl Default for FormatDetector {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_LINES)
    }
}

/// Check that a line is a self-contained structured record.
fn parse_record(line: &str) -> crate::Result<()> {
    let value: serde_json::Value = serde_json::from_str(line.trim())
        .map_err(|e| RedactionError::MalformedUnit(e.to_string()))?;
    if value.is_object() {
        Ok(())
    } else {
        Err(RedactionError::MalformedUnit(
            "record is not a JSON object".to_string(),
        ))
    }
}

/// Classify with the default sample size.
pub fn detect<'a, I>(lines: I) -> LogFormat
where
    I: IntoIterator<Item = &'a str>,
{
    FormatDetector::default().detect(lines)
}
