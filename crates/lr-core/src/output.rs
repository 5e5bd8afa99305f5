//! Summary rendering.
//!
//! Turns a [`RunSummary`] into either the human report or a JSON document.
//! Neither form ever contains redacted content, only counts and labels.

use lr_redact::{PatternRegistry, RunSummary};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

const RULE_WIDTH: usize = 60;

/// How the end-of-run summary is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SummaryFormat {
    #[default]
    Human,
    Json,
}

/// Human-readable report.
pub fn render_human(summary: &RunSummary) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "REDACTION SUMMARY");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Input File: {}", summary.input);
    let _ = writeln!(out, "Output File: {}", summary.output);
    let _ = writeln!(
        out,
        "Log Format: {}{}",
        summary.format.to_string().to_uppercase(),
        if summary.format_forced { " (forced)" } else { "" }
    );
    let _ = writeln!(
        out,
        "Lines: {}  Bytes: {}  Elapsed: {:.2}s  Throughput: {:.0} lines/s",
        summary.lines_processed,
        human_bytes(summary.bytes_processed),
        summary.elapsed_seconds,
        summary.lines_per_second()
    );
    if summary.lossy_lines > 0 {
        let _ = writeln!(
            out,
            "Warning: {} line(s) were not valid UTF-8 and were decoded lossily",
            summary.lossy_lines
        );
    }
    if summary.interrupted {
        let _ = writeln!(out, "Interrupted: output is complete up to the last batch");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Redaction Statistics:");
    if summary.redactions.is_empty() {
        let _ = writeln!(out, "  No sensitive data found to redact.");
    } else {
        for (name, tally) in &summary.redactions {
            let _ = writeln!(
                out,
                "  {}: {} items - {}",
                name, tally.count, tally.description
            );
        }
        let _ = writeln!(out, "  total: {}", summary.total_redactions());
    }
    out
}

/// JSON document with the full summary.
pub fn render_json(summary: &RunSummary) -> serde_json::Result<String> {
    serde_json::to_string_pretty(summary)
}

/// Tabular listing of the active registry, in application order.
pub fn render_patterns(registry: &PatternRegistry) -> String {
    let width = registry
        .iter()
        .map(|spec| spec.name().len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for spec in registry.iter() {
        let formats = if spec.formats().is_empty() {
            "all".to_string()
        } else {
            let names: Vec<String> = spec.formats().iter().map(|f| f.to_string()).collect();
            names.join(",")
        };
        let _ = writeln!(
            out,
            "{:width$}  {:<10}  {:<21}  {}",
            spec.name(),
            spec.priority().to_string(),
            formats,
            spec.description(),
            width = width
        );
    }
    out
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
