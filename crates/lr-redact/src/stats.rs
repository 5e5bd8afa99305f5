//! Per-pattern redaction counters.

use std::collections::BTreeMap;

/// Monotonic redaction counts keyed by pattern name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedactionStats {
    counts: BTreeMap<String, u64>,
}

impl RedactionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` redactions for `pattern`.
    pub fn record(&mut self, pattern: &str, n: u64) {
        if n == 0 {
            return;
        }
        match self.counts.get_mut(pattern) {
            Some(count) => *count += n,
            None => {
                self.counts.insert(pattern.to_string(), n);
            }
        }
    }

    /// Count for `pattern` (zero when never seen).
    pub fn get(&self, pattern: &str) -> u64 {
        self.counts.get(pattern).copied().unwrap_or(0)
    }

    /// Sum over all patterns.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// True when nothing has been redacted.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Non-zero entries ordered by pattern name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
