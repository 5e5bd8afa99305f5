//! Redactor configuration.
//!
//! Everything a run needs besides its input and output: batching, the mask
//! character, phone validation, and which patterns are active. Loaded from
//! JSON, validated before any I/O.

use crate::pattern::{builtin_names, MaskStrategy, PatternRegistry, PatternSpec, Priority};
use crate::phone::{ValidatorKind, DEFAULT_REGIONS};
use crate::{LogFormat, RedactionError, Result, DEFAULT_MASK_CHAR, DEFAULT_SAMPLE_LINES};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Schema version for the config file.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// Default lines per batch.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Default number of batches between output flushes.
pub const DEFAULT_FLUSH_EVERY_BATCHES: usize = 10;

/// Upper bound on detection sample size.
pub const MAX_SAMPLE_LINES: usize = 100;

/// Redactor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactorConfig {
    /// Schema version.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Lines read per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Flush the output every this many batches.
    #[serde(default = "default_flush_every")]
    pub flush_every_batches: usize,

    /// Character used to mask sensitive text.
    #[serde(default = "default_mask_char")]
    pub mask_char: char,

    /// Non-empty lines sampled for format detection.
    #[serde(default = "default_sample_lines")]
    pub detect_sample_lines: usize,

    /// Phone validator selection.
    #[serde(default)]
    pub phone_validator: ValidatorKind,

    /// Regions tried for phone candidates without an international prefix.
    #[serde(default = "default_regions")]
    pub phone_regions: Vec<String>,

    /// Built-in patterns to switch off.
    #[serde(default)]
    pub disabled_patterns: Vec<String>,

    /// Additional site-specific patterns.
    #[serde(default)]
    pub custom_patterns: Vec<CustomPattern>,
}

fn default_schema_version() -> String {
    CONFIG_SCHEMA_VERSION.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_flush_every() -> usize {
    DEFAULT_FLUSH_EVERY_BATCHES
}

fn default_mask_char() -> char {
    DEFAULT_MASK_CHAR
}

fn default_sample_lines() -> usize {
    DEFAULT_SAMPLE_LINES
}

fn default_regions() -> Vec<String> {
    DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect()
}

/// A user-supplied pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPattern {
    /// Unique name, used as the stats key.
    pub name: String,

    /// Regular expression (matched case-insensitively).
    pub pattern: String,

    /// Human description.
    #[serde(default)]
    pub description: String,

    /// Mask the whole match or capture group 1.
    #[serde(default = "default_strategy")]
    pub mask: MaskStrategy,

    /// Priority tier; custom patterns default to running last.
    #[serde(default)]
    pub priority: Priority,

    /// Formats the pattern applies to (empty = all).
    #[serde(default)]
    pub formats: Vec<LogFormat>,
}

fn default_strategy() -> MaskStrategy {
    MaskStrategy::WholeMatch
}

impl CustomPattern {
    fn compile(&self) -> Result<PatternSpec> {
        let description = if self.description.is_empty() {
            format!("Custom pattern {}", self.name)
        } else {
            self.description.clone()
        };
        Ok(
            PatternSpec::new(self.name.clone(), &self.pattern, description, self.mask)?
                .with_priority(self.priority)
                .only_for(&self.formats),
        )
    }
}

impl Default for RedactorConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            batch_size: DEFAULT_BATCH_SIZE,
            flush_every_batches: DEFAULT_FLUSH_EVERY_BATCHES,
            mask_char: DEFAULT_MASK_CHAR,
            detect_sample_lines: DEFAULT_SAMPLE_LINES,
            phone_validator: ValidatorKind::default(),
            phone_regions: default_regions(),
            disabled_patterns: Vec::new(),
            custom_patterns: Vec::new(),
        }
    }
}

impl RedactorConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse config from a JSON string.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: RedactorConfig = serde_json::from_str(content)?;
        Ok(config)
    }

    /// Save config to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_mask_char(mut self, mask_char: char) -> Self {
        self.mask_char = mask_char;
        self
    }

    pub fn with_phone_validator(mut self, kind: ValidatorKind) -> Self {
        self.phone_validator = kind;
        self
    }

    /// Reject settings that would make a run misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.schema_version != CONFIG_SCHEMA_VERSION {
            return Err(RedactionError::invalid(
                "schema_version",
                format!(
                    "expected {}, got {}",
                    CONFIG_SCHEMA_VERSION, self.schema_version
                ),
            ));
        }

        if self.batch_size == 0 {
            return Err(RedactionError::invalid("batch_size", "must be at least 1"));
        }

        if self.flush_every_batches == 0 {
            return Err(RedactionError::invalid(
                "flush_every_batches",
                "must be at least 1",
            ));
        }

        if !(1..=MAX_SAMPLE_LINES).contains(&self.detect_sample_lines) {
            return Err(RedactionError::invalid(
                "detect_sample_lines",
                format!("must be in [1, {}], got {}", MAX_SAMPLE_LINES, self.detect_sample_lines),
            ));
        }

        validate_mask_char(self.mask_char)?;

        #[cfg(not(feature = "numbering-plan"))]
        if self.phone_validator == ValidatorKind::NumberingPlan {
            return Err(RedactionError::invalid(
                "phone_validator",
                "numbering_plan requires the numbering-plan feature",
            ));
        }

        for name in &self.disabled_patterns {
            if !builtin_names().any(|b| b == name) {
                return Err(RedactionError::invalid(
                    "disabled_patterns",
                    format!("unknown pattern {}", name),
                ));
            }
        }

        for (i, custom) in self.custom_patterns.iter().enumerate() {
            if custom.name.trim().is_empty() {
                return Err(RedactionError::invalid(
                    format!("custom_patterns[{}].name", i),
                    "must not be empty",
                ));
            }
            let clashes_builtin = builtin_names().any(|b| b == custom.name);
            let clashes_custom = self.custom_patterns[..i]
                .iter()
                .any(|c| c.name == custom.name);
            if clashes_builtin || clashes_custom {
                return Err(RedactionError::invalid(
                    format!("custom_patterns[{}].name", i),
                    format!("duplicate pattern name {}", custom.name),
                ));
            }
            custom.compile().map_err(|e| {
                RedactionError::invalid(format!("custom_patterns[{}].pattern", i), e.to_string())
            })?;
        }

        Ok(())
    }

    /// Build the pattern registry this config describes.
    pub fn build_registry(&self) -> Result<PatternRegistry> {
        let mut specs: Vec<PatternSpec> = PatternRegistry::builtin()?
            .without(&self.disabled_patterns)
            .iter()
            .cloned()
            .collect();
        for custom in &self.custom_patterns {
            specs.push(custom.compile()?);
        }
        PatternRegistry::from_specs(specs)
    }
}

/// The mask must never recreate a sensitive shape or break quoting.
fn validate_mask_char(c: char) -> Result<()> {
    let reason = if c.is_whitespace() {
        Some("must not be whitespace")
    } else if c.is_control() {
        Some("must not be a control character")
    } else if c.is_ascii_hexdigit() {
        Some("must not be a hex digit")
    } else if matches!(c, '"' | '\'' | '\\') {
        Some("must not be a quote or backslash")
    } else {
        None
    };
    match reason {
        Some(message) => Err(RedactionError::invalid("mask_char", message)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RedactorConfig::default();
        config.validate().unwrap();
        assert_eq!(config.batch_size, 10_000);
        assert_eq!(config.mask_char, 'X');
        assert_eq!(config.phone_regions.len(), DEFAULT_REGIONS.len());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let err = RedactorConfig::default()
            .with_batch_size(0)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            RedactionError::InvalidConfiguration { ref field, .. } if field == "batch_size"
        ));
    }

    #[test]
    fn test_bad_mask_chars_rejected() {
        for c in [' ', '\n', '7', 'a', 'F', '"', '\\'] {
            assert!(
                RedactorConfig::default().with_mask_char(c).validate().is_err(),
                "mask char {:?} should be rejected",
                c
            );
        }
        for c in ['X', '*', '#', 'x', '█'] {
            RedactorConfig::default().with_mask_char(c).validate().unwrap();
        }
    }

    #[test]
    #[cfg(not(feature = "numbering-plan"))]
    fn test_numbering_plan_needs_feature() {
        let err = RedactorConfig::default()
            .with_phone_validator(ValidatorKind::NumberingPlan)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            RedactionError::InvalidConfiguration { ref field, .. } if field == "phone_validator"
        ));
        RedactorConfig::default()
            .with_phone_validator(ValidatorKind::Auto)
            .validate()
            .unwrap();
    }

    #[test]
    #[cfg(feature = "numbering-plan")]
    fn test_numbering_plan_accepted_with_feature() {
        RedactorConfig::default()
            .with_phone_validator(ValidatorKind::NumberingPlan)
            .validate()
            .unwrap();
    }

    #[test]
    fn test_unknown_disabled_pattern_rejected() {
        let mut config = RedactorConfig::default();
        config.disabled_patterns.push("credit_cards".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sample_lines_bounds() {
        let mut config = RedactorConfig::default();
        config.detect_sample_lines = 0;
        assert!(config.validate().is_err());
        config.detect_sample_lines = MAX_SAMPLE_LINES + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_schema_version_mismatch() {
        let mut config = RedactorConfig::default();
        config.schema_version = "0.9.0".to_string();
        assert_eq!(config.validate().unwrap_err().code(), "invalid_configuration");
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = RedactorConfig::from_json(r#"{"batch_size": 500}"#).unwrap();
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.flush_every_batches, DEFAULT_FLUSH_EVERY_BATCHES);
        assert_eq!(config.phone_validator, ValidatorKind::Auto);
        config.validate().unwrap();
    }

    #[test]
    fn test_custom_patterns() {
        let config = RedactorConfig::from_json(
            r#"{
                "custom_patterns": [
                    {"name": "tenant_ids", "pattern": "\"tenant\":\"([a-z0-9]+)\"", "mask": "capture"},
                    {"name": "hosts", "pattern": "db[0-9]+\\.internal", "priority": "high",
                     "formats": ["freeform"]}
                ],
                "disabled_patterns": ["git_commits"]
            }"#,
        )
        .unwrap();
        config.validate().unwrap();

        let registry = config.build_registry().unwrap();
        assert!(registry.get("git_commits").is_none());
        let names: Vec<_> = registry.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names.last().map(String::as_str), Some("tenant_ids"));
        let hosts_at = names.iter().position(|n| n == "hosts").unwrap();
        let bots_at = names.iter().position(|n| n == "bot_ids").unwrap();
        assert!(hosts_at > bots_at);
        assert!(!registry.get("hosts").unwrap().applies_to(LogFormat::Structured));
    }

    #[test]
    fn test_custom_pattern_errors() {
        let mut config = RedactorConfig::default();
        config.custom_patterns.push(CustomPattern {
            name: "uuids".to_string(),
            pattern: "x".to_string(),
            description: String::new(),
            mask: MaskStrategy::WholeMatch,
            priority: Priority::Additional,
            formats: Vec::new(),
        });
        assert!(config.validate().is_err());

        config.custom_patterns[0].name = "broken".to_string();
        config.custom_patterns[0].pattern = "(".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("custom_patterns[0].pattern"));

        config.custom_patterns[0].pattern = "no-group".to_string();
        config.custom_patterns[0].mask = MaskStrategy::CaptureGroup;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = RedactorConfig::default()
            .with_batch_size(2500)
            .with_phone_validator(ValidatorKind::Heuristic);
        config.save(&path).unwrap();

        let loaded = RedactorConfig::load(&path).unwrap();
        assert_eq!(loaded.batch_size, 2500);
        assert_eq!(loaded.phone_validator, ValidatorKind::Heuristic);
    }
}
