//! Pattern registry.
//!
//! An ordered table of named recognizers. Each entry carries its own
//! masking strategy, candidate check and format applicability as data, so
//! the engine applies every pattern through the same code path.
//!
//! Order matters: broad structural shapes (IPs, UUIDs) run before the
//! field-specific identifiers that can sit next to or inside them.

use crate::{LogFormat, RedactionError, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// How a match maps to its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskStrategy {
    /// Mask every character of the match.
    #[serde(alias = "whole")]
    WholeMatch,
    /// Mask capture group 1 only; the rest of the match (field names,
    /// quotes, wrappers) is kept verbatim.
    #[serde(alias = "capture")]
    CaptureGroup,
}

/// Extra evidence a candidate needs before it is masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateCheck {
    /// A syntactic match is enough.
    None,
    /// The captured text must be a plausible phone number.
    Phone,
}

/// Priority tier. Tiers are applied in declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    #[default]
    Additional,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Additional => "additional",
        };
        write!(f, "{}", s)
    }
}

/// A compiled, immutable pattern definition.
#[derive(Debug, Clone)]
pub struct PatternSpec {
    name: String,
    regex: Regex,
    description: String,
    strategy: MaskStrategy,
    check: CandidateCheck,
    priority: Priority,
    /// Formats the pattern applies to; empty means every format.
    formats: Vec<LogFormat>,
}

impl PatternSpec {
    /// Compile a pattern. Matching is always case-insensitive.
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        description: impl Into<String>,
        strategy: MaskStrategy,
    ) -> Result<Self> {
        let name = name.into();
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| RedactionError::Pattern {
                name: name.clone(),
                message: e.to_string(),
            })?;

        // captures_len counts the implicit whole-match group
        if strategy == MaskStrategy::CaptureGroup && regex.captures_len() < 2 {
            return Err(RedactionError::Pattern {
                name,
                message: "capture masking needs at least one capture group".to_string(),
            });
        }

        Ok(Self {
            name,
            regex,
            description: description.into(),
            strategy,
            check: CandidateCheck::None,
            priority: Priority::default(),
            formats: Vec::new(),
        })
    }

    pub fn with_check(mut self, check: CandidateCheck) -> Self {
        self.check = check;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Restrict the pattern to the given formats.
    pub fn only_for(mut self, formats: &[LogFormat]) -> Self {
        self.formats = formats.to_vec();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn strategy(&self) -> MaskStrategy {
        self.strategy
    }

    pub fn check(&self) -> CandidateCheck {
        self.check
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Formats this pattern is restricted to (empty = all).
    pub fn formats(&self) -> &[LogFormat] {
        &self.formats
    }

    /// Whether the pattern runs for input of the given format.
    pub fn applies_to(&self, format: LogFormat) -> bool {
        self.formats.is_empty() || self.formats.contains(&format)
    }
}

/// Static description of a built-in pattern.
struct BuiltinPattern {
    name: &'static str,
    pattern: &'static str,
    description: &'static str,
    strategy: MaskStrategy,
    check: CandidateCheck,
    priority: Priority,
    formats: &'static [LogFormat],
}

// Declaration order is application order.
static BUILTIN_PATTERNS: &[BuiltinPattern] = &[
    BuiltinPattern {
        name: "phone_numbers",
        pattern: r#""(\+?[0-9(][0-9 ().\-]{5,18}[0-9)])""#,
        description: "Phone numbers in queries",
        strategy: MaskStrategy::CaptureGroup,
        check: CandidateCheck::Phone,
        priority: Priority::Critical,
        formats: &[],
    },
    BuiltinPattern {
        name: "ip_addresses",
        pattern: r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b",
        description: "IPv4 addresses",
        strategy: MaskStrategy::WholeMatch,
        check: CandidateCheck::None,
        priority: Priority::High,
        formats: &[],
    },
    BuiltinPattern {
        name: "uuids",
        pattern: r"\b[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\b",
        description: "UUID identifiers",
        strategy: MaskStrategy::WholeMatch,
        check: CandidateCheck::None,
        priority: Priority::High,
        formats: &[],
    },
    BuiltinPattern {
        name: "atlas_hostnames",
        pattern: r"atlas-[a-z0-9]+-shard-[0-9]+-[0-9]+\.[a-z0-9]+\.mongodb\.net",
        description: "Atlas cluster hostnames",
        strategy: MaskStrategy::WholeMatch,
        check: CandidateCheck::None,
        priority: Priority::High,
        formats: &[],
    },
    BuiltinPattern {
        name: "git_commits",
        pattern: r"\b[0-9a-f]{40}\b",
        description: "Git commit hashes",
        strategy: MaskStrategy::WholeMatch,
        check: CandidateCheck::None,
        priority: Priority::High,
        formats: &[],
    },
    BuiltinPattern {
        name: "bot_ids",
        pattern: r#""([0-9a-f]{24})""#,
        description: "ObjectIds used as bot/app IDs",
        strategy: MaskStrategy::CaptureGroup,
        check: CandidateCheck::None,
        priority: Priority::High,
        formats: &[],
    },
    BuiltinPattern {
        name: "connection_ids",
        pattern: r#""connectionId":([0-9]+)"#,
        description: "Atlas connection IDs",
        strategy: MaskStrategy::CaptureGroup,
        check: CandidateCheck::None,
        priority: Priority::Medium,
        formats: &[],
    },
    BuiltinPattern {
        name: "operation_ids",
        pattern: r#""opId":([0-9]+)"#,
        description: "Atlas operation IDs",
        strategy: MaskStrategy::CaptureGroup,
        check: CandidateCheck::None,
        priority: Priority::Medium,
        formats: &[],
    },
    BuiltinPattern {
        name: "legacy_conn_ids",
        pattern: r"conn([0-9]+)",
        description: "On-premises connection IDs",
        strategy: MaskStrategy::CaptureGroup,
        check: CandidateCheck::None,
        priority: Priority::Medium,
        formats: &[LogFormat::Freeform],
    },
    BuiltinPattern {
        name: "tls_subjects",
        pattern: r#""peerSubject":"((?:[^"\\]|\\.)*)""#,
        description: "TLS certificate subjects",
        strategy: MaskStrategy::CaptureGroup,
        check: CandidateCheck::None,
        priority: Priority::Medium,
        formats: &[],
    },
    BuiltinPattern {
        name: "cipher_details",
        pattern: r#""cipher":"((?:[^"\\]|\\.)*)""#,
        description: "TLS cipher information",
        strategy: MaskStrategy::CaptureGroup,
        check: CandidateCheck::None,
        priority: Priority::Medium,
        formats: &[],
    },
    BuiltinPattern {
        name: "email_addresses",
        pattern: r"\b[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}\b",
        description: "Email addresses",
        strategy: MaskStrategy::WholeMatch,
        check: CandidateCheck::None,
        priority: Priority::Additional,
        formats: &[],
    },
    BuiltinPattern {
        name: "session_lsid",
        pattern: r#""lsid":\s*\{\s*"id":\s*UUID\("((?:[^"\\]|\\.)+)"\)"#,
        description: "Logical session IDs",
        strategy: MaskStrategy::CaptureGroup,
        check: CandidateCheck::None,
        priority: Priority::Additional,
        formats: &[],
    },
];

/// Names of the built-in patterns, in application order.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTIN_PATTERNS.iter().map(|p| p.name)
}

/// Ordered, immutable collection of compiled patterns.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    patterns: Vec<PatternSpec>,
}

impl PatternRegistry {
    /// Compile the built-in pattern table.
    pub fn builtin() -> Result<Self> {
        let patterns = BUILTIN_PATTERNS
            .iter()
            .map(|b| {
                Ok(PatternSpec::new(b.name, b.pattern, b.description, b.strategy)?
                    .with_check(b.check)
                    .with_priority(b.priority)
                    .only_for(b.formats))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Build a registry from an explicit list.
    ///
    /// Patterns are ordered by priority tier; declaration order is kept
    /// within a tier.
    pub fn from_specs(mut patterns: Vec<PatternSpec>) -> Result<Self> {
        for (i, spec) in patterns.iter().enumerate() {
            if patterns[..i].iter().any(|p| p.name == spec.name) {
                return Err(RedactionError::invalid(
                    "patterns",
                    format!("duplicate pattern name {}", spec.name),
                ));
            }
        }
        patterns.sort_by_key(|p| p.priority);
        Ok(Self { patterns })
    }

    /// Drop the named patterns.
    pub fn without(mut self, names: &[String]) -> Self {
        self.patterns.retain(|p| !names.iter().any(|n| n == &p.name));
        self
    }

    /// All patterns in application order.
    pub fn iter(&self) -> impl Iterator<Item = &PatternSpec> {
        self.patterns.iter()
    }

    /// Patterns that apply to `format`, in application order.
    pub fn for_format(&self, format: LogFormat) -> impl Iterator<Item = &PatternSpec> {
        self.patterns.iter().filter(move |p| p.applies_to(format))
    }

    /// Look up a pattern by name.
    pub fn get(&self, name: &str) -> Option<&PatternSpec> {
        self.patterns.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
