//! Main redaction engine.
//!
//! The RedactionEngine applies the pattern registry, in priority order, to
//! one unit of input at a time (a JSON record or a text line) and keeps the
//! per-pattern statistics and phone verdict cache for one run.

use crate::mask::{is_masked, mask_span};
use crate::pattern::{CandidateCheck, MaskStrategy, PatternRegistry, PatternSpec};
use crate::phone::{build_validator, CachedPhoneValidator, PhoneValidator};
use crate::{LogFormat, RedactionError, RedactionStats, RedactorConfig, Result};
use regex::Captures;
use std::borrow::Cow;
use std::sync::Arc;

/// The main redaction engine.
///
/// Statistics and the phone cache belong to this instance only; create a
/// new engine per input stream.
#[derive(Debug)]
pub struct RedactionEngine {
    /// Patterns in application order. Shared read-only between engines.
    registry: Arc<PatternRegistry>,

    /// Phone plausibility check with memoized verdicts.
    phone: CachedPhoneValidator,

    /// Redactions applied so far.
    stats: RedactionStats,

    /// Replacement character.
    mask_char: char,
}

impl RedactionEngine {
    /// Create an engine from its parts.
    pub fn new(
        registry: Arc<PatternRegistry>,
        validator: Box<dyn PhoneValidator>,
        mask_char: char,
    ) -> Self {
        Self {
            registry,
            phone: CachedPhoneValidator::new(validator),
            stats: RedactionStats::new(),
            mask_char,
        }
    }

    /// Create an engine from a validated configuration.
    pub fn from_config(config: &RedactorConfig) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(config.build_registry()?);
        Self::with_registry(config, registry)
    }

    /// Create an engine that reuses an already-built registry.
    pub fn with_registry(config: &RedactorConfig, registry: Arc<PatternRegistry>) -> Result<Self> {
        let validator = build_validator(config.phone_validator, &config.phone_regions)
            .ok_or_else(|| {
                RedactionError::invalid(
                    "phone_validator",
                    "numbering_plan requires the numbering-plan feature",
                )
            })?;
        Ok(Self::new(registry, validator, config.mask_char))
    }

    /// Engine with the built-in patterns and default settings.
    pub fn with_defaults() -> Result<Self> {
        Self::from_config(&RedactorConfig::default())
    }

    /// Redact one unit.
    ///
    /// Blank and whitespace-only units pass through untouched.
    pub fn redact_unit(&mut self, unit: &str, format: LogFormat) -> String {
        if unit.trim().is_empty() {
            return unit.to_string();
        }

        let Self {
            registry,
            phone,
            stats,
            mask_char,
        } = self;

        let mut text = Cow::Borrowed(unit);
        for spec in registry.for_format(format) {
            let (next, replaced) = apply_pattern(spec, &text, phone, *mask_char);
            stats.record(spec.name(), replaced);
            if let Cow::Owned(next) = next {
                text = Cow::Owned(next);
            }
        }
        text.into_owned()
    }

    /// Statistics accumulated so far.
    pub fn stats(&self) -> &RedactionStats {
        &self.stats
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    pub fn mask_char(&self) -> char {
        self.mask_char
    }

    /// Phone validator and its cache counters.
    pub fn phone(&self) -> &CachedPhoneValidator {
        &self.phone
    }
}

/// Run one pattern over `text`, returning the new text and the number of
/// spans actually masked.
fn apply_pattern<'t>(
    spec: &PatternSpec,
    text: &'t str,
    phone: &mut CachedPhoneValidator,
    mask_char: char,
) -> (Cow<'t, str>, u64) {
    let mut replaced = 0u64;
    let out = spec.regex().replace_all(text, |caps: &Captures<'_>| {
        let whole = &caps[0];
        let span = match sensitive_span(spec, caps) {
            Some(span) => span,
            None => return whole.to_string(),
        };
        let candidate = &whole[span.clone()];
        if candidate.is_empty() || is_masked(candidate, mask_char) {
            return whole.to_string();
        }
        if spec.check() == CandidateCheck::Phone && !phone.is_plausible(candidate) {
            return whole.to_string();
        }
        replaced += 1;
        mask_span(whole, span, mask_char)
    });
    (out, replaced)
}

/// Byte range of the sensitive text relative to the match.
fn sensitive_span(spec: &PatternSpec, caps: &Captures<'_>) -> Option<std::ops::Range<usize>> {
    let whole = caps.get(0)?;
    match spec.strategy() {
        MaskStrategy::WholeMatch => Some(0..whole.len()),
        MaskStrategy::CaptureGroup => match caps.get(1) {
            Some(group) => Some(group.start() - whole.start()..group.end() - whole.start()),
            None => {
                tracing::warn!(
                    target: "pattern.skipped",
                    pattern = spec.name(),
                    "capture group did not participate in match"
                );
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phone::{HeuristicValidator, ValidatorKind};
    use crate::Priority;

    fn engine() -> RedactionEngine {
        let config = RedactorConfig::default().with_phone_validator(ValidatorKind::Heuristic);
        RedactionEngine::from_config(&config).unwrap()
    }

    #[test]
    fn test_legacy_conn_id() {
        let mut e = engine();
        assert_eq!(e.redact_unit("conn297396", LogFormat::Freeform), "connXXXXXX");
        assert_eq!(e.stats().get("legacy_conn_ids"), 1);
    }

    #[test]
    fn test_legacy_conn_id_ignored_for_structured() {
        let mut e = engine();
        let line = r#"{"ctx":"conn15191","msg":"Connection ended"}"#;
        assert_eq!(e.redact_unit(line, LogFormat::Structured), line);
        assert!(e.stats().is_empty());
    }

    #[test]
    fn test_phone_number() {
        let mut e = engine();
        assert_eq!(
            e.redact_unit(r#""phone_number": "60124471286""#, LogFormat::Freeform),
            r#""phone_number": "XXXXXXXXXXX""#
        );
        assert_eq!(e.stats().get("phone_numbers"), 1);
    }

    #[test]
    fn test_implausible_phone_is_kept_and_not_counted() {
        let mut e = engine();
        let line = r#"{"total": "0000000"}"#;
        assert_eq!(e.redact_unit(line, LogFormat::Structured), line);
        assert_eq!(e.stats().get("phone_numbers"), 0);
    }

    #[test]
    fn test_connection_id() {
        let mut e = engine();
        assert_eq!(
            e.redact_unit(r#"{"connectionId":15191}"#, LogFormat::Structured),
            r#"{"connectionId":XXXXX}"#
        );
        assert_eq!(e.stats().get("connection_ids"), 1);
    }

    #[test]
    fn test_ip_preserves_character_length() {
        let mut e = engine();
        assert_eq!(
            e.redact_unit("end connection 192.168.248.116:45292", LogFormat::Freeform),
            "end connection XXXXXXXXXXXXXXX:45292"
        );
        assert_eq!(e.stats().get("ip_addresses"), 1);
    }

    #[test]
    fn test_clean_line_is_byte_identical() {
        let mut e = engine();
        let line = "2025-07-15T11:49:10.468+0000 I  CONTROL  [main] ***** SERVER RESTARTED *****";
        assert_eq!(e.redact_unit(line, LogFormat::Freeform), line);
        assert!(e.stats().is_empty());
    }

    #[test]
    fn test_blank_units_pass_through() {
        let mut e = engine();
        assert_eq!(e.redact_unit("", LogFormat::Freeform), "");
        assert_eq!(e.redact_unit("   \t", LogFormat::Structured), "   \t");
        assert!(e.stats().is_empty());
    }

    #[test]
    fn test_uuid_then_lsid_counts_once() {
        let mut e = engine();
        let line = r#""lsid": { "id": UUID("18dc6629-9262-4055-b3fa-6c00285da25b") }"#;
        let out = e.redact_unit(line, LogFormat::Freeform);
        assert_eq!(
            out,
            r#""lsid": { "id": UUID("XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX") }"#
        );
        assert_eq!(e.stats().get("uuids"), 1);
        assert_eq!(e.stats().get("session_lsid"), 0);
    }

    #[test]
    fn test_structured_line_stays_json() {
        let mut e = engine();
        let line = r#"{"t":{"$date":"2025-07-16T05:18:53.846+00:00"},"s":"I","c":"NETWORK","id":22944,"ctx":"conn15191","msg":"Connection ended","attr":{"remote":"192.168.248.116:45292","isLoadBalanced":false,"uuid":{"uuid":{"$uuid":"d2b52b4f-2a9d-4033-ab45-b3b4de28de12"}},"connectionId":15191,"connectionCount":84}}"#;
        let out = e.redact_unit(line, LogFormat::Structured);
        assert_eq!(out.len(), line.len());
        assert!(out.contains(r#""remote":"XXXXXXXXXXXXXXX:45292""#));
        assert!(out.contains(r#""$uuid":"XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX""#));
        assert!(out.contains(r#""connectionId":XXXXX,"#));
        assert!(out.contains(r#""ctx":"conn15191""#));
        assert_eq!(e.stats().get("uuids"), 1);
        assert_eq!(e.stats().get("ip_addresses"), 1);
    }

    #[test]
    fn test_tls_fields() {
        let mut e = engine();
        let line = r#"{"attr":{"peerSubject":"CN=client.example.net","cipher":"TLS_AES_256_GCM_SHA384"}}"#;
        let out = e.redact_unit(line, LogFormat::Structured);
        assert!(out.contains(r#""peerSubject":"XXXXXXXXXXXXXXXXXXXXX""#));
        assert!(out.contains(r#""cipher":"XXXXXXXXXXXXXXXXXXXXXX""#));
        assert_eq!(e.stats().get("tls_subjects"), 1);
        assert_eq!(e.stats().get("cipher_details"), 1);
    }

    #[test]
    fn test_empty_capture_is_not_counted() {
        let mut e = engine();
        let line = r#"{"cipher":""}"#;
        assert_eq!(e.redact_unit(line, LogFormat::Structured), line);
        assert_eq!(e.stats().get("cipher_details"), 0);
    }

    #[test]
    fn test_second_pass_is_noop() {
        let mut e = engine();
        let line = r#"conn42 from 10.0.0.1 user ops@example.com phone "+60 12-447 1286" bot "5f1d7a3c9b2e4a6f8c0d1e2f""#;
        let once = e.redact_unit(line, LogFormat::Freeform);
        assert_ne!(once, line);

        let mut again = engine();
        assert_eq!(again.redact_unit(&once, LogFormat::Freeform), once);
        assert!(again.stats().is_empty());
    }

    #[test]
    fn test_custom_mask_char() {
        let config = RedactorConfig::default()
            .with_mask_char('*')
            .with_phone_validator(ValidatorKind::Heuristic);
        let mut e = RedactionEngine::from_config(&config).unwrap();
        assert_eq!(e.redact_unit("conn12", LogFormat::Freeform), "conn**");
    }

    #[test]
    fn test_phone_cache_is_used_across_units() {
        let mut e = engine();
        for _ in 0..3 {
            e.redact_unit(r#"phone: "60124471286""#, LogFormat::Freeform);
        }
        assert_eq!(e.stats().get("phone_numbers"), 3);
        assert_eq!(e.phone().cache().misses(), 1);
        assert_eq!(e.phone().cache().hits(), 2);
    }

    #[test]
    fn test_optional_group_without_participation_is_noop() {
        let spec = PatternSpec::new(
            "maybe",
            r"token(?:=([a-z]+))?",
            "optional group",
            MaskStrategy::CaptureGroup,
        )
        .unwrap()
        .with_priority(Priority::High);
        let registry = Arc::new(PatternRegistry::from_specs(vec![spec]).unwrap());
        let mut e = RedactionEngine::new(registry, Box::new(HeuristicValidator), 'X');
        assert_eq!(
            e.redact_unit("token and token=abc", LogFormat::Freeform),
            "token and token=XXX"
        );
        assert_eq!(e.stats().get("maybe"), 1);
    }
}
