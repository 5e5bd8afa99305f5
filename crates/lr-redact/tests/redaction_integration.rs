//! Integration tests for lr-redact.
//!
//! These tests verify:
//! - Sample identifiers never survive redaction in either log format
//! - Masked spans keep their exact character length
//! - Clean lines pass through byte-identical
//! - A second pass over redacted output changes nothing

use lr_redact::{
    LogFormat, RedactionEngine, RedactorConfig, StreamOptions, StreamProcessor, ValidatorKind,
};
use std::io::Cursor;

const ONPREM_LINES: &[&str] = &[
    r#"2025-07-15T11:49:10.372+0000 I  COMMAND  [conn297396] command customers.profiles command: find { find: "profiles", filter: { phone_number: "60124471286" }, lsid: { id: UUID("18dc6629-9262-4055-b3fa-6c00285da25b") }, $db: "customers" } planSummary: IXSCAN { phone_number: 1 } 2ms"#,
    "2025-07-15T11:49:10.468+0000 I  NETWORK  [conn297484] end connection 10.201.32.211:38282 (138 connections now open)",
    r#"2025-07-15T11:49:11.001+0000 I  ACCESS   [conn297485] Successfully authenticated as principal ops.team@example.com on admin from client 10.201.32.212:41012"#,
    r#"2025-07-15T11:49:11.203+0000 I  COMMAND  [conn297486] command bots.sessions command: update { update: "sessions", updates: [ { q: { botId: "5f1d7a3c9b2e4a6f8c0d1e2f" } } ] }"#,
];

const ATLAS_LINES: &[&str] = &[
    r#"{"t":{"$date":"2025-07-16T05:18:53.846+00:00"},"s":"I","c":"NETWORK","id":22944,"ctx":"conn15191","msg":"Connection ended","attr":{"remote":"192.168.248.116:45292","isLoadBalanced":false,"uuid":{"uuid":{"$uuid":"d2b52b4f-2a9d-4033-ab45-b3b4de28de12"}},"connectionId":15191,"connectionCount":84}}"#,
    r#"{"t":{"$date":"2025-07-16T05:18:54.001+00:00"},"s":"I","c":"NETWORK","id":6723804,"ctx":"conn15192","msg":"Ingress TLS handshake complete","attr":{"durationMillis":3,"peerSubject":"CN=app-client.example.net,O=Example","cipher":"TLS_AES_256_GCM_SHA384"}}"#,
    r#"{"t":{"$date":"2025-07-16T05:18:54.512+00:00"},"s":"I","c":"COMMAND","id":51803,"ctx":"conn15193","msg":"Slow query","attr":{"type":"command","ns":"app.users","command":{"find":"users","filter":{"phone":"+60 12-447 1286"},"lsid":{"id":{"$uuid":"9a0e3c1b-7f4d-4e2a-8b6c-5d9e1f3a7b2c"}}},"opId":88213,"remote":"atlas-x1y2z3-shard-00-01.abc12.mongodb.net:27017","gitVersion":"b2fe1f5e4c1c9a2b3d4e5f60718293a4b5c6d7e8"}}"#,
];

/// Identifiers embedded in the sample lines above.
const SENSITIVE: &[&str] = &[
    "60124471286",
    "18dc6629-9262-4055-b3fa-6c00285da25b",
    "297396",
    "10.201.32.211",
    "ops.team@example.com",
    "5f1d7a3c9b2e4a6f8c0d1e2f",
    "192.168.248.116",
    "d2b52b4f-2a9d-4033-ab45-b3b4de28de12",
    "CN=app-client.example.net,O=Example",
    "TLS_AES_256_GCM_SHA384",
    "+60 12-447 1286",
    "9a0e3c1b-7f4d-4e2a-8b6c-5d9e1f3a7b2c",
    "88213",
    "atlas-x1y2z3-shard-00-01.abc12.mongodb.net",
    "b2fe1f5e4c1c9a2b3d4e5f60718293a4b5c6d7e8",
];

fn heuristic_config() -> RedactorConfig {
    RedactorConfig::default().with_phone_validator(ValidatorKind::Heuristic)
}

fn engine() -> RedactionEngine {
    RedactionEngine::from_config(&heuristic_config()).expect("default config is valid")
}

fn redact_all(input: &str) -> (String, lr_redact::RunSummary) {
    let config = heuristic_config();
    let engine = RedactionEngine::from_config(&config).unwrap();
    let mut processor = StreamProcessor::new(engine, StreamOptions::from_config(&config));
    let mut out = Vec::new();
    let summary = processor
        .process(
            Cursor::new(input.as_bytes()),
            &mut out,
            &mut lr_redact::NoopObserver,
        )
        .unwrap();
    (String::from_utf8(out).unwrap(), summary)
}

// ============================================================================
// Leak Tests
// ============================================================================

#[test]
fn test_sensitive_values_never_leak_onprem() {
    let mut engine = engine();
    for line in ONPREM_LINES {
        let out = engine.redact_unit(line, LogFormat::Freeform);
        for secret in SENSITIVE {
            assert!(
                !out.contains(secret),
                "leaked {} in freeform output: {}",
                secret,
                out
            );
        }
        assert_eq!(out.chars().count(), line.chars().count());
    }
}

#[test]
fn test_sensitive_values_never_leak_atlas() {
    let mut engine = engine();
    for line in ATLAS_LINES {
        let out = engine.redact_unit(line, LogFormat::Structured);
        for secret in SENSITIVE {
            assert!(
                !out.contains(secret),
                "leaked {} in structured output: {}",
                secret,
                out
            );
        }
        assert_eq!(out.len(), line.len());
    }
}

#[test]
fn test_escaped_quotes_inside_tls_fields() {
    let mut engine = engine();
    let line = r#"{"ctx":"conn7","attr":{"peerSubject":"CN=\"Acme, Inc\",O=Example","cipher":"TLS\\AES_256\"GCM"}}"#;
    let before: serde_json::Value = serde_json::from_str(line).unwrap();
    assert!(before.is_object());

    let out = engine.redact_unit(line, LogFormat::Structured);
    assert_eq!(out.len(), line.len());
    for fragment in ["Acme", "Inc", "O=Example", "CN=", "AES_256", "GCM", "TLS"] {
        assert!(!out.contains(fragment), "leaked {} in {}", fragment, out);
    }

    let after: serde_json::Value = serde_json::from_str(&out).unwrap();
    let subject = after["attr"]["peerSubject"].as_str().unwrap();
    let cipher = after["attr"]["cipher"].as_str().unwrap();
    assert!(subject.chars().all(|c| c == 'X'));
    assert!(cipher.chars().all(|c| c == 'X'));
    assert_eq!(engine.stats().get("tls_subjects"), 1);
    assert_eq!(engine.stats().get("cipher_details"), 1);

    // masked output is stable
    let mut again = RedactionEngine::from_config(&heuristic_config()).unwrap();
    assert_eq!(again.redact_unit(&out, LogFormat::Structured), out);
    assert!(again.stats().is_empty());
}

#[test]
fn test_escaped_quote_inside_lsid() {
    let mut engine = engine();
    let line = r#"command: find { "lsid": { "id": UUID("0e1f\"2a3b") } }"#;
    let out = engine.redact_unit(line, LogFormat::Freeform);
    assert_eq!(out, r#"command: find { "lsid": { "id": UUID("XXXXXXXXXX") } }"#);
    assert_eq!(engine.stats().get("session_lsid"), 1);

    let line = r#"{ "lsid": { "id": UUID("ab\\cd") } }"#;
    let out = engine.redact_unit(line, LogFormat::Freeform);
    assert_eq!(out, r#"{ "lsid": { "id": UUID("XXXXXX") } }"#);
    assert_eq!(engine.stats().get("session_lsid"), 2);
}

// ============================================================================
// Concrete Scenarios
// ============================================================================

#[test]
fn test_scenario_legacy_connection() {
    let mut engine = engine();
    assert_eq!(
        engine.redact_unit("conn297396", LogFormat::Freeform),
        "connXXXXXX"
    );
    assert_eq!(engine.stats().get("legacy_conn_ids"), 1);
}

#[test]
fn test_scenario_phone_field() {
    let mut engine = engine();
    assert_eq!(
        engine.redact_unit(r#""phone_number": "60124471286""#, LogFormat::Freeform),
        r#""phone_number": "XXXXXXXXXXX""#
    );
    assert_eq!(engine.stats().get("phone_numbers"), 1);
}

#[test]
fn test_scenario_connection_id() {
    let mut engine = engine();
    assert_eq!(
        engine.redact_unit(r#""connectionId":15191"#, LogFormat::Structured),
        r#""connectionId":XXXXX"#
    );
}

#[test]
fn test_scenario_ip_length() {
    let mut engine = engine();
    let out = engine.redact_unit("remote 192.168.248.116 closed", LogFormat::Freeform);
    assert_eq!(out, "remote XXXXXXXXXXXXXXX closed");
}

#[test]
fn test_scenario_clean_line_untouched() {
    let mut engine = engine();
    let line = "2025-07-15T11:49:09.000+0000 I  STORAGE  [initandlisten] wiredtiger_open config: cache_size=1024M";
    assert_eq!(engine.redact_unit(line, LogFormat::Freeform), line);
    assert!(engine.stats().is_empty());
}

// ============================================================================
// Run-level behavior
// ============================================================================

#[test]
fn test_onprem_run_counts() {
    let input = ONPREM_LINES.join("\n") + "\n";
    let (out, summary) = redact_all(&input);

    assert_eq!(summary.format, LogFormat::Freeform);
    assert_eq!(summary.lines_processed, ONPREM_LINES.len() as u64);
    assert_eq!(out.lines().count(), ONPREM_LINES.len());
    assert_eq!(summary.redactions["legacy_conn_ids"].count, 4);
    assert_eq!(summary.redactions["ip_addresses"].count, 2);
    assert_eq!(summary.redactions["phone_numbers"].count, 1);
    assert_eq!(summary.redactions["uuids"].count, 1);
    assert_eq!(summary.redactions["bot_ids"].count, 1);
    assert_eq!(summary.redactions["email_addresses"].count, 1);
    assert_eq!(
        summary.redactions["legacy_conn_ids"].description,
        "On-premises connection IDs"
    );
    assert!(summary.redactions.values().all(|t| t.count > 0));
}

#[test]
fn test_atlas_run_counts() {
    let input = ATLAS_LINES.join("\n") + "\n";
    let (out, summary) = redact_all(&input);

    assert_eq!(summary.format, LogFormat::Structured);
    assert_eq!(out.lines().count(), ATLAS_LINES.len());
    assert!(!summary.redactions.contains_key("legacy_conn_ids"));
    assert_eq!(summary.redactions["connection_ids"].count, 1);
    assert_eq!(summary.redactions["operation_ids"].count, 1);
    assert_eq!(summary.redactions["tls_subjects"].count, 1);
    assert_eq!(summary.redactions["cipher_details"].count, 1);
    assert_eq!(summary.redactions["atlas_hostnames"].count, 1);
    assert_eq!(summary.redactions["git_commits"].count, 1);
    assert_eq!(summary.redactions["uuids"].count, 2);
    assert_eq!(summary.redactions["phone_numbers"].count, 1);

    // contexts like "conn15191" stay readable in structured logs
    assert!(out.contains(r#""ctx":"conn15191""#));
}

#[test]
fn test_second_pass_is_empty() {
    let input = [ONPREM_LINES, ATLAS_LINES].concat().join("\n");
    let (once, first) = redact_all(&input);
    assert!(first.total_redactions() > 0);

    let (twice, second) = redact_all(&once);
    assert_eq!(once, twice);
    assert!(second.redactions.is_empty());
}

#[test]
fn test_disabled_pattern_is_not_applied() {
    let mut config = heuristic_config();
    config.disabled_patterns = vec!["ip_addresses".to_string()];
    let mut engine = RedactionEngine::from_config(&config).unwrap();
    let line = "end connection 10.0.0.1:5000";
    assert_eq!(engine.redact_unit(line, LogFormat::Freeform), line);
}
