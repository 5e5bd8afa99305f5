//! Fuzz target for single-line redaction.
//!
//! Checks that redaction never panics, never changes the character count
//! of a line, and only ever replaces characters with the mask character.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lr_redact::{LogFormat, RedactionEngine, RedactorConfig, ValidatorKind};

#[derive(Debug, Arbitrary)]
struct Input {
    line: String,
    structured: bool,
}

fuzz_target!(|input: Input| {
    let config = RedactorConfig::default().with_phone_validator(ValidatorKind::Heuristic);
    let Ok(mut engine) = RedactionEngine::from_config(&config) else {
        return;
    };
    let format = if input.structured {
        LogFormat::Structured
    } else {
        LogFormat::Freeform
    };

    let out = engine.redact_unit(&input.line, format);
    assert_eq!(out.chars().count(), input.line.chars().count());
    for (before, after) in input.line.chars().zip(out.chars()) {
        assert!(before == after || after == engine.mask_char());
    }
});
