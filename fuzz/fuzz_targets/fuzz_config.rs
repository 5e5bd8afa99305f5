//! Fuzz target for config.json parsing and validation.
//!
//! Parsing and validation must return errors, never panic, including on
//! custom patterns with hostile regexes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use lr_redact::RedactorConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = serde_json::from_slice::<RedactorConfig>(data) {
        if config.validate().is_ok() {
            let _ = config.build_registry();
        }
    }
});
