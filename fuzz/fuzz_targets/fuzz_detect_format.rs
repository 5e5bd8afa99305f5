//! Fuzz target for format detection on raw streams.
//!
//! Arbitrary bytes (including invalid UTF-8 and stray `\r`) must classify
//! without panicking, and the answer must not depend on being asked twice.

#![no_main]

use libfuzzer_sys::fuzz_target;
use lr_redact::detect_stream;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let first = detect_stream(Cursor::new(data), 5);
    let second = detect_stream(Cursor::new(data), 5);
    assert_eq!(first.ok(), second.ok());
});
