//! Length-preserving redaction engine for database server logs.
//!
//! This crate masks sensitive identifiers (phone numbers, IPv4 addresses,
//! UUIDs, object ids, connection and session ids, TLS metadata, email
//! addresses) in server log streams while keeping every line, field name,
//! quote and separator where it was.
//!
//! # Key Features
//!
//! - **Format detection**: JSON-lines and free-text logs are told apart from
//!   a short peek at the leading lines.
//! - **Ordered pattern registry**: each pattern carries its masking strategy,
//!   candidate check, priority tier and format applicability as data.
//! - **Length preservation**: sensitive text is replaced character for
//!   character by a mask character, so field widths survive.
//! - **Phone validation**: phone-shaped candidates are only masked once a
//!   validator accepts them; verdicts are memoized per run.
//! - **Streaming**: input is processed in bounded batches with progress
//!   callbacks and cooperative cancellation.
//!
//! # Example
//!
//! ```no_run
//! use lr_redact::{LogFormat, RedactionEngine};
//!
//! let mut engine = RedactionEngine::with_defaults().unwrap();
//! let out = engine.redact_unit("[conn297396] end connection 10.0.0.1:5000", LogFormat::Freeform);
//! assert_eq!(out, "[connXXXXXX] end connection XXXXXXXX:5000");
//! ```

pub mod engine;
pub mod error;
pub mod format;
pub mod mask;
pub mod pattern;
pub mod phone;
pub mod policy;
pub mod stats;
pub mod stream;

pub use engine::RedactionEngine;
pub use error::{RedactionError, Result};
pub use format::{FormatDetector, LogFormat, DEFAULT_SAMPLE_LINES};
pub use mask::{mask, DEFAULT_MASK_CHAR};
pub use pattern::{CandidateCheck, MaskStrategy, PatternRegistry, PatternSpec, Priority};
pub use phone::{HeuristicValidator, PhoneValidationCache, PhoneValidator, ValidatorKind};
pub use policy::{CustomPattern, RedactorConfig};
pub use stats::RedactionStats;
pub use stream::{
    detect_stream, BatchProgress, NoopObserver, PatternTally, ProgressObserver, RunState,
    RunSummary, StreamOptions, StreamProcessor,
};
