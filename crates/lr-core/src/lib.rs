//! logredact core library
//!
//! Glue between the `logredact` binary and the redaction engine:
//! - Exit codes for CLI operations
//! - Configuration resolution and overrides
//! - Structured logging and progress events
//! - Summary rendering
//! - Signal-driven cancellation
//! - Demo log generation
//!
//! The binary entry point is in `main.rs`.

pub mod config;
pub mod events;
pub mod exit_codes;
pub mod interrupt;
pub mod logging;
pub mod output;
pub mod sample;
