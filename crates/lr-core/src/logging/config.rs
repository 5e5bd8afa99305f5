//! Logging configuration.
//!
//! Precedence, highest first: `-v`/`-q` and `--log-format` flags, then
//! `LOGREDACT_LOG` / `LOGREDACT_LOG_FORMAT`, then a level word found in
//! `RUST_LOG`, then `info` with human output.

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

/// Environment variable selecting the log level.
pub const LOG_LEVEL_ENV_VAR: &str = "LOGREDACT_LOG";

/// Environment variable selecting the log format.
pub const LOG_FORMAT_ENV_VAR: &str = "LOGREDACT_LOG_FORMAT";

/// Shape of log records on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per record.
    Jsonl,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "text" | "pretty" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            other => Err(format!("unknown log format '{}' (expected human or jsonl)", other)),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LogFormat::Human => "human",
            LogFormat::Jsonl => "jsonl",
        })
    }
}

/// Level implied by `-v`/`-q`; `None` leaves the environment in charge.
pub fn verbosity_level(verbose: u8, quiet: bool) -> Option<LevelFilter> {
    match (quiet, verbose) {
        (true, _) => Some(LevelFilter::ERROR),
        (false, 0) => None,
        (false, 1) => Some(LevelFilter::DEBUG),
        (false, _) => Some(LevelFilter::TRACE),
    }
}

/// Settings for [`super::init_logging`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LevelFilter,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LevelFilter::INFO,
        }
    }
}

impl LogConfig {
    /// Resolve settings from the environment, then apply CLI overrides.
    pub fn from_env(cli_level: Option<LevelFilter>, cli_format: Option<LogFormat>) -> Self {
        Self::resolve(
            |key| std::env::var(key).ok(),
            cli_level,
            cli_format,
        )
    }

    fn resolve(
        env: impl Fn(&str) -> Option<String>,
        cli_level: Option<LevelFilter>,
        cli_format: Option<LogFormat>,
    ) -> Self {
        let env_level = env(LOG_LEVEL_ENV_VAR)
            .and_then(|v| v.trim().parse::<LevelFilter>().ok())
            .or_else(|| env("RUST_LOG").and_then(|v| level_word(&v)));
        let env_format = env(LOG_FORMAT_ENV_VAR).and_then(|v| v.parse::<LogFormat>().ok());

        let defaults = LogConfig::default();
        LogConfig {
            format: cli_format.or(env_format).unwrap_or(defaults.format),
            level: cli_level.or(env_level).unwrap_or(defaults.level),
        }
    }
}

/// Most verbose level word mentioned anywhere in a `RUST_LOG` value.
fn level_word(directives: &str) -> Option<LevelFilter> {
    let lower = directives.to_ascii_lowercase();
    [
        ("trace", LevelFilter::TRACE),
        ("debug", LevelFilter::DEBUG),
        ("info", LevelFilter::INFO),
        ("warn", LevelFilter::WARN),
        ("error", LevelFilter::ERROR),
    ]
    .into_iter()
    .find(|(word, _)| lower.contains(word))
    .map(|(_, level)| level)
}
