//! Configuration loading for the logredact CLI.
//!
//! This module handles:
//! - Config resolution order (CLI > env > XDG > defaults)
//! - Parsing the JSON config file into a [`RedactorConfig`]
//! - Applying command-line overrides on top of the file
//! - Semantic validation before any input is opened

use crate::logging::event_names;
use lr_redact::{RedactionError, RedactorConfig, ValidatorKind};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default XDG config directory name.
const CONFIG_DIR_NAME: &str = "logredact";

/// Config file name inside the config directory.
const CONFIG_FILE_NAME: &str = "config.json";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "LOGREDACT_CONFIG";

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Invalid JSON in config file {}: {source}", path.display())]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Semantic validation failed: {0}")]
    ValidationError(#[from] RedactionError),

    #[error("I/O error reading {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Stable error code for JSON error output.
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::NotFound { .. } => "config_not_found",
            ConfigError::ParseError { .. } => "config_parse_error",
            ConfigError::ValidationError(e) => e.code(),
            ConfigError::IoError { .. } => "config_io_error",
        }
    }
}

/// Where the effective config came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigSource {
    /// `--config` flag.
    Cli { path: PathBuf },
    /// `LOGREDACT_CONFIG` environment variable.
    Env { path: PathBuf },
    /// `$XDG_CONFIG_HOME/logredact/config.json`.
    Xdg { path: PathBuf },
    /// Built-in defaults.
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Cli { path } | ConfigSource::Env { path } | ConfigSource::Xdg { path } => {
                Some(path)
            }
            ConfigSource::Defaults => None,
        }
    }
}

/// Configuration resolution options.
#[derive(Debug, Default, Clone)]
pub struct ConfigOptions {
    /// Explicit config file (highest priority).
    pub config_path: Option<PathBuf>,
}

/// Values from command-line flags that override the config file.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub batch_size: Option<usize>,
    pub mask_char: Option<char>,
    pub phone_validator: Option<ValidatorKind>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut RedactorConfig) {
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(mask_char) = self.mask_char {
            config.mask_char = mask_char;
        }
        if let Some(kind) = self.phone_validator {
            config.phone_validator = kind;
        }
    }
}

/// Resolved configuration with provenance information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: RedactorConfig,
    pub source: ConfigSource,
}

/// Load configuration with the standard resolution order.
///
/// Resolution order (highest to lowest priority):
/// 1. Explicit CLI flag (via ConfigOptions)
/// 2. Environment variable (LOGREDACT_CONFIG)
/// 3. XDG config home (~/.config/logredact/config.json), if present
/// 4. Built-in defaults
///
/// Overrides are applied before validation, so a bad `--batch-size` is
/// reported the same way as a bad file value.
pub fn load_config(
    options: &ConfigOptions,
    overrides: &ConfigOverrides,
) -> Result<ResolvedConfig, ConfigError> {
    let source = resolve_source(options);
    let mut config = match source.path() {
        Some(path) => load_config_file(path)?,
        None => RedactorConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate()?;

    tracing::debug!(
        target: event_names::CONFIG_LOADED,
        source = ?source,
        batch_size = config.batch_size,
        "configuration resolved"
    );
    Ok(ResolvedConfig { config, source })
}

/// Pick the config source using the standard resolution order.
fn resolve_source(options: &ConfigOptions) -> ConfigSource {
    if let Some(path) = &options.config_path {
        return ConfigSource::Cli { path: path.clone() };
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return ConfigSource::Env {
                path: PathBuf::from(path),
            };
        }
    }

    if let Some(path) = xdg_config_path() {
        if path.exists() {
            return ConfigSource::Xdg { path };
        }
    }

    ConfigSource::Defaults
}

/// `$XDG_CONFIG_HOME/logredact/config.json`, falling back to `~/.config`.
fn xdg_config_path() -> Option<PathBuf> {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)?;
    Some(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Read and parse one config file without validating it.
pub fn load_config_file(path: &Path) -> Result<RedactorConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::IoError {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}
