//! Hub configuration loading from file and environment variables.

use murmur_observe::EventMeta;
use murmur_voice::ProvidersConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level hub configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Session runtime settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Provider selection and adapter runtime settings.
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "murmur_voice=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Orchestrator runtime settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Wait between active-context reads while narration retries.
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Retries after the first missing active-context read.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Write voice events to the output stream next to responses.
    #[serde(default = "default_true")]
    pub forward_events: bool,

    /// Envelope stamped on every voice event.
    #[serde(default)]
    pub event_meta: EventMeta,
}

impl SessionConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_retry_interval_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: default_retry_interval_ms(),
            max_retries: default_max_retries(),
            forward_events: true,
            event_meta: EventMeta::default(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `MURMUR_LOG_LEVEL` overrides `logging.level`
/// - `MURMUR_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `MURMUR_RETRY_INTERVAL_MS` overrides `session.retry_interval_ms`
/// - `MURMUR_WHISPER_CPP_PATH` overrides `providers.whisper_cpp.command_path`
/// - `MURMUR_FASTER_WHISPER_PATH` overrides `providers.faster_whisper.command_path`
/// - `MURMUR_KOKORO_PATH` overrides `providers.kokoro.command_path`
/// - `MURMUR_KOKORO_MODEL_PATH` overrides `providers.kokoro.model_path`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies `MURMUR_*` overrides read through `lookup`.
///
/// Unparseable numeric values are ignored.
pub fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(level) = lookup("MURMUR_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("MURMUR_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(interval) = lookup("MURMUR_RETRY_INTERVAL_MS") {
        if let Ok(parsed) = interval.parse() {
            config.session.retry_interval_ms = parsed;
        }
    }

    let providers = &mut config.providers;
    if let Some(path) = lookup("MURMUR_WHISPER_CPP_PATH") {
        providers.whisper_cpp.command_path = Some(PathBuf::from(path));
    }
    if let Some(path) = lookup("MURMUR_FASTER_WHISPER_PATH") {
        providers.faster_whisper.command_path = Some(PathBuf::from(path));
    }
    if let Some(path) = lookup("MURMUR_KOKORO_PATH") {
        providers.kokoro.command_path = Some(PathBuf::from(path));
    }
    if let Some(path) = lookup("MURMUR_KOKORO_MODEL_PATH") {
        providers.kokoro.model_path = Some(PathBuf::from(path));
    }
}
