use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default time budget for one provider invocation.
pub const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 15_000;

fn default_timeout_ms() -> u64 {
    DEFAULT_PROVIDER_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}

fn default_kokoro_voice() -> String {
    "af_sarah".to_string()
}

/// STT chain options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SttSelectionConfig {
    #[serde(default)]
    pub enable_faster_whisper: bool,
    /// Try faster-whisper before whisper.cpp. Only honoured when
    /// `enable_faster_whisper` is set.
    #[serde(default)]
    pub prefer_faster_whisper: bool,
    #[serde(default = "default_true")]
    pub allow_browser_fallback: bool,
}

impl Default for SttSelectionConfig {
    fn default() -> Self {
        Self {
            enable_faster_whisper: false,
            prefer_faster_whisper: false,
            allow_browser_fallback: true,
        }
    }
}

/// TTS chain options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsSelectionConfig {
    #[serde(default = "default_true")]
    pub allow_browser_fallback: bool,
}

impl Default for TtsSelectionConfig {
    fn default() -> Self {
        Self {
            allow_browser_fallback: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSelectionConfig {
    #[serde(default)]
    pub stt: SttSelectionConfig,
    #[serde(default)]
    pub tts: TtsSelectionConfig,
}

/// Runtime wiring of a command-line provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandAdapterConfig {
    /// Executable to spawn. Invocations fail with `NOT_CONFIGURED` when unset.
    #[serde(default)]
    pub command_path: Option<PathBuf>,
    /// Model file passed with `-m`.
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Overrides availability. Defaults to "a command path is configured".
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl Default for CommandAdapterConfig {
    fn default() -> Self {
        Self {
            command_path: None,
            model_path: None,
            timeout_ms: default_timeout_ms(),
            enabled: None,
        }
    }
}

impl CommandAdapterConfig {
    pub fn is_available(&self) -> bool {
        self.enabled.unwrap_or_else(|| has_path(&self.command_path))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Runtime wiring of the Kokoro synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KokoroConfig {
    #[serde(default)]
    pub command_path: Option<PathBuf>,
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    #[serde(default = "default_kokoro_voice")]
    pub voice: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl Default for KokoroConfig {
    fn default() -> Self {
        Self {
            command_path: None,
            model_path: None,
            voice: default_kokoro_voice(),
            timeout_ms: default_timeout_ms(),
            enabled: None,
        }
    }
}

impl KokoroConfig {
    pub fn is_available(&self) -> bool {
        self.enabled
            .unwrap_or_else(|| has_path(&self.command_path) && has_path(&self.model_path))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Everything needed to build and select the speech providers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub selection: ProviderSelectionConfig,
    #[serde(default)]
    pub whisper_cpp: CommandAdapterConfig,
    #[serde(default)]
    pub faster_whisper: CommandAdapterConfig,
    #[serde(default)]
    pub kokoro: KokoroConfig,
}

fn has_path(path: &Option<PathBuf>) -> bool {
    path.as_ref()
        .is_some_and(|p| !p.as_os_str().to_string_lossy().trim().is_empty())
}
