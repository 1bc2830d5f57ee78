//! Speech provider capabilities, adapters and selection.
//!
//! Adapters are capability records: an id from a closed set, an
//! availability flag, and one async operation. The selector walks a
//! priority chain per capability and hands the orchestrator one STT and
//! one TTS adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderRuntimeError;

pub mod command;
pub mod selector;
pub mod stt;
pub mod tts;

pub use command::{CommandExecutor, CommandInput, CommandOutput, CommandRunner, ProcessExecutor};
pub use selector::{
    select_providers, select_stt_provider, select_tts_provider, ProviderSet, SelectedProviders,
};
pub use stt::{BrowserNativeSttAdapter, FasterWhisperSttAdapter, WhisperCppSttAdapter};
pub use tts::{
    pcm16_from_samples, BrowserNativeTtsAdapter, KokoroCommandLoader, KokoroTtsAdapter,
    SpeechModel, SpeechModelError, SpeechModelLoader,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SttProviderId {
    #[serde(rename = "whisper.cpp")]
    WhisperCpp,
    #[serde(rename = "faster-whisper")]
    FasterWhisper,
    #[serde(rename = "browser-native")]
    BrowserNative,
}

impl SttProviderId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WhisperCpp => "whisper.cpp",
            Self::FasterWhisper => "faster-whisper",
            Self::BrowserNative => "browser-native",
        }
    }
}

impl std::fmt::Display for SttProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TtsProviderId {
    #[serde(rename = "kokoro")]
    Kokoro,
    #[serde(rename = "browser-native")]
    BrowserNative,
}

impl TtsProviderId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kokoro => "kokoro",
            Self::BrowserNative => "browser-native",
        }
    }
}

impl std::fmt::Display for TtsProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SttRequest {
    pub audio: Vec<u8>,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SttResult {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtsRequest {
    pub text: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtsResult {
    /// 16-bit little-endian PCM, or provider-specific bytes for fallbacks.
    pub audio: Vec<u8>,
}

/// Speech-to-text capability.
#[async_trait]
pub trait SttProvider: Send + Sync {
    fn id(&self) -> SttProviderId;

    fn is_available(&self) -> bool;

    async fn transcribe(&self, request: &SttRequest) -> Result<SttResult, ProviderRuntimeError>;
}

/// Text-to-speech capability.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    fn id(&self) -> TtsProviderId;

    fn is_available(&self) -> bool;

    async fn synthesize(&self, request: &TtsRequest) -> Result<TtsResult, ProviderRuntimeError>;
}
