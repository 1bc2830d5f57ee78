use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::command::{CommandExecutor, CommandRunner};
use super::{SttProvider, SttProviderId, SttRequest, SttResult};
use crate::config::CommandAdapterConfig;
use crate::error::{ProviderOperation, ProviderRuntimeError};

const OPERATION: ProviderOperation = ProviderOperation::SttTranscribe;

/// Maximum audio accepted per utterance (10 MiB).
const MAX_STT_INPUT_BYTES: usize = 10 * 1024 * 1024;

fn command_args(model_path: &Option<PathBuf>, language: &str) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(model) = model_path {
        args.push("-m".to_string());
        args.push(model.display().to_string());
    }
    args.push("--language".to_string());
    args.push(language.to_string());
    args
}

fn check_input_size(id: SttProviderId, audio: &[u8]) -> Result<(), ProviderRuntimeError> {
    if audio.len() > MAX_STT_INPUT_BYTES {
        return Err(ProviderRuntimeError::exec_failed(
            id.as_str(),
            OPERATION,
            format!("voice.providers.{}.input", id),
            format!(
                "audio data exceeds maximum size: {} bytes (limit: {} bytes)",
                audio.len(),
                MAX_STT_INPUT_BYTES
            ),
            "Split the utterance into smaller audio chunks",
        ));
    }
    Ok(())
}

/// whisper.cpp driven over stdin/stdout; stdout is the transcript.
#[derive(Debug, Clone)]
pub struct WhisperCppSttAdapter {
    runner: CommandRunner,
    model_path: Option<PathBuf>,
    available: bool,
}

impl WhisperCppSttAdapter {
    pub fn new(config: &CommandAdapterConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            runner: CommandRunner::new(config.command_path.clone(), config.timeout(), executor),
            model_path: config.model_path.clone(),
            available: config.is_available(),
        }
    }
}

#[async_trait]
impl SttProvider for WhisperCppSttAdapter {
    fn id(&self) -> SttProviderId {
        SttProviderId::WhisperCpp
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn transcribe(&self, request: &SttRequest) -> Result<SttResult, ProviderRuntimeError> {
        let id = self.id();
        check_input_size(id, &request.audio)?;
        let output = self
            .runner
            .run(
                id.as_str(),
                OPERATION,
                command_args(&self.model_path, &request.language),
                request.audio.clone(),
            )
            .await?;

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(ProviderRuntimeError::invalid_response(
                id.as_str(),
                OPERATION,
                "whisper.cpp returned empty transcription output",
            ));
        }
        Ok(SttResult { text })
    }
}

#[derive(Deserialize)]
struct FasterWhisperOutput {
    text: String,
}

/// faster-whisper wrapper that prints `{"text": "..."}` on stdout.
#[derive(Debug, Clone)]
pub struct FasterWhisperSttAdapter {
    runner: CommandRunner,
    model_path: Option<PathBuf>,
    available: bool,
}

impl FasterWhisperSttAdapter {
    pub fn new(config: &CommandAdapterConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            runner: CommandRunner::new(config.command_path.clone(), config.timeout(), executor),
            model_path: config.model_path.clone(),
            available: config.is_available(),
        }
    }
}

#[async_trait]
impl SttProvider for FasterWhisperSttAdapter {
    fn id(&self) -> SttProviderId {
        SttProviderId::FasterWhisper
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn transcribe(&self, request: &SttRequest) -> Result<SttResult, ProviderRuntimeError> {
        let id = self.id();
        check_input_size(id, &request.audio)?;
        let output = self
            .runner
            .run(
                id.as_str(),
                OPERATION,
                command_args(&self.model_path, &request.language),
                request.audio.clone(),
            )
            .await?;

        let parsed: FasterWhisperOutput = serde_json::from_slice(&output.stdout).map_err(|e| {
            ProviderRuntimeError::invalid_response(
                id.as_str(),
                OPERATION,
                format!("faster-whisper output is not valid JSON: {}", e),
            )
        })?;
        let text = parsed.text.trim().to_string();
        if text.is_empty() {
            return Err(ProviderRuntimeError::invalid_response(
                id.as_str(),
                OPERATION,
                "faster-whisper returned empty transcription output",
            ));
        }
        Ok(SttResult { text })
    }
}

/// Always-available fallback: treats the payload as UTF-8 text captured by
/// the client's own recognizer.
#[derive(Debug, Clone)]
pub struct BrowserNativeSttAdapter {
    available: bool,
}

impl BrowserNativeSttAdapter {
    pub const UNAVAILABLE_TEXT: &'static str = "[audio] transcription unavailable";

    pub fn new() -> Self {
        Self { available: true }
    }

    pub fn with_availability(available: bool) -> Self {
        Self { available }
    }
}

impl Default for BrowserNativeSttAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SttProvider for BrowserNativeSttAdapter {
    fn id(&self) -> SttProviderId {
        SttProviderId::BrowserNative
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn transcribe(&self, request: &SttRequest) -> Result<SttResult, ProviderRuntimeError> {
        let text = String::from_utf8_lossy(&request.audio).trim().to_string();
        Ok(SttResult {
            text: if text.is_empty() {
                Self::UNAVAILABLE_TEXT.to_string()
            } else {
                text
            },
        })
    }
}
