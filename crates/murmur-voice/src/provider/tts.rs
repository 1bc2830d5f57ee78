use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

use super::command::{CommandExecutor, CommandRunner};
use super::{TtsProvider, TtsProviderId, TtsRequest, TtsResult};
use crate::config::KokoroConfig;
use crate::error::{ProviderOperation, ProviderRuntimeError};

const OPERATION: ProviderOperation = ProviderOperation::TtsSynthesize;

/// Maximum text accepted per synthesis request (64 KiB).
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// Failure while loading or running the synthesis model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpeechModelError {
    /// The model itself is unusable or produced unusable output.
    #[error("{0}")]
    Model(String),

    /// The runtime process failed; carries the provider code and details.
    #[error(transparent)]
    Runtime(ProviderRuntimeError),
}

/// A loaded synthesis model.
#[async_trait]
pub trait SpeechModel: Send + Sync {
    /// Generates mono samples in `[-1.0, 1.0]`.
    async fn generate(
        &self,
        text: &str,
        voice: &str,
        language: &str,
    ) -> Result<Vec<f32>, SpeechModelError>;
}

/// Loads the synthesis model. Called at most once per adapter.
#[async_trait]
pub trait SpeechModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn SpeechModel>, SpeechModelError>;
}

/// Converts float samples to clamped 16-bit little-endian PCM.
pub fn pcm16_from_samples(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Kokoro synthesizer with a lazily loaded model.
///
/// The first call loads the model; concurrent first callers wait on the
/// same load. A failed load is remembered and returned to every later
/// caller without another attempt.
pub struct KokoroTtsAdapter {
    loader: Arc<dyn SpeechModelLoader>,
    model: OnceCell<Result<Arc<dyn SpeechModel>, SpeechModelError>>,
    voice: String,
    available: bool,
}

impl std::fmt::Debug for KokoroTtsAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KokoroTtsAdapter")
            .field("voice", &self.voice)
            .field("available", &self.available)
            .field("loaded", &self.model.initialized())
            .finish()
    }
}

impl KokoroTtsAdapter {
    pub fn new(loader: Arc<dyn SpeechModelLoader>, voice: impl Into<String>, available: bool) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
            voice: voice.into(),
            available,
        }
    }

    /// Builds the adapter around the command-line Kokoro runtime.
    pub fn from_config(config: &KokoroConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        let loader = KokoroCommandLoader::new(config, executor);
        Self::new(Arc::new(loader), config.voice.clone(), config.is_available())
    }

    async fn model(&self) -> Result<Arc<dyn SpeechModel>, SpeechModelError> {
        self.model
            .get_or_init(|| async {
                tracing::info!(provider = "kokoro", "loading speech model");
                let loaded = self.loader.load().await;
                if let Err(err) = &loaded {
                    tracing::error!(provider = "kokoro", error = %err, "speech model failed to load");
                }
                loaded
            })
            .await
            .clone()
    }

    fn synthesis_failed(err: SpeechModelError) -> ProviderRuntimeError {
        if let SpeechModelError::Runtime(runtime) = err {
            return runtime;
        }
        ProviderRuntimeError::exec_failed(
            TtsProviderId::Kokoro.as_str(),
            OPERATION,
            "kokoro.synthesize",
            format!("Kokoro TTS synthesis failed: {}", err),
            "Ensure the Kokoro runtime is installed and its model file is readable",
        )
    }
}

#[async_trait]
impl TtsProvider for KokoroTtsAdapter {
    fn id(&self) -> TtsProviderId {
        TtsProviderId::Kokoro
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn synthesize(&self, request: &TtsRequest) -> Result<TtsResult, ProviderRuntimeError> {
        if request.text.len() > MAX_TTS_INPUT_BYTES {
            return Err(Self::synthesis_failed(SpeechModelError::Model(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                request.text.len(),
                MAX_TTS_INPUT_BYTES
            ))));
        }

        let model = self.model().await.map_err(Self::synthesis_failed)?;
        let samples = model
            .generate(&request.text, &self.voice, &request.language)
            .await
            .map_err(Self::synthesis_failed)?;
        if samples.is_empty() {
            return Err(Self::synthesis_failed(SpeechModelError::Model(
                "model produced no audio".to_string(),
            )));
        }
        Ok(TtsResult {
            audio: pcm16_from_samples(&samples),
        })
    }
}

/// Loader for a Kokoro command-line runtime.
///
/// Loading validates the runtime wiring and the model file; generation
/// spawns the runtime with the text on stdin and reads raw `f32le`
/// samples from stdout.
pub struct KokoroCommandLoader {
    command_path: Option<PathBuf>,
    model_path: Option<PathBuf>,
    runner: CommandRunner,
}

impl KokoroCommandLoader {
    pub fn new(config: &KokoroConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            command_path: config.command_path.clone(),
            model_path: config.model_path.clone(),
            runner: CommandRunner::new(config.command_path.clone(), config.timeout(), executor),
        }
    }
}

#[async_trait]
impl SpeechModelLoader for KokoroCommandLoader {
    async fn load(&self) -> Result<Arc<dyn SpeechModel>, SpeechModelError> {
        if self.command_path.is_none() {
            return Err(SpeechModelError::Model(
                "kokoro command path is not configured".to_string(),
            ));
        }
        let model_path = self
            .model_path
            .clone()
            .ok_or_else(|| SpeechModelError::Model("kokoro model path is not configured".to_string()))?;

        let metadata = tokio::fs::metadata(&model_path).await.map_err(|e| {
            SpeechModelError::Model(format!(
                "kokoro model {} is not readable: {}",
                model_path.display(),
                e
            ))
        })?;
        if !metadata.is_file() {
            return Err(SpeechModelError::Model(format!(
                "kokoro model {} is not a file",
                model_path.display()
            )));
        }

        Ok(Arc::new(KokoroCommandModel {
            model_path,
            runner: self.runner.clone(),
        }))
    }
}

struct KokoroCommandModel {
    model_path: PathBuf,
    runner: CommandRunner,
}

#[async_trait]
impl SpeechModel for KokoroCommandModel {
    async fn generate(
        &self,
        text: &str,
        voice: &str,
        language: &str,
    ) -> Result<Vec<f32>, SpeechModelError> {
        let args = vec![
            "--model".to_string(),
            self.model_path.display().to_string(),
            "--voice".to_string(),
            voice.to_string(),
            "--lang".to_string(),
            language.to_string(),
            "--output_raw".to_string(),
        ];
        let output = self
            .runner
            .run(
                TtsProviderId::Kokoro.as_str(),
                OPERATION,
                args,
                text.as_bytes().to_vec(),
            )
            .await
            .map_err(SpeechModelError::Runtime)?;

        if output.stdout.len() % 4 != 0 {
            return Err(SpeechModelError::Model(format!(
                "kokoro emitted {} bytes, not a whole number of f32 samples",
                output.stdout.len()
            )));
        }
        Ok(output
            .stdout
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}

/// Always-available fallback: returns the text bytes for the client's own
/// synthesizer.
#[derive(Debug, Clone)]
pub struct BrowserNativeTtsAdapter {
    available: bool,
}

impl BrowserNativeTtsAdapter {
    pub fn new() -> Self {
        Self { available: true }
    }

    pub fn with_availability(available: bool) -> Self {
        Self { available }
    }
}

impl Default for BrowserNativeTtsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtsProvider for BrowserNativeTtsAdapter {
    fn id(&self) -> TtsProviderId {
        TtsProviderId::BrowserNative
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn synthesize(&self, request: &TtsRequest) -> Result<TtsResult, ProviderRuntimeError> {
        Ok(TtsResult {
            audio: request.text.as_bytes().to_vec(),
        })
    }
}
