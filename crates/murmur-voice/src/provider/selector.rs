use std::sync::Arc;

use super::{SttProvider, TtsProvider};
use crate::config::ProviderSelectionConfig;
use crate::error::VoiceError;

/// Every adapter the selector may choose from.
#[derive(Clone)]
pub struct ProviderSet {
    pub whisper_cpp: Arc<dyn SttProvider>,
    pub faster_whisper: Arc<dyn SttProvider>,
    pub browser_stt: Arc<dyn SttProvider>,
    pub kokoro: Arc<dyn TtsProvider>,
    pub browser_tts: Arc<dyn TtsProvider>,
}

/// The active STT and TTS adapters.
#[derive(Clone)]
pub struct SelectedProviders {
    pub stt: Arc<dyn SttProvider>,
    pub tts: Arc<dyn TtsProvider>,
}

impl std::fmt::Debug for SelectedProviders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedProviders")
            .field("stt", &self.stt.id())
            .field("tts", &self.tts.id())
            .finish()
    }
}

pub fn select_providers(
    adapters: &ProviderSet,
    config: &ProviderSelectionConfig,
) -> Result<SelectedProviders, VoiceError> {
    let stt = select_stt_provider(adapters, config)?;
    let tts = select_tts_provider(adapters, config)?;
    tracing::info!(stt = %stt.id(), tts = %tts.id(), "selected voice providers");
    Ok(SelectedProviders { stt, tts })
}

/// Walks the STT chain: whisper.cpp, then faster-whisper when enabled
/// (first when also preferred), then the browser fallback when allowed.
pub fn select_stt_provider(
    adapters: &ProviderSet,
    config: &ProviderSelectionConfig,
) -> Result<Arc<dyn SttProvider>, VoiceError> {
    let stt = &config.stt;
    let chain: Vec<&Arc<dyn SttProvider>> = match (stt.enable_faster_whisper, stt.prefer_faster_whisper) {
        (true, true) => vec![&adapters.faster_whisper, &adapters.whisper_cpp],
        (true, false) => vec![&adapters.whisper_cpp, &adapters.faster_whisper],
        (false, _) => vec![&adapters.whisper_cpp],
    };

    if let Some(adapter) = chain.into_iter().find(|a| a.is_available()) {
        return Ok(Arc::clone(adapter));
    }
    if stt.allow_browser_fallback && adapters.browser_stt.is_available() {
        return Ok(Arc::clone(&adapters.browser_stt));
    }
    Err(VoiceError::ProviderUnavailable(
        "No available STT provider for current config".to_string(),
    ))
}

/// Walks the TTS chain: kokoro, then the browser fallback when allowed.
pub fn select_tts_provider(
    adapters: &ProviderSet,
    config: &ProviderSelectionConfig,
) -> Result<Arc<dyn TtsProvider>, VoiceError> {
    if adapters.kokoro.is_available() {
        return Ok(Arc::clone(&adapters.kokoro));
    }
    if config.tts.allow_browser_fallback && adapters.browser_tts.is_available() {
        return Ok(Arc::clone(&adapters.browser_tts));
    }
    Err(VoiceError::ProviderUnavailable(
        "No available TTS provider for current config".to_string(),
    ))
}
