#![allow(dead_code)]

use async_trait::async_trait;
use murmur_observe::MemoryEventSink;
use murmur_types::ActiveContext;
use murmur_voice::provider::{
    BrowserNativeSttAdapter, BrowserNativeTtsAdapter, SttProvider, SttProviderId, SttRequest,
    SttResult, TtsProvider, TtsProviderId, TtsRequest, TtsResult,
};
use murmur_voice::{
    ActiveContextReader, OrchestratorDeps, OrchestratorOptions, ProviderRuntimeError,
    SelectedProviders, Sleeper, VoiceOrchestrator,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Context reader whose answer can be changed mid-test.
#[derive(Default)]
pub struct FakeContextReader {
    context: Mutex<Option<ActiveContext>>,
    reads: AtomicUsize,
}

impl FakeContextReader {
    pub fn with_path(path: &str) -> Arc<Self> {
        let reader = Self::default();
        reader.set(Some(ActiveContext::new("editor", path)));
        Arc::new(reader)
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, context: Option<ActiveContext>) {
        *self.context.lock().unwrap() = context;
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActiveContextReader for FakeContextReader {
    async fn active_context(&self) -> Option<ActiveContext> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.context.lock().unwrap().clone()
    }
}

/// Records requested waits instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    pub waits: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

/// STT provider that always fails with the given error.
pub struct FailingStt(pub ProviderRuntimeError);

#[async_trait]
impl SttProvider for FailingStt {
    fn id(&self) -> SttProviderId {
        SttProviderId::WhisperCpp
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn transcribe(&self, _request: &SttRequest) -> Result<SttResult, ProviderRuntimeError> {
        Err(self.0.clone())
    }
}

/// STT provider that answers every request with the same text.
pub struct FixedStt(pub &'static str);

#[async_trait]
impl SttProvider for FixedStt {
    fn id(&self) -> SttProviderId {
        SttProviderId::FasterWhisper
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn transcribe(&self, _request: &SttRequest) -> Result<SttResult, ProviderRuntimeError> {
        Ok(SttResult {
            text: self.0.to_string(),
        })
    }
}

/// TTS provider that counts calls and optionally fails.
#[derive(Default)]
pub struct CountingTts {
    pub calls: AtomicUsize,
    pub failure: Option<ProviderRuntimeError>,
}

#[async_trait]
impl TtsProvider for CountingTts {
    fn id(&self) -> TtsProviderId {
        TtsProviderId::Kokoro
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn synthesize(&self, request: &TtsRequest) -> Result<TtsResult, ProviderRuntimeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Yield so concurrent narrations interleave at the provider call.
        tokio::task::yield_now().await;
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(TtsResult {
                audio: vec![0; request.text.len() * 2],
            }),
        }
    }
}

pub struct Harness {
    pub orchestrator: Arc<VoiceOrchestrator>,
    pub sink: Arc<MemoryEventSink>,
    pub reader: Arc<FakeContextReader>,
    pub sleeper: Arc<RecordingSleeper>,
}

pub fn browser_providers() -> SelectedProviders {
    SelectedProviders {
        stt: Arc::new(BrowserNativeSttAdapter::new()),
        tts: Arc::new(BrowserNativeTtsAdapter::new()),
    }
}

pub fn harness(reader: Arc<FakeContextReader>, providers: SelectedProviders) -> Harness {
    harness_with_device(reader, providers, None)
}

pub fn harness_with_device(
    reader: Arc<FakeContextReader>,
    providers: SelectedProviders,
    system_device: Option<&'static str>,
) -> Harness {
    build_harness(reader, providers, system_device, OrchestratorOptions::default())
}

pub fn harness_with_options(
    reader: Arc<FakeContextReader>,
    providers: SelectedProviders,
    options: OrchestratorOptions,
) -> Harness {
    build_harness(reader, providers, None, options)
}

fn build_harness(
    reader: Arc<FakeContextReader>,
    providers: SelectedProviders,
    system_device: Option<&'static str>,
    options: OrchestratorOptions,
) -> Harness {
    let sink = Arc::new(MemoryEventSink::new());
    let sleeper = Arc::new(RecordingSleeper::default());
    let deps = OrchestratorDeps {
        context_reader: reader.clone(),
        event_sink: sink.clone(),
        providers,
        sleeper: sleeper.clone(),
        device_resolver: Arc::new(move || system_device.map(str::to_string)),
    };
    Harness {
        orchestrator: Arc::new(VoiceOrchestrator::new(deps, options)),
        sink,
        reader,
        sleeper,
    }
}
