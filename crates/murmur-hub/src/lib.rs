//! Murmur hub: runtime shell around the voice orchestrator.
//!
//! Wires providers from configuration, keeps the active context reported
//! by the client, and serves the orchestrator over a JSON-lines stream.
//! Requests naming the same session run in arrival order; other requests
//! run concurrently. Responses and forwarded voice events share one ordered
//! output stream.

pub mod api;
pub mod config;
pub mod context;

use context::ActiveContextStore;
use murmur_observe::{PlatformEvent, TracingEventSink, VoiceEventSink};
use murmur_voice::provider::{
    BrowserNativeSttAdapter, BrowserNativeTtsAdapter, CommandExecutor, FasterWhisperSttAdapter,
    KokoroTtsAdapter, ProcessExecutor, WhisperCppSttAdapter,
};
use murmur_voice::{
    select_providers, EnvDeviceResolver, OrchestratorDeps, OrchestratorOptions, ProviderSet,
    ProvidersConfig, SelectedProviders, TokioSleeper, VoiceError, VoiceOrchestrator,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Sending half of the output stream.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<String>,
}

impl Outbox {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queues one JSON line. Dropped silently once the stream is closed.
    pub fn send<T: Serialize>(&self, value: &T) {
        match serde_json::to_string(value) {
            Ok(line) => {
                if self.tx.send(line).is_err() {
                    tracing::debug!("output stream closed, dropping line");
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to encode output line"),
        }
    }
}

#[derive(Serialize)]
struct EventLine<'a> {
    event: &'a PlatformEvent,
}

/// Logs every voice event and optionally forwards it to the output stream.
pub struct HubEventSink {
    log: TracingEventSink,
    forward: Option<Outbox>,
}

impl HubEventSink {
    pub fn new(forward: Option<Outbox>) -> Self {
        Self {
            log: TracingEventSink,
            forward,
        }
    }
}

impl VoiceEventSink for HubEventSink {
    fn emit(&self, event: PlatformEvent) {
        if let Some(outbox) = &self.forward {
            outbox.send(&EventLine { event: &event });
        }
        self.log.emit(event);
    }
}

/// Builds every adapter from configuration, command adapters backed by
/// real processes.
pub fn build_provider_set(config: &ProvidersConfig) -> ProviderSet {
    let executor: Arc<dyn CommandExecutor> = Arc::new(ProcessExecutor);
    ProviderSet {
        whisper_cpp: Arc::new(WhisperCppSttAdapter::new(
            &config.whisper_cpp,
            executor.clone(),
        )),
        faster_whisper: Arc::new(FasterWhisperSttAdapter::new(
            &config.faster_whisper,
            executor.clone(),
        )),
        browser_stt: Arc::new(BrowserNativeSttAdapter::new()),
        kokoro: Arc::new(KokoroTtsAdapter::from_config(&config.kokoro, executor)),
        browser_tts: Arc::new(BrowserNativeTtsAdapter::new()),
    }
}

/// State shared by every request.
pub struct HubState {
    pub orchestrator: VoiceOrchestrator,
    pub context: Arc<ActiveContextStore>,
    pub outbox: Outbox,
}

impl HubState {
    /// Selects providers from configuration and builds the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::ProviderUnavailable` when no STT or TTS
    /// provider can be selected.
    pub fn from_config(config: &config::Config, outbox: Outbox) -> Result<Self, VoiceError> {
        let adapters = build_provider_set(&config.providers);
        let providers = select_providers(&adapters, &config.providers.selection)?;
        Ok(Self::with_providers(config, providers, outbox))
    }

    /// Builds the orchestrator around already-selected providers.
    pub fn with_providers(
        config: &config::Config,
        providers: SelectedProviders,
        outbox: Outbox,
    ) -> Self {
        let context = Arc::new(ActiveContextStore::new());
        let forward = config.session.forward_events.then(|| outbox.clone());
        let deps = OrchestratorDeps {
            context_reader: context.clone(),
            event_sink: Arc::new(HubEventSink::new(forward)),
            providers,
            sleeper: Arc::new(TokioSleeper),
            device_resolver: Arc::new(EnvDeviceResolver),
        };
        let options = OrchestratorOptions {
            max_retries: config.session.max_retries,
            retry_interval: config.session.retry_interval(),
            event_meta: config.session.event_meta.clone(),
        };
        Self {
            orchestrator: VoiceOrchestrator::new(deps, options),
            context,
            outbox,
        }
    }
}

/// Serves requests from `input` until it reaches end of stream.
///
/// Lines carrying a `sessionId` are queued on that session's lane and
/// handled one after another in input order. Any other non-blank line is
/// handled on its own task. Output lines from
/// `outbox` are written to `output` in the order they were queued. Returns
/// once the input is exhausted, all requests have answered, and their
/// lines are flushed.
pub async fn serve<R, W>(
    state: Arc<HubState>,
    input: R,
    mut output: W,
    mut outbox: mpsc::UnboundedReceiver<String>,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut tasks = JoinSet::new();
    let mut lanes: HashMap<String, mpsc::UnboundedSender<String>> = HashMap::new();
    let mut input_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match session_key(&line) {
                    Some(key) => {
                        let lane = lanes
                            .entry(key.clone())
                            .or_insert_with(|| spawn_lane(&mut tasks, Arc::clone(&state)));
                        if lane.send(line).is_err() {
                            tracing::error!(session_id = %key, "session lane closed, dropping request");
                            lanes.remove(&key);
                        }
                    }
                    None => {
                        let state = Arc::clone(&state);
                        tasks.spawn(async move {
                            let response = api::handle_line(&state, &line).await;
                            state.outbox.send(&response);
                        });
                    }
                },
                None => {
                    tracing::debug!("input closed");
                    input_open = false;
                    // Lanes finish once their queued lines are handled.
                    lanes.clear();
                }
            },
            Some(line) = outbox.recv() => write_line(&mut output, &line).await?,
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "request task failed");
                }
            }
            else => break,
        }

        if !input_open && tasks.is_empty() {
            while let Ok(line) = outbox.try_recv() {
                write_line(&mut output, &line).await?;
            }
            break;
        }
    }
    Ok(())
}

/// Session id named by a request line, if any.
fn session_key(line: &str) -> Option<String> {
    let value: Value = serde_json::from_str(line).ok()?;
    value.get("sessionId")?.as_str().map(str::to_string)
}

fn spawn_lane(tasks: &mut JoinSet<()>, state: Arc<HubState>) -> mpsc::UnboundedSender<String> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    tasks.spawn(async move {
        while let Some(line) = rx.recv().await {
            let response = api::handle_line(&state, &line).await;
            state.outbox.send(&response);
        }
    });
    tx
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> std::io::Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
