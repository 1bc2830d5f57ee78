//! The voice orchestrator.
//!
//! Owns one [`VoiceSessionState`] per session id and drives the three
//! state machines in response to session calls. Calls against the same
//! session id run one at a time; different sessions proceed in parallel.

use base64::Engine;
use murmur_observe::{
    create_voice_event, EventMeta, StreamFailureReason, VoiceEventPayload, VoiceEventSink,
};
use murmur_types::{
    ActiveContext, Actor, InputState, InterruptionCause, OutputState, PolicyOverrides,
    TranscriptMode, TranscriptState, VoiceSessionPolicy,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::error::{
    FailedGuard, ProviderInvocationError, ProviderOperation, ProviderRuntimeError,
    StateTransitionError, VoiceError,
};
use crate::fsm::{
    transcript_transitions, validate_input_transition, validate_output_transition,
    validate_transcript_transition, InputTrigger, OutputTrigger, TranscriptTrigger,
};
use crate::narration::{build_narration_text, select_narration_strategy, NarrationSource};
use crate::policy::resolve_policy_against;
use crate::provider::{SelectedProviders, SttProvider, SttRequest, TtsProvider, TtsRequest};
use crate::runtime::{
    resolve_device_preference, resolve_language, ActiveContextReader, PlaybackDeviceResolver,
    Sleeper,
};
use crate::segment::{
    create_plan_id, create_voice_segment_id, split_segments, SegmentPriority, SpeechPlan,
    SpeechPlanSegment,
};
use crate::session::{PlaybackState, VoiceSessionState};

/// Retries after the first missing active-context read.
pub const MAX_STREAM_RETRIES: u32 = 3;

/// Default wait between active-context reads.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub max_retries: u32,
    pub retry_interval: Duration,
    /// Envelope stamped on every emitted event.
    pub event_meta: EventMeta,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            max_retries: MAX_STREAM_RETRIES,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            event_meta: EventMeta::default(),
        }
    }
}

impl OrchestratorOptions {
    /// Retry interval in whole milliseconds, saturating at `u64::MAX`.
    pub fn retry_interval_ms(&self) -> u64 {
        u64::try_from(self.retry_interval.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Collaborators injected into the orchestrator.
#[derive(Clone)]
pub struct OrchestratorDeps {
    pub context_reader: Arc<dyn ActiveContextReader>,
    pub event_sink: Arc<dyn VoiceEventSink>,
    pub providers: SelectedProviders,
    pub sleeper: Arc<dyn Sleeper>,
    pub device_resolver: Arc<dyn PlaybackDeviceResolver>,
}

/// An utterance submitted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Utterance {
    /// Base64-encoded audio handed to the STT provider.
    AudioChunk { text: String },
    /// Text recognised on the client; used as is.
    TranscriptText { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationRequest {
    pub source: NarrationSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResult {
    pub session_id: String,
    pub transcript_state: TranscriptState,
    pub text: String,
}

type SessionHandle = Arc<Mutex<VoiceSessionState>>;

pub struct VoiceOrchestrator {
    deps: OrchestratorDeps,
    options: OrchestratorOptions,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl VoiceOrchestrator {
    pub fn new(deps: OrchestratorDeps, options: OrchestratorOptions) -> Self {
        Self {
            deps,
            options,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Starts (or restarts) capture for a session.
    ///
    /// Transcript, output and playback state survive a restart. Overrides
    /// merge against the session's current policy.
    pub async fn start_session(
        &self,
        session_id: &str,
        overrides: Option<&PolicyOverrides>,
    ) -> Result<VoiceSessionState, VoiceError> {
        let handle = self.session(session_id).await?;
        let mut state = handle.lock().await;

        let policy = match overrides {
            Some(overrides) => resolve_policy_against(&state.policy, overrides)?,
            None => state.policy.clone(),
        };
        let from = state.input_state;
        let next = validate_input_transition(
            from,
            InputTrigger::StartSession {
                policy_valid: true,
                new_session: from == InputState::Stopped,
            },
        )?;

        state.policy = policy;
        state.input_state = next;
        tracing::info!(session_id, from = %from, "voice session started");
        self.emit(
            session_id,
            None,
            VoiceEventPayload::SessionStarted { input_state: next },
        );
        Ok(state.clone())
    }

    /// Drives input capture to `stopped` along the path legal from the
    /// current state.
    pub async fn stop_session(&self, session_id: &str) -> Result<VoiceSessionState, VoiceError> {
        let handle = self.session(session_id).await?;
        let mut state = handle.lock().await;

        let ready = InputTrigger::TranscriptReady {
            parse_success: true,
        };
        let next = match state.input_state {
            InputState::Listening => {
                let processing =
                    validate_input_transition(InputState::Listening, InputTrigger::StopCapture)?;
                validate_input_transition(processing, ready)?
            }
            InputState::Processing => validate_input_transition(InputState::Processing, ready)?,
            other => validate_input_transition(other, InputTrigger::StopSession)?,
        };

        state.input_state = next;
        tracing::info!(session_id, "voice session stopped");
        self.emit(
            session_id,
            None,
            VoiceEventPayload::SessionStopped { input_state: next },
        );
        Ok(state.clone())
    }

    /// Stops capture on a barge-in and cascades into the output machine
    /// when speech is playing.
    pub async fn interrupt_session(
        &self,
        session_id: &str,
        actor: Option<Actor>,
    ) -> Result<VoiceSessionState, VoiceError> {
        let handle = self.session(session_id).await?;
        let mut state = handle.lock().await;

        let next = validate_input_transition(
            state.input_state,
            InputTrigger::Interrupt {
                barge_in_enabled: state.policy.barge_in_enabled,
            },
        )?;
        state.input_state = next;

        if state.output_state == OutputState::Speaking {
            self.interrupt_output_locked(
                &mut state,
                InterruptionCause::BargeIn,
                actor.unwrap_or(Actor::User),
            )?;
        }
        Ok(state.clone())
    }

    pub async fn get_session_state(
        &self,
        session_id: &str,
    ) -> Result<VoiceSessionState, VoiceError> {
        let handle = self.session(session_id).await?;
        let state = handle.lock().await;
        Ok(state.clone())
    }

    // ── Policy ───────────────────────────────────────────────────────

    pub async fn get_policy(&self, session_id: &str) -> Result<VoiceSessionPolicy, VoiceError> {
        let handle = self.session(session_id).await?;
        let state = handle.lock().await;
        Ok(state.policy.clone())
    }

    /// Resolves `patch` against the session's current policy and replaces it.
    pub async fn update_policy(
        &self,
        session_id: &str,
        patch: &PolicyOverrides,
    ) -> Result<VoiceSessionPolicy, VoiceError> {
        let handle = self.session(session_id).await?;
        let mut state = handle.lock().await;
        let policy = resolve_policy_against(&state.policy, patch)?;
        state.policy = policy.clone();
        tracing::debug!(session_id, ?policy, "voice policy updated");
        Ok(policy)
    }

    // ── Transcript ───────────────────────────────────────────────────

    /// Resolves the utterance text and makes it the interim transcript.
    pub async fn handle_utterance(
        &self,
        session_id: &str,
        utterance: &Utterance,
    ) -> Result<TranscriptResult, VoiceError> {
        let handle = self.session(session_id).await?;
        let mut state = handle.lock().await;

        let text = match utterance {
            Utterance::TranscriptText { text } => require_text(text, "voice.utterance.text")?,
            Utterance::AudioChunk { text } => {
                let chunk = require_text(text, "voice.utterance.text")?;
                let audio = base64::engine::general_purpose::STANDARD
                    .decode(chunk.trim())
                    .map_err(|e| {
                        VoiceError::validation(
                            "voice.utterance.text",
                            format!("audio chunk must be base64: {}", e),
                        )
                    })?;
                let language = state.policy.language.clone();
                self.transcribe(session_id, audio, language).await?
            }
        };

        let mut transcript_state = state.transcript_state;
        if transcript_state == TranscriptState::Sent {
            transcript_state = validate_transcript_transition(
                transcript_state,
                TranscriptTrigger::NewUtterance { same_session: true },
            )?;
        }
        let transcript_state = validate_transcript_transition(
            transcript_state,
            TranscriptTrigger::InterimChunk {
                has_text: !text.trim().is_empty(),
            },
        )?;

        state.transcript_state = transcript_state;
        state.transcript_text = text;
        self.emit_transcript_updated(&state);
        Ok(transcript_result(&state))
    }

    pub async fn finalize_transcript(
        &self,
        session_id: &str,
    ) -> Result<TranscriptResult, VoiceError> {
        let handle = self.session(session_id).await?;
        let mut state = handle.lock().await;
        state.transcript_state = validate_transcript_transition(
            state.transcript_state,
            TranscriptTrigger::Finalize { asr_done: true },
        )?;
        self.emit_transcript_updated(&state);
        Ok(transcript_result(&state))
    }

    /// Replaces the transcript text. A final transcript is opened for
    /// editing first, which requires `edit-before-send`.
    pub async fn edit_transcript(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<TranscriptResult, VoiceError> {
        let handle = self.session(session_id).await?;
        let mut state = handle.lock().await;
        let text = require_text(text, "voice.transcript.text")?;

        let mut next = state.transcript_state;
        if next == TranscriptState::Final {
            next = validate_transcript_transition(
                next,
                TranscriptTrigger::EnableEdit {
                    mode: state.policy.transcript_mode,
                },
            )?;
        }
        if next != TranscriptState::Editable {
            return Err(StateTransitionError::new(
                murmur_types::StateMachine::Transcript,
                next.as_str(),
                "edit",
                Some(FailedGuard::Unmet("editable")),
                transcript_transitions(next).to_vec(),
            )
            .into());
        }

        state.transcript_state = next;
        state.transcript_text = text;
        self.emit_transcript_updated(&state);
        Ok(transcript_result(&state))
    }

    /// Delivers the transcript. Uses `autoSend` when the policy allows it
    /// and the transcript is final; otherwise confirms through the edit path.
    pub async fn send_transcript(&self, session_id: &str) -> Result<TranscriptResult, VoiceError> {
        let handle = self.session(session_id).await?;
        let mut state = handle.lock().await;
        let mode = state.policy.transcript_mode;
        let from = state.transcript_state;

        let next = if from == TranscriptState::Final && mode == TranscriptMode::AutomaticSend {
            validate_transcript_transition(from, TranscriptTrigger::AutoSend { mode })?
        } else {
            let editable = if from == TranscriptState::Final {
                validate_transcript_transition(from, TranscriptTrigger::EnableEdit { mode })?
            } else {
                from
            };
            validate_transcript_transition(
                editable,
                TranscriptTrigger::Submit {
                    user_confirmed: true,
                },
            )?
        };

        state.transcript_state = next;
        tracing::info!(session_id, chars = state.transcript_text.chars().count(), "transcript sent");
        self.emit_transcript_updated(&state);
        Ok(transcript_result(&state))
    }

    // ── Output ───────────────────────────────────────────────────────

    pub async fn pause_output(&self, session_id: &str) -> Result<VoiceSessionState, VoiceError> {
        let handle = self.session(session_id).await?;
        let mut state = handle.lock().await;
        state.output_state = validate_output_transition(state.output_state, OutputTrigger::Pause)?;
        Ok(state.clone())
    }

    /// Resumes paused speech, or re-enters playback after an interrupt
    /// with the front of the pending queue as the active segment.
    pub async fn resume_output(&self, session_id: &str) -> Result<VoiceSessionState, VoiceError> {
        let handle = self.session(session_id).await?;
        let mut state = handle.lock().await;

        if state.output_state == OutputState::Interrupted {
            let queued = validate_output_transition(
                OutputState::Interrupted,
                OutputTrigger::Resume {
                    pending_segments: !state.playback.pending_segment_ids.is_empty(),
                },
            )?;
            let speaking = validate_output_transition(
                queued,
                OutputTrigger::StartPlayback { device_ready: true },
            )?;
            state.playback.promote_next();
            state.output_state = speaking;
        } else {
            state.output_state = validate_output_transition(
                state.output_state,
                OutputTrigger::Resume {
                    pending_segments: !state.playback.pending_segment_ids.is_empty(),
                },
            )?;
        }

        self.emit(
            session_id,
            state.playback.active_segment_id.as_deref(),
            VoiceEventPayload::OutputStarted {
                plan_id: None,
                segment_index: None,
                queue_remaining: state.playback.pending_segment_ids.len(),
            },
        );
        Ok(state.clone())
    }

    /// Cuts speech short and re-queues the active segment at the front.
    ///
    /// The barge-in policy only gates interrupts caused by a barge-in.
    pub async fn interrupt_output(
        &self,
        session_id: &str,
        cause: Option<InterruptionCause>,
        actor: Option<Actor>,
    ) -> Result<VoiceSessionState, VoiceError> {
        let handle = self.session(session_id).await?;
        let mut state = handle.lock().await;
        self.interrupt_output_locked(
            &mut state,
            cause.unwrap_or(InterruptionCause::User),
            actor.unwrap_or(Actor::User),
        )?;
        Ok(state.clone())
    }

    /// Marks the active segment as played and moves on to the next one,
    /// or settles in `completed` when the queue is empty.
    pub async fn complete_segment(
        &self,
        session_id: &str,
    ) -> Result<VoiceSessionState, VoiceError> {
        let handle = self.session(session_id).await?;
        let mut state = handle.lock().await;

        let remaining = !state.playback.pending_segment_ids.is_empty();
        let next = validate_output_transition(
            state.output_state,
            OutputTrigger::SegmentDone {
                segments_remaining: remaining,
            },
        )?;
        let next = if next == OutputState::Queued {
            validate_output_transition(next, OutputTrigger::StartPlayback { device_ready: true })?
        } else {
            next
        };

        state.playback.complete_active();
        state.output_state = next;
        if next == OutputState::Speaking {
            state.playback.promote_next();
            self.emit(
                session_id,
                state.playback.active_segment_id.as_deref(),
                VoiceEventPayload::OutputStarted {
                    plan_id: None,
                    segment_index: Some(state.playback.completed_segment_ids.len()),
                    queue_remaining: state.playback.pending_segment_ids.len(),
                },
            );
        } else {
            tracing::debug!(session_id, "speech plan completed");
        }
        Ok(state.clone())
    }

    // ── Narration ────────────────────────────────────────────────────

    /// Builds, synthesizes and queues a speech plan for the active context.
    pub async fn narrate_from_active_context(
        &self,
        session_id: &str,
        request: &NarrationRequest,
    ) -> Result<SpeechPlan, VoiceError> {
        let handle = self.session(session_id).await?;
        let mut state = handle.lock().await;

        let context = self.resolve_active_context(session_id).await?;
        let language = resolve_language(request.language.as_deref(), &state.policy.language);

        let strategy = select_narration_strategy(&request.source)?;
        let narration = build_narration_text(strategy, &request.source.content, context.path())?;
        let plan_id = create_plan_id(session_id, context.path(), &narration);
        let texts = split_segments(&narration);
        let segment_ids = texts
            .iter()
            .enumerate()
            .map(|(index, text)| create_voice_segment_id(session_id, &plan_id, index, text))
            .collect::<Result<Vec<_>, _>>()?;

        let queued = validate_output_transition(
            state.output_state,
            OutputTrigger::EnqueuePlan {
                output_allowed: state.policy.output_mode.allows_output(),
            },
        )?;
        let speaking =
            validate_output_transition(queued, OutputTrigger::StartPlayback { device_ready: true })?;

        let device_preference = resolve_device_preference(
            state.policy.device_preference.as_deref(),
            self.deps.device_resolver.system_default_device(),
        );

        let audio = self
            .synthesize(session_id, narration.clone(), language.clone())
            .await?;

        state.output_state = queued;
        state.playback = PlaybackState::from_segments(segment_ids.clone());
        let pending: Vec<String> = state.playback.pending_segment_ids.iter().cloned().collect();
        self.emit(
            session_id,
            None,
            VoiceEventPayload::OutputQueued {
                plan_id: plan_id.clone(),
                language: language.clone(),
                device_preference: device_preference.clone(),
                total_segments: segment_ids.len(),
                pending_segment_ids: pending.clone(),
                audio_bytes: audio.len(),
            },
        );

        state.output_state = speaking;
        self.emit(
            session_id,
            state.playback.active_segment_id.as_deref(),
            VoiceEventPayload::OutputStarted {
                plan_id: Some(plan_id.clone()),
                segment_index: Some(0),
                queue_remaining: pending.len(),
            },
        );
        tracing::info!(
            session_id,
            plan_id = %plan_id,
            strategy = %strategy,
            segments = segment_ids.len(),
            "narration queued"
        );

        let now = chrono::Utc::now().to_rfc3339();
        let segments = texts
            .into_iter()
            .zip(segment_ids)
            .map(|(text, segment_id)| SpeechPlanSegment {
                segment_id,
                text,
                allow_barge_in: state.policy.barge_in_enabled,
                cue_hints: Vec::new(),
                priority: SegmentPriority::Normal,
                started_at: now.clone(),
                ended_at: now.clone(),
                interruption_cause: None,
                actor: Actor::System,
            })
            .collect();

        Ok(SpeechPlan {
            plan_id,
            session_id: session_id.to_string(),
            strategy,
            language,
            device_preference,
            segments,
        })
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Returns the session handle, creating default state on first use.
    async fn session(&self, session_id: &str) -> Result<SessionHandle, VoiceError> {
        if session_id.trim().is_empty() {
            return Err(VoiceError::validation(
                "voice.sessionId",
                "sessionId must be a non-empty string",
            ));
        }
        if let Some(handle) = self.sessions.read().await.get(session_id) {
            return Ok(Arc::clone(handle));
        }
        let mut sessions = self.sessions.write().await;
        let handle = sessions.entry(session_id.to_string()).or_insert_with(|| {
            tracing::debug!(session_id, "creating voice session state");
            Arc::new(Mutex::new(VoiceSessionState::new(session_id)))
        });
        Ok(Arc::clone(handle))
    }

    fn interrupt_output_locked(
        &self,
        state: &mut VoiceSessionState,
        cause: InterruptionCause,
        actor: Actor,
    ) -> Result<(), VoiceError> {
        let barge_in_enabled = match cause {
            InterruptionCause::BargeIn => state.policy.barge_in_enabled,
            InterruptionCause::System | InterruptionCause::User => true,
        };
        state.output_state = validate_output_transition(
            state.output_state,
            OutputTrigger::BargeIn { barge_in_enabled },
        )?;
        state.playback.requeue_active();

        tracing::info!(
            session_id = %state.session_id,
            cause = %cause,
            actor = %actor,
            "voice output interrupted"
        );
        self.emit(
            &state.session_id,
            None,
            VoiceEventPayload::OutputInterrupted {
                cause,
                actor,
                queue_remaining: state.playback.pending_segment_ids.len(),
            },
        );
        Ok(())
    }

    async fn resolve_active_context(&self, session_id: &str) -> Result<ActiveContext, VoiceError> {
        let max_retries = self.options.max_retries;
        for attempt in 0..=max_retries {
            if let Some(context) = self.deps.context_reader.active_context().await {
                return Ok(context);
            }
            if attempt == max_retries {
                break;
            }

            let retry_attempt = attempt + 1;
            tracing::debug!(session_id, retry_attempt, "active context missing, retrying");
            self.emit(
                session_id,
                None,
                VoiceEventPayload::StreamRetry {
                    reason: StreamFailureReason::MissingActiveContext,
                    retry_attempt,
                    max_retries,
                    interval_ms: self.options.retry_interval_ms(),
                },
            );
            self.deps.sleeper.sleep(self.options.retry_interval).await;
        }

        tracing::warn!(session_id, max_retries, "active context unavailable");
        self.emit(
            session_id,
            None,
            VoiceEventPayload::StreamFailed {
                reason: StreamFailureReason::MissingActiveContext,
                max_retries: Some(max_retries),
                provider_id: None,
                provider_code: None,
                location: None,
            },
        );
        Err(VoiceError::MissingActiveContext)
    }

    async fn transcribe(
        &self,
        session_id: &str,
        audio: Vec<u8>,
        language: String,
    ) -> Result<String, VoiceError> {
        let stt: &Arc<dyn SttProvider> = &self.deps.providers.stt;
        let request = SttRequest { audio, language };
        let outcome = stt.transcribe(&request).await.and_then(|result| {
            if result.text.trim().is_empty() {
                return Err(ProviderRuntimeError::invalid_response(
                    stt.id().as_str(),
                    ProviderOperation::SttTranscribe,
                    format!("{} returned an empty transcript", stt.id().as_str()),
                ));
            }
            Ok(result.text)
        });
        outcome.map_err(|err| {
            let err = ProviderInvocationError::from(err);
            self.emit_provider_failure(session_id, StreamFailureReason::SttProviderFailed, &err);
            VoiceError::from(err)
        })
    }

    async fn synthesize(
        &self,
        session_id: &str,
        text: String,
        language: String,
    ) -> Result<Vec<u8>, VoiceError> {
        let tts: &Arc<dyn TtsProvider> = &self.deps.providers.tts;
        match tts.synthesize(&TtsRequest { text, language }).await {
            Ok(result) => Ok(result.audio),
            Err(err) => {
                let err = ProviderInvocationError::from(err);
                self.emit_provider_failure(session_id, StreamFailureReason::TtsProviderFailed, &err);
                Err(err.into())
            }
        }
    }

    fn emit_provider_failure(
        &self,
        session_id: &str,
        reason: StreamFailureReason,
        err: &ProviderInvocationError,
    ) {
        tracing::warn!(
            session_id,
            provider = err.provider_id,
            code = %err.provider_code,
            location = %err.location,
            error = %err,
            "voice provider failed"
        );
        self.emit(
            session_id,
            None,
            VoiceEventPayload::StreamFailed {
                reason,
                max_retries: None,
                provider_id: Some(err.provider_id.to_string()),
                provider_code: Some(err.provider_code.as_str().to_string()),
                location: Some(err.location.clone()),
            },
        );
    }

    fn emit_transcript_updated(&self, state: &VoiceSessionState) {
        self.emit(
            &state.session_id,
            None,
            VoiceEventPayload::TranscriptUpdated {
                transcript_state: state.transcript_state,
                text_length: state.transcript_text.chars().count(),
            },
        );
    }

    fn emit(&self, session_id: &str, segment_id: Option<&str>, payload: VoiceEventPayload) {
        match create_voice_event(&self.options.event_meta, session_id, segment_id, &payload) {
            Ok(event) => self.deps.event_sink.emit(event),
            Err(e) => tracing::warn!(session_id, error = %e, "dropping malformed voice event"),
        }
    }
}

fn require_text(text: &str, location: &str) -> Result<String, VoiceError> {
    if text.trim().is_empty() {
        return Err(VoiceError::validation(
            location,
            "text must be a non-empty string",
        ));
    }
    Ok(text.to_string())
}

fn transcript_result(state: &VoiceSessionState) -> TranscriptResult {
    TranscriptResult {
        session_id: state.session_id.clone(),
        transcript_state: state.transcript_state,
        text: state.transcript_text.clone(),
    }
}
