//! Platform event envelope and voice payload types.

use murmur_types::{Actor, InputState, InterruptionCause, TranscriptState};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ObserveError;

/// Platform-level event categories shared with the rest of the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlatformEventType {
    /// A state change was applied.
    PatchApplied,
    /// An operation failed validation or could not complete.
    ValidationFailed,
}

impl PlatformEventType {
    /// Returns the canonical string label for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PatchApplied => "PATCH_APPLIED",
            Self::ValidationFailed => "VALIDATION_FAILED",
        }
    }
}

impl std::fmt::Display for PlatformEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of voice event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoiceEventKind {
    SessionStarted,
    SessionStopped,
    TranscriptUpdated,
    OutputQueued,
    OutputStarted,
    OutputInterrupted,
    StreamRetry,
    StreamFailed,
}

impl VoiceEventKind {
    /// Returns the canonical string label for this event.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionStarted => "SESSION_STARTED",
            Self::SessionStopped => "SESSION_STOPPED",
            Self::TranscriptUpdated => "TRANSCRIPT_UPDATED",
            Self::OutputQueued => "OUTPUT_QUEUED",
            Self::OutputStarted => "OUTPUT_STARTED",
            Self::OutputInterrupted => "OUTPUT_INTERRUPTED",
            Self::StreamRetry => "STREAM_RETRY",
            Self::StreamFailed => "STREAM_FAILED",
        }
    }
}

impl std::fmt::Display for VoiceEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VoiceEventKind {
    type Err = ParseVoiceEventKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SESSION_STARTED" => Ok(Self::SessionStarted),
            "SESSION_STOPPED" => Ok(Self::SessionStopped),
            "TRANSCRIPT_UPDATED" => Ok(Self::TranscriptUpdated),
            "OUTPUT_QUEUED" => Ok(Self::OutputQueued),
            "OUTPUT_STARTED" => Ok(Self::OutputStarted),
            "OUTPUT_INTERRUPTED" => Ok(Self::OutputInterrupted),
            "STREAM_RETRY" => Ok(Self::StreamRetry),
            "STREAM_FAILED" => Ok(Self::StreamFailed),
            _ => Err(ParseVoiceEventKindError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown voice event name.
#[derive(Debug, Clone)]
pub struct ParseVoiceEventKindError(pub String);

impl std::fmt::Display for ParseVoiceEventKindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown voice event: {}", self.0)
    }
}

impl std::error::Error for ParseVoiceEventKindError {}

/// Why a stream could not proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamFailureReason {
    /// No active context was available to anchor narration.
    MissingActiveContext,
    /// The speech-to-text provider failed.
    SttProviderFailed,
    /// The text-to-speech provider failed.
    TtsProviderFailed,
}

/// Structured details for each voice event.
///
/// The `voiceEvent` tag and the camelCase fields are merged into the
/// platform event's `details` object alongside `domain`, `sessionId` and,
/// when known, `segmentId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "voiceEvent",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum VoiceEventPayload {
    // ── Session lifecycle ────────────────────────────────────────────
    /// Capture started (or restarted) for a session.
    SessionStarted {
        /// Input state after the start transition.
        input_state: InputState,
    },

    /// Capture stopped for a session.
    SessionStopped {
        /// Input state after the stop path.
        input_state: InputState,
    },

    // ── Transcript ───────────────────────────────────────────────────
    /// The transcript buffer or its state changed.
    TranscriptUpdated {
        /// Transcript state after the change.
        transcript_state: TranscriptState,
        /// Length of the transcript buffer in characters.
        text_length: usize,
    },

    // ── Output ───────────────────────────────────────────────────────
    /// A speech plan was queued for playback.
    OutputQueued {
        /// Content-addressed plan id.
        plan_id: String,
        /// Effective narration language.
        language: String,
        /// Effective playback device.
        device_preference: String,
        /// Number of segments in the plan.
        total_segments: usize,
        /// Segments waiting behind the active one.
        pending_segment_ids: Vec<String>,
        /// Size of the synthesized audio.
        audio_bytes: usize,
    },

    /// A segment started (or resumed) playing.
    OutputStarted {
        /// Plan id, when playback starts from a fresh plan.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        plan_id: Option<String>,
        /// Index of the segment inside its plan, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        segment_index: Option<usize>,
        /// Segments still pending behind the active one.
        queue_remaining: usize,
    },

    /// Playback was cut short.
    OutputInterrupted {
        /// What interrupted the output.
        cause: InterruptionCause,
        /// Who interrupted the output.
        actor: Actor,
        /// Segments pending after the active one was re-queued.
        queue_remaining: usize,
    },

    // ── Stream health ────────────────────────────────────────────────
    /// A required upstream input was missing; the runtime will retry.
    StreamRetry {
        reason: StreamFailureReason,
        /// 1-based retry counter.
        retry_attempt: u32,
        max_retries: u32,
        interval_ms: u64,
    },

    /// A stream failed permanently.
    StreamFailed {
        reason: StreamFailureReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_retries: Option<u32>,
        /// Provider blamed for the failure.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider_id: Option<String>,
        /// Provider runtime error code, if the provider reported one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider_code: Option<String>,
        /// Dotted location of the failure.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
    },
}

impl VoiceEventPayload {
    /// Returns the voice event name for this payload.
    pub fn kind(&self) -> VoiceEventKind {
        match self {
            Self::SessionStarted { .. } => VoiceEventKind::SessionStarted,
            Self::SessionStopped { .. } => VoiceEventKind::SessionStopped,
            Self::TranscriptUpdated { .. } => VoiceEventKind::TranscriptUpdated,
            Self::OutputQueued { .. } => VoiceEventKind::OutputQueued,
            Self::OutputStarted { .. } => VoiceEventKind::OutputStarted,
            Self::OutputInterrupted { .. } => VoiceEventKind::OutputInterrupted,
            Self::StreamRetry { .. } => VoiceEventKind::StreamRetry,
            Self::StreamFailed { .. } => VoiceEventKind::StreamFailed,
        }
    }

    /// Returns the platform event type carrying this payload.
    pub fn event_type(&self) -> PlatformEventType {
        match self {
            Self::StreamFailed { .. } => PlatformEventType::ValidationFailed,
            _ => PlatformEventType::PatchApplied,
        }
    }
}

/// Envelope fields stamped on every event an emitter produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    pub modality: String,
    pub artifact: String,
    pub actor: Actor,
}

impl Default for EventMeta {
    fn default() -> Self {
        Self {
            modality: "voice-interface".to_string(),
            artifact: "voice/runtime-session".to_string(),
            actor: Actor::System,
        }
    }
}

/// A single event as delivered to sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// `PATCH_APPLIED` or `VALIDATION_FAILED`.
    #[serde(rename = "type")]
    pub event_type: PlatformEventType,
    pub modality: String,
    pub artifact: String,
    pub actor: Actor,
    /// RFC 3339 timestamp of when the event was created.
    pub timestamp: String,
    /// Structured details; always an object.
    pub details: Map<String, Value>,
}

impl PlatformEvent {
    /// Returns a detail value by key.
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }

    /// Returns the voice event name, if this is a voice event.
    pub fn voice_event(&self) -> Option<VoiceEventKind> {
        self.detail("voiceEvent")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    /// Returns the session id the event belongs to.
    pub fn session_id(&self) -> Option<&str> {
        self.detail("sessionId").and_then(Value::as_str)
    }
}

/// Builds a voice event from an envelope, a session, and a payload.
///
/// The payload's fields are merged into `details`; `domain`, `voiceEvent`
/// and `sessionId` are always present, `segmentId` only when given.
///
/// # Errors
///
/// Returns `ObserveError::EmptyField` if the session or segment id is
/// blank, or `ObserveError::Serialization` if the payload cannot be
/// serialised.
pub fn create_voice_event(
    meta: &EventMeta,
    session_id: &str,
    segment_id: Option<&str>,
    payload: &VoiceEventPayload,
) -> Result<PlatformEvent, ObserveError> {
    if session_id.trim().is_empty() {
        return Err(ObserveError::EmptyField("sessionId"));
    }

    let mut details = match serde_json::to_value(payload)? {
        Value::Object(map) => map,
        _ => return Err(ObserveError::InvalidPayload),
    };
    details.insert("domain".to_string(), Value::from("voice"));
    details.insert(
        "voiceEvent".to_string(),
        Value::from(payload.kind().as_str()),
    );
    details.insert("sessionId".to_string(), Value::from(session_id));

    if let Some(segment_id) = segment_id {
        if segment_id.trim().is_empty() {
            return Err(ObserveError::EmptyField("segmentId"));
        }
        details.insert("segmentId".to_string(), Value::from(segment_id));
    }

    Ok(PlatformEvent {
        event_type: payload.event_type(),
        modality: meta.modality.clone(),
        artifact: meta.artifact.clone(),
        actor: meta.actor,
        timestamp: chrono::Utc::now().to_rfc3339(),
        details,
    })
}
