//! Voice event layer for the Murmur runtime.
//!
//! Every observable step of a voice session (session lifecycle, transcript
//! updates, output queue changes, retries and failures) is emitted as a
//! [`PlatformEvent`] whose `details` carry `domain = "voice"` together with
//! the session id and the voice event name. Sinks decide where events go:
//! the runtime never stores them itself.
//!
//! # Voice events
//!
//! | Voice event | Platform type |
//! |-------------|---------------|
//! | `SESSION_STARTED`, `SESSION_STOPPED` | `PATCH_APPLIED` |
//! | `TRANSCRIPT_UPDATED` | `PATCH_APPLIED` |
//! | `OUTPUT_QUEUED`, `OUTPUT_STARTED`, `OUTPUT_INTERRUPTED` | `PATCH_APPLIED` |
//! | `STREAM_RETRY` | `PATCH_APPLIED` |
//! | `STREAM_FAILED` | `VALIDATION_FAILED` |
//!
//! # Usage
//!
//! ```rust,ignore
//! use murmur_observe::{create_voice_event, EventMeta, VoiceEventPayload};
//!
//! let event = create_voice_event(
//!     &EventMeta::default(),
//!     "session-1",
//!     None,
//!     &VoiceEventPayload::SessionStarted { input_state: InputState::Listening },
//! )?;
//! sink.emit(event);
//! ```

mod error;
mod event;
mod sink;

pub use error::ObserveError;
pub use event::{
    create_voice_event, EventMeta, ParseVoiceEventKindError, PlatformEvent, PlatformEventType,
    StreamFailureReason, VoiceEventKind, VoiceEventPayload,
};
pub use sink::{MemoryEventSink, TracingEventSink, VoiceEventSink};
