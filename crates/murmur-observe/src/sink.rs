//! Event sinks.
//!
//! The orchestrator hands every event to a [`VoiceEventSink`]. Emission is
//! fire-and-forget: a sink must not block and cannot fail the operation
//! that produced the event.

use std::sync::Mutex;

use crate::event::{PlatformEvent, PlatformEventType, VoiceEventKind};

/// Receiver of voice events.
pub trait VoiceEventSink: Send + Sync {
    /// Delivers one event.
    fn emit(&self, event: PlatformEvent);
}

/// Sink that keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<PlatformEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all events emitted so far.
    pub fn events(&self) -> Vec<PlatformEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns the events carrying the given voice event name.
    pub fn events_of(&self, kind: VoiceEventKind) -> Vec<PlatformEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.voice_event() == Some(kind))
            .collect()
    }

    /// Returns the most recent event.
    pub fn last(&self) -> Option<PlatformEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .last()
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VoiceEventSink for MemoryEventSink {
    fn emit(&self, event: PlatformEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

/// Sink that writes events to the `tracing` log.
///
/// `VALIDATION_FAILED` events are logged at `warn`, everything else at
/// `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl VoiceEventSink for TracingEventSink {
    fn emit(&self, event: PlatformEvent) {
        let voice_event = event
            .voice_event()
            .map(VoiceEventKind::as_str)
            .unwrap_or("<none>");
        let session_id = event.session_id().unwrap_or("<none>");
        let details = serde_json::Value::Object(event.details.clone());

        match event.event_type {
            PlatformEventType::ValidationFailed => tracing::warn!(
                voice_event,
                session_id,
                %details,
                "voice event"
            ),
            PlatformEventType::PatchApplied => tracing::info!(
                voice_event,
                session_id,
                %details,
                "voice event"
            ),
        }
    }
}
