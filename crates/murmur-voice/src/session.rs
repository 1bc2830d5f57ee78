//! Per-session state owned by the orchestrator.

use murmur_types::{InputState, OutputState, TranscriptState, VoiceSessionPolicy};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Segment queue of the current plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub active_segment_id: Option<String>,
    pub pending_segment_ids: VecDeque<String>,
    pub completed_segment_ids: Vec<String>,
    pub total_segments: usize,
}

impl PlaybackState {
    /// Queues a fresh plan: the first id becomes active.
    pub fn from_segments(segment_ids: Vec<String>) -> Self {
        let total_segments = segment_ids.len();
        let mut pending: VecDeque<String> = segment_ids.into();
        Self {
            active_segment_id: pending.pop_front(),
            pending_segment_ids: pending,
            completed_segment_ids: Vec::new(),
            total_segments,
        }
    }

    /// Moves the active segment back to the front of the queue.
    pub fn requeue_active(&mut self) {
        if let Some(active) = self.active_segment_id.take() {
            self.pending_segment_ids.push_front(active);
        }
    }

    /// Promotes the next pending segment into the active slot.
    pub fn promote_next(&mut self) -> Option<&str> {
        self.active_segment_id = self.pending_segment_ids.pop_front();
        self.active_segment_id.as_deref()
    }

    /// Marks the active segment completed.
    pub fn complete_active(&mut self) -> Option<String> {
        let done = self.active_segment_id.take()?;
        self.completed_segment_ids.push(done.clone());
        Some(done)
    }

    /// `pending + completed + active == total`.
    pub fn is_consistent(&self) -> bool {
        self.pending_segment_ids.len()
            + self.completed_segment_ids.len()
            + usize::from(self.active_segment_id.is_some())
            == self.total_segments
    }
}

/// Snapshot of one voice session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSessionState {
    pub session_id: String,
    pub policy: VoiceSessionPolicy,
    pub input_state: InputState,
    pub transcript_state: TranscriptState,
    pub output_state: OutputState,
    pub transcript_text: String,
    pub playback: PlaybackState,
}

impl VoiceSessionState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            policy: VoiceSessionPolicy::default(),
            input_state: InputState::default(),
            transcript_state: TranscriptState::default(),
            output_state: OutputState::default(),
            transcript_text: String::new(),
            playback: PlaybackState::default(),
        }
    }

    /// Whether the playback invariants hold for the current output state.
    pub fn playback_is_consistent(&self) -> bool {
        let slot_ok =
            self.playback.active_segment_id.is_none() || self.output_state.holds_active_segment();
        slot_ok && self.playback.is_consistent()
    }
}
