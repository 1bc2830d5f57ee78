//! State definitions for the three voice state machines.
//!
//! Each session runs an input-capture machine, a transcript-lifecycle
//! machine, and an output-playback machine. The transition rules live in
//! `murmur-voice`; this module only names the states.

use serde::{Deserialize, Serialize};

/// Identifies one of the three voice state machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMachine {
    /// Microphone capture lifecycle.
    Input,
    /// Transcript buffer lifecycle.
    Transcript,
    /// Speech output playback lifecycle.
    Output,
}

impl StateMachine {
    /// Returns the string label for this machine.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Transcript => "transcript",
            Self::Output => "output",
        }
    }
}

impl std::fmt::Display for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input capture states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputState {
    /// No capture has been started for this session.
    #[default]
    Idle,
    /// Capturing audio from the user.
    Listening,
    /// Capture stopped, recognition in flight.
    Processing,
    /// Capture paused by a barge-in.
    Interrupted,
    /// Session capture finished.
    Stopped,
}

impl InputState {
    /// Returns the string label for this state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Processing => "processing",
            Self::Interrupted => "interrupted",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for InputState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transcript buffer states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptState {
    /// Nothing recognised yet.
    #[default]
    Empty,
    /// Partial recognition result, may still change.
    Interim,
    /// Recognition finished.
    Final,
    /// The user is editing the final text.
    Editable,
    /// The transcript was delivered to the agent.
    Sent,
}

impl TranscriptState {
    /// Returns the string label for this state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Interim => "interim",
            Self::Final => "final",
            Self::Editable => "editable",
            Self::Sent => "sent",
        }
    }
}

impl std::fmt::Display for TranscriptState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Speech output playback states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputState {
    /// No plan has been queued.
    #[default]
    Idle,
    /// A plan is queued and waiting for the device.
    Queued,
    /// A segment is playing.
    Speaking,
    /// Playback paused by the user.
    Paused,
    /// Playback cut short; remaining segments are pending.
    Interrupted,
    /// Every segment of the last plan finished.
    Completed,
}

impl OutputState {
    /// Returns the string label for this state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Queued => "queued",
            Self::Speaking => "speaking",
            Self::Paused => "paused",
            Self::Interrupted => "interrupted",
            Self::Completed => "completed",
        }
    }

    /// Whether a segment may occupy the active playback slot in this state.
    pub fn holds_active_segment(self) -> bool {
        matches!(self, Self::Queued | Self::Speaking | Self::Paused)
    }
}

impl std::fmt::Display for OutputState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
