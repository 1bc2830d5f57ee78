//! Shared types and constants for the Murmur voice runtime.
//!
//! This crate provides the foundational types used across all Murmur crates:
//! the state enums of the three voice state machines, the session policy and
//! its wire-level overrides, participant actors, and the active-context
//! anchor that narration is resolved against.
//!
//! No crate in the workspace depends on anything *except* `murmur-types` for
//! cross-cutting type definitions. This keeps the dependency graph clean and
//! prevents circular dependencies.

use serde::{Deserialize, Serialize};

pub mod policy;
pub mod voice;

pub use policy::{CueProfile, OutputMode, PolicyOverrides, TranscriptMode, VoiceSessionPolicy};
pub use voice::{InputState, OutputState, StateMachine, TranscriptState};

/// Who caused an action: the human, the automated agent, or the runtime itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    /// The human participant.
    User,
    /// The automated agent.
    Agent,
    /// The voice runtime.
    #[default]
    System,
}

impl Actor {
    /// Returns the string label for this actor.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a speech segment stopped before it finished playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterruptionCause {
    /// The user started speaking over the output.
    #[serde(rename = "barge-in")]
    BargeIn,
    /// The runtime stopped playback.
    #[serde(rename = "system")]
    System,
    /// The user explicitly stopped playback.
    #[serde(rename = "user")]
    User,
}

impl InterruptionCause {
    /// Returns the string label for this cause.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BargeIn => "barge-in",
            Self::System => "system",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for InterruptionCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line range inside the active artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveLocation {
    /// First line (1-based).
    pub start_line: u32,
    /// Last line (inclusive).
    pub end_line: u32,
}

/// Artifact-side payload of the active context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveContextData {
    /// Workspace-relative path of the artifact in focus.
    pub path: String,
    /// Optional focused range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ActiveLocation>,
}

/// The artifact currently in focus elsewhere in the workspace.
///
/// Narration plans are anchored to this path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveContext {
    /// The modality that owns the artifact (e.g. `editor`, `whiteboard`).
    pub modality: String,
    /// Artifact reference.
    pub data: ActiveContextData,
}

impl ActiveContext {
    /// Creates an active context for `path` without a focused range.
    pub fn new(modality: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            modality: modality.into(),
            data: ActiveContextData {
                path: path.into(),
                location: None,
            },
        }
    }

    /// Returns the artifact path.
    pub fn path(&self) -> &str {
        &self.data.path
    }
}

/// Error returned when parsing a value outside of a closed string enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    /// The rejected input.
    pub value: String,
    /// The accepted spellings.
    pub allowed: &'static [&'static str],
}

impl ParseEnumError {
    /// Returns the accepted spellings joined with `", "`.
    pub fn allowed_list(&self) -> String {
        self.allowed.join(", ")
    }
}

impl std::fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown value '{}', expected one of: {}",
            self.value,
            self.allowed_list()
        )
    }
}

impl std::error::Error for ParseEnumError {}
