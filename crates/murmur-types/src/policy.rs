//! Voice session policy configuration.

use crate::ParseEnumError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a finalized transcript reaches the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriptMode {
    /// The user reviews (and may edit) the transcript before it is sent.
    #[default]
    EditBeforeSend,
    /// A final transcript is sent without review.
    AutomaticSend,
}

impl TranscriptMode {
    /// Accepted spellings, in declaration order.
    pub const ALLOWED: &'static [&'static str] = &["edit-before-send", "automatic-send"];

    /// Returns the string label for this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EditBeforeSend => "edit-before-send",
            Self::AutomaticSend => "automatic-send",
        }
    }
}

impl FromStr for TranscriptMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "edit-before-send" => Ok(Self::EditBeforeSend),
            "automatic-send" => Ok(Self::AutomaticSend),
            _ => Err(ParseEnumError {
                value: s.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }
}

/// When the runtime is allowed to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// Speech output disabled.
    Off,
    /// Speak only when explicitly asked.
    #[default]
    OnDemand,
    /// Speak when an agent turn completes.
    OnCompletion,
    /// Speak when an error surfaces.
    OnError,
    /// Speak everything.
    Always,
}

impl OutputMode {
    /// Accepted spellings, in declaration order.
    pub const ALLOWED: &'static [&'static str] =
        &["off", "on-demand", "on-completion", "on-error", "always"];

    /// Returns the string label for this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::OnDemand => "on-demand",
            Self::OnCompletion => "on-completion",
            Self::OnError => "on-error",
            Self::Always => "always",
        }
    }

    /// Whether any speech output is permitted.
    pub fn allows_output(self) -> bool {
        self != Self::Off
    }
}

impl FromStr for OutputMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(Self::Off),
            "on-demand" => Ok(Self::OnDemand),
            "on-completion" => Ok(Self::OnCompletion),
            "on-error" => Ok(Self::OnError),
            "always" => Ok(Self::Always),
            _ => Err(ParseEnumError {
                value: s.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }
}

/// Intensity of non-verbal audio cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CueProfile {
    #[default]
    Minimal,
    Balanced,
    Expressive,
}

impl CueProfile {
    /// Accepted spellings, in declaration order.
    pub const ALLOWED: &'static [&'static str] = &["minimal", "balanced", "expressive"];

    /// Returns the string label for this profile.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Balanced => "balanced",
            Self::Expressive => "expressive",
        }
    }
}

impl FromStr for CueProfile {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minimal" => Ok(Self::Minimal),
            "balanced" => Ok(Self::Balanced),
            "expressive" => Ok(Self::Expressive),
            _ => Err(ParseEnumError {
                value: s.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }
}

/// Per-session voice policy.
///
/// Created when a session starts and replaced wholesale on every policy
/// update; it is never partially mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSessionPolicy {
    /// How finalized transcripts are delivered.
    pub transcript_mode: TranscriptMode,
    /// When speech output is permitted.
    pub output_mode: OutputMode,
    /// Whether the user may interrupt speech output.
    pub barge_in_enabled: bool,
    /// Whether non-verbal cues accompany speech.
    pub expressive_cues_enabled: bool,
    /// Cue intensity.
    pub cue_profile: CueProfile,
    /// BCP-47 language tag used for recognition and synthesis.
    pub language: String,
    /// Preferred playback device, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_preference: Option<String>,
}

impl Default for VoiceSessionPolicy {
    fn default() -> Self {
        Self {
            transcript_mode: TranscriptMode::EditBeforeSend,
            output_mode: OutputMode::OnDemand,
            barge_in_enabled: true,
            expressive_cues_enabled: false,
            cue_profile: CueProfile::Minimal,
            language: "en-US".to_string(),
            device_preference: None,
        }
    }
}

/// Partial policy as received from a caller.
///
/// Enumerations and strings are kept raw so that the resolver can reject
/// bad values with a field-qualified message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barge_in_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expressive_cues_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cue_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_preference: Option<String>,
}

impl PolicyOverrides {
    /// Returns `true` when no field is overridden.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
