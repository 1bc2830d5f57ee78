//! Narration strategy selection and narration text building.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::VoiceError;

/// Text longer than this many characters is summarized by default.
pub const NARRATION_SUMMARY_THRESHOLD_CHARS: usize = 600;

const SUMMARY_MAX_CHARS: usize = 160;
const DESCRIPTOR_MAX_CHARS: usize = 120;

/// What kind of content is being narrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrationSourceKind {
    Text,
    Code,
    Diagram,
    Error,
}

/// Transformation applied to content before it is spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrationStrategy {
    Summary,
    SnippetDescriptor,
    VisualExplainer,
    Verbatim,
}

impl NarrationStrategy {
    pub const ALLOWED: &'static [&'static str] =
        &["summary", "snippet_descriptor", "visual_explainer", "verbatim"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::SnippetDescriptor => "snippet_descriptor",
            Self::VisualExplainer => "visual_explainer",
            Self::Verbatim => "verbatim",
        }
    }
}

impl std::fmt::Display for NarrationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NarrationStrategy {
    type Err = murmur_types::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(Self::Summary),
            "snippet_descriptor" => Ok(Self::SnippetDescriptor),
            "visual_explainer" => Ok(Self::VisualExplainer),
            "verbatim" => Ok(Self::Verbatim),
            _ => Err(murmur_types::ParseEnumError {
                value: s.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }
}

/// Content offered for narration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationSource {
    pub kind: NarrationSourceKind,
    pub content: String,
    /// Raw strategy name requested by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_strategy: Option<String>,
}

impl NarrationSource {
    pub fn new(kind: NarrationSourceKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            requested_strategy: None,
        }
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.requested_strategy = Some(strategy.into());
        self
    }
}

/// Picks the narration strategy for `source`.
///
/// Diagrams are always explained and errors always summarized, whatever
/// the caller asked for. Code is described unless verbatim reading is
/// requested. Text honours the request, otherwise falls back on length.
pub fn select_narration_strategy(source: &NarrationSource) -> Result<NarrationStrategy, VoiceError> {
    let content = source.content.trim();
    if content.is_empty() {
        return Err(VoiceError::validation(
            "voice.source.content",
            "content must be a non-empty string",
        ));
    }

    let requested = source
        .requested_strategy
        .as_deref()
        .map(|raw| {
            raw.parse::<NarrationStrategy>().map_err(|err| {
                VoiceError::validation(
                    "voice.source.requestedStrategy",
                    format!("requestedStrategy must be one of: {}", err.allowed_list()),
                )
            })
        })
        .transpose()?;

    let strategy = match source.kind {
        NarrationSourceKind::Diagram => NarrationStrategy::VisualExplainer,
        NarrationSourceKind::Code => match requested {
            Some(NarrationStrategy::Verbatim) => NarrationStrategy::Verbatim,
            _ => NarrationStrategy::SnippetDescriptor,
        },
        NarrationSourceKind::Error => NarrationStrategy::Summary,
        NarrationSourceKind::Text => match requested {
            Some(strategy) => strategy,
            // Measured on the raw content, as submitted.
            None if source.content.chars().count() > NARRATION_SUMMARY_THRESHOLD_CHARS => {
                NarrationStrategy::Summary
            }
            None => NarrationStrategy::Verbatim,
        },
    };
    Ok(strategy)
}

/// Renders the text that will actually be spoken.
pub fn build_narration_text(
    strategy: NarrationStrategy,
    content: &str,
    active_path: &str,
) -> Result<String, VoiceError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(VoiceError::validation(
            "voice.source.content",
            "content must be a non-empty string",
        ));
    }

    Ok(match strategy {
        NarrationStrategy::Summary => truncate_chars(content, SUMMARY_MAX_CHARS).to_string(),
        NarrationStrategy::SnippetDescriptor => format!(
            "Code snippet in {}: {}",
            active_path,
            truncate_chars(content, DESCRIPTOR_MAX_CHARS)
        ),
        NarrationStrategy::VisualExplainer => format!(
            "Diagram explanation for {}: {}",
            active_path,
            truncate_chars(content, DESCRIPTOR_MAX_CHARS)
        ),
        NarrationStrategy::Verbatim => content.to_string(),
    })
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
