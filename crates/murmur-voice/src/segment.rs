//! Speech segmentation, content-addressed ids and speech plans.

use murmur_types::{Actor, InterruptionCause};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::VoiceError;
use crate::narration::NarrationStrategy;

/// Hex characters kept from a digest for plan and segment ids.
const ID_HEX_LEN: usize = 12;

/// Field separator fed to the hasher between id components.
const SEPARATOR: &[u8] = &[0x1f];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentPriority {
    Low,
    #[default]
    Normal,
    High,
}

/// One sentence-granularity unit of queued speech.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechPlanSegment {
    pub segment_id: String,
    pub text: String,
    /// Mirrors the session's barge-in policy at plan time.
    pub allow_barge_in: bool,
    pub cue_hints: Vec<String>,
    pub priority: SegmentPriority,
    pub started_at: String,
    pub ended_at: String,
    pub interruption_cause: Option<InterruptionCause>,
    pub actor: Actor,
}

/// The result of one narration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechPlan {
    pub plan_id: String,
    pub session_id: String,
    pub strategy: NarrationStrategy,
    pub language: String,
    pub device_preference: String,
    pub segments: Vec<SpeechPlanSegment>,
}

impl SpeechPlan {
    pub fn segment_ids(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.segment_id.clone()).collect()
    }
}

/// Splits narration text after sentence-ending punctuation.
///
/// Returns no segments for blank input and the whole trimmed text when
/// there is at most one sentence.
pub fn split_segments(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if !matches!(ch, '.' | '!' | '?') {
            continue;
        }
        let boundary = idx + ch.len_utf8();
        if chars.peek().is_some_and(|(_, next)| next.is_whitespace()) {
            let piece = text[start..boundary].trim();
            if !piece.is_empty() {
                segments.push(piece.to_string());
            }
            while chars.peek().is_some_and(|(_, next)| next.is_whitespace()) {
                chars.next();
            }
            start = chars.peek().map_or(text.len(), |(next_idx, _)| *next_idx);
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        segments.push(tail.to_string());
    }

    if segments.len() <= 1 {
        return vec![text.to_string()];
    }
    segments
}

/// Collapses runs of whitespace and trims.
pub fn normalize_segment_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Content hash of (session, active path, narration text).
pub fn create_plan_id(session_id: &str, active_path: &str, text: &str) -> String {
    digest_id(&[session_id.as_bytes(), active_path.as_bytes(), text.as_bytes()])
}

/// Content hash of (session, plan, index, normalized text).
///
/// Identical inputs always produce the same id, and text that only
/// differs in whitespace collapses to the same id.
pub fn create_voice_segment_id(
    session_id: &str,
    plan_id: &str,
    segment_index: usize,
    text: &str,
) -> Result<String, VoiceError> {
    let session_id = require_non_empty(session_id, "sessionId")?;
    let plan_id = require_non_empty(plan_id, "planId")?;
    let normalized = normalize_segment_text(text);
    if normalized.is_empty() {
        return Err(VoiceError::validation(
            "voice.segment.text",
            "text must be a non-empty string",
        ));
    }

    let index = segment_index.to_string();
    Ok(digest_id(&[
        session_id.as_bytes(),
        plan_id.as_bytes(),
        index.as_bytes(),
        normalized.as_bytes(),
    ]))
}

fn require_non_empty<'a>(value: &'a str, field: &str) -> Result<&'a str, VoiceError> {
    if value.trim().is_empty() {
        return Err(VoiceError::validation(
            format!("voice.segment.{}", field),
            format!("{} must be a non-empty string", field),
        ));
    }
    Ok(value)
}

fn digest_id(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(SEPARATOR);
        }
        hasher.update(part);
    }
    let mut id = hex::encode(hasher.finalize());
    id.truncate(ID_HEX_LEN);
    id
}
