//! Session policy resolution.

use murmur_types::{
    CueProfile, OutputMode, ParseEnumError, PolicyOverrides, TranscriptMode, VoiceSessionPolicy,
};
use std::str::FromStr;

use crate::error::VoiceError;

/// Applies `overrides` onto the default policy.
pub fn resolve_policy(overrides: &PolicyOverrides) -> Result<VoiceSessionPolicy, VoiceError> {
    resolve_policy_against(&VoiceSessionPolicy::default(), overrides)
}

/// Applies `overrides` onto `base` field by field and validates the result.
///
/// Used at policy update time, where the session's current policy is the
/// base rather than the defaults.
pub fn resolve_policy_against(
    base: &VoiceSessionPolicy,
    overrides: &PolicyOverrides,
) -> Result<VoiceSessionPolicy, VoiceError> {
    let transcript_mode = match overrides.transcript_mode.as_deref() {
        Some(raw) => parse_field::<TranscriptMode>("transcriptMode", raw)?,
        None => base.transcript_mode,
    };
    let output_mode = match overrides.output_mode.as_deref() {
        Some(raw) => parse_field::<OutputMode>("outputMode", raw)?,
        None => base.output_mode,
    };
    let cue_profile = match overrides.cue_profile.as_deref() {
        Some(raw) => parse_field::<CueProfile>("cueProfile", raw)?,
        None => base.cue_profile,
    };

    let language = overrides
        .language
        .as_deref()
        .unwrap_or(&base.language)
        .trim()
        .to_string();
    if language.is_empty() {
        return Err(VoiceError::validation(
            "voice.policy.language",
            "language must be a non-empty BCP-47 string",
        ));
    }

    let device_preference = match overrides.device_preference.as_deref() {
        Some(raw) => Some(raw),
        None => base.device_preference.as_deref(),
    };
    let device_preference = match device_preference.map(str::trim) {
        Some("") => {
            return Err(VoiceError::validation(
                "voice.policy.devicePreference",
                "devicePreference must be a non-empty string when provided",
            ))
        }
        other => other.map(str::to_string),
    };

    Ok(VoiceSessionPolicy {
        transcript_mode,
        output_mode,
        barge_in_enabled: overrides.barge_in_enabled.unwrap_or(base.barge_in_enabled),
        expressive_cues_enabled: overrides
            .expressive_cues_enabled
            .unwrap_or(base.expressive_cues_enabled),
        cue_profile,
        language,
        device_preference,
    })
}

fn parse_field<T>(field: &str, raw: &str) -> Result<T, VoiceError>
where
    T: FromStr<Err = ParseEnumError>,
{
    raw.trim().parse::<T>().map_err(|err| {
        VoiceError::validation(
            format!("voice.policy.{}", field),
            format!("{} must be one of: {}", field, err.allowed_list()),
        )
    })
}
