//! Request dispatch for the JSON-lines protocol.
//!
//! Each input line is one JSON object tagged by `op`. An optional `id` is
//! echoed on the response so clients can match answers to requests, which
//! may complete out of order across sessions.

use crate::HubState;
use murmur_types::{ActiveContext, Actor, InterruptionCause, PolicyOverrides};
use murmur_voice::{NarrationRequest, NarrationSource, Utterance, VoiceError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One client request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HubRequest {
    SetActiveContext {
        context: ActiveContext,
    },
    ClearActiveContext,
    StartSession {
        session_id: String,
        #[serde(default)]
        policy: Option<PolicyOverrides>,
    },
    StopSession {
        session_id: String,
    },
    GetSession {
        session_id: String,
    },
    GetPolicy {
        session_id: String,
    },
    PatchPolicy {
        session_id: String,
        policy: PolicyOverrides,
    },
    Utterance {
        session_id: String,
        utterance: Utterance,
    },
    FinalizeTranscript {
        session_id: String,
    },
    EditTranscript {
        session_id: String,
        text: String,
    },
    SendTranscript {
        session_id: String,
    },
    PauseOutput {
        session_id: String,
    },
    ResumeOutput {
        session_id: String,
    },
    InterruptOutput {
        session_id: String,
        #[serde(default)]
        cause: Option<InterruptionCause>,
        #[serde(default)]
        actor: Option<Actor>,
    },
    CompleteSegment {
        session_id: String,
    },
    InterruptSession {
        session_id: String,
        #[serde(default)]
        actor: Option<Actor>,
    },
    Narrate {
        session_id: String,
        source: NarrationSource,
        #[serde(default)]
        language: Option<String>,
    },
}

/// Failure body of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status: u16,
    pub code: String,
    pub location: String,
    pub reason: String,
    pub remediation: String,
}

/// API error type mapping onto response envelopes.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("malformed request: {0}")]
    BadRequest(#[source] serde_json::Error),

    #[error(transparent)]
    Voice(#[from] VoiceError),

    #[error("failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),
}

impl HubError {
    pub fn envelope(&self) -> ErrorEnvelope {
        match self {
            HubError::BadRequest(_) => ErrorEnvelope {
                status: 400,
                code: "VOICE_BAD_REQUEST".to_string(),
                location: "request".to_string(),
                reason: self.to_string(),
                remediation: "Send one JSON object per line with a known op and its fields"
                    .to_string(),
            },
            HubError::Voice(err) => ErrorEnvelope {
                status: err.status(),
                code: err.code().to_string(),
                location: err.location(),
                reason: err.to_string(),
                remediation: err.remediation(),
            },
            HubError::Encode(_) => ErrorEnvelope {
                status: 500,
                code: "VOICE_INTERNAL_ERROR".to_string(),
                location: "response".to_string(),
                reason: self.to_string(),
                remediation: "Retry the request".to_string(),
            },
        }
    }
}

/// One output line answering a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

impl HubResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            id,
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Option<Value>, err: &HubError) -> Self {
        let envelope = err.envelope();
        if envelope.status >= 500 {
            tracing::warn!(code = %envelope.code, location = %envelope.location, error = %err, "request failed");
        } else {
            tracing::debug!(code = %envelope.code, location = %envelope.location, error = %err, "request rejected");
        }
        Self {
            id,
            ok: false,
            result: None,
            error: Some(envelope),
        }
    }
}

/// Parses one input line and dispatches it.
pub async fn handle_line(state: &HubState, line: &str) -> HubResponse {
    let mut value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => return HubResponse::failure(None, &HubError::BadRequest(e)),
    };
    let id = value.as_object_mut().and_then(|fields| fields.remove("id"));

    let request = match serde_json::from_value::<HubRequest>(value) {
        Ok(request) => request,
        Err(e) => return HubResponse::failure(id, &HubError::BadRequest(e)),
    };

    match dispatch(state, request).await {
        Ok(result) => HubResponse::success(id, result),
        Err(err) => HubResponse::failure(id, &err),
    }
}

/// Runs one request against the hub state.
pub async fn dispatch(state: &HubState, request: HubRequest) -> Result<Value, HubError> {
    let voice = &state.orchestrator;
    match request {
        HubRequest::SetActiveContext { context } => to_json(&state.context.set(context)?),
        HubRequest::ClearActiveContext => {
            state.context.clear();
            Ok(Value::Null)
        }
        HubRequest::StartSession { session_id, policy } => {
            to_json(&voice.start_session(&session_id, policy.as_ref()).await?)
        }
        HubRequest::StopSession { session_id } => to_json(&voice.stop_session(&session_id).await?),
        HubRequest::GetSession { session_id } => {
            to_json(&voice.get_session_state(&session_id).await?)
        }
        HubRequest::GetPolicy { session_id } => to_json(&voice.get_policy(&session_id).await?),
        HubRequest::PatchPolicy { session_id, policy } => {
            to_json(&voice.update_policy(&session_id, &policy).await?)
        }
        HubRequest::Utterance {
            session_id,
            utterance,
        } => to_json(&voice.handle_utterance(&session_id, &utterance).await?),
        HubRequest::FinalizeTranscript { session_id } => {
            to_json(&voice.finalize_transcript(&session_id).await?)
        }
        HubRequest::EditTranscript { session_id, text } => {
            to_json(&voice.edit_transcript(&session_id, &text).await?)
        }
        HubRequest::SendTranscript { session_id } => {
            to_json(&voice.send_transcript(&session_id).await?)
        }
        HubRequest::PauseOutput { session_id } => to_json(&voice.pause_output(&session_id).await?),
        HubRequest::ResumeOutput { session_id } => {
            to_json(&voice.resume_output(&session_id).await?)
        }
        HubRequest::InterruptOutput {
            session_id,
            cause,
            actor,
        } => to_json(&voice.interrupt_output(&session_id, cause, actor).await?),
        HubRequest::CompleteSegment { session_id } => {
            to_json(&voice.complete_segment(&session_id).await?)
        }
        HubRequest::InterruptSession { session_id, actor } => {
            to_json(&voice.interrupt_session(&session_id, actor).await?)
        }
        HubRequest::Narrate {
            session_id,
            source,
            language,
        } => {
            let request = NarrationRequest { source, language };
            to_json(&voice.narrate_from_active_context(&session_id, &request).await?)
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, HubError> {
    serde_json::to_value(value).map_err(HubError::Encode)
}
