use murmur_types::StateMachine;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// A `{trigger, to}` pair that is legal from a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AllowedTransition {
    pub trigger: &'static str,
    pub to: &'static str,
}

/// The guard that rejected an otherwise well-formed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailedGuard {
    /// Barge-in is disabled by policy.
    BargeInDisabled,
    /// The output mode forbids speech.
    OutputNotAllowed,
    /// Editing requires `edit-before-send`.
    EditRequiresEditMode,
    /// Automatic send requires `automatic-send`.
    AutoSendRequiresAutomaticMode,
    /// An interim chunk carried no text.
    EmptyText,
    /// Any other named condition that did not hold.
    Unmet(&'static str),
}

impl FailedGuard {
    fn reason(self) -> Option<&'static str> {
        match self {
            Self::BargeInDisabled => Some("barge-in must be enabled"),
            Self::OutputNotAllowed => Some("output policy must allow speech"),
            Self::EditRequiresEditMode => Some("transcriptMode must be edit-before-send"),
            Self::AutoSendRequiresAutomaticMode => Some("transcriptMode must be automatic-send"),
            Self::EmptyText => Some("interimChunk requires non-empty text"),
            Self::Unmet(_) => None,
        }
    }

    fn remediation(self, trigger: &str) -> String {
        match self {
            Self::BargeInDisabled => {
                "Enable policy.bargeInEnabled before interrupting or resuming".to_string()
            }
            Self::OutputNotAllowed => "Set policy.outputMode to a value other than off".to_string(),
            Self::EditRequiresEditMode => {
                "Set policy.transcriptMode to edit-before-send to edit transcripts".to_string()
            }
            Self::AutoSendRequiresAutomaticMode => {
                "Set policy.transcriptMode to automatic-send or edit before sending".to_string()
            }
            Self::EmptyText => "Submit a non-empty utterance".to_string(),
            Self::Unmet(condition) => format!("Satisfy {} before {}", condition, trigger),
        }
    }
}

/// A trigger was not legal for the current state of a voice state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{reason}")]
pub struct StateTransitionError {
    pub state_machine: StateMachine,
    pub from: &'static str,
    pub trigger: &'static str,
    pub reason: String,
    /// Set when the trigger exists for `from` but its guard failed.
    pub failed_guard: Option<FailedGuard>,
    /// Every transition legal from `from`.
    pub allowed: Vec<AllowedTransition>,
}

impl StateTransitionError {
    pub(crate) fn new(
        state_machine: StateMachine,
        from: &'static str,
        trigger: &'static str,
        failed_guard: Option<FailedGuard>,
        allowed: Vec<AllowedTransition>,
    ) -> Self {
        let reason = match failed_guard.and_then(FailedGuard::reason) {
            Some(reason) => reason.to_string(),
            None => format!("invalid {} state transition", state_machine),
        };
        Self {
            state_machine,
            from,
            trigger,
            reason,
            failed_guard,
            allowed,
        }
    }

    /// Human remediation naming what would make the transition legal.
    pub fn remediation(&self) -> String {
        if let Some(guard) = self.failed_guard {
            return guard.remediation(self.trigger);
        }
        let options: Vec<String> = self
            .allowed
            .iter()
            .map(|t| format!("{} -> {}", t.trigger, t.to))
            .collect();
        format!(
            "From {} state '{}' use one of: {}",
            self.state_machine,
            self.from,
            options.join(", ")
        )
    }
}

/// Machine-readable code of a provider runtime failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProviderErrorCode {
    #[serde(rename = "VOICE_PROVIDER_NOT_CONFIGURED")]
    NotConfigured,
    #[serde(rename = "VOICE_PROVIDER_TIMEOUT")]
    Timeout,
    #[serde(rename = "VOICE_PROVIDER_EXEC_FAILED")]
    ExecFailed,
    #[serde(rename = "VOICE_PROVIDER_INVALID_RESPONSE")]
    InvalidResponse,
}

impl ProviderErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotConfigured => "VOICE_PROVIDER_NOT_CONFIGURED",
            Self::Timeout => "VOICE_PROVIDER_TIMEOUT",
            Self::ExecFailed => "VOICE_PROVIDER_EXEC_FAILED",
            Self::InvalidResponse => "VOICE_PROVIDER_INVALID_RESPONSE",
        }
    }

    /// Whether the caller may retry the same request unchanged.
    ///
    /// Only timeouts qualify; the other codes persist until an operator
    /// reconfigures the provider.
    pub fn is_retryable(self) -> bool {
        self == Self::Timeout
    }
}

impl std::fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability being exercised when a provider failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProviderOperation {
    #[serde(rename = "stt.transcribe")]
    SttTranscribe,
    #[serde(rename = "tts.synthesize")]
    TtsSynthesize,
}

impl ProviderOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SttTranscribe => "stt.transcribe",
            Self::TtsSynthesize => "tts.synthesize",
        }
    }

    pub fn phase(self) -> ProviderPhase {
        match self {
            Self::SttTranscribe => ProviderPhase::Stt,
            Self::TtsSynthesize => ProviderPhase::Tts,
        }
    }
}

impl std::fmt::Display for ProviderOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderPhase {
    Stt,
    Tts,
}

/// Failure raised by a provider adapter.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{reason}")]
pub struct ProviderRuntimeError {
    pub code: ProviderErrorCode,
    pub provider_id: &'static str,
    pub operation: ProviderOperation,
    /// Dotted path to the configuration or output that failed.
    pub location: String,
    pub reason: String,
    pub remediation: String,
    pub details: Map<String, Value>,
}

impl ProviderRuntimeError {
    /// No command path is configured for the provider.
    pub fn not_configured(provider_id: &'static str, operation: ProviderOperation) -> Self {
        Self {
            code: ProviderErrorCode::NotConfigured,
            provider_id,
            operation,
            location: format!("voice.providers.{}.commandPath", provider_id),
            reason: format!("{} command path is not configured", provider_id),
            remediation: format!(
                "Set a non-empty commandPath for {} adapter runtime wiring",
                provider_id
            ),
            details: Map::new(),
        }
    }

    /// The provider process exceeded its time budget and was killed.
    pub fn timeout(
        provider_id: &'static str,
        operation: ProviderOperation,
        timeout_ms: u64,
    ) -> Self {
        let mut details = Map::new();
        details.insert("timeoutMs".to_string(), Value::from(timeout_ms));
        Self {
            code: ProviderErrorCode::Timeout,
            provider_id,
            operation,
            location: format!("voice.providers.{}.command", provider_id),
            reason: format!("{} command timed out after {}ms", provider_id, timeout_ms),
            remediation: format!(
                "Increase timeoutMs or reduce {} workload for this request",
                provider_id
            ),
            details,
        }
    }

    /// The provider could not be run or reported failure.
    pub fn exec_failed(
        provider_id: &'static str,
        operation: ProviderOperation,
        location: impl Into<String>,
        reason: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Self {
        Self {
            code: ProviderErrorCode::ExecFailed,
            provider_id,
            operation,
            location: location.into(),
            reason: reason.into(),
            remediation: remediation.into(),
            details: Map::new(),
        }
    }

    /// The provider finished but its output was empty or unparseable.
    pub fn invalid_response(
        provider_id: &'static str,
        operation: ProviderOperation,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            code: ProviderErrorCode::InvalidResponse,
            provider_id,
            operation,
            location: format!("voice.providers.{}.command.stdout", provider_id),
            reason: reason.into(),
            remediation: format!(
                "Ensure {} runtime emits expected output payload on stdout",
                provider_id
            ),
            details: Map::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// A provider failure as surfaced by the orchestrator.
///
/// Always names the provider, the operation, and a remediation hint; the
/// location is rewritten to `voice.providers.{id}.{operation}`.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{reason}")]
pub struct ProviderInvocationError {
    pub phase: ProviderPhase,
    pub provider_id: &'static str,
    pub provider_code: ProviderErrorCode,
    pub operation: ProviderOperation,
    pub reason: String,
    pub location: String,
    pub remediation: String,
    pub details: Map<String, Value>,
}

impl From<ProviderRuntimeError> for ProviderInvocationError {
    fn from(err: ProviderRuntimeError) -> Self {
        Self {
            phase: err.operation.phase(),
            provider_id: err.provider_id,
            provider_code: err.code,
            operation: err.operation,
            location: format!("voice.providers.{}.{}", err.provider_id, err.operation),
            reason: err.reason,
            remediation: err.remediation,
            details: err.details,
        }
    }
}

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error(transparent)]
    Transition(#[from] StateTransitionError),

    #[error("{reason}")]
    Validation { location: String, reason: String },

    #[error("Active context is required before narration")]
    MissingActiveContext,

    #[error(transparent)]
    ProviderInvocation(#[from] ProviderInvocationError),

    #[error("{0}")]
    ProviderUnavailable(String),
}

impl VoiceError {
    pub fn validation(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Transport error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transition(err) if err.failed_guard == Some(FailedGuard::OutputNotAllowed) => {
                "VOICE_OUTPUT_BLOCKED"
            }
            Self::Transition(_) => "VOICE_INVALID_TRANSITION",
            Self::Validation { .. } => "VOICE_BAD_REQUEST",
            Self::MissingActiveContext => "VOICE_ACTIVE_CONTEXT_REQUIRED",
            Self::ProviderInvocation(err) => match err.phase {
                ProviderPhase::Stt => "VOICE_STT_PROVIDER_FAILED",
                ProviderPhase::Tts => "VOICE_TTS_PROVIDER_FAILED",
            },
            Self::ProviderUnavailable(_) => "VOICE_PROVIDER_UNAVAILABLE",
        }
    }

    /// HTTP-equivalent status for transport layers.
    pub fn status(&self) -> u16 {
        match self {
            Self::Transition(_) | Self::MissingActiveContext => 409,
            Self::Validation { .. } => 400,
            Self::ProviderInvocation(_) => 502,
            Self::ProviderUnavailable(_) => 503,
        }
    }

    /// Dotted path of the offending input or component.
    pub fn location(&self) -> String {
        match self {
            Self::Transition(err) => format!("voice.session.{}State", err.state_machine),
            Self::Validation { location, .. } => location.clone(),
            Self::MissingActiveContext => "context.active".to_string(),
            Self::ProviderInvocation(err) => err.location.clone(),
            Self::ProviderUnavailable(_) => "voice.providers".to_string(),
        }
    }

    pub fn remediation(&self) -> String {
        match self {
            Self::Transition(err) => err.remediation(),
            Self::Validation { location, .. } => format!("Correct {} and retry", location),
            Self::MissingActiveContext => {
                "Set the active context before requesting narration".to_string()
            }
            Self::ProviderInvocation(err) => err.remediation.clone(),
            Self::ProviderUnavailable(_) => {
                "Enable a local provider or allow the browser-native fallback".to_string()
            }
        }
    }

    /// Whether retrying the same request may succeed without caller changes.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderInvocation(err) => err.provider_code.is_retryable(),
            _ => false,
        }
    }
}
