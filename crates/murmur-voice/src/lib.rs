//! Voice session orchestration for the Murmur runtime.
//!
//! Turns utterances into a tracked transcript and agent output into
//! spoken segments. Three guarded state machines (input capture,
//! transcript lifecycle, output playback) are driven by the
//! [`VoiceOrchestrator`] under a per-session policy. Speech engines are
//! pluggable providers chosen from a priority chain at startup.
//!
//! The crate owns no networking and no rendering. Transports call the
//! orchestrator's async operations, receive plain result objects, and map
//! [`VoiceError`] onto their own envelopes with [`VoiceError::code`] and
//! [`VoiceError::status`].

pub mod config;
pub mod error;
pub mod fsm;
pub mod narration;
pub mod orchestrator;
pub mod policy;
pub mod provider;
pub mod runtime;
pub mod segment;
pub mod session;

pub use config::{
    CommandAdapterConfig, KokoroConfig, ProviderSelectionConfig, ProvidersConfig,
    SttSelectionConfig, TtsSelectionConfig,
};
pub use error::{
    AllowedTransition, FailedGuard, ProviderErrorCode, ProviderInvocationError, ProviderOperation,
    ProviderPhase, ProviderRuntimeError, StateTransitionError, VoiceError,
};
pub use narration::{
    build_narration_text, select_narration_strategy, NarrationSource, NarrationSourceKind,
    NarrationStrategy,
};
pub use orchestrator::{
    NarrationRequest, OrchestratorDeps, OrchestratorOptions, TranscriptResult, Utterance,
    VoiceOrchestrator,
};
pub use policy::{resolve_policy, resolve_policy_against};
pub use provider::{
    select_providers, ProviderSet, SelectedProviders, SttProvider, SttProviderId, TtsProvider,
    TtsProviderId,
};
pub use runtime::{
    ActiveContextReader, EnvDeviceResolver, PlaybackDeviceResolver, Sleeper, TokioSleeper,
};
pub use segment::{create_plan_id, create_voice_segment_id, split_segments, SpeechPlan};
pub use session::{PlaybackState, VoiceSessionState};
