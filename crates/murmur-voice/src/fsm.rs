//! Transition validators for the input, transcript and output machines.
//!
//! Each validator is a pure function of the current state and a trigger.
//! Triggers carry exactly the guard conditions they need, so a missing
//! guard is a compile error rather than a runtime surprise.

use murmur_types::{InputState, OutputState, StateMachine, TranscriptMode, TranscriptState};

use crate::error::{AllowedTransition, FailedGuard, StateTransitionError};

const fn allow(trigger: &'static str, to: &'static str) -> AllowedTransition {
    AllowedTransition { trigger, to }
}

fn guard<S>(holds: bool, failed: FailedGuard, to: S) -> Result<S, Option<FailedGuard>> {
    if holds {
        Ok(to)
    } else {
        Err(Some(failed))
    }
}

// ── Input ────────────────────────────────────────────────────────────

/// Triggers of the input capture machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTrigger {
    /// Start capture. `policy_valid` guards a fresh session,
    /// `new_session` guards a restart from `stopped`.
    StartSession { policy_valid: bool, new_session: bool },
    StopCapture,
    Interrupt { barge_in_enabled: bool },
    TranscriptReady { parse_success: bool },
    ParseError { recoverable: bool },
    ResumeCapture { barge_in_enabled: bool },
    StopSession,
}

impl InputTrigger {
    pub fn name(self) -> &'static str {
        match self {
            Self::StartSession { .. } => "startSession",
            Self::StopCapture => "stopCapture",
            Self::Interrupt { .. } => "interrupt",
            Self::TranscriptReady { .. } => "transcriptReady",
            Self::ParseError { .. } => "parseError",
            Self::ResumeCapture { .. } => "resumeCapture",
            Self::StopSession => "stopSession",
        }
    }
}

/// Legal input transitions out of `from`.
pub fn input_transitions(from: InputState) -> &'static [AllowedTransition] {
    const IDLE: &[AllowedTransition] = &[allow("startSession", "listening")];
    const LISTENING: &[AllowedTransition] = &[
        allow("stopCapture", "processing"),
        allow("interrupt", "interrupted"),
    ];
    const PROCESSING: &[AllowedTransition] = &[
        allow("transcriptReady", "stopped"),
        allow("parseError", "listening"),
    ];
    const INTERRUPTED: &[AllowedTransition] = &[
        allow("resumeCapture", "listening"),
        allow("stopSession", "stopped"),
    ];
    const STOPPED: &[AllowedTransition] = &[allow("startSession", "listening")];

    match from {
        InputState::Idle => IDLE,
        InputState::Listening => LISTENING,
        InputState::Processing => PROCESSING,
        InputState::Interrupted => INTERRUPTED,
        InputState::Stopped => STOPPED,
    }
}

pub fn validate_input_transition(
    from: InputState,
    trigger: InputTrigger,
) -> Result<InputState, StateTransitionError> {
    use InputState as S;
    use InputTrigger as T;

    let outcome = match (from, trigger) {
        (S::Idle, T::StartSession { policy_valid, .. }) => {
            guard(policy_valid, FailedGuard::Unmet("policyValid"), S::Listening)
        }
        (S::Stopped, T::StartSession { new_session, .. }) => {
            guard(new_session, FailedGuard::Unmet("newSession"), S::Listening)
        }
        (S::Listening, T::StopCapture) => Ok(S::Processing),
        (S::Listening, T::Interrupt { barge_in_enabled }) => {
            guard(barge_in_enabled, FailedGuard::BargeInDisabled, S::Interrupted)
        }
        (S::Processing, T::TranscriptReady { parse_success }) => {
            guard(parse_success, FailedGuard::Unmet("parseSuccess"), S::Stopped)
        }
        (S::Processing, T::ParseError { recoverable }) => {
            guard(recoverable, FailedGuard::Unmet("recoverable"), S::Listening)
        }
        (S::Interrupted, T::ResumeCapture { barge_in_enabled }) => {
            guard(barge_in_enabled, FailedGuard::BargeInDisabled, S::Listening)
        }
        (S::Interrupted, T::StopSession) => Ok(S::Stopped),
        _ => Err(None),
    };

    outcome.map_err(|failed| {
        StateTransitionError::new(
            StateMachine::Input,
            from.as_str(),
            trigger.name(),
            failed,
            input_transitions(from).to_vec(),
        )
    })
}

// ── Transcript ───────────────────────────────────────────────────────

/// Triggers of the transcript lifecycle machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptTrigger {
    InterimChunk { has_text: bool },
    Finalize { asr_done: bool },
    EnableEdit { mode: TranscriptMode },
    AutoSend { mode: TranscriptMode },
    Submit { user_confirmed: bool },
    Cancel { user_cancelled: bool },
    NewUtterance { same_session: bool },
}

impl TranscriptTrigger {
    pub fn name(self) -> &'static str {
        match self {
            Self::InterimChunk { .. } => "interimChunk",
            Self::Finalize { .. } => "finalize",
            Self::EnableEdit { .. } => "enableEdit",
            Self::AutoSend { .. } => "autoSend",
            Self::Submit { .. } => "submit",
            Self::Cancel { .. } => "cancel",
            Self::NewUtterance { .. } => "newUtterance",
        }
    }
}

pub fn transcript_transitions(from: TranscriptState) -> &'static [AllowedTransition] {
    const EMPTY: &[AllowedTransition] = &[allow("interimChunk", "interim")];
    const INTERIM: &[AllowedTransition] = &[
        allow("interimChunk", "interim"),
        allow("finalize", "final"),
    ];
    const FINAL: &[AllowedTransition] = &[allow("enableEdit", "editable"), allow("autoSend", "sent")];
    const EDITABLE: &[AllowedTransition] = &[allow("submit", "sent"), allow("cancel", "final")];
    const SENT: &[AllowedTransition] = &[allow("newUtterance", "interim")];

    match from {
        TranscriptState::Empty => EMPTY,
        TranscriptState::Interim => INTERIM,
        TranscriptState::Final => FINAL,
        TranscriptState::Editable => EDITABLE,
        TranscriptState::Sent => SENT,
    }
}

pub fn validate_transcript_transition(
    from: TranscriptState,
    trigger: TranscriptTrigger,
) -> Result<TranscriptState, StateTransitionError> {
    use TranscriptState as S;
    use TranscriptTrigger as T;

    let outcome = match (from, trigger) {
        (S::Empty | S::Interim, T::InterimChunk { has_text }) => {
            guard(has_text, FailedGuard::EmptyText, S::Interim)
        }
        (S::Interim, T::Finalize { asr_done }) => {
            guard(asr_done, FailedGuard::Unmet("asrDone"), S::Final)
        }
        (S::Final, T::EnableEdit { mode }) => guard(
            mode == TranscriptMode::EditBeforeSend,
            FailedGuard::EditRequiresEditMode,
            S::Editable,
        ),
        (S::Final, T::AutoSend { mode }) => guard(
            mode == TranscriptMode::AutomaticSend,
            FailedGuard::AutoSendRequiresAutomaticMode,
            S::Sent,
        ),
        (S::Editable, T::Submit { user_confirmed }) => {
            guard(user_confirmed, FailedGuard::Unmet("userConfirmed"), S::Sent)
        }
        (S::Editable, T::Cancel { user_cancelled }) => {
            guard(user_cancelled, FailedGuard::Unmet("userCancelled"), S::Final)
        }
        (S::Sent, T::NewUtterance { same_session }) => {
            guard(same_session, FailedGuard::Unmet("sameSession"), S::Interim)
        }
        _ => Err(None),
    };

    outcome.map_err(|failed| {
        StateTransitionError::new(
            StateMachine::Transcript,
            from.as_str(),
            trigger.name(),
            failed,
            transcript_transitions(from).to_vec(),
        )
    })
}

// ── Output ───────────────────────────────────────────────────────────

/// Triggers of the output playback machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTrigger {
    EnqueuePlan { output_allowed: bool },
    StartPlayback { device_ready: bool },
    Pause,
    /// `pending_segments` is only consulted when resuming from `interrupted`.
    Resume { pending_segments: bool },
    BargeIn { barge_in_enabled: bool },
    /// `segments_remaining` selects between `queued` and `completed`.
    SegmentDone { segments_remaining: bool },
}

impl OutputTrigger {
    pub fn name(self) -> &'static str {
        match self {
            Self::EnqueuePlan { .. } => "enqueuePlan",
            Self::StartPlayback { .. } => "startPlayback",
            Self::Pause => "pause",
            Self::Resume { .. } => "resume",
            Self::BargeIn { .. } => "bargeIn",
            Self::SegmentDone { .. } => "segmentDone",
        }
    }
}

pub fn output_transitions(from: OutputState) -> &'static [AllowedTransition] {
    const IDLE: &[AllowedTransition] = &[allow("enqueuePlan", "queued")];
    const QUEUED: &[AllowedTransition] = &[allow("startPlayback", "speaking")];
    const SPEAKING: &[AllowedTransition] = &[
        allow("pause", "paused"),
        allow("bargeIn", "interrupted"),
        allow("segmentDone", "queued"),
        allow("segmentDone", "completed"),
    ];
    const PAUSED: &[AllowedTransition] = &[allow("resume", "speaking")];
    const INTERRUPTED: &[AllowedTransition] = &[allow("resume", "queued")];

    match from {
        OutputState::Idle | OutputState::Completed => IDLE,
        OutputState::Queued => QUEUED,
        OutputState::Speaking => SPEAKING,
        OutputState::Paused => PAUSED,
        OutputState::Interrupted => INTERRUPTED,
    }
}

pub fn validate_output_transition(
    from: OutputState,
    trigger: OutputTrigger,
) -> Result<OutputState, StateTransitionError> {
    use OutputState as S;
    use OutputTrigger as T;

    let outcome = match (from, trigger) {
        (S::Idle | S::Completed, T::EnqueuePlan { output_allowed }) => {
            guard(output_allowed, FailedGuard::OutputNotAllowed, S::Queued)
        }
        (S::Queued, T::StartPlayback { device_ready }) => {
            guard(device_ready, FailedGuard::Unmet("deviceReady"), S::Speaking)
        }
        (S::Speaking, T::Pause) => Ok(S::Paused),
        (S::Paused, T::Resume { .. }) => Ok(S::Speaking),
        (S::Speaking, T::BargeIn { barge_in_enabled }) => {
            guard(barge_in_enabled, FailedGuard::BargeInDisabled, S::Interrupted)
        }
        (S::Interrupted, T::Resume { pending_segments }) => {
            guard(pending_segments, FailedGuard::Unmet("pendingSegments"), S::Queued)
        }
        (S::Speaking, T::SegmentDone { segments_remaining }) => Ok(if segments_remaining {
            S::Queued
        } else {
            S::Completed
        }),
        _ => Err(None),
    };

    outcome.map_err(|failed| {
        StateTransitionError::new(
            StateMachine::Output,
            from.as_str(),
            trigger.name(),
            failed,
            output_transitions(from).to_vec(),
        )
    })
}
