mod common;

use common::{
    browser_providers, harness, harness_with_device, harness_with_options, CountingTts,
    FailingStt, FakeContextReader, FixedStt,
};
use murmur_observe::{PlatformEventType, VoiceEventKind};
use murmur_types::{
    ActiveContext, Actor, InputState, InterruptionCause, OutputState, PolicyOverrides,
    TranscriptState,
};
use murmur_voice::provider::BrowserNativeSttAdapter;
use murmur_voice::{
    ActiveContextReader, NarrationRequest, NarrationSource, NarrationSourceKind,
    NarrationStrategy, OrchestratorOptions, ProviderOperation, ProviderRuntimeError, SelectedProviders, Utterance,
    VoiceError,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn text_request(content: &str) -> NarrationRequest {
    NarrationRequest {
        source: NarrationSource::new(NarrationSourceKind::Text, content),
        language: Some("en-US".to_string()),
    }
}

const THREE_SEGMENTS: &str = "Segment one. Segment two. Segment three.";

#[tokio::test]
async fn narration_end_to_end_queues_three_segments() {
    let h = harness(FakeContextReader::with_path("docs/readme.md"), browser_providers());
    h.orchestrator.start_session("s1", None).await.unwrap();

    let plan = h
        .orchestrator
        .narrate_from_active_context("s1", &text_request(THREE_SEGMENTS))
        .await
        .unwrap();

    assert_eq!(plan.strategy, NarrationStrategy::Verbatim);
    assert_eq!(plan.segments.len(), 3);
    assert_eq!(plan.language, "en-US");
    assert_eq!(plan.device_preference, "server");
    for segment in &plan.segments {
        assert_eq!(segment.actor, Actor::System);
        assert!(segment.interruption_cause.is_none());
        assert!(segment.allow_barge_in);
    }

    let state = h.orchestrator.get_session_state("s1").await.unwrap();
    assert_eq!(state.output_state, OutputState::Speaking);
    assert_eq!(state.playback.total_segments, 3);
    assert_eq!(state.playback.pending_segment_ids.len(), 2);
    assert_eq!(
        state.playback.active_segment_id.as_deref(),
        Some(plan.segments[0].segment_id.as_str())
    );
    assert!(state.playback_is_consistent());

    let queued = h.sink.events_of(VoiceEventKind::OutputQueued);
    assert_eq!(queued.len(), 1);
    assert_eq!(
        queued[0].detail("planId").and_then(|v| v.as_str()),
        Some(plan.plan_id.as_str())
    );
    let started = h.sink.events_of(VoiceEventKind::OutputStarted);
    assert_eq!(
        started[0].detail("segmentId").and_then(|v| v.as_str()),
        Some(plan.segments[0].segment_id.as_str())
    );
}

#[tokio::test]
async fn narration_is_reproducible_for_identical_inputs() {
    let h = harness(FakeContextReader::with_path("a.md"), browser_providers());
    let first = h
        .orchestrator
        .narrate_from_active_context("s1", &text_request(THREE_SEGMENTS))
        .await
        .unwrap();
    h.orchestrator.complete_segment("s1").await.unwrap();
    h.orchestrator.complete_segment("s1").await.unwrap();
    h.orchestrator.complete_segment("s1").await.unwrap();

    let second = h
        .orchestrator
        .narrate_from_active_context("s1", &text_request(THREE_SEGMENTS))
        .await
        .unwrap();
    assert_eq!(first.plan_id, second.plan_id);
    assert_eq!(first.segment_ids(), second.segment_ids());
}

#[tokio::test]
async fn missing_context_retries_then_fails() {
    let h = harness(FakeContextReader::empty(), browser_providers());

    let err = h
        .orchestrator
        .narrate_from_active_context("s1", &text_request("Hello."))
        .await
        .unwrap_err();
    assert!(matches!(err, VoiceError::MissingActiveContext));
    assert_eq!(err.code(), "VOICE_ACTIVE_CONTEXT_REQUIRED");
    assert_eq!(err.status(), 409);

    assert_eq!(h.reader.reads(), 4);
    assert_eq!(
        *h.sleeper.waits.lock().unwrap(),
        vec![Duration::from_millis(1000); 3]
    );

    let retries = h.sink.events_of(VoiceEventKind::StreamRetry);
    let attempts: Vec<u64> = retries
        .iter()
        .filter_map(|e| e.detail("retryAttempt").and_then(|v| v.as_u64()))
        .collect();
    assert_eq!(attempts, vec![1, 2, 3]);

    let failed = h.sink.last().expect("failure event");
    assert_eq!(failed.voice_event(), Some(VoiceEventKind::StreamFailed));
    assert_eq!(failed.event_type, PlatformEventType::ValidationFailed);
    assert_eq!(
        failed.detail("reason").and_then(|v| v.as_str()),
        Some("missing_active_context")
    );

    let state = h.orchestrator.get_session_state("s1").await.unwrap();
    assert_eq!(state.output_state, OutputState::Idle);
}

#[tokio::test]
async fn oversized_retry_interval_saturates_in_events() {
    let options = OrchestratorOptions {
        max_retries: 1,
        retry_interval: Duration::from_secs(u64::MAX),
        ..OrchestratorOptions::default()
    };
    assert_eq!(options.retry_interval_ms(), u64::MAX);
    let h = harness_with_options(FakeContextReader::empty(), browser_providers(), options);

    let err = h
        .orchestrator
        .narrate_from_active_context("s1", &text_request("Hello."))
        .await
        .unwrap_err();
    assert!(matches!(err, VoiceError::MissingActiveContext));

    let retries = h.sink.events_of(VoiceEventKind::StreamRetry);
    assert_eq!(retries.len(), 1);
    assert_eq!(
        retries[0].detail("intervalMs").and_then(|v| v.as_u64()),
        Some(u64::MAX)
    );
}

#[tokio::test]
async fn context_arriving_during_retry_is_used() {
    struct LateReader {
        inner: Arc<FakeContextReader>,
    }

    #[async_trait::async_trait]
    impl ActiveContextReader for LateReader {
        async fn active_context(&self) -> Option<ActiveContext> {
            let found = self.inner.active_context().await;
            if self.inner.reads() == 2 {
                self.inner.set(Some(ActiveContext::new("editor", "late.md")));
            }
            found
        }
    }

    let inner = FakeContextReader::empty();
    let h = harness(inner.clone(), browser_providers());
    let deps = murmur_voice::OrchestratorDeps {
        context_reader: Arc::new(LateReader {
            inner: inner.clone(),
        }),
        event_sink: h.sink.clone(),
        providers: browser_providers(),
        sleeper: h.sleeper.clone(),
        device_resolver: Arc::new(murmur_voice::EnvDeviceResolver),
    };
    let orchestrator =
        murmur_voice::VoiceOrchestrator::new(deps, murmur_voice::OrchestratorOptions::default());

    let plan = orchestrator
        .narrate_from_active_context("s1", &text_request("Hello there."))
        .await
        .unwrap();
    assert_eq!(plan.segments.len(), 1);
    assert_eq!(h.sink.events_of(VoiceEventKind::StreamRetry).len(), 2);
    assert!(h.sink.events_of(VoiceEventKind::StreamFailed).is_empty());
}

#[tokio::test]
async fn output_off_blocks_before_synthesis() {
    let tts = Arc::new(CountingTts::default());
    let providers = SelectedProviders {
        stt: Arc::new(BrowserNativeSttAdapter::new()),
        tts: tts.clone(),
    };
    let h = harness(FakeContextReader::with_path("a.md"), providers);
    let overrides = PolicyOverrides {
        output_mode: Some("off".to_string()),
        ..PolicyOverrides::default()
    };
    h.orchestrator.start_session("s1", Some(&overrides)).await.unwrap();

    let err = h
        .orchestrator
        .narrate_from_active_context("s1", &text_request("Hello."))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VOICE_OUTPUT_BLOCKED");
    assert_eq!(err.to_string(), "output policy must allow speech");
    assert_eq!(tts.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn tts_failure_emits_stream_failed_and_leaves_state() {
    let tts = Arc::new(CountingTts {
        failure: Some(ProviderRuntimeError::exec_failed(
            "kokoro",
            ProviderOperation::TtsSynthesize,
            "kokoro.synthesize",
            "Kokoro TTS synthesis failed: model missing",
            "Install the model",
        )),
        ..CountingTts::default()
    });
    let providers = SelectedProviders {
        stt: Arc::new(BrowserNativeSttAdapter::new()),
        tts,
    };
    let h = harness(FakeContextReader::with_path("a.md"), providers);

    let err = h
        .orchestrator
        .narrate_from_active_context("s1", &text_request("Hello."))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VOICE_TTS_PROVIDER_FAILED");
    assert_eq!(err.location(), "voice.providers.kokoro.tts.synthesize");
    assert_eq!(err.remediation(), "Install the model");

    let failed = h.sink.events_of(VoiceEventKind::StreamFailed);
    assert_eq!(failed.len(), 1);
    assert_eq!(
        failed[0].detail("reason").and_then(|v| v.as_str()),
        Some("tts_provider_failed")
    );
    assert_eq!(
        failed[0].detail("providerCode").and_then(|v| v.as_str()),
        Some("VOICE_PROVIDER_EXEC_FAILED")
    );

    let state = h.orchestrator.get_session_state("s1").await.unwrap();
    assert_eq!(state.output_state, OutputState::Idle);
    assert_eq!(state.playback.total_segments, 0);
}

#[tokio::test]
async fn audio_utterance_goes_through_stt() {
    let h = harness(FakeContextReader::empty(), browser_providers());
    h.orchestrator.start_session("s1", None).await.unwrap();

    // base64("open the file")
    let result = h
        .orchestrator
        .handle_utterance(
            "s1",
            &Utterance::AudioChunk {
                text: "b3BlbiB0aGUgZmlsZQ==".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(result.text, "open the file");
    assert_eq!(result.transcript_state, TranscriptState::Interim);

    let updated = h.sink.events_of(VoiceEventKind::TranscriptUpdated);
    assert_eq!(
        updated[0].detail("textLength").and_then(|v| v.as_u64()),
        Some(13)
    );
}

#[tokio::test]
async fn stt_failure_is_wrapped() {
    let providers = SelectedProviders {
        stt: Arc::new(FailingStt(ProviderRuntimeError::timeout(
            "whisper.cpp",
            ProviderOperation::SttTranscribe,
            15_000,
        ))),
        tts: browser_providers().tts,
    };
    let h = harness(FakeContextReader::empty(), providers);

    let err = h
        .orchestrator
        .handle_utterance(
            "s1",
            &Utterance::AudioChunk {
                text: "AAAA".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VOICE_STT_PROVIDER_FAILED");
    assert_eq!(err.status(), 502);
    assert!(err.is_retryable());

    let failed = h.sink.events_of(VoiceEventKind::StreamFailed);
    assert_eq!(
        failed[0].detail("providerId").and_then(|v| v.as_str()),
        Some("whisper.cpp")
    );
    assert_eq!(
        failed[0].detail("location").and_then(|v| v.as_str()),
        Some("voice.providers.whisper.cpp.stt.transcribe")
    );

    let state = h.orchestrator.get_session_state("s1").await.unwrap();
    assert_eq!(state.transcript_state, TranscriptState::Empty);
}

#[tokio::test]
async fn blank_transcript_is_a_provider_failure() {
    let providers = SelectedProviders {
        stt: Arc::new(FixedStt("   ")),
        tts: browser_providers().tts,
    };
    let h = harness(FakeContextReader::empty(), providers);

    let err = h
        .orchestrator
        .handle_utterance(
            "s1",
            &Utterance::AudioChunk {
                text: "AAAA".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VOICE_STT_PROVIDER_FAILED");
    assert_eq!(err.status(), 502);
    assert!(!err.is_retryable());

    let failed = h.sink.events_of(VoiceEventKind::StreamFailed);
    assert_eq!(failed.len(), 1);
    assert_eq!(
        failed[0].detail("reason").and_then(|v| v.as_str()),
        Some("stt_provider_failed")
    );
    assert_eq!(
        failed[0].detail("providerId").and_then(|v| v.as_str()),
        Some("faster-whisper")
    );
    assert_eq!(
        failed[0].detail("providerCode").and_then(|v| v.as_str()),
        Some("VOICE_PROVIDER_INVALID_RESPONSE")
    );

    let state = h.orchestrator.get_session_state("s1").await.unwrap();
    assert_eq!(state.transcript_state, TranscriptState::Empty);
}

#[tokio::test]
async fn bad_base64_is_a_bad_request() {
    let h = harness(FakeContextReader::empty(), browser_providers());
    let err = h
        .orchestrator
        .handle_utterance(
            "s1",
            &Utterance::AudioChunk {
                text: "not base64!!".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VOICE_BAD_REQUEST");
}

#[tokio::test]
async fn transcript_edit_before_send_flow() {
    let h = harness(FakeContextReader::empty(), browser_providers());
    let o = &h.orchestrator;
    o.start_session("s1", None).await.unwrap();
    o.handle_utterance(
        "s1",
        &Utterance::TranscriptText {
            text: "draft".to_string(),
        },
    )
    .await
    .unwrap();
    let fin = o.finalize_transcript("s1").await.unwrap();
    assert_eq!(fin.transcript_state, TranscriptState::Final);

    let edited = o.edit_transcript("s1", "final words").await.unwrap();
    assert_eq!(edited.transcript_state, TranscriptState::Editable);
    assert_eq!(edited.text, "final words");

    let sent = o.send_transcript("s1").await.unwrap();
    assert_eq!(sent.transcript_state, TranscriptState::Sent);
    assert_eq!(sent.text, "final words");

    // A new utterance after sending starts a fresh interim transcript.
    let next = o
        .handle_utterance(
            "s1",
            &Utterance::TranscriptText {
                text: "again".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(next.transcript_state, TranscriptState::Interim);
    assert_eq!(next.text, "again");
}

#[tokio::test]
async fn automatic_send_skips_edit() {
    let h = harness(FakeContextReader::empty(), browser_providers());
    let o = &h.orchestrator;
    let overrides = PolicyOverrides {
        transcript_mode: Some("automatic-send".to_string()),
        ..PolicyOverrides::default()
    };
    o.start_session("s1", Some(&overrides)).await.unwrap();
    o.handle_utterance(
        "s1",
        &Utterance::TranscriptText {
            text: "ship it".to_string(),
        },
    )
    .await
    .unwrap();
    o.finalize_transcript("s1").await.unwrap();

    let err = o.edit_transcript("s1", "changed").await.unwrap_err();
    assert_eq!(err.code(), "VOICE_INVALID_TRANSITION");
    assert_eq!(err.to_string(), "transcriptMode must be edit-before-send");

    let sent = o.send_transcript("s1").await.unwrap();
    assert_eq!(sent.transcript_state, TranscriptState::Sent);
}

#[tokio::test]
async fn interrupt_then_resume_restores_active_segment() {
    let h = harness(FakeContextReader::with_path("a.md"), browser_providers());
    let o = &h.orchestrator;
    let plan = o
        .narrate_from_active_context("s1", &text_request(THREE_SEGMENTS))
        .await
        .unwrap();

    let interrupted = o
        .interrupt_output("s1", Some(InterruptionCause::User), Some(Actor::User))
        .await
        .unwrap();
    assert_eq!(interrupted.output_state, OutputState::Interrupted);
    assert!(interrupted.playback.active_segment_id.is_none());
    assert_eq!(interrupted.playback.pending_segment_ids.len(), 3);
    assert!(interrupted.playback_is_consistent());

    let resumed = o.resume_output("s1").await.unwrap();
    assert_eq!(resumed.output_state, OutputState::Speaking);
    assert_eq!(
        resumed.playback.active_segment_id.as_deref(),
        Some(plan.segments[0].segment_id.as_str())
    );
    assert_eq!(resumed.playback.pending_segment_ids.len(), 2);
    assert!(resumed.playback_is_consistent());

    let event = h.sink.events_of(VoiceEventKind::OutputInterrupted);
    assert_eq!(event[0].detail("cause").and_then(|v| v.as_str()), Some("user"));
    assert_eq!(event[0].detail("queueRemaining").and_then(|v| v.as_u64()), Some(3));
}

#[tokio::test]
async fn pause_and_resume_keep_the_active_segment() {
    let h = harness(FakeContextReader::with_path("a.md"), browser_providers());
    let o = &h.orchestrator;
    o.narrate_from_active_context("s1", &text_request(THREE_SEGMENTS))
        .await
        .unwrap();
    let paused = o.pause_output("s1").await.unwrap();
    assert_eq!(paused.output_state, OutputState::Paused);
    assert!(paused.playback_is_consistent());

    let resumed = o.resume_output("s1").await.unwrap();
    assert_eq!(resumed.output_state, OutputState::Speaking);
    assert_eq!(resumed.playback, paused.playback);
}

#[tokio::test]
async fn barge_in_disabled_rejects_barge_in_cause_only() {
    let h = harness(FakeContextReader::with_path("a.md"), browser_providers());
    let o = &h.orchestrator;
    let overrides = PolicyOverrides {
        barge_in_enabled: Some(false),
        ..PolicyOverrides::default()
    };
    o.start_session("s1", Some(&overrides)).await.unwrap();
    o.narrate_from_active_context("s1", &text_request(THREE_SEGMENTS))
        .await
        .unwrap();

    let err = o
        .interrupt_output("s1", Some(InterruptionCause::BargeIn), None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "barge-in must be enabled");

    let state = o
        .interrupt_output("s1", Some(InterruptionCause::System), Some(Actor::System))
        .await
        .unwrap();
    assert_eq!(state.output_state, OutputState::Interrupted);
}

#[tokio::test]
async fn interrupt_session_cascades_into_output() {
    let h = harness(FakeContextReader::with_path("a.md"), browser_providers());
    let o = &h.orchestrator;
    o.start_session("s1", None).await.unwrap();
    o.narrate_from_active_context("s1", &text_request(THREE_SEGMENTS))
        .await
        .unwrap();

    let state = o.interrupt_session("s1", None).await.unwrap();
    assert_eq!(state.input_state, InputState::Interrupted);
    assert_eq!(state.output_state, OutputState::Interrupted);

    let event = h.sink.events_of(VoiceEventKind::OutputInterrupted);
    assert_eq!(
        event[0].detail("cause").and_then(|v| v.as_str()),
        Some("barge-in")
    );

    let stopped = o.stop_session("s1").await.unwrap();
    assert_eq!(stopped.input_state, InputState::Stopped);
}

#[tokio::test]
async fn complete_segment_walks_the_queue() {
    let h = harness(FakeContextReader::with_path("a.md"), browser_providers());
    let o = &h.orchestrator;
    let plan = o
        .narrate_from_active_context("s1", &text_request(THREE_SEGMENTS))
        .await
        .unwrap();

    let second = o.complete_segment("s1").await.unwrap();
    assert_eq!(second.output_state, OutputState::Speaking);
    assert_eq!(
        second.playback.active_segment_id.as_deref(),
        Some(plan.segments[1].segment_id.as_str())
    );
    o.complete_segment("s1").await.unwrap();
    let done = o.complete_segment("s1").await.unwrap();
    assert_eq!(done.output_state, OutputState::Completed);
    assert!(done.playback.active_segment_id.is_none());
    assert_eq!(done.playback.completed_segment_ids, plan.segment_ids());
    assert!(done.playback_is_consistent());

    let err = o.complete_segment("s1").await.unwrap_err();
    assert_eq!(err.code(), "VOICE_INVALID_TRANSITION");
}

#[tokio::test]
async fn session_restart_preserves_state() {
    let h = harness(FakeContextReader::empty(), browser_providers());
    let o = &h.orchestrator;
    o.start_session("s1", None).await.unwrap();
    o.handle_utterance(
        "s1",
        &Utterance::TranscriptText {
            text: "keep me".to_string(),
        },
    )
    .await
    .unwrap();
    o.stop_session("s1").await.unwrap();

    let restarted = o.start_session("s1", None).await.unwrap();
    assert_eq!(restarted.input_state, InputState::Listening);
    assert_eq!(restarted.transcript_text, "keep me");

    let err = o.start_session("s1", None).await.unwrap_err();
    match err {
        VoiceError::Transition(err) => {
            assert_eq!(err.from, "listening");
            assert_eq!(err.allowed.len(), 2);
        }
        other => panic!("expected transition error, got {:?}", other),
    }

    assert_eq!(h.sink.events_of(VoiceEventKind::SessionStarted).len(), 2);
    assert_eq!(h.sink.events_of(VoiceEventKind::SessionStopped).len(), 1);
}

#[tokio::test]
async fn stop_from_idle_is_invalid() {
    let h = harness(FakeContextReader::empty(), browser_providers());
    let err = h.orchestrator.stop_session("fresh").await.unwrap_err();
    assert_eq!(err.status(), 409);
    assert_eq!(err.location(), "voice.session.inputState");
}

#[tokio::test]
async fn policy_updates_merge_against_current() {
    let h = harness(FakeContextReader::empty(), browser_providers());
    let o = &h.orchestrator;
    o.update_policy(
        "s1",
        &PolicyOverrides {
            language: Some("fr-FR".to_string()),
            ..PolicyOverrides::default()
        },
    )
    .await
    .unwrap();
    let policy = o
        .update_policy(
            "s1",
            &PolicyOverrides {
                cue_profile: Some("balanced".to_string()),
                ..PolicyOverrides::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(policy.language, "fr-FR");
    assert_eq!(o.get_policy("s1").await.unwrap(), policy);

    let err = o
        .update_policy(
            "s1",
            &PolicyOverrides {
                output_mode: Some("loud".to_string()),
                ..PolicyOverrides::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.location(), "voice.policy.outputMode");
    assert_eq!(o.get_policy("s1").await.unwrap(), policy);
}

#[tokio::test]
async fn language_and_device_resolution() {
    let h = harness_with_device(
        FakeContextReader::with_path("a.md"),
        browser_providers(),
        Some("hdmi-out"),
    );
    let o = &h.orchestrator;
    o.update_policy(
        "s1",
        &PolicyOverrides {
            language: Some("de-DE".to_string()),
            ..PolicyOverrides::default()
        },
    )
    .await
    .unwrap();

    let plan = o
        .narrate_from_active_context(
            "s1",
            &NarrationRequest {
                source: NarrationSource::new(NarrationSourceKind::Text, "Hallo."),
                language: Some("  ".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(plan.language, "de-DE");
    assert_eq!(plan.device_preference, "hdmi-out");
}

#[tokio::test]
async fn blank_session_id_is_rejected() {
    let h = harness(FakeContextReader::empty(), browser_providers());
    let err = h.orchestrator.get_session_state("  ").await.unwrap_err();
    assert_eq!(err.code(), "VOICE_BAD_REQUEST");
    assert_eq!(err.location(), "voice.sessionId");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_narrations_keep_playback_consistent() {
    let tts = Arc::new(CountingTts::default());
    let providers = SelectedProviders {
        stt: Arc::new(BrowserNativeSttAdapter::new()),
        tts: tts.clone(),
    };
    let h = harness(FakeContextReader::with_path("a.md"), providers);

    let mut tasks = Vec::new();
    for i in 0..8 {
        let o = h.orchestrator.clone();
        tasks.push(tokio::spawn(async move {
            let content = format!("Run {i} first. Run {i} second.");
            o.narrate_from_active_context("shared", &text_request(&content))
                .await
        }));
    }

    let mut ok = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => ok += 1,
            Err(err) => assert_eq!(err.code(), "VOICE_INVALID_TRANSITION"),
        }
    }
    // The first narration leaves output speaking, so later ones are rejected.
    assert_eq!(ok, 1);
    assert_eq!(tts.calls.load(Ordering::SeqCst), 1);

    let state = h.orchestrator.get_session_state("shared").await.unwrap();
    assert_eq!(state.output_state, OutputState::Speaking);
    assert_eq!(state.playback.total_segments, 2);
    assert!(state.playback_is_consistent());
}
