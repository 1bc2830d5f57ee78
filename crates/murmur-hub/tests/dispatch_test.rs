use murmur_hub::api::{handle_line, HubResponse};
use murmur_hub::config::Config;
use murmur_hub::{serve, HubState, Outbox};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

fn test_config(forward_events: bool) -> Config {
    let mut config = Config::default();
    config.session.retry_interval_ms = 0;
    config.session.forward_events = forward_events;
    config
}

fn quiet_state() -> HubState {
    let (outbox, _rx) = Outbox::channel();
    HubState::from_config(&test_config(false), outbox).unwrap()
}

async fn call(state: &HubState, request: Value) -> HubResponse {
    handle_line(state, &request.to_string()).await
}

async fn ok(state: &HubState, request: Value) -> Value {
    let response = call(state, request.clone()).await;
    assert!(response.ok, "{} failed: {:?}", request, response.error);
    response.result.unwrap_or(Value::Null)
}

#[tokio::test]
async fn default_config_falls_back_to_browser_providers() {
    let (outbox, _rx) = Outbox::channel();
    assert!(HubState::from_config(&Config::default(), outbox).is_ok());

    let mut config = Config::default();
    config.providers.selection.tts.allow_browser_fallback = false;
    let (outbox, _rx) = Outbox::channel();
    let err = HubState::from_config(&config, outbox).err().unwrap();
    assert_eq!(err.code(), "VOICE_PROVIDER_UNAVAILABLE");
}

#[tokio::test]
async fn narration_flow_over_the_protocol() {
    let state = quiet_state();

    ok(
        &state,
        json!({"op": "setActiveContext", "context": {"modality": "editor", "data": {"path": "notes.md"}}}),
    )
    .await;
    let started = ok(&state, json!({"op": "startSession", "sessionId": "s1"})).await;
    assert_eq!(started["inputState"], "listening");

    let plan = ok(
        &state,
        json!({
            "op": "narrate",
            "sessionId": "s1",
            "source": {"kind": "text", "content": "First line. Second line."},
            "language": "en-GB"
        }),
    )
    .await;
    assert_eq!(plan["strategy"], "verbatim");
    assert_eq!(plan["language"], "en-GB");
    assert_eq!(plan["segments"].as_array().unwrap().len(), 2);
    let first = plan["segments"][0]["segmentId"].clone();

    let interrupted = ok(
        &state,
        json!({"op": "interruptOutput", "sessionId": "s1", "cause": "user", "actor": "user"}),
    )
    .await;
    assert_eq!(interrupted["outputState"], "interrupted");
    assert_eq!(interrupted["playback"]["pendingSegmentIds"][0], first);

    let resumed = ok(&state, json!({"op": "resumeOutput", "sessionId": "s1"})).await;
    assert_eq!(resumed["outputState"], "speaking");
    assert_eq!(resumed["playback"]["activeSegmentId"], first);

    ok(&state, json!({"op": "completeSegment", "sessionId": "s1"})).await;
    let done = ok(&state, json!({"op": "completeSegment", "sessionId": "s1"})).await;
    assert_eq!(done["outputState"], "completed");
    assert_eq!(done["playback"]["completedSegmentIds"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn transcript_flow_over_the_protocol() {
    let state = quiet_state();
    ok(
        &state,
        json!({"op": "utterance", "sessionId": "t1", "utterance": {"kind": "transcript-text", "text": "draft"}}),
    )
    .await;
    ok(&state, json!({"op": "finalizeTranscript", "sessionId": "t1"})).await;
    let edited = ok(
        &state,
        json!({"op": "editTranscript", "sessionId": "t1", "text": "final"}),
    )
    .await;
    assert_eq!(edited["transcriptState"], "editable");

    let sent = ok(&state, json!({"op": "sendTranscript", "sessionId": "t1"})).await;
    assert_eq!(sent["transcriptState"], "sent");
    assert_eq!(sent["text"], "final");
}

#[tokio::test]
async fn errors_carry_the_full_envelope() {
    let state = quiet_state();

    let response = call(
        &state,
        json!({"op": "narrate", "sessionId": "s1", "source": {"kind": "text", "content": "Hi."}}),
    )
    .await;
    let error = response.error.unwrap();
    assert_eq!(error.status, 409);
    assert_eq!(error.code, "VOICE_ACTIVE_CONTEXT_REQUIRED");
    assert_eq!(error.location, "context.active");

    let response = call(
        &state,
        json!({"op": "patchPolicy", "sessionId": "s1", "policy": {"outputMode": "loud"}}),
    )
    .await;
    let error = response.error.unwrap();
    assert_eq!(error.status, 400);
    assert_eq!(error.location, "voice.policy.outputMode");
    assert!(error.reason.starts_with("outputMode must be one of: off"));

    let response = call(&state, json!({"op": "stopSession", "sessionId": "s1"})).await;
    let error = response.error.unwrap();
    assert_eq!(error.code, "VOICE_INVALID_TRANSITION");
    assert_eq!(error.location, "voice.session.inputState");
    assert_eq!(
        error.remediation,
        "From input state 'idle' use one of: startSession -> listening"
    );

    let response = handle_line(&state, "{not json").await;
    assert!(!response.ok);
    assert_eq!(response.error.unwrap().code, "VOICE_BAD_REQUEST");

    let response = call(&state, json!({"id": 7, "op": "getSession"})).await;
    assert_eq!(response.id, Some(json!(7)));
    assert_eq!(response.error.unwrap().status, 400);
}

#[tokio::test]
async fn serve_answers_every_line_and_forwards_events() {
    let (outbox, rx) = Outbox::channel();
    let state = Arc::new(HubState::from_config(&test_config(true), outbox).unwrap());

    let input = [
        json!({"id": 1, "op": "startSession", "sessionId": "a"}).to_string(),
        String::new(),
        "garbage".to_string(),
        json!({"id": 3, "op": "startSession", "sessionId": "b", "policy": {"language": "fr-FR"}})
            .to_string(),
        json!({"id": 4, "op": "getPolicy", "sessionId": "c"}).to_string(),
    ]
    .join("\n");

    let mut output = Vec::new();
    serve(state, input.as_bytes(), &mut output, rx).await.unwrap();

    let lines: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    let responses: HashMap<String, &Value> = lines
        .iter()
        .filter(|line| line.get("ok").is_some())
        .map(|line| (line["id"].to_string(), line))
        .collect();
    assert_eq!(responses.len(), 4);
    assert_eq!(responses["1"]["result"]["inputState"], "listening");
    assert_eq!(responses["3"]["result"]["policy"]["language"], "fr-FR");
    assert_eq!(responses["4"]["result"]["outputMode"], "on-demand");
    assert_eq!(responses["null"]["error"]["code"], "VOICE_BAD_REQUEST");

    let started: Vec<&Value> = lines
        .iter()
        .filter_map(|line| line.get("event"))
        .filter(|event| event["details"]["voiceEvent"] == "SESSION_STARTED")
        .collect();
    assert_eq!(started.len(), 2);
    assert!(started
        .iter()
        .all(|event| event["type"] == "PATCH_APPLIED" && event["details"]["domain"] == "voice"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn serve_keeps_input_order_within_a_session() {
    let (outbox, rx) = Outbox::channel();
    let state = Arc::new(HubState::from_config(&test_config(false), outbox).unwrap());

    let mut input = Vec::new();
    for (session, offset) in [("t1", 0), ("t2", 10)] {
        input.extend([
            json!({"id": offset + 1, "op": "utterance", "sessionId": session,
                   "utterance": {"kind": "transcript-text", "text": "draft"}}),
            json!({"id": offset + 2, "op": "finalizeTranscript", "sessionId": session}),
            json!({"id": offset + 3, "op": "editTranscript", "sessionId": session, "text": session}),
            json!({"id": offset + 4, "op": "sendTranscript", "sessionId": session}),
        ]);
    }
    let input = input
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join("\n");

    let mut output = Vec::new();
    serve(state, input.as_bytes(), &mut output, rx).await.unwrap();

    let responses: Vec<HubResponse> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses.len(), 8);
    assert!(responses.iter().all(|r| r.ok), "{:?}", responses);

    for (session, offset) in [("t1", 0), ("t2", 10)] {
        let ids: Vec<i64> = responses
            .iter()
            .filter_map(|r| r.id.as_ref().and_then(Value::as_i64))
            .filter(|id| (offset + 1..=offset + 4).contains(id))
            .collect();
        assert_eq!(ids, vec![offset + 1, offset + 2, offset + 3, offset + 4]);

        let sent = responses
            .iter()
            .find(|r| r.id == Some(json!(offset + 4)))
            .unwrap();
        let result = sent.result.as_ref().unwrap();
        assert_eq!(result["transcriptState"], "sent");
        assert_eq!(result["text"], session);
    }
}
