// End-to-end state tracking: ready, patch chaining, one-shot
// overrides, fingerprint verification, and session identifiers, all
// over real sockets against a scripted engine.

use scriptlink::protocol::{DispatchResult, Patch};
use scriptlink::state::{StateMap, state_fingerprint};
use serde_json::{Value, json};
use sl_test_utils::{ScriptedEngine, TestServer, host_session};
use std::sync::Arc;

fn patch(wire: Value) -> Patch {
    serde_json::from_value(wire).unwrap()
}

fn result(patch_wire: Option<Value>, fingerprint: Option<&str>) -> DispatchResult {
    DispatchResult {
        patch: patch_wire.map(patch),
        fingerprint: fingerprint.map(str::to_owned),
        ..DispatchResult::default()
    }
}

fn fingerprint_of(entries: &[(&str, Value)]) -> String {
    let mut state = StateMap::new();
    for (key, value) in entries {
        state.insert((*key).to_owned(), value.clone());
    }
    state_fingerprint(&state)
}

/// Ready applies the returned patch to an empty mirror and lands on the
/// engine's fingerprint.
#[tokio::test]
async fn ready_sets_tracked_state() {
    let scripted = Arc::new(ScriptedEngine::new());
    let fp = fingerprint_of(&[("a", json!(1)), ("b", json!("x"))]);
    scripted.push_response(result(
        Some(json!({"set": [["a", 1], ["b", "x"]]})),
        Some(&fp),
    ));
    let server = TestServer::start(Arc::clone(&scripted) as _).await.unwrap();

    let sinks = sl_test_utils::RecordingSinks::new();
    let mut session = host_session(server.endpoint(), &sinks);
    session.ready(Some(1_700_000_000)).await.unwrap();

    assert_eq!(session.tracked_state()["a"], json!(1));
    assert_eq!(session.tracked_state()["b"], json!("x"));
    assert_eq!(session.tracked_fingerprint(), fp);
    // Verification passed: nothing hit the log sink.
    assert!(sinks.logs().is_empty());

    // The ready request carried the preload payload and no sync fields.
    let received = scripted.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].event.kind, "system");
    assert_eq!(received[0].event.target, "ready");
    assert_eq!(
        received[0].event.value,
        json!({"entry": "main", "timestamp": 1_700_000_000})
    );
    assert!(received[0].state_json.is_none());
    assert!(received[0].patch.is_none());

    // Commands were delivered under the ready label.
    assert_eq!(sinks.commands()[0].0, "event_system_ready");

    server.stop().await;
}

/// The engine's last patch is chained verbatim into the next dispatch,
/// whichever encoding it used.
#[tokio::test]
async fn patch_chain_is_forwarded_verbatim() {
    let scripted = Arc::new(ScriptedEngine::new());
    let fp1 = fingerprint_of(&[("a", json!(1)), ("b", json!("x"))]);
    let fp2 = fingerprint_of(&[("a", json!(1)), ("c", json!(true))]);
    scripted.push_response(result(Some(json!({"set": [["a", 1], ["b", "x"]]})), Some(&fp1)));
    scripted.push_response(result(Some(json!([["b", null], ["c", true]])), Some(&fp2)));
    scripted.push_response(result(None, Some(&fp2)));
    let server = TestServer::start(Arc::clone(&scripted) as _).await.unwrap();

    let sinks = sl_test_utils::RecordingSinks::new();
    let mut session = host_session(server.endpoint(), &sinks);
    session.ready(None).await.unwrap();
    session.dispatch("ui", "click", Value::Null).await.unwrap();

    assert_eq!(session.tracked_state().len(), 2);
    assert_eq!(session.tracked_state()["a"], json!(1));
    assert_eq!(session.tracked_state()["c"], json!(true));
    assert_eq!(session.tracked_fingerprint(), fp2);
    assert!(sinks.logs().is_empty());

    session.dispatch("ui", "hover", Value::Null).await.unwrap();

    let received = scripted.received();
    // Dispatch #1 chained the ready patch; dispatch #2 chained the
    // array-form patch byte-for-byte.
    assert_eq!(
        serde_json::to_value(received[1].patch.as_ref().unwrap()).unwrap(),
        json!({"set": [["a", 1], ["b", "x"]]})
    );
    assert_eq!(
        serde_json::to_value(received[2].patch.as_ref().unwrap()).unwrap(),
        json!([["b", null], ["c", true]])
    );
    assert_eq!(sinks.commands()[1].0, "event_ui_click");

    server.stop().await;
}

/// The full-sync snapshot beats the patch override, and both are
/// cleared by a single dispatch.
#[tokio::test]
async fn full_sync_override_wins_and_is_one_shot() {
    let scripted = Arc::new(ScriptedEngine::new());
    let empty = fingerprint_of(&[]);
    for _ in 0..3 {
        scripted.push_response(result(None, Some(&empty)));
    }
    let server = TestServer::start(Arc::clone(&scripted) as _).await.unwrap();

    let sinks = sl_test_utils::RecordingSinks::new();
    let mut session = host_session(server.endpoint(), &sinks);
    session.ready(None).await.unwrap();

    session.set_next_state_json("{\"k\":42}");
    session.set_next_patch_override(patch(json!([["x", 1]])));
    session.dispatch("ui", "submit", Value::Null).await.unwrap();
    session.dispatch("ui", "submit", Value::Null).await.unwrap();

    let received = scripted.received();
    // First dispatch: snapshot only.
    assert_eq!(received[1].state_json.as_deref(), Some("{\"k\":42}"));
    assert!(received[1].patch.is_none());
    // Second dispatch: both overrides are gone and there is no chain.
    assert!(received[2].state_json.is_none());
    assert!(received[2].patch.is_none());

    server.stop().await;
}

/// A wrong engine fingerprint is reported through the log sink, but the
/// dispatch still succeeds and the mirror still updates.
#[tokio::test]
async fn fingerprint_mismatch_is_observed_but_non_fatal() {
    let scripted = Arc::new(ScriptedEngine::new());
    scripted.push_response(result(Some(json!([["a", 1]])), Some("bogus")));
    let server = TestServer::start(Arc::clone(&scripted) as _).await.unwrap();

    let sinks = sl_test_utils::RecordingSinks::new();
    let mut session = host_session(server.endpoint(), &sinks);
    session.ready(None).await.unwrap();

    assert_eq!(session.tracked_state()["a"], json!(1));
    let logs = sinks.logs();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].contains("bogus"));

    server.stop().await;
}

/// The routing id rotates with every response that carries one; the
/// session key keeps its first non-empty value.
#[tokio::test]
async fn session_identifier_asymmetry() {
    let scripted = Arc::new(ScriptedEngine::new());
    let empty = fingerprint_of(&[]);
    scripted.push_response(DispatchResult {
        session_id: Some("route-1".to_owned()),
        session_key: Some("secret-1".to_owned()),
        fingerprint: Some(empty.clone()),
        ..DispatchResult::default()
    });
    scripted.push_response(DispatchResult {
        session_id: Some("route-2".to_owned()),
        session_key: Some("secret-2".to_owned()),
        fingerprint: Some(empty.clone()),
        ..DispatchResult::default()
    });
    scripted.push_response(result(None, Some(&empty)));
    let server = TestServer::start(Arc::clone(&scripted) as _).await.unwrap();

    let sinks = sl_test_utils::RecordingSinks::new();
    let mut session = host_session(server.endpoint(), &sinks);
    session.ready(None).await.unwrap();
    session.dispatch("ui", "click", Value::Null).await.unwrap();
    session.dispatch("ui", "click", Value::Null).await.unwrap();

    assert_eq!(session.session_id(), Some("route-2"));
    assert_eq!(session.session_key(), Some("secret-1"));

    let received = scripted.received();
    // The ready request predates any identifiers.
    assert!(received[0].event.session_id.is_none());
    // Dispatches carry whatever was current when they left.
    assert_eq!(received[1].event.session_id.as_deref(), Some("route-1"));
    assert_eq!(received[2].event.session_id.as_deref(), Some("route-2"));
    assert_eq!(received[2].event.session_key.as_deref(), Some("secret-1"));

    server.stop().await;
}

/// `ok = false` surfaces as an RPC error and leaves tracking untouched.
#[tokio::test]
async fn engine_failure_is_an_rpc_error() {
    let scripted = Arc::new(ScriptedEngine::new());
    let fp = fingerprint_of(&[("a", json!(1))]);
    scripted.push_response(result(Some(json!([["a", 1]])), Some(&fp)));
    // Queue left empty for the second dispatch.
    let server = TestServer::start(Arc::clone(&scripted) as _).await.unwrap();

    let sinks = sl_test_utils::RecordingSinks::new();
    let mut session = host_session(server.endpoint(), &sinks);
    session.ready(None).await.unwrap();

    let err = session.dispatch("ui", "click", Value::Null).await.unwrap_err();
    assert!(matches!(err, scriptlink::host::HostError::Rpc(_)));
    assert_eq!(session.tracked_fingerprint(), fp);
    assert_eq!(session.tracked_state()["a"], json!(1));

    server.stop().await;
}

/// `reset_client_session` returns to Fresh without a network call.
#[tokio::test]
async fn reset_returns_to_fresh() {
    let scripted = Arc::new(ScriptedEngine::new());
    scripted.push_response(DispatchResult {
        patch: Some(patch(json!([["a", 1]]))),
        session_id: Some("route-1".to_owned()),
        fingerprint: Some(fingerprint_of(&[("a", json!(1))])),
        ..DispatchResult::default()
    });
    let server = TestServer::start(Arc::clone(&scripted) as _).await.unwrap();

    let sinks = sl_test_utils::RecordingSinks::new();
    let mut session = host_session(server.endpoint(), &sinks);
    session.ready(None).await.unwrap();
    session.reset_client_session();

    assert!(session.session_id().is_none());
    assert!(session.tracked_state().is_empty());
    assert_eq!(session.cursor(), 0);
    assert_eq!(session.tracked_fingerprint(), fingerprint_of(&[]));
    // Nothing further reached the engine.
    assert_eq!(scripted.received().len(), 1);

    server.stop().await;
}
