// Bounded retention over the wire: pruned prefixes are skipped
// silently and the retained tail is served to any cursor.

use scriptlink::host::RpcTransport;
use scriptlink::protocol::PollResult;
use serde_json::json;
use sl_test_utils::{RecordingSinks, ScriptedEngine, TestServer, host_session};
use std::sync::Arc;

async fn poll(transport: &RpcTransport, cursor: u64) -> PollResult {
    let result = transport
        .call_ok("pollEvents", json!({"cursor": cursor}))
        .await
        .unwrap();
    serde_json::from_value(result).unwrap()
}

/// S5: cap 4, six emits — seqs {3,4,5,6} survive, and both an in-range
/// and a pruned-range cursor see the same tail.
#[tokio::test]
async fn pruned_prefix_is_skipped_silently() {
    let server = TestServer::start_with_retention(Arc::new(ScriptedEngine::new()), 4)
        .await
        .unwrap();
    for n in 1..=6 {
        server.bus().emit("tick", json!(n));
    }
    let transport = RpcTransport::new(server.endpoint());

    let result = poll(&transport, 2).await;
    let seqs: Vec<u64> = result.events.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![3, 4, 5, 6]);
    assert_eq!(result.cursor, 6);

    let result = poll(&transport, 0).await;
    let seqs: Vec<u64> = result.events.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![3, 4, 5, 6]);

    server.stop().await;
}

/// A session polling across a prune keeps its cursor monotone and never
/// sees a seq twice.
#[tokio::test]
async fn session_cursor_stays_monotone_across_prune() {
    let server = TestServer::start_with_retention(Arc::new(ScriptedEngine::new()), 3)
        .await
        .unwrap();
    let sinks = RecordingSinks::new();
    let mut session = host_session(server.endpoint(), &sinks);

    server.bus().emit("tick", json!(1));
    server.bus().emit("tick", json!(2));
    assert_eq!(session.poll_once().await.unwrap(), 2);
    assert_eq!(session.cursor(), 2);

    // Six more emits push the earliest retained seq past the cursor.
    for n in 3..=8 {
        server.bus().emit("tick", json!(n));
    }
    assert_eq!(session.poll_once().await.unwrap(), 3);
    assert_eq!(session.cursor(), 8);

    let seqs = sinks.event_seqs();
    assert_eq!(seqs, vec![1, 2, 6, 7, 8]);
    assert!(seqs.windows(2).all(|w| w[0] < w[1]));

    server.stop().await;
}
