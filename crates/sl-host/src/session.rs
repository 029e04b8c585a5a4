//! Client session and state tracking.
//!
//! The session owns an authoritative local mirror of engine state: it
//! applies each returned patch, recomputes the canonical fingerprint,
//! optionally verifies it against the engine's, and forwards either the
//! patch chain or a one-shot full-sync snapshot on the next dispatch.
//!
//! Single-owner by contract: every operation takes `&mut self`.  A host
//! that wants to drive one session from several tasks must serialize
//! externally or create per-task sessions.
//!
//! Lifecycle: *Fresh → Tracking → Tracking → …*.  `ready` always resets
//! to Fresh before transitioning to Tracking on success;
//! `reset_client_session` jumps to Fresh without touching the network.

use crate::error::HostError;
use crate::follow::FollowHandle;
use crate::preload::PreloadBuilder;
use crate::sinks::{CommandSink, EventSink, LogSink};
use crate::transport::RpcTransport;
use serde_json::Value;
use sl_protocol::{DispatchArgs, DispatchResult, EventEnvelope, Patch, PollArgs, PollResult, methods};
use sl_state::{StateMap, apply_patch, state_fingerprint};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Static session configuration; everything else in the session is
/// tracking state that `ready`/`reset_client_session` clear.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// `host:port` of the engine endpoint.
    pub endpoint: String,
    /// Entry script source text, sent with every dispatch.
    pub app_script: String,
    /// Normalized key of the entry script, handed to the preload builder.
    pub entry_key: String,
    /// Verify engine fingerprints against the tracked mirror.
    pub verify_fingerprints: bool,
}

// ---------------------------------------------------------------------------
// HostSession
// ---------------------------------------------------------------------------

pub struct HostSession {
    transport: RpcTransport,
    app_script: String,
    entry_key: String,
    verify_fingerprints: bool,
    preload: Arc<dyn PreloadBuilder>,
    command_sink: Arc<dyn CommandSink>,
    event_sink: Arc<dyn EventSink>,
    log_sink: Arc<dyn LogSink>,

    session_id: Option<String>,
    session_key: Option<String>,
    last_patch: Option<Patch>,
    last_fingerprint: Option<String>,
    /// Shared with the follow driver; advanced by max only.
    cursor: Arc<AtomicU64>,
    tracked_state: StateMap,
    tracked_fingerprint: String,
    next_state_json: Option<String>,
    next_patch_override: Option<Patch>,

    follow: Option<FollowHandle>,
}

impl HostSession {
    pub fn new(
        config: SessionConfig,
        preload: Arc<dyn PreloadBuilder>,
        command_sink: Arc<dyn CommandSink>,
        event_sink: Arc<dyn EventSink>,
        log_sink: Arc<dyn LogSink>,
    ) -> Self {
        let tracked_state = StateMap::new();
        let tracked_fingerprint = state_fingerprint(&tracked_state);
        HostSession {
            transport: RpcTransport::new(config.endpoint),
            app_script: config.app_script,
            entry_key: config.entry_key,
            verify_fingerprints: config.verify_fingerprints,
            preload,
            command_sink,
            event_sink,
            log_sink,
            session_id: None,
            session_key: None,
            last_patch: None,
            last_fingerprint: None,
            cursor: Arc::new(AtomicU64::new(0)),
            tracked_state,
            tracked_fingerprint,
            next_state_json: None,
            next_patch_override: None,
            follow: None,
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Resets tracking, builds the preload payload, and dispatches the
    /// `system`/`ready` event that opens a fresh engine session.
    pub async fn ready(&mut self, timestamp: Option<i64>) -> Result<(), HostError> {
        self.clear_tracking();
        let payload = self.preload.build(&self.entry_key, timestamp, None);
        let args = DispatchArgs {
            app_script: self.app_script.clone(),
            event: EventEnvelope {
                kind: "system".to_owned(),
                target: "ready".to_owned(),
                value: payload,
                session_id: None,
                session_key: None,
            },
            state_json: None,
            patch: None,
        };
        let result = self.call_dispatch(args).await?;
        self.absorb("system", "ready", result);
        Ok(())
    }

    /// Dispatches one event, carrying exactly one of the full-sync
    /// snapshot (consumed `next_state_json`) or a patch (consumed
    /// `next_patch_override`, else the chained `last_patch`).
    pub async fn dispatch(
        &mut self,
        kind: &str,
        target: &str,
        value: Value,
    ) -> Result<(), HostError> {
        let (state_json, patch) = self.take_outgoing_sync();
        let args = DispatchArgs {
            app_script: self.app_script.clone(),
            event: EventEnvelope {
                kind: kind.to_owned(),
                target: target.to_owned(),
                value,
                session_id: self.session_id.clone(),
                session_key: self.session_key.clone(),
            },
            state_json,
            patch,
        };
        let result = self.call_dispatch(args).await?;
        self.absorb(kind, target, result);
        Ok(())
    }

    /// One cursor poll: advances the cursor and feeds the event sink in
    /// order.  Returns the number of delivered events.
    pub async fn poll_once(&mut self) -> Result<usize, HostError> {
        poll_events(&self.transport, &self.cursor, self.event_sink.as_ref()).await
    }

    /// Clears every piece of tracked session state without contacting
    /// the engine.  For use when the caller knows the engine restarted.
    pub fn reset_client_session(&mut self) {
        self.clear_tracking();
    }

    /// Starts the background follow driver, stopping any previous one
    /// first.  At most one driver runs per session.
    pub async fn start_follow(&mut self, interval: Duration) {
        self.stop_follow().await;
        self.follow = Some(FollowHandle::spawn(
            self.transport.clone(),
            Arc::clone(&self.cursor),
            Arc::clone(&self.event_sink),
            Arc::clone(&self.log_sink),
            interval,
        ));
    }

    /// Stops the follow driver: clears its flag, interrupts the sleep,
    /// and joins.
    pub async fn stop_follow(&mut self) {
        if let Some(follow) = self.follow.take() {
            follow.stop().await;
        }
    }

    /// Stops the follow driver only; tracked state survives.
    pub async fn close(&mut self) {
        self.stop_follow().await;
    }

    // -----------------------------------------------------------------------
    // One-shot overrides
    // -----------------------------------------------------------------------

    /// Full-sync snapshot for the next dispatch; wins over a patch
    /// override when both are set.
    pub fn set_next_state_json(&mut self, state_json: impl Into<String>) {
        self.next_state_json = Some(state_json.into());
    }

    /// Patch to send on the next dispatch instead of the chained one.
    pub fn set_next_patch_override(&mut self, patch: Patch) {
        self.next_patch_override = Some(patch);
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn session_key(&self) -> Option<&str> {
        self.session_key.as_deref()
    }

    pub fn last_patch(&self) -> Option<&Patch> {
        self.last_patch.as_ref()
    }

    pub fn last_fingerprint(&self) -> Option<&str> {
        self.last_fingerprint.as_deref()
    }

    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::SeqCst)
    }

    pub fn tracked_state(&self) -> &StateMap {
        &self.tracked_state
    }

    pub fn tracked_fingerprint(&self) -> &str {
        &self.tracked_fingerprint
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    /// Picks the outgoing synchronization payload.  Both overrides are
    /// consumed even when the snapshot wins, so neither outlives one
    /// dispatch.
    fn take_outgoing_sync(&mut self) -> (Option<String>, Option<Patch>) {
        if let Some(state_json) = self.next_state_json.take() {
            self.next_patch_override = None;
            return (Some(state_json), None);
        }
        if let Some(patch) = self.next_patch_override.take() {
            return (None, Some(patch));
        }
        (None, self.last_patch.clone())
    }

    async fn call_dispatch(&self, args: DispatchArgs) -> Result<DispatchResult, HostError> {
        let args = serde_json::to_value(&args)
            .map_err(|e| HostError::Protocol(format!("encode dispatch args: {e}")))?;
        let result = self.transport.call_ok(methods::DISPATCH_EVENT, args).await?;
        serde_json::from_value(result)
            .map_err(|e| HostError::Protocol(format!("dispatch result: {e}")))
    }

    /// Folds one successful dispatch result into the session: session
    /// identifiers, patch chain, tracked mirror, fingerprint check, and
    /// command delivery.
    fn absorb(&mut self, kind: &str, target: &str, result: DispatchResult) {
        // The engine may rotate the routing id on any response...
        if let Some(id) = result.session_id {
            self.session_id = Some(id);
        }
        // ...but the key is write-once: first non-empty wins.
        if let Some(key) = result.session_key {
            if !key.is_empty() && self.session_key.as_deref().map_or(true, str::is_empty) {
                self.session_key = Some(key);
            }
        }

        apply_patch(&mut self.tracked_state, result.patch.as_ref());
        self.tracked_fingerprint = state_fingerprint(&self.tracked_state);
        self.last_patch = result.patch;
        self.last_fingerprint = result.fingerprint;

        if self.verify_fingerprints {
            if let Some(remote) = self.last_fingerprint.as_deref() {
                if remote != self.tracked_fingerprint {
                    warn!(
                        engine = %remote,
                        tracked = %self.tracked_fingerprint,
                        "fingerprint mismatch"
                    );
                    self.log_sink.log(&format!(
                        "fingerprint mismatch: engine {remote} != tracked {}",
                        self.tracked_fingerprint
                    ));
                }
            }
        }

        let label = format!("event_{kind}_{target}");
        debug!(%label, commands = result.commands.len(), "dispatch absorbed");
        self.command_sink.deliver(&label, &result.commands);
    }

    fn clear_tracking(&mut self) {
        self.session_id = None;
        self.session_key = None;
        self.last_patch = None;
        self.last_fingerprint = None;
        self.cursor.store(0, Ordering::SeqCst);
        self.tracked_state = StateMap::new();
        self.tracked_fingerprint = state_fingerprint(&self.tracked_state);
        self.next_state_json = None;
        self.next_patch_override = None;
    }
}

// ---------------------------------------------------------------------------
// Shared poll path (session + follow driver)
// ---------------------------------------------------------------------------

pub(crate) async fn poll_events(
    transport: &RpcTransport,
    cursor: &AtomicU64,
    event_sink: &dyn EventSink,
) -> Result<usize, HostError> {
    let args = PollArgs {
        cursor: cursor.load(Ordering::SeqCst),
    };
    let args =
        serde_json::to_value(args).map_err(|e| HostError::Protocol(format!("encode poll args: {e}")))?;
    let result = transport.call_ok(methods::POLL_EVENTS, args).await?;
    let result: PollResult = serde_json::from_value(result)
        .map_err(|e| HostError::Protocol(format!("poll result: {e}")))?;
    cursor.fetch_max(result.cursor, Ordering::SeqCst);
    for event in &result.events {
        event_sink.deliver(event);
    }
    Ok(result.events.len())
}
