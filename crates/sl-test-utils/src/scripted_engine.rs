//! A deterministic engine for tests: replays queued results.

use engine::bus::EventBus;
use engine::eval::{EngineError, ScriptEngine};
use sl_protocol::{DispatchArgs, DispatchResult};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays queued dispatch results in FIFO order and records every
/// args payload it receives, so tests can assert on outgoing request
/// contents (patch chain, overrides, session fields).
///
/// An empty queue turns the next dispatch into an engine error, which
/// the dispatcher renders as `{ok: false}`.
#[derive(Default)]
pub struct ScriptedEngine {
    responses: Mutex<VecDeque<DispatchResult>>,
    received: Mutex<Vec<DispatchArgs>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        ScriptedEngine::default()
    }

    pub fn push_response(&self, result: DispatchResult) {
        self.responses.lock().unwrap().push_back(result);
    }

    /// Every `dispatchEvent` args payload seen so far, oldest first.
    pub fn received(&self) -> Vec<DispatchArgs> {
        self.received.lock().unwrap().clone()
    }
}

impl ScriptEngine for ScriptedEngine {
    fn evaluate(&self, args: DispatchArgs, _bus: &EventBus) -> Result<DispatchResult, EngineError> {
        self.received.lock().unwrap().push(args);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| EngineError("scripted engine: no queued response".to_owned()))
    }
}
