//! Script evaluator seam.
//!
//! The dispatcher hands decoded `dispatchEvent` args to a
//! [`ScriptEngine`], which may enqueue bus events while evaluating and
//! returns the state delta, commands, and fingerprint of the
//! post-evaluation state.
//!
//! [`EchoEngine`] is the default wiring for deployments without an
//! embedded evaluator: it rebuilds the state the host described
//! (snapshot or patch), fingerprints it with the same canonicalization
//! the host uses, and mints session identifiers on the ready event.

use crate::bus::EventBus;
use sl_protocol::{DispatchArgs, DispatchResult};
use sl_state::{StateMap, apply_patch, state_fingerprint};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct EngineError(pub String);

pub trait ScriptEngine: Send + Sync {
    fn evaluate(&self, args: DispatchArgs, bus: &EventBus) -> Result<DispatchResult, EngineError>;
}

pub struct EchoEngine;

impl ScriptEngine for EchoEngine {
    fn evaluate(&self, args: DispatchArgs, _bus: &EventBus) -> Result<DispatchResult, EngineError> {
        let mut state = match &args.state_json {
            Some(state_json) => serde_json::from_str::<StateMap>(state_json)
                .map_err(|e| EngineError(format!("stateJson: {e}")))?,
            None => StateMap::new(),
        };
        apply_patch(&mut state, args.patch.as_ref());

        let mut result = DispatchResult {
            fingerprint: Some(state_fingerprint(&state)),
            ..DispatchResult::default()
        };
        if args.event.kind == "system" && args.event.target == "ready" {
            result.session_id = Some(Uuid::new_v4().to_string());
            result.session_key = Some(Uuid::new_v4().to_string());
        }
        Ok(result)
    }
}
