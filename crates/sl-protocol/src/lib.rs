// sl-protocol: scriptlink wire types and framing.
//
// Every RPC exchange is one request envelope out, one response envelope
// back, carried as framed JSON (see `codec`).  The host keeps no socket
// state between calls; session identity travels in the payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod codec;

pub use codec::{FrameCodec, FrameError, MAX_FRAME_LEN};

/// Frozen method names.
pub mod methods {
    pub const DISPATCH_EVENT: &str = "dispatchEvent";
    pub const POLL_EVENTS: &str = "pollEvents";
    pub const PING: &str = "ping";
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// Request envelope.
///
/// `id` is client-chosen, nonzero, and echoed verbatim by the engine.
/// The argument carrier is accepted under either `args` or `params`
/// for compatibility; it is always emitted as `args`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub method: String,
    #[serde(default, alias = "params")]
    pub args: Value,
}

/// Response envelope.
///
/// Exactly one of `result` / `error` is meaningful.  `ok = true`
/// implies `result` is present (possibly an empty object).  `id` is
/// omitted when the engine could not decode the request far enough to
/// learn it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn success(id: u64, result: Value) -> Self {
        Response {
            id: Some(id),
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<u64>, error: impl Into<String>) -> Self {
        Response {
            id,
            ok: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Patches
// ---------------------------------------------------------------------------

/// A state delta, in either of the two wire encodings.
///
/// Both coexist for historical compatibility and both must be accepted
/// on the receive path; the emitted form is whichever the producer
/// chose (the host forwards engine patches verbatim when chaining).
///
/// ```json
/// {"set": [["k", 1]], "remove": ["old"]}
/// [["k", 1], ["old", null]]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Patch {
    /// Array form: each 2-element `[k, v]` entry upserts, a JSON-null
    /// `v` deletes.  Malformed entries are skipped by the patch engine.
    Entries(Vec<Value>),
    /// Object form: all `set` pairs in order, then all `remove` keys.
    Sections {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        set: Vec<(String, Value)>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        remove: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// dispatchEvent
// ---------------------------------------------------------------------------

/// The event carried inside `dispatchEvent` args.
///
/// Session fields are omitted from the wire when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub target: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
}

/// `dispatchEvent` arguments.
///
/// `state_json` (full-sync snapshot) and `patch` are mutually
/// exclusive; the host sends at most one of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchArgs {
    /// Entry script source text.
    pub app_script: String,
    pub event: EventEnvelope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Patch>,
}

/// `dispatchEvent` result.
///
/// Absent fields default to empty; `session_id` may rotate on any
/// response while `session_key` is write-once from the host's view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Patch>,
    #[serde(default)]
    pub commands: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
}

// ---------------------------------------------------------------------------
// pollEvents
// ---------------------------------------------------------------------------

/// One engine-originated event.  `seq` is strictly increasing and
/// gap-free within an engine process lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

/// `pollEvents` arguments: the highest seq the caller has observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PollArgs {
    #[serde(default)]
    pub cursor: u64,
}

/// `pollEvents` result: retained entries with `seq > cursor`, in order,
/// and the advanced cursor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PollResult {
    pub cursor: u64,
    #[serde(default)]
    pub events: Vec<EventRecord>,
}
