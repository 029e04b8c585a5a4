// scriptlink: bidirectional RPC substrate between a script host and a
// script engine — deterministic state deltas, canonical fingerprints,
// and cursor-polled engine events over framed JSON.
//
// Facade over the workspace members; the integration suites drive the
// full stack through these re-exports.

pub use sl_host as host;
pub use sl_protocol as protocol;
pub use sl_state as state;
