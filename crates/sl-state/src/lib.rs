// sl-state: the tracked state mapping shared by host and engine.
//
// Insertion order is significant: the fingerprint hashes top-level keys
// in the order they were first inserted, so both ends must mutate state
// through the same patch semantics to stay equal.

pub mod fingerprint;
pub mod patch;

pub use fingerprint::state_fingerprint;
pub use patch::apply_patch;

/// Insertion-ordered mapping from string key to JSON value.
///
/// Backed by `serde_json::Map` with the `preserve_order` feature, so
/// wire snapshots (`stateJson`) decode directly into it.
pub type StateMap = serde_json::Map<String, serde_json::Value>;
