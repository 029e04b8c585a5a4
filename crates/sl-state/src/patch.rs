//! Patch application.
//!
//! Deterministic and order-preserving: updating an existing key keeps
//! its position, a new key appends, and deletions shift so surviving
//! keys keep their relative order.  Values are stored as decoded JSON
//! trees with no sharing back into the patch.

use crate::StateMap;
use sl_protocol::Patch;

/// Applies `patch` to `state`.  A missing patch is a no-op.
///
/// Object form: all `set` pairs in order, then all `remove` keys
/// (absent keys are silently ignored).  Array form: 2-element `[k, v]`
/// entries upsert, JSON-null `v` deletes; entries with the wrong arity
/// or a non-string key are skipped.
pub fn apply_patch(state: &mut StateMap, patch: Option<&Patch>) {
    let Some(patch) = patch else { return };
    match patch {
        Patch::Sections { set, remove } => {
            for (key, value) in set {
                state.insert(key.clone(), value.clone());
            }
            for key in remove {
                state.shift_remove(key);
            }
        }
        Patch::Entries(entries) => {
            for entry in entries {
                let Some(pair) = entry.as_array() else { continue };
                if pair.len() != 2 {
                    continue;
                }
                let Some(key) = pair[0].as_str() else { continue };
                if pair[1].is_null() {
                    state.shift_remove(key);
                } else {
                    state.insert(key.to_owned(), pair[1].clone());
                }
            }
        }
    }
}
