//! Collaborator seams consumed during `ready`.
//!
//! The preload builder produces the initial ready payload; it must be
//! deterministic and side-effect free so that replaying a ready with
//! the same timestamp reproduces the same engine state.

use serde_json::Value;
use std::path::PathBuf;

pub trait PreloadBuilder: Send + Sync {
    /// Ready payload for `entry_key`, optionally pinned to a caller
    /// timestamp.  `extra` carries host-specific context when present.
    fn build(&self, entry_key: &str, timestamp: Option<i64>, extra: Option<&Value>) -> Value;
}

impl<F> PreloadBuilder for F
where
    F: Fn(&str, Option<i64>, Option<&Value>) -> Value + Send + Sync,
{
    fn build(&self, entry_key: &str, timestamp: Option<i64>, extra: Option<&Value>) -> Value {
        self(entry_key, timestamp, extra)
    }
}

/// Maps a normalized script key to a filesystem path.  Consumed by
/// preload builders that load script sources from disk.
pub trait PathResolver: Send + Sync {
    fn resolve(&self, normalized: &str) -> PathBuf;
}

/// Joins normalized keys onto a fixed root directory.
pub struct DirResolver {
    root: PathBuf,
}

impl DirResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirResolver { root: root.into() }
    }
}

impl PathResolver for DirResolver {
    fn resolve(&self, normalized: &str) -> PathBuf {
        self.root.join(normalized.trim_start_matches('/'))
    }
}

/// Minimal builder: the entry key, timestamp, and extra context spliced
/// into one object.  Enough for hosts whose engine derives everything
/// else from the script itself.
pub struct StaticPreload;

impl PreloadBuilder for StaticPreload {
    fn build(&self, entry_key: &str, timestamp: Option<i64>, extra: Option<&Value>) -> Value {
        let mut payload = serde_json::Map::new();
        payload.insert("entry".to_owned(), Value::String(entry_key.to_owned()));
        if let Some(ts) = timestamp {
            payload.insert("timestamp".to_owned(), Value::from(ts));
        }
        if let Some(extra) = extra {
            payload.insert("extra".to_owned(), extra.clone());
        }
        Value::Object(payload)
    }
}
