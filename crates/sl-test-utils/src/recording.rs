//! Recording sinks and session construction for assertions.

use serde_json::Value;
use sl_host::{CommandSink, EventSink, HostSession, LogSink, SessionConfig, StaticPreload};
use sl_protocol::EventRecord;
use std::sync::{Arc, Mutex};

/// One recorder implementing all three host sink traits; tests read
/// back what the session and follow driver delivered.
#[derive(Default)]
pub struct RecordingSinks {
    commands: Mutex<Vec<(String, Vec<Value>)>>,
    events: Mutex<Vec<EventRecord>>,
    logs: Mutex<Vec<String>>,
}

impl RecordingSinks {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingSinks::default())
    }

    pub fn commands(&self) -> Vec<(String, Vec<Value>)> {
        self.commands.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_seqs(&self) -> Vec<u64> {
        self.events.lock().unwrap().iter().map(|e| e.seq).collect()
    }

    pub fn logs(&self) -> Vec<String> {
        self.logs.lock().unwrap().clone()
    }
}

impl CommandSink for RecordingSinks {
    fn deliver(&self, label: &str, commands: &[Value]) {
        self.commands
            .lock()
            .unwrap()
            .push((label.to_owned(), commands.to_vec()));
    }
}

impl EventSink for RecordingSinks {
    fn deliver(&self, event: &EventRecord) {
        self.events.lock().unwrap().push(event.clone());
    }
}

impl LogSink for RecordingSinks {
    fn log(&self, message: &str) {
        self.logs.lock().unwrap().push(message.to_owned());
    }
}

/// A host session with fingerprint verification on, wired entirely to
/// `sinks`.
pub fn host_session(endpoint: impl Into<String>, sinks: &Arc<RecordingSinks>) -> HostSession {
    HostSession::new(
        SessionConfig {
            endpoint: endpoint.into(),
            app_script: "app.main = fn { }".to_owned(),
            entry_key: "main".to_owned(),
            verify_fingerprints: true,
        },
        Arc::new(StaticPreload),
        Arc::clone(sinks) as Arc<dyn CommandSink>,
        Arc::clone(sinks) as Arc<dyn EventSink>,
        Arc::clone(sinks) as Arc<dyn LogSink>,
    )
}
