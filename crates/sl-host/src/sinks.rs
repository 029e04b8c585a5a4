//! Host-side callback capabilities.
//!
//! One method each, so hosts can hand in either a small object or a
//! closure.  The session and follow driver invoke them synchronously
//! from the activity that received the data; sink calls from one client
//! are never concurrent with each other.

use serde_json::Value;
use sl_protocol::EventRecord;

/// Receives the commands from one dispatch result, labeled
/// `event_<type>_<target>` after the originating event.
pub trait CommandSink: Send + Sync {
    fn deliver(&self, label: &str, commands: &[Value]);
}

impl<F> CommandSink for F
where
    F: Fn(&str, &[Value]) + Send + Sync,
{
    fn deliver(&self, label: &str, commands: &[Value]) {
        self(label, commands);
    }
}

/// Receives engine events in strictly ascending `seq` order.
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: &EventRecord);
}

impl<F> EventSink for F
where
    F: Fn(&EventRecord) + Send + Sync,
{
    fn deliver(&self, event: &EventRecord) {
        self(event);
    }
}

/// Receives non-fatal diagnostics: fingerprint mismatches and follow
/// poll failures.
pub trait LogSink: Send + Sync {
    fn log(&self, message: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, message: &str) {
        self(message);
    }
}

/// Default log sink: forwards to `tracing` at warn level.
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, message: &str) {
        tracing::warn!("{message}");
    }
}
