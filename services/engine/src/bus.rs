//! Append-only event log with cursor polling and bounded retention.
//!
//! Seqs start at 1 and are gap-free within a process lifetime.  When
//! the log exceeds the retention cap the oldest prefix is dropped;
//! relative order is always preserved.  A cursor older than the
//! earliest retained seq silently skips the pruned range — lagging
//! consumers absorb the loss.

use serde_json::Value;
use sl_protocol::{EventRecord, PollResult};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

pub const DEFAULT_MAX_EVENTS_KEPT: usize = 10_000;

pub struct EventBus {
    max_kept: usize,
    next_seq: AtomicU64,
    log: Mutex<VecDeque<EventRecord>>,
}

impl EventBus {
    pub fn new(max_kept: usize) -> Self {
        EventBus {
            max_kept,
            next_seq: AtomicU64::new(0),
            log: Mutex::new(VecDeque::new()),
        }
    }

    /// Atomically allocates the next seq, appends, and prunes back to
    /// the retention cap.
    pub fn emit(&self, kind: &str, payload: Value) -> u64 {
        let mut log = self.log.lock().unwrap();
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        log.push_back(EventRecord {
            seq,
            kind: kind.to_owned(),
            payload,
        });
        while log.len() > self.max_kept {
            log.pop_front();
        }
        seq
    }

    /// Snapshot of the retained entries with `seq > cursor`, in order.
    /// The returned cursor is `max(cursor, highest returned seq)`.
    pub fn poll(&self, cursor: u64) -> PollResult {
        let log = self.log.lock().unwrap();
        let start = log.partition_point(|e| e.seq <= cursor);
        let events: Vec<EventRecord> = log.iter().skip(start).cloned().collect();
        let latest = events.last().map_or(cursor, |e| e.seq);
        PollResult {
            cursor: latest,
            events,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new(DEFAULT_MAX_EVENTS_KEPT)
    }
}
