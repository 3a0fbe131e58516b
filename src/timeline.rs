//! Append-only, per-session event log
//!
//! The timeline owns event ordering and identity: `seq` is assigned
//! here, is unique and monotonically increasing per session, and starts
//! at 1. Appends carrying an already-seen `event_id` return the
//! previously assigned `seq` without growing the log, which makes
//! retries safe.

use crate::event::Event;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Default)]
struct SessionLog {
    events: Vec<Event>,
    /// event_id -> assigned seq, for idempotent retries
    by_event_id: HashMap<String, i64>,
    /// Insertion order of dedup keys, for bounded eviction
    dedup_order: VecDeque<String>,
    next_seq: i64,
}

/// Arena of per-session logs behind a single store lock. The lock is
/// held only for the map operation itself; sessions never block each
/// other on anything slower than that.
pub struct TimelineStore {
    sessions: Mutex<HashMap<String, SessionLog>>,
    /// Per-session cap on the idempotency map; oldest key evicted
    dedup_cap: usize,
}

impl TimelineStore {
    pub fn new(dedup_cap: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            dedup_cap: dedup_cap.max(1),
        }
    }

    /// Append an event, stamping `seq` and `session_id`. Returns the
    /// assigned sequence number; for a duplicate `event_id`, returns
    /// the original one and stores nothing.
    pub fn append(&self, session_id: &str, mut event: Event) -> i64 {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let log = sessions.entry(session_id.to_string()).or_default();

        if let Some(event_id) = event.event_id.as_deref() {
            if !event_id.is_empty() {
                if let Some(&seq) = log.by_event_id.get(event_id) {
                    tracing::debug!(session_id, event_id, seq, "Duplicate append ignored");
                    return seq;
                }
            }
        }

        log.next_seq += 1;
        let seq = log.next_seq;
        event.seq = seq;
        event.session_id = session_id.to_string();

        if let Some(event_id) = event.event_id.clone().filter(|id| !id.is_empty()) {
            if log.by_event_id.len() >= self.dedup_cap {
                if let Some(oldest) = log.dedup_order.pop_front() {
                    log.by_event_id.remove(&oldest);
                }
            }
            log.by_event_id.insert(event_id.clone(), seq);
            log.dedup_order.push_back(event_id);
        }

        log.events.push(event);
        seq
    }

    /// Ordered history for a session, as a defensive copy. An unknown
    /// session yields an empty timeline, not an error.
    pub fn list(&self, session_id: &str) -> Vec<Event> {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(session_id)
            .map(|log| log.events.clone())
            .unwrap_or_default()
    }

    pub fn len(&self, session_id: &str) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(session_id)
            .map_or(0, |log| log.events.len())
    }

    #[allow(dead_code)] // API completeness
    pub fn is_empty(&self, session_id: &str) -> bool {
        self.len(session_id) == 0
    }
}
