//! Session snapshot types and the snapshot store
//!
//! The snapshot is derived state only: it is owned by the session
//! store, mutated exclusively through the reducer, and rebuildable at
//! any time by replaying the session's timeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::RwLock;

/// One conversational turn in the session's ordered, append-only log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

/// A pending branch question awaiting its moment (FIFO)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchQuestion {
    pub question_id: String,
    pub text: String,
}

/// Latest raw user signals, overwritten on each user event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signals {
    pub last_user_chars: usize,
    pub last_user_latency_ms: Option<u64>,
}

/// The live session snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    // Identity
    pub session_id: String,
    pub entry_id: String,
    pub domain: String,

    // Pedagogical objective
    pub main_objective: String,
    pub act: String,
    pub beat: String,
    pub pacing_mode: String,

    // Learner model
    pub mastery_estimate: f32,
    pub misconception_tags: BTreeSet<String>,

    // Pacing signals
    /// Seconds since the last assistant output. Recomputed from
    /// `last_output_at` on each user event, never accumulated.
    pub output_clock_sec: i64,
    pub last_output_at: Option<DateTime<Utc>>,
    pub tension_level: u8,
    pub cognitive_load: u8,

    pub question_stack: VecDeque<BranchQuestion>,
    pub signals: Signals,

    /// Ordered, append-only turn log; length only ever grows
    pub turns: Vec<Turn>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(
        session_id: impl Into<String>,
        entry_id: impl Into<String>,
        domain: impl Into<String>,
        main_objective: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            entry_id: entry_id.into(),
            domain: domain.into(),
            main_objective: main_objective.into(),
            act: String::new(),
            beat: String::new(),
            pacing_mode: String::new(),
            mastery_estimate: 0.0,
            misconception_tags: BTreeSet::new(),
            output_clock_sec: 0,
            last_output_at: None,
            tension_level: 0,
            cognitive_load: 0,
            question_stack: VecDeque::new(),
            signals: Signals::default(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Last user-authored turn text, if any
    pub fn last_user_text(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == TurnRole::User)
            .map(|t| t.text.as_str())
    }
}

/// Keyed snapshot storage. `save` is whole-snapshot replace; a snapshot
/// handed out by `get` is the caller's private working copy until the
/// next `save`.
pub struct SessionStore {
    snapshots: RwLock<HashMap<String, SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            snapshots: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, session_id: &str) -> Option<SessionState> {
        self.snapshots
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    pub fn save(&self, snapshot: SessionState) {
        self.snapshots
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(snapshot.session_id.clone(), snapshot);
    }

    #[allow(dead_code)] // Useful for tests
    pub fn contains(&self, session_id: &str) -> bool {
        self.snapshots
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains_key(session_id)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
