//! Timeline event types
//!
//! An `Event` is an immutable fact: once appended to the timeline it is
//! never mutated or removed. The store assigns `seq` and stamps
//! `session_id`; everything else arrives from the transport layer or is
//! produced by the engine itself.

use crate::director::DirectorPlan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event vocabulary. String-backed so transports can introduce new
/// kinds without a schema change; unknown kinds are preserved verbatim
/// and reduced via the default (user text) path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    UserMessage,
    UserUtterance,
    AssistantText,
    QuizAnswer,
    DirectorPlan,
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::UserMessage => "user_message",
            EventKind::UserUtterance => "user_utterance",
            EventKind::AssistantText => "assistant_text",
            EventKind::QuizAnswer => "quiz_answer",
            EventKind::DirectorPlan => "director_plan",
            EventKind::Other(s) => s,
        }
    }
}

impl From<String> for EventKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "user_message" => EventKind::UserMessage,
            "user_utterance" => EventKind::UserUtterance,
            "assistant_text" => EventKind::AssistantText,
            "quiz_answer" => EventKind::QuizAnswer,
            "director_plan" => EventKind::DirectorPlan,
            _ => EventKind::Other(s),
        }
    }
}

impl From<EventKind> for String {
    fn from(k: EventKind) -> Self {
        k.as_str().to_string()
    }
}

/// An immutable timeline fact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Store-assigned, unique and monotonically increasing per session,
    /// starting at 1. Zero until appended.
    #[serde(default)]
    pub seq: i64,
    #[serde(default)]
    pub session_id: String,
    /// Caller-supplied idempotency key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_id: Option<String>,
    pub kind: EventKind,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub client_ts: DateTime<Utc>,
    /// Always server-assigned
    pub server_ts: DateTime<Utc>,
    /// Attached only on `director_plan` events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director_plan: Option<DirectorPlan>,
}

impl Event {
    /// Construct a bare event of the given kind, timestamps set to `now`
    pub fn new(kind: EventKind, text: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            seq: 0,
            session_id: String::new(),
            event_id: None,
            turn_id: None,
            kind,
            text: text.into(),
            question_id: None,
            answer: None,
            client_ts: now,
            server_ts: now,
            director_plan: None,
        }
    }
}

/// Inbound event as received from the transport layer, before the
/// engine normalizes it (missing kind defaults to `user_message`,
/// missing client timestamp defaults to now, server timestamp and
/// session id are always stamped by the engine).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundEvent {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub turn_id: Option<String>,
    #[serde(default)]
    pub kind: Option<EventKind>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub client_ts: Option<DateTime<Utc>>,
}

impl InboundEvent {
    /// Plain user text, the common case
    #[allow(dead_code)] // Constructor for tests and embedding callers
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Same text with an idempotency key attached
    #[allow(dead_code)] // Constructor for tests and embedding callers
    pub fn with_event_id(mut self, id: impl Into<String>) -> Self {
        self.event_id = Some(id.into());
        self
    }

    /// Normalize into a full `Event` for the given session at `now`
    pub fn normalize(self, session_id: &str, now: DateTime<Utc>) -> Event {
        Event {
            seq: 0,
            session_id: session_id.to_string(),
            event_id: self.event_id,
            turn_id: self.turn_id,
            kind: self.kind.unwrap_or(EventKind::UserMessage),
            text: self.text,
            question_id: self.question_id,
            answer: self.answer,
            client_ts: self.client_ts.unwrap_or(now),
            server_ts: now,
            director_plan: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in [
            EventKind::UserMessage,
            EventKind::UserUtterance,
            EventKind::AssistantText,
            EventKind::QuizAnswer,
            EventKind::DirectorPlan,
            EventKind::Other("pause_marker".to_string()),
        ] {
            let s: String = kind.clone().into();
            assert_eq!(EventKind::from(s), kind);
        }
    }

    #[test]
    fn normalize_defaults_kind_and_timestamps() {
        let now = Utc::now();
        let event = InboundEvent::text("hello").normalize("s-1", now);
        assert_eq!(event.kind, EventKind::UserMessage);
        assert_eq!(event.session_id, "s-1");
        assert_eq!(event.client_ts, now);
        assert_eq!(event.server_ts, now);
        assert_eq!(event.seq, 0);
    }

    #[test]
    fn normalize_keeps_caller_client_timestamp() {
        let now = Utc::now();
        let earlier = now - chrono::Duration::seconds(5);
        let inbound = InboundEvent {
            client_ts: Some(earlier),
            kind: Some(EventKind::UserUtterance),
            ..InboundEvent::text("spoken")
        };
        let event = inbound.normalize("s-1", now);
        assert_eq!(event.client_ts, earlier);
        assert_eq!(event.server_ts, now);
        assert_eq!(event.kind, EventKind::UserUtterance);
    }
}
