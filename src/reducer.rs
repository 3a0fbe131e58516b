//! Pure state reduction
//!
//! `reduce` is the only writer of session snapshots. It is
//! deterministic, has no side effects beyond the passed-in snapshot,
//! and is safe to re-run over a full timeline to rebuild a snapshot
//! from scratch (the recovery/audit path).

use crate::event::{Event, EventKind};
use crate::session::{SessionState, Turn, TurnRole};
use chrono::{DateTime, Utc};

/// Fold one event into the snapshot at time `now`.
///
/// During live operation `now` is the same instant stamped into the
/// event's `server_ts`, so replaying with `server_ts` as the clock
/// reproduces the identical snapshot.
pub fn reduce(snapshot: &mut SessionState, event: &Event, now: DateTime<Utc>) {
    match &event.kind {
        EventKind::AssistantText => {
            if event.text.is_empty() {
                return;
            }
            snapshot.turns.push(Turn {
                role: TurnRole::Assistant,
                text: event.text.clone(),
                timestamp: now,
            });
            snapshot.output_clock_sec = 0;
            snapshot.last_output_at = Some(now);
            snapshot.updated_at = now;
        }

        EventKind::QuizAnswer => {
            // A tool answer is not a conversational turn boundary:
            // the output clock is deliberately left alone.
            let Some(answer) = event.answer.as_deref().filter(|a| !a.is_empty()) else {
                return;
            };
            snapshot.turns.push(Turn {
                role: TurnRole::User,
                text: answer.to_string(),
                timestamp: now,
            });
            snapshot.updated_at = now;
        }

        EventKind::DirectorPlan => {
            // Plans are audit facts; the only projection they carry
            // into the snapshot is the chosen beat.
            if let Some(plan) = &event.director_plan {
                snapshot.beat = plan.next_beat.clone();
                snapshot.updated_at = now;
            }
        }

        // user_message, user_utterance, and any unknown kind
        _ => {
            if event.text.is_empty() {
                return;
            }
            if let Some(last_output) = snapshot.last_output_at {
                // Elapsed since last output, recomputed - never accumulated
                snapshot.output_clock_sec = (now - last_output).num_seconds().max(0);
            }
            snapshot.signals.last_user_chars = event.text.chars().count();
            let latency = (event.server_ts - event.client_ts).num_milliseconds();
            if latency >= 0 {
                snapshot.signals.last_user_latency_ms = Some(latency as u64);
            }
            snapshot.turns.push(Turn {
                role: TurnRole::User,
                text: event.text.clone(),
                timestamp: now,
            });
            snapshot.updated_at = now;
        }
    }
}

/// Rebuild a snapshot from scratch by folding an ordered timeline over
/// a base snapshot (identity fields only). Uses each event's
/// `server_ts` as the clock so the result matches what incremental
/// reduction produced at the time.
pub fn replay(base: SessionState, events: &[Event]) -> SessionState {
    let mut snapshot = base;
    for event in events {
        reduce(&mut snapshot, event, event.server_ts);
    }
    snapshot
}
