//! Turn orchestration
//!
//! Append-first discipline: nothing is decided before it is recorded.
//! Each inbound event produces three timeline facts - the normalized
//! input, the Director's plan, and the assistant output - with a
//! reduce+persist after each fact that touches the snapshot. Every
//! append/persist pair commits independently; recovery after a crash is
//! replaying the timeline through the reducer.

use crate::actor;
use crate::config::EngineConfig;
use crate::director::{Director, DirectorPlan, OutputAction, UserMustDo};
use crate::error::{EngineError, EngineResult};
use crate::event::{Event, EventKind, InboundEvent};
use crate::provider::Generator;
use crate::reducer;
use crate::session::{SessionState, SessionStore};
use crate::templates::TemplateLibrary;
use crate::timeline::TimelineStore;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex as AsyncMutex;

/// Learner-facing output of one turn
#[derive(Debug, Clone, serde::Serialize)]
pub struct AssistantMessage {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_must_do: Option<UserMustDo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz: Option<QuizPayload>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct QuizPayload {
    pub question_id: String,
    pub prompt: String,
}

/// What `on_event` hands back: the message plus the plan as debug
/// payload for audit/replay by the surrounding system
#[derive(Debug, Clone, serde::Serialize)]
pub struct TurnOutcome {
    pub message: AssistantMessage,
    pub plan: DirectorPlan,
}

pub struct Engine {
    timeline: TimelineStore,
    sessions: SessionStore,
    templates: TemplateLibrary,
    director: Box<dyn Director>,
    generator: Box<dyn Generator>,
    config: EngineConfig,
    /// One logical owner per session: `on_event` for a given session
    /// runs to completion before the next may start
    guards: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        templates: TemplateLibrary,
        director: Box<dyn Director>,
        generator: Box<dyn Generator>,
    ) -> Self {
        Self {
            timeline: TimelineStore::new(config.dedup_cap),
            sessions: SessionStore::new(),
            templates,
            director,
            generator,
            config,
            guards: StdMutex::new(HashMap::new()),
        }
    }

    /// Create a session and return its initial snapshot
    pub fn create_session(
        &self,
        entry_id: &str,
        domain: &str,
        main_objective: &str,
    ) -> SessionState {
        let session_id = uuid::Uuid::new_v4().to_string();
        let snapshot =
            SessionState::new(session_id, entry_id, domain, main_objective, Utc::now());
        self.sessions.save(snapshot.clone());
        tracing::info!(session_id = %snapshot.session_id, domain, "Session created");
        snapshot
    }

    pub fn snapshot(&self, session_id: &str) -> EngineResult<SessionState> {
        self.sessions
            .get(session_id)
            .ok_or_else(|| EngineError::NotFound(session_id.to_string()))
    }

    /// Ordered timeline for a session (defensive copy)
    pub fn timeline(&self, session_id: &str) -> Vec<Event> {
        self.timeline.list(session_id)
    }

    /// Rebuild the snapshot from scratch by replaying the timeline
    /// (recovery/audit path). Does not overwrite the stored snapshot.
    pub fn rebuild_snapshot(&self, session_id: &str) -> EngineResult<SessionState> {
        let current = self.snapshot(session_id)?;
        let base = SessionState::new(
            current.session_id.clone(),
            current.entry_id.clone(),
            current.domain.clone(),
            current.main_objective.clone(),
            current.created_at,
        );
        Ok(reducer::replay(base, &self.timeline.list(session_id)))
    }

    /// Process one inbound event to completion
    pub async fn on_event(
        &self,
        session_id: &str,
        inbound: InboundEvent,
    ) -> EngineResult<TurnOutcome> {
        let guard = self.session_guard(session_id);
        let _owner = guard.lock().await;

        // 1. Load snapshot, fail fast if absent
        let mut snapshot = self.snapshot(session_id)?;

        // 2-3. Normalize, append (idempotent), reduce, persist
        let now = Utc::now();
        let event = inbound.normalize(session_id, now);
        let before = self.timeline.len(session_id);
        let seq = self.timeline.append(session_id, event.clone());
        let freshly_appended = self.timeline.len(session_id) > before;
        if freshly_appended {
            reducer::reduce(&mut snapshot, &event, now);
            self.sessions.save(snapshot.clone());
        } else {
            // Duplicate retry: the fact already stands and was already
            // reduced; continue the turn from the stored state.
            tracing::info!(session_id, seq, "Retried event, continuing from stored snapshot");
            snapshot = self.snapshot(session_id)?;
        }

        // 4. Decide, and record the plan as a fact
        let plan = self.director.decide(&snapshot, &event, &self.config).await;
        let plan_now = Utc::now();
        let mut plan_event = Event::new(EventKind::DirectorPlan, "", plan_now);
        plan_event.turn_id = event.turn_id.clone();
        plan_event.director_plan = Some(plan.clone());
        self.timeline.append(session_id, plan_event.clone());
        reducer::reduce(&mut snapshot, &plan_event, plan_now);
        self.sessions.save(snapshot.clone());

        // 5. Assemble instructions (fallback prompt on any assembly
        // failure) and delegate generation (fallback text on provider
        // failure) - the learner-facing turn always completes.
        let prompt = self.assemble_or_fallback(&plan, &snapshot);
        let text = self.generate_or_fallback(&prompt.text, &snapshot).await;

        // 6. Record and fold the assistant output
        let out_now = Utc::now();
        let mut out_event = Event::new(EventKind::AssistantText, text.clone(), out_now);
        out_event.turn_id = event.turn_id.clone();
        self.timeline.append(session_id, out_event.clone());
        reducer::reduce(&mut snapshot, &out_event, out_now);
        self.sessions.save(snapshot);

        // 7. Respond with the message plus the plan as debug payload
        let quiz = (plan.output_action == OutputAction::Choice)
            .then(|| {
                plan.user_must_do.as_ref().map(|task| QuizPayload {
                    question_id: uuid::Uuid::new_v4().to_string(),
                    prompt: task.prompt.clone(),
                })
            })
            .flatten();
        Ok(TurnOutcome {
            message: AssistantMessage {
                text,
                user_must_do: plan.user_must_do.clone(),
                quiz,
            },
            plan,
        })
    }

    fn assemble_or_fallback(
        &self,
        plan: &DirectorPlan,
        snapshot: &SessionState,
    ) -> actor::ActorPrompt {
        let role_doc = self.templates.role(&plan.next_role);
        let beat_doc = self.templates.beat(&plan.next_beat);
        let (Some(role_doc), Some(beat_doc)) = (role_doc, beat_doc) else {
            tracing::warn!(
                session_id = %snapshot.session_id,
                role = %plan.next_role,
                beat = %plan.next_beat,
                "Missing role/beat template, using fallback prompt"
            );
            return actor::fallback_prompt(snapshot, &self.config);
        };
        match actor::assemble(plan, snapshot, role_doc, beat_doc, &self.config) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::warn!(
                    session_id = %snapshot.session_id,
                    error = %e,
                    "Prompt assembly failed, using fallback prompt"
                );
                actor::fallback_prompt(snapshot, &self.config)
            }
        }
    }

    async fn generate_or_fallback(&self, instructions: &str, snapshot: &SessionState) -> String {
        let outcome = tokio::time::timeout(
            self.config.provider_timeout,
            self.generator.generate(instructions),
        )
        .await;
        let text = match outcome {
            Ok(Ok(text)) if !text.is_empty() => Some(text),
            Ok(Ok(_)) => {
                tracing::warn!(
                    session_id = %snapshot.session_id,
                    "Generator returned empty text, using fallback"
                );
                None
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    session_id = %snapshot.session_id,
                    error = %e,
                    "Generation failed, using fallback text"
                );
                None
            }
            Err(_) => {
                tracing::warn!(
                    session_id = %snapshot.session_id,
                    timeout = ?self.config.provider_timeout,
                    "Generation timed out, using fallback text"
                );
                None
            }
        };
        // Generic but on-topic, never an error message
        text.unwrap_or_else(|| {
            format!(
                "Let's take stock of {} together - walk me through what \
                 you have so far.",
                snapshot.main_objective
            )
        })
    }

    fn session_guard(&self, session_id: &str) -> Arc<AsyncMutex<()>> {
        self.guards
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::director::HeuristicDirector;
    use crate::provider::{ProviderError, StubGenerator};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::HashMap as Map;

    const ROLE_DOC: &str = "# Host\n\n## Profile\nWarm and quick.\n";
    const BEAT_DOC: &str =
        "# Beat\n\n## Prompt Template\n```\nWork on {concept}.\n```\n";

    fn templates() -> TemplateLibrary {
        let roles: Map<String, String> = ["host", "expert", "skeptic"]
            .iter()
            .map(|r| ((*r).to_string(), ROLE_DOC.to_string()))
            .collect();
        let beats: Map<String, String> = ["Hook", "Check", "Reveal", "Stretch", "Recap"]
            .iter()
            .map(|b| ((*b).to_string(), BEAT_DOC.to_string()))
            .collect();
        TemplateLibrary::from_maps(roles, beats).unwrap()
    }

    fn engine() -> Engine {
        Engine::new(
            EngineConfig::default(),
            templates(),
            Box::new(HeuristicDirector),
            Box::new(StubGenerator),
        )
    }

    struct FailingGenerator;

    #[async_trait]
    impl Generator for FailingGenerator {
        async fn generate(&self, _instructions: &str) -> Result<String, ProviderError> {
            Err(ProviderError::malformed("garbage"))
        }
    }

    #[tokio::test]
    async fn turn_appends_three_facts_in_order() {
        let engine = engine();
        let session = engine.create_session("e-1", "physics", "entropy");

        // Pre-existing stale output 60s in the past
        let mut snap = engine.snapshot(&session.session_id).unwrap();
        snap.last_output_at = Some(Utc::now() - Duration::seconds(60));
        snap.output_clock_sec = 0;
        engine.sessions.save(snap);

        let outcome = engine
            .on_event(&session.session_id, InboundEvent::text("hello"))
            .await
            .unwrap();

        let events = engine.timeline(&session.session_id);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, EventKind::UserMessage);
        assert_eq!(events[1].kind, EventKind::DirectorPlan);
        assert_eq!(events[2].kind, EventKind::AssistantText);
        assert!(events.windows(2).all(|w| w[0].seq < w[1].seq));

        let snap = engine.snapshot(&session.session_id).unwrap();
        // One user turn, one assistant turn
        assert_eq!(snap.turns.len(), 2);
        assert_eq!(snap.output_clock_sec, 0);
        assert!(!outcome.message.text.is_empty());
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let engine = engine();
        let err = engine
            .on_event("no-such-session", InboundEvent::text("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn retried_event_id_does_not_duplicate_the_user_fact() {
        let engine = engine();
        let session = engine.create_session("e-1", "physics", "entropy");

        let inbound = || InboundEvent::text("hello").with_event_id("evt-1");
        engine.on_event(&session.session_id, inbound()).await.unwrap();
        engine.on_event(&session.session_id, inbound()).await.unwrap();

        let events = engine.timeline(&session.session_id);
        let user_events = events
            .iter()
            .filter(|e| e.kind == EventKind::UserMessage)
            .count();
        assert_eq!(user_events, 1);

        // The retry still completed a full turn: one extra plan+output pair
        assert_eq!(events.len(), 5);

        // And the snapshot holds exactly one user turn
        let snap = engine.snapshot(&session.session_id).unwrap();
        let user_turns = snap
            .turns
            .iter()
            .filter(|t| t.role == crate::session::TurnRole::User)
            .count();
        assert_eq!(user_turns, 1);
    }

    #[tokio::test]
    async fn generation_failure_degrades_to_on_topic_text() {
        let engine = Engine::new(
            EngineConfig::default(),
            templates(),
            Box::new(HeuristicDirector),
            Box::new(FailingGenerator),
        );
        let session = engine.create_session("e-1", "physics", "entropy");
        let outcome = engine
            .on_event(&session.session_id, InboundEvent::text("hello"))
            .await
            .unwrap();
        assert!(outcome.message.text.contains("entropy"));
        // The degraded output is still recorded as a fact
        let events = engine.timeline(&session.session_id);
        assert_eq!(events[2].kind, EventKind::AssistantText);
        assert_eq!(events[2].text, outcome.message.text);
    }

    #[tokio::test]
    async fn missing_templates_fall_back_without_failing_the_turn() {
        // Library with beats only: every role lookup misses
        let beats: Map<String, String> =
            [("Check".to_string(), BEAT_DOC.to_string())].into_iter().collect();
        let engine = Engine::new(
            EngineConfig::default(),
            TemplateLibrary::from_maps(Map::new(), beats).unwrap(),
            Box::new(HeuristicDirector),
            Box::new(StubGenerator),
        );
        let session = engine.create_session("e-1", "physics", "entropy");
        let outcome = engine
            .on_event(&session.session_id, InboundEvent::text("hello"))
            .await
            .unwrap();
        assert!(!outcome.message.text.is_empty());
    }

    #[tokio::test]
    async fn rebuilt_snapshot_matches_stored_snapshot() {
        let engine = engine();
        let session = engine.create_session("e-1", "physics", "entropy");
        for text in ["hello", "why does entropy grow?", "got it!"] {
            engine
                .on_event(&session.session_id, InboundEvent::text(text))
                .await
                .unwrap();
        }

        let stored = engine.snapshot(&session.session_id).unwrap();
        let rebuilt = engine.rebuild_snapshot(&session.session_id).unwrap();
        assert_eq!(stored.turns, rebuilt.turns);
        assert_eq!(stored.beat, rebuilt.beat);
        assert_eq!(stored.last_output_at, rebuilt.last_output_at);
        assert_eq!(stored.signals, rebuilt.signals);
    }

    #[tokio::test]
    async fn teach_back_plan_carries_user_task_in_message() {
        let engine = engine();
        let session = engine.create_session("e-1", "physics", "entropy");
        let outcome = engine
            .on_event(&session.session_id, InboundEvent::text("aha, got it!"))
            .await
            .unwrap();
        assert_eq!(outcome.plan.output_action, OutputAction::TeachBack);
        assert!(outcome.message.user_must_do.is_some());
    }
}
