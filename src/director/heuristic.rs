//! Rule-based Director variant
//!
//! Entirely local: classifies the latest user input with cheap lexical
//! cues plus the snapshot's pacing signals. Deliberately conservative -
//! the point is a sane turn even with no provider configured, not
//! clever pedagogy.

use super::{
    attach_user_task, enforce_pacing, talk_burst_for, Director, DirectorPlan, FlowMode,
    GoalDirection, Intent, MindState, OutputAction, PlanTrace, StackAction,
};
use crate::config::EngineConfig;
use crate::event::{Event, EventKind};
use crate::session::SessionState;
use async_trait::async_trait;
use std::collections::BTreeSet;

pub struct HeuristicDirector;

/// Lexical cues for each classification bucket
const CONFUSION_CUES: &[&str] = &["confus", "lost", "huh", "wait", "don't get", "dont get"];
const AHA_CUES: &[&str] = &["aha", "got it", "makes sense", "i see", "oh!"];
const VERIFY_CUES: &[&str] = &["right?", "correct?", "is that", "so basically"];
const DEEPEN_CUES: &[&str] = &["why", "how come", "what if", "how does"];
const META_CUES: &[&str] = &["slow down", "speed up", "skip", "take a break", "pause"];

fn contains_any(haystack: &str, cues: &[&str]) -> bool {
    cues.iter().any(|cue| haystack.contains(cue))
}

impl HeuristicDirector {
    fn classify(text: &str, snapshot: &SessionState) -> (BTreeSet<MindState>, Intent) {
        let lower = text.to_lowercase();
        let mut minds = BTreeSet::new();
        let mut intent = Intent::Continue;

        if contains_any(&lower, CONFUSION_CUES) {
            minds.insert(MindState::Fog);
            intent = Intent::Clarify;
        } else if contains_any(&lower, AHA_CUES) {
            minds.insert(MindState::Aha);
            intent = Intent::Continue;
        } else if contains_any(&lower, VERIFY_CUES) {
            minds.insert(MindState::Verify);
            intent = Intent::Clarify;
        } else if contains_any(&lower, DEEPEN_CUES) {
            minds.insert(MindState::Expand);
            intent = Intent::Deepen;
        } else if contains_any(&lower, META_CUES) {
            intent = Intent::Meta;
        } else if lower.trim_end().ends_with('?') {
            intent = Intent::Clarify;
        }

        // Very short replies late in a session read as flagging energy
        if snapshot.turns.len() > 8 && text.chars().count() <= 3 {
            minds.insert(MindState::Fatigue);
        }
        if minds.is_empty() {
            minds.insert(MindState::Partial);
        }
        (minds, intent)
    }

    fn pick_beat(intent: Intent, minds: &BTreeSet<MindState>, config: &EngineConfig) -> String {
        let preferred = if minds.contains(&MindState::Fog) || minds.contains(&MindState::Fatigue) {
            "Check"
        } else if minds.contains(&MindState::Aha) {
            "Recap"
        } else if intent == Intent::Deepen {
            "Stretch"
        } else {
            return config.output_beat.clone();
        };
        if config.beats.iter().any(|b| b == preferred) {
            preferred.to_string()
        } else {
            config.output_beat.clone()
        }
    }

    fn pick_role(intent: Intent, minds: &BTreeSet<MindState>, config: &EngineConfig) -> String {
        let preferred = if intent == Intent::Deepen {
            "expert"
        } else if minds.contains(&MindState::Verify) || minds.contains(&MindState::Illusion) {
            "skeptic"
        } else {
            return config.default_role.clone();
        };
        if config.roles.iter().any(|r| r == preferred) {
            preferred.to_string()
        } else {
            config.default_role.clone()
        }
    }

    fn pick_action(intent: Intent, minds: &BTreeSet<MindState>) -> OutputAction {
        if minds.contains(&MindState::Fog) {
            OutputAction::Explain
        } else if minds.contains(&MindState::Aha) {
            OutputAction::TeachBack
        } else if minds.contains(&MindState::Verify) {
            OutputAction::BoundaryCase
        } else if minds.contains(&MindState::Fatigue) {
            OutputAction::Recap
        } else if intent == Intent::Deepen {
            OutputAction::Example
        } else {
            OutputAction::Ask
        }
    }
}

#[async_trait]
impl Director for HeuristicDirector {
    async fn decide(
        &self,
        snapshot: &SessionState,
        event: &Event,
        config: &EngineConfig,
    ) -> DirectorPlan {
        let text = if event.kind == EventKind::QuizAnswer {
            event.answer.as_deref().unwrap_or_default()
        } else {
            event.text.as_str()
        };
        let (minds, intent) = Self::classify(text, snapshot);
        let next_beat = Self::pick_beat(intent, &minds, config);
        let next_role = Self::pick_role(intent, &minds, config);
        let output_action = Self::pick_action(intent, &minds);

        let rescue = minds.contains(&MindState::Fog)
            || snapshot.cognitive_load >= config.high_load_threshold;

        let plan = DirectorPlan {
            user_mind_state: minds.clone(),
            flow_mode: if rescue { FlowMode::Rescue } else { FlowMode::Flow },
            intent,
            next_beat,
            next_role,
            output_action,
            user_must_do: None,
            talk_burst_limit_sec: talk_burst_for(snapshot, config),
            tension_goal: if snapshot.tension_level >= 4 {
                GoalDirection::Decrease
            } else {
                GoalDirection::Keep
            },
            load_goal: if snapshot.cognitive_load >= config.high_load_threshold {
                GoalDirection::Decrease
            } else {
                GoalDirection::Keep
            },
            stack_action: if intent == Intent::Branch {
                StackAction::Push
            } else if !snapshot.question_stack.is_empty()
                && minds.contains(&MindState::Aha)
            {
                StackAction::Pop
            } else {
                StackAction::Keep
            },
            notes: String::new(),
            trace: Some(PlanTrace {
                candidates: config.beats.clone(),
                rationale: vec![format!("intent={intent:?} minds={minds:?}")],
            }),
        };

        let plan = attach_user_task(plan, snapshot);
        enforce_pacing(plan, snapshot, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot() -> SessionState {
        SessionState::new("s-1", "e-1", "physics", "entropy", Utc::now())
    }

    fn user_event(text: &str) -> Event {
        Event::new(EventKind::UserMessage, text, Utc::now())
    }

    #[tokio::test]
    async fn confusion_triggers_rescue_explain() {
        let cfg = EngineConfig::default();
        let plan = HeuristicDirector
            .decide(&snapshot(), &user_event("wait, I'm totally lost"), &cfg)
            .await;
        assert!(plan.user_mind_state.contains(&MindState::Fog));
        assert_eq!(plan.flow_mode, FlowMode::Rescue);
        assert_eq!(plan.output_action, OutputAction::Explain);
        assert_eq!(plan.next_beat, "Check");
    }

    #[tokio::test]
    async fn aha_asks_for_teach_back_with_task() {
        let cfg = EngineConfig::default();
        let plan = HeuristicDirector
            .decide(&snapshot(), &user_event("oh, got it now!"), &cfg)
            .await;
        assert_eq!(plan.output_action, OutputAction::TeachBack);
        let task = plan.user_must_do.expect("teach-back needs a learner task");
        assert!(task.prompt.contains("entropy"));
    }

    #[tokio::test]
    async fn deepen_routes_to_expert() {
        let cfg = EngineConfig::default();
        let plan = HeuristicDirector
            .decide(&snapshot(), &user_event("why does that happen?"), &cfg)
            .await;
        assert_eq!(plan.intent, Intent::Deepen);
        assert_eq!(plan.next_role, "expert");
    }

    #[tokio::test]
    async fn stale_output_clock_always_yields_output() {
        let cfg = EngineConfig::default();
        let mut snap = snapshot();
        snap.output_clock_sec = cfg.pacing_threshold_sec + 30;
        // A message that would otherwise be a quiet Ask turn
        let plan = HeuristicDirector.decide(&snap, &user_event("ok"), &cfg).await;
        assert!(plan.output_action.produces_output());
        assert_eq!(plan.next_beat, cfg.output_beat);
    }

    #[tokio::test]
    async fn high_load_shrinks_budget() {
        let cfg = EngineConfig::default();
        let mut snap = snapshot();
        snap.cognitive_load = cfg.high_load_threshold + 1;
        let plan = HeuristicDirector.decide(&snap, &user_event("ok"), &cfg).await;
        assert_eq!(plan.talk_burst_limit_sec, cfg.talk_burst_high_load_sec);
        assert_eq!(plan.load_goal, GoalDirection::Decrease);
    }

    #[tokio::test]
    async fn quiz_answers_classify_on_the_answer() {
        let cfg = EngineConfig::default();
        let mut event = Event::new(EventKind::QuizAnswer, "", Utc::now());
        event.answer = Some("got it, makes sense".to_string());
        let plan = HeuristicDirector.decide(&snapshot(), &event, &cfg).await;
        assert!(plan.user_mind_state.contains(&MindState::Aha));
    }
}
