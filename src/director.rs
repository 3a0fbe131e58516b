//! Turn-by-turn policy
//!
//! The Director is the transition function over the session's
//! `(role, beat)` control state: given the snapshot and the freshly
//! reduced event it decides who speaks next, under which strategy beat,
//! and within what budget. It owns no persisted state - all memory is
//! in the snapshot.
//!
//! Two variants sit behind one trait so the Orchestrator is agnostic:
//! a local rule-based policy and a delegated policy that asks an
//! external decision provider and falls back to a conservative default
//! on timeout or malformed output.

mod delegated;
mod heuristic;
mod plan;

pub use delegated::DelegatedDirector;
pub use heuristic::HeuristicDirector;
pub use plan::{
    DirectorPlan, FlowMode, GoalDirection, Intent, MindState, OutputAction, PlanTrace,
    StackAction, UserMustDo,
};

use crate::config::EngineConfig;
use crate::event::Event;
use crate::session::SessionState;
use async_trait::async_trait;

/// Policy capability. `decide` is infallible by contract: variants
/// absorb their own failures and return the fallback plan instead.
#[async_trait]
pub trait Director: Send + Sync {
    async fn decide(
        &self,
        snapshot: &SessionState,
        event: &Event,
        config: &EngineConfig,
    ) -> DirectorPlan;
}

/// Anti-starvation clamp, applied to every plan regardless of which
/// variant produced it: once the output clock passes the configured
/// threshold the next turn must produce output.
pub(crate) fn enforce_pacing(
    mut plan: DirectorPlan,
    snapshot: &SessionState,
    config: &EngineConfig,
) -> DirectorPlan {
    if snapshot.output_clock_sec <= config.pacing_threshold_sec {
        return plan;
    }
    if !plan.output_action.produces_output() {
        plan.output_action = OutputAction::Explain;
        plan.user_must_do = None;
    }
    plan.next_beat = config.output_beat.clone();
    if let Some(trace) = plan.trace.as_mut() {
        trace.rationale.push(format!(
            "pacing override: output clock {}s past threshold {}s",
            snapshot.output_clock_sec, config.pacing_threshold_sec
        ));
    }
    plan
}

/// Talk-burst budget for the turn, reduced under elevated load
pub(crate) fn talk_burst_for(snapshot: &SessionState, config: &EngineConfig) -> u32 {
    if snapshot.cognitive_load >= config.high_load_threshold {
        config.talk_burst_high_load_sec
    } else {
        config.talk_burst_default_sec
    }
}

/// Attach the learner task whenever the action demands an artifact
pub(crate) fn attach_user_task(mut plan: DirectorPlan, snapshot: &SessionState) -> DirectorPlan {
    if plan.output_action.requires_user_artifact() && plan.user_must_do.is_none() {
        let prompt = match plan.output_action {
            OutputAction::TeachBack => format!(
                "Explain, in your own words, what we just covered about {}.",
                snapshot.main_objective
            ),
            OutputAction::Choice => {
                "Pick the option you believe is right, and say why.".to_string()
            }
            OutputAction::Example => format!(
                "Give one concrete example of {} from your own experience.",
                snapshot.main_objective
            ),
            OutputAction::BoundaryCase => format!(
                "Describe a situation where {} would NOT apply.",
                snapshot.main_objective
            ),
            OutputAction::Transfer => format!(
                "Apply the idea of {} to a completely different domain.",
                snapshot.main_objective
            ),
            _ => unreachable!("requires_user_artifact covers only artifact actions"),
        };
        plan.user_must_do = Some(UserMustDo {
            kind: plan.output_action,
            prompt,
        });
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot_with_clock(clock: i64) -> SessionState {
        let mut s = SessionState::new("s-1", "e-1", "physics", "entropy", Utc::now());
        s.output_clock_sec = clock;
        s
    }

    #[test]
    fn pacing_override_forces_output_action_and_beat() {
        let cfg = EngineConfig::default();
        let mut plan = DirectorPlan::fallback(&cfg);
        plan.output_action = OutputAction::Listen;
        plan.next_beat = "Hook".to_string();

        let snap = snapshot_with_clock(cfg.pacing_threshold_sec + 1);
        let clamped = enforce_pacing(plan, &snap, &cfg);
        assert!(clamped.output_action.produces_output());
        assert_eq!(clamped.next_beat, cfg.output_beat);
    }

    #[test]
    fn pacing_leaves_plans_alone_under_threshold() {
        let cfg = EngineConfig::default();
        let mut plan = DirectorPlan::fallback(&cfg);
        plan.output_action = OutputAction::Listen;
        plan.next_beat = "Hook".to_string();

        let snap = snapshot_with_clock(cfg.pacing_threshold_sec);
        let kept = enforce_pacing(plan, &snap, &cfg);
        assert_eq!(kept.output_action, OutputAction::Listen);
        assert_eq!(kept.next_beat, "Hook");
    }

    #[test]
    fn high_load_reduces_talk_burst() {
        let cfg = EngineConfig::default();
        let mut snap = snapshot_with_clock(0);
        assert_eq!(talk_burst_for(&snap, &cfg), cfg.talk_burst_default_sec);
        snap.cognitive_load = cfg.high_load_threshold;
        assert_eq!(talk_burst_for(&snap, &cfg), cfg.talk_burst_high_load_sec);
    }

    #[test]
    fn artifact_actions_get_a_user_task() {
        let cfg = EngineConfig::default();
        let snap = snapshot_with_clock(0);
        for action in [
            OutputAction::TeachBack,
            OutputAction::Choice,
            OutputAction::Example,
            OutputAction::BoundaryCase,
            OutputAction::Transfer,
        ] {
            let mut plan = DirectorPlan::fallback(&cfg);
            plan.output_action = action;
            let plan = attach_user_task(plan, &snap);
            let task = plan.user_must_do.expect("artifact action needs a task");
            assert_eq!(task.kind, action);
            assert!(!task.prompt.is_empty());
        }

        let mut plan = DirectorPlan::fallback(&cfg);
        plan.output_action = OutputAction::Explain;
        assert!(attach_user_task(plan, &snap).user_must_do.is_none());
    }
}
