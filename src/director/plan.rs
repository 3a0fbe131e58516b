//! Director decision output
//!
//! A plan is not a persisted entity of its own; it rides inside a
//! `director_plan` timeline event so that every decision is itself an
//! auditable fact.

use crate::config::EngineConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Tags describing the learner's inferred mental state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MindState {
    /// Lost, can't follow
    Fog,
    /// Confidently wrong
    Illusion,
    /// Has pieces, not the whole
    Partial,
    /// Just got it
    Aha,
    /// Wants confirmation
    Verify,
    /// Ready for more
    Expand,
    /// Running out of steam
    Fatigue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowMode {
    #[default]
    Flow,
    Rescue,
}

/// What the latest user input is trying to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Clarify,
    Deepen,
    Branch,
    Meta,
    OffTopic,
    #[default]
    Continue,
}

/// The action the next turn should perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputAction {
    #[default]
    Explain,
    Recap,
    Ask,
    /// Hold back and let the learner work; the only non-output action
    Listen,
    TeachBack,
    Choice,
    Example,
    BoundaryCase,
    Transfer,
}

impl OutputAction {
    /// Whether this action produces assistant output (speech). The
    /// pacing anti-starvation rule may only select actions for which
    /// this holds.
    pub fn produces_output(self) -> bool {
        !matches!(self, OutputAction::Listen)
    }

    /// Whether the learner must produce an artifact in response
    pub fn requires_user_artifact(self) -> bool {
        matches!(
            self,
            OutputAction::TeachBack
                | OutputAction::Choice
                | OutputAction::Example
                | OutputAction::BoundaryCase
                | OutputAction::Transfer
        )
    }
}

/// Something the learner is required to produce this turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMustDo {
    pub kind: OutputAction,
    pub prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalDirection {
    Increase,
    Decrease,
    #[default]
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackAction {
    Push,
    Pop,
    #[default]
    Keep,
}

/// Debug trace with named fields rather than an open key/value bag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTrace {
    /// Beats that were considered before the final choice
    pub candidates: Vec<String>,
    /// Why the chosen beat/action won
    pub rationale: Vec<String>,
}

/// The Director's structured decision for the next turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectorPlan {
    pub user_mind_state: BTreeSet<MindState>,
    pub flow_mode: FlowMode,
    pub intent: Intent,
    pub next_beat: String,
    pub next_role: String,
    pub output_action: OutputAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_must_do: Option<UserMustDo>,
    pub talk_burst_limit_sec: u32,
    pub tension_goal: GoalDirection,
    pub load_goal: GoalDirection,
    pub stack_action: StackAction,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<PlanTrace>,
}

impl DirectorPlan {
    /// The conservative default used whenever policy cannot run:
    /// provider timeout, unparsable provider output, or any other
    /// decision failure. Deterministic by construction.
    pub fn fallback(config: &EngineConfig) -> Self {
        Self {
            user_mind_state: BTreeSet::new(),
            flow_mode: FlowMode::Rescue,
            intent: Intent::Continue,
            next_beat: "Check".to_string(),
            next_role: config.default_role.clone(),
            output_action: OutputAction::Recap,
            user_must_do: None,
            talk_burst_limit_sec: config.talk_burst_default_sec,
            tension_goal: GoalDirection::Decrease,
            load_goal: GoalDirection::Decrease,
            stack_action: StackAction::Keep,
            notes: "fallback plan".to_string(),
            trace: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_actions_are_a_subset_of_output_actions() {
        for action in [
            OutputAction::Explain,
            OutputAction::Recap,
            OutputAction::Ask,
            OutputAction::Listen,
            OutputAction::TeachBack,
            OutputAction::Choice,
            OutputAction::Example,
            OutputAction::BoundaryCase,
            OutputAction::Transfer,
        ] {
            if action.requires_user_artifact() {
                assert!(action.produces_output());
            }
        }
        assert!(!OutputAction::Listen.produces_output());
    }

    #[test]
    fn fallback_plan_is_rescue_recap() {
        let cfg = EngineConfig::default();
        let plan = DirectorPlan::fallback(&cfg);
        assert_eq!(plan.flow_mode, FlowMode::Rescue);
        assert_eq!(plan.next_beat, "Check");
        assert_eq!(plan.output_action, OutputAction::Recap);
        assert_eq!(plan.next_role, cfg.default_role);
    }

    #[test]
    fn plan_serializes_with_snake_case_tags() {
        let cfg = EngineConfig::default();
        let json = serde_json::to_value(DirectorPlan::fallback(&cfg)).unwrap();
        assert_eq!(json["flow_mode"], "rescue");
        assert_eq!(json["output_action"], "recap");
        assert_eq!(json["stack_action"], "keep");
    }
}
