//! Delegated Director variant
//!
//! Ships a compact snapshot-derived context to the external decision
//! provider and parses its reply into a plan. The provider is treated
//! as fallible and slow: the call runs under the configured timeout,
//! and timeout, transport failure, or unparsable output all degrade to
//! the conservative fallback plan - the turn never fails here.

use super::{
    attach_user_task, enforce_pacing, talk_burst_for, Director, DirectorPlan, FlowMode,
    GoalDirection, Intent, MindState, OutputAction, StackAction, UserMustDo,
};
use crate::config::EngineConfig;
use crate::event::Event;
use crate::provider::{DecisionProvider, DecisionRequest};
use crate::session::SessionState;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct DelegatedDirector {
    provider: Arc<dyn DecisionProvider>,
}

/// Lenient wire form of a plan: every field optional so a provider that
/// omits some is still usable. Role/beat membership is validated after
/// parsing; anything outside the configured sets rejects the reply.
#[derive(Debug, Deserialize)]
struct PlanWire {
    #[serde(default)]
    user_mind_state: BTreeSet<MindState>,
    #[serde(default)]
    flow_mode: FlowMode,
    #[serde(default)]
    intent: Intent,
    next_beat: String,
    next_role: String,
    #[serde(default)]
    output_action: OutputAction,
    #[serde(default)]
    user_must_do: Option<UserMustDo>,
    #[serde(default)]
    talk_burst_limit_sec: Option<u32>,
    #[serde(default)]
    tension_goal: GoalDirection,
    #[serde(default)]
    load_goal: GoalDirection,
    #[serde(default)]
    stack_action: StackAction,
    #[serde(default)]
    notes: String,
}

impl DelegatedDirector {
    pub fn new(provider: Arc<dyn DecisionProvider>) -> Self {
        Self { provider }
    }

    fn build_request(snapshot: &SessionState, config: &EngineConfig) -> DecisionRequest {
        DecisionRequest {
            session_id: snapshot.session_id.clone(),
            objective: snapshot.main_objective.clone(),
            current_beat: snapshot.beat.clone(),
            output_clock_sec: snapshot.output_clock_sec,
            tension_level: snapshot.tension_level,
            cognitive_load: snapshot.cognitive_load,
            last_user_text: snapshot.last_user_text().unwrap_or_default().to_string(),
            available_roles: config.roles.clone(),
            available_beats: config.beats.clone(),
        }
    }

    fn parse_plan(
        raw: &str,
        snapshot: &SessionState,
        config: &EngineConfig,
    ) -> Option<DirectorPlan> {
        let wire: PlanWire = serde_json::from_str(raw).ok()?;
        if !config.beats.iter().any(|b| *b == wire.next_beat) {
            tracing::warn!(beat = %wire.next_beat, "Provider chose a beat outside the configured set");
            return None;
        }
        if !config.roles.iter().any(|r| *r == wire.next_role) {
            tracing::warn!(role = %wire.next_role, "Provider chose a role outside the configured set");
            return None;
        }
        // The provider may propose a budget but never exceed ours
        let budget = talk_burst_for(snapshot, config);
        let talk_burst_limit_sec = wire
            .talk_burst_limit_sec
            .map_or(budget, |b| b.min(budget))
            .max(1);
        Some(DirectorPlan {
            user_mind_state: wire.user_mind_state,
            flow_mode: wire.flow_mode,
            intent: wire.intent,
            next_beat: wire.next_beat,
            next_role: wire.next_role,
            output_action: wire.output_action,
            user_must_do: wire.user_must_do,
            talk_burst_limit_sec,
            tension_goal: wire.tension_goal,
            load_goal: wire.load_goal,
            stack_action: wire.stack_action,
            notes: wire.notes,
            trace: None,
        })
    }
}

#[async_trait]
impl Director for DelegatedDirector {
    async fn decide(
        &self,
        snapshot: &SessionState,
        _event: &Event,
        config: &EngineConfig,
    ) -> DirectorPlan {
        let request = Self::build_request(snapshot, config);
        let outcome =
            tokio::time::timeout(config.provider_timeout, self.provider.decide(&request)).await;

        let plan = match outcome {
            Err(_) => {
                tracing::warn!(
                    session_id = %snapshot.session_id,
                    timeout = ?config.provider_timeout,
                    "Decision provider timed out, using fallback plan"
                );
                None
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    session_id = %snapshot.session_id,
                    error = %e,
                    "Decision provider failed, using fallback plan"
                );
                None
            }
            Ok(Ok(raw)) => {
                let parsed = Self::parse_plan(&raw, snapshot, config);
                if parsed.is_none() {
                    tracing::warn!(
                        session_id = %snapshot.session_id,
                        "Decision provider returned malformed plan, using fallback"
                    );
                }
                parsed
            }
        };

        let plan = plan.unwrap_or_else(|| DirectorPlan::fallback(config));
        let plan = attach_user_task(plan, snapshot);
        enforce_pacing(plan, snapshot, config)
    }
}
