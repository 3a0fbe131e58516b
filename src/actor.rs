//! Instruction assembly
//!
//! The Actor is a pure text transform: plan + session context + opaque
//! role/beat templates in, bounded instruction sections out. It owns no
//! template content; the two-stage extraction (role essence, beat
//! directive) lets templates evolve without touching this code.

pub mod template;

use crate::config::EngineConfig;
use crate::director::{DirectorPlan, GoalDirection};
use crate::error::{EngineError, EngineResult};
use crate::session::SessionState;
use std::fmt::Write;

/// Required section headers, in assembly order, each appearing exactly
/// once in a valid prompt
pub const SECTION_ROLE: &str = "## Role";
pub const SECTION_SITUATION: &str = "## Current Situation";
pub const SECTION_STRATEGY: &str = "## Strategy & Task";
pub const SECTION_CONSTRAINTS: &str = "## Constraints";

pub const REQUIRED_SECTIONS: [&str; 4] = [
    SECTION_ROLE,
    SECTION_SITUATION,
    SECTION_STRATEGY,
    SECTION_CONSTRAINTS,
];

const ROLE_ESSENCE_MAX_LINES: usize = 6;

/// Assembled instructions plus a typed debug record
#[derive(Debug, Clone)]
pub struct ActorPrompt {
    pub text: String,
    pub debug: PromptDebug,
}

/// Named debug fields instead of an open key/value bag
#[derive(Debug, Clone, Default)]
#[allow(dead_code)] // Inspected by tests and debug tooling
pub struct PromptDebug {
    pub role_essence_lines: usize,
    pub directive_from_template: bool,
    pub is_fallback: bool,
}

/// Assemble instructions for the turn described by `plan`.
///
/// Errors: `Validation` when the plan carries no actionable instruction
/// or the assembled prompt violates the section/length contract. The
/// caller substitutes `fallback_prompt` on any error here rather than
/// failing the turn; missing templates are the caller's lookup concern.
pub fn assemble(
    plan: &DirectorPlan,
    snapshot: &SessionState,
    role_doc: &str,
    beat_doc: &str,
    config: &EngineConfig,
) -> EngineResult<ActorPrompt> {
    if plan.next_role.is_empty() || plan.next_beat.is_empty() {
        return Err(EngineError::Validation(
            "director supplied no actionable instruction".to_string(),
        ));
    }

    let essence = template::role_essence(role_doc, ROLE_ESSENCE_MAX_LINES);
    if essence.is_empty() {
        return Err(EngineError::Validation(format!(
            "role template for '{}' has no usable content",
            plan.next_role
        )));
    }

    let (directive, directive_from_template) = match template::prompt_block(beat_doc) {
        Some(block) => (
            template::substitute(
                &block,
                &[
                    ("concept", &snapshot.main_objective),
                    ("metaphor", &snapshot.domain),
                ],
            ),
            true,
        ),
        None => (
            format!(
                "Run the '{}' beat: {:?} on {}.",
                plan.next_beat, plan.output_action, snapshot.main_objective
            ),
            false,
        ),
    };

    let mut text = String::new();
    let _ = writeln!(text, "{SECTION_ROLE}");
    let _ = writeln!(text, "You are '{}'.", plan.next_role);
    for line in &essence {
        let _ = writeln!(text, "{line}");
    }

    let _ = writeln!(text, "\n{SECTION_SITUATION}");
    let _ = writeln!(text, "Learner mind state: {:?}", plan.user_mind_state);
    let _ = writeln!(text, "Detected intent: {:?}", plan.intent);
    if let Some(last) = snapshot.last_user_text() {
        let _ = writeln!(text, "Last learner input: {last}");
    }
    let _ = writeln!(text, "Session objective: {}", snapshot.main_objective);

    let _ = writeln!(text, "\n{SECTION_STRATEGY}");
    let _ = writeln!(
        text,
        "Beat: {} | Action: {:?}",
        plan.next_beat, plan.output_action
    );
    let _ = writeln!(text, "{directive}");
    if let Some(task) = &plan.user_must_do {
        let _ = writeln!(text, "Require the learner to respond: {}", task.prompt);
    }

    let _ = writeln!(text, "\n{SECTION_CONSTRAINTS}");
    let _ = writeln!(
        text,
        "Speak for at most {} seconds.",
        plan.talk_burst_limit_sec
    );
    let _ = writeln!(text, "Stay warm and concrete; no lecturing tone.");
    if plan.load_goal == GoalDirection::Decrease {
        let _ = writeln!(text, "Simplify language; one idea per sentence.");
    }
    if plan.tension_goal == GoalDirection::Decrease {
        let _ = writeln!(text, "Lower the intensity; reassure before challenging.");
    }

    validate(&text, config)?;
    Ok(ActorPrompt {
        text,
        debug: PromptDebug {
            role_essence_lines: essence.len(),
            directive_from_template,
            is_fallback: false,
        },
    })
}

/// Every required header exactly once, total length within the cap
pub fn validate(text: &str, config: &EngineConfig) -> EngineResult<()> {
    for header in REQUIRED_SECTIONS {
        let count = text
            .lines()
            .filter(|line| line.trim_end() == header)
            .count();
        if count != 1 {
            return Err(EngineError::Validation(format!(
                "section '{header}' appears {count} times, expected exactly once"
            )));
        }
    }
    let chars = text.chars().count();
    if chars > config.max_prompt_chars {
        return Err(EngineError::Validation(format!(
            "prompt length {chars} exceeds cap {}",
            config.max_prompt_chars
        )));
    }
    Ok(())
}

/// Deterministic substitute used whenever assembly fails: references
/// only the objective and a generic talk-burst limit, and always passes
/// validation by construction.
pub fn fallback_prompt(snapshot: &SessionState, config: &EngineConfig) -> ActorPrompt {
    let mut text = String::new();
    let _ = writeln!(text, "{SECTION_ROLE}");
    let _ = writeln!(text, "You are a patient tutor.");
    let _ = writeln!(text, "\n{SECTION_SITUATION}");
    let _ = writeln!(text, "Session objective: {}", snapshot.main_objective);
    let _ = writeln!(text, "\n{SECTION_STRATEGY}");
    let _ = writeln!(
        text,
        "Briefly recap where the session stands on {}, then ask one \
         open question to re-engage the learner.",
        snapshot.main_objective
    );
    let _ = writeln!(text, "\n{SECTION_CONSTRAINTS}");
    let _ = writeln!(
        text,
        "Speak for at most {} seconds.",
        config.talk_burst_default_sec
    );
    ActorPrompt {
        text,
        debug: PromptDebug {
            role_essence_lines: 0,
            directive_from_template: false,
            is_fallback: true,
        },
    }
}
