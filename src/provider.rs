//! External decision/generation provider seam
//!
//! The engine never talks to a model directly; the Director's delegated
//! variant and the Orchestrator's generation step go through these
//! traits. Providers are assumed fallible and slow: every call is
//! wrapped in a timeout by the caller, and every failure path has a
//! deterministic fallback.

mod error;
mod http;

pub use error::{ProviderError, ProviderErrorKind};
pub use http::HttpProvider;

use async_trait::async_trait;
use serde::Serialize;

/// Snapshot-derived context shipped to the decision provider
#[derive(Debug, Clone, Serialize)]
pub struct DecisionRequest {
    pub session_id: String,
    pub objective: String,
    pub current_beat: String,
    pub output_clock_sec: i64,
    pub tension_level: u8,
    pub cognitive_load: u8,
    pub last_user_text: String,
    pub available_roles: Vec<String>,
    pub available_beats: Vec<String>,
}

/// Classifies intent/mind-state and proposes the next plan.
/// Returns the provider's raw output; the Director owns parsing and
/// the malformed-output fallback.
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    async fn decide(&self, request: &DecisionRequest) -> Result<String, ProviderError>;
}

/// Turns assembled instructions into learner-facing text
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, instructions: &str) -> Result<String, ProviderError>;
}

/// Deterministic generator for degraded mode and tests: acknowledges
/// the turn without delegating anywhere.
pub struct StubGenerator;

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(&self, instructions: &str) -> Result<String, ProviderError> {
        let _ = instructions;
        Ok("Let's keep going - tell me what part feels solid so far, and \
            what part feels shaky."
            .to_string())
    }
}
