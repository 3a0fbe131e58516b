//! Engine error taxonomy
//!
//! Only store failures and unknown-session lookups surface as hard
//! failures; policy, template, and provider failures degrade to
//! deterministic fallbacks so the learner-facing turn always completes.

use crate::provider::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Unknown session - propagated to the caller, no blind retry
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Malformed or missing prompt material (missing template, empty
    /// director instruction, section/length violation)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Decision/generation provider timed out or returned garbage
    #[error("Provider failure: {0}")]
    External(#[from] ProviderError),

    /// Store-layer failure - aborts the current call; the caller may
    /// retry the same logical event safely (appends are idempotent)
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Whether the caller may retry the same logical event verbatim
    #[allow(dead_code)] // Part of the error contract, exercised in tests
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Internal(_) | EngineError::External(_))
    }
}
