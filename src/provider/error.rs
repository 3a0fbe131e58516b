//! Provider error types

use thiserror::Error;

/// Provider failure with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Network, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Auth, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Malformed, message)
    }
}

/// Failure classification; retryability drives whether a caller may
/// resend the same logical request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Call exceeded the configured deadline - retryable
    Timeout,
    /// Connection-level failure - retryable
    Network,
    /// Provider-side 5xx - retryable
    ServerError,
    /// Credentials rejected - not retryable
    Auth,
    /// Response arrived but could not be interpreted - not retryable,
    /// callers substitute the fallback instead
    Malformed,
}

impl ProviderErrorKind {
    #[allow(dead_code)] // Part of the error contract, exercised in tests
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Timeout | Self::Network | Self::ServerError)
    }
}
