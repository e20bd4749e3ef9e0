//! Exchange client error types.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ExchangeError {
    /// Network failure, timeout or non-2xx HTTP status.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// Exchange answered with a non-zero result code.
    #[error("{message} (retCode={code})")]
    Api { code: i64, message: String },

    /// Response body was not the expected JSON.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Every fallback attempt failed; carries the failure of each attempt.
    #[error("{0}")]
    AllAttemptsFailed(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl ExchangeError {
    /// Whether the request never produced an exchange answer (network,
    /// timeout, HTTP status or client setup).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::HttpClient(_))
    }

    /// Whether the exchange itself rejected the request.
    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api { .. })
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
