//! Chat gateway error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("Bot API error {code}: {description}")]
    Api { code: i64, description: String },

    /// Another consumer is long-polling with the same token.
    #[error("Update poll conflict: {0}")]
    Conflict(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

pub type ChatResult<T> = Result<T, ChatError>;
