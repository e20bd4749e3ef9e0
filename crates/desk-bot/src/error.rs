//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chat error: {0}")]
    Chat(#[from] desk_chat::ChatError),

    #[error("Exchange error: {0}")]
    Exchange(#[from] desk_exchange::ExchangeError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] desk_persistence::PersistenceError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] desk_telemetry::TelemetryError),

    #[error("Domain error: {0}")]
    Core(#[from] desk_core::CoreError),
}

pub type AppResult<T> = Result<T, AppError>;
