//! Telegram dashboard for a derivatives exchange account.
//!
//! Main application that wires the components together:
//! - Long-poll update dispatcher with command and callback routing
//! - Per-user menu context and deferred message cleanup
//! - Account replies built from exchange snapshots
//! - Rate-limited broadcast price alert

pub mod alert;
pub mod app;
pub mod cleanup;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod users;

pub use alert::{AlertOutcome, PriceAlertService};
pub use app::Application;
pub use cleanup::{CleanupJob, CleanupScheduler};
pub use commands::{CallbackAction, Command};
pub use config::{AppConfig, EnvSettings};
pub use context::{spawn_context_store, ContextStoreHandle, InteractionContext};
pub use dispatcher::{DispatcherSettings, UpdateDispatcher, UpdateOffset};
pub use error::{AppError, AppResult};
pub use handlers::AccountService;
pub use users::UserDirectory;
