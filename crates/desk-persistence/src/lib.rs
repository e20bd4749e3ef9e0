//! Durable state for wallet-desk.
//!
//! Two small pieces of state survive restarts:
//! - the per-user month-to-date baseline
//! - the timestamp of the last broadcast price alert
//!
//! Both sit on top of [`KeyValueStore`], which has a directory-of-files
//! implementation for production and an in-memory one for tests.

pub mod alert_clock;
pub mod baseline;
pub mod error;
pub mod store;

pub use alert_clock::AlertClock;
pub use baseline::{BaselineRecord, BaselineStore};
pub use error::{PersistenceError, PersistenceResult};
pub use store::{FileStore, KeyValueStore, MemoryStore};
