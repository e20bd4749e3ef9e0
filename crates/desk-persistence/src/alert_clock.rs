//! Last-sent timestamp of the broadcast price alert.

use crate::store::KeyValueStore;
use std::sync::Arc;
use tracing::warn;

const KEY: &str = "alert_last_sent";

/// Unix-seconds timestamp of the last delivered alert.
///
/// Storage failures are logged and never escalated: a lost timestamp only
/// means the next alert may come early.
pub struct AlertClock {
    store: Arc<dyn KeyValueStore>,
}

impl AlertClock {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Last-sent time, or 0 when unknown or unreadable.
    pub fn load(&self) -> i64 {
        match self.store.get(KEY) {
            Ok(Some(raw)) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(raw = %raw.trim(), "Unreadable alert timestamp, treating as never sent");
                0
            }),
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "Failed to load alert timestamp");
                0
            }
        }
    }

    /// Persist a new last-sent time.
    pub fn save(&self, unix_secs: i64) {
        if let Err(e) = self.store.put(KEY, &unix_secs.to_string()) {
            warn!(error = %e, unix_secs, "Failed to persist alert timestamp");
        }
    }
}
