//! Per-user month-to-date baseline.
//!
//! The first observation of a month captures the wallet value; later calls
//! in the same month return it unchanged. A new month supersedes the record.

use crate::error::PersistenceResult;
use crate::store::KeyValueStore;
use desk_core::MonthKey;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Stored baseline of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineRecord {
    pub month: MonthKey,
    pub start_wallet: Decimal,
}

/// Month baselines keyed by user id.
pub struct BaselineStore {
    store: Arc<dyn KeyValueStore>,
    /// Serializes read-check-write so one (user, month) gets one record.
    write_lock: Mutex<()>,
}

impl BaselineStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    fn key(user_id: i64) -> String {
        format!("baseline_{user_id}.json")
    }

    /// Current record for `user_id`, if any. Unreadable records count as absent.
    pub fn get(&self, user_id: i64) -> PersistenceResult<Option<BaselineRecord>> {
        let Some(raw) = self.store.get(&Self::key(user_id))? else {
            return Ok(None);
        };
        match serde_json::from_str::<BaselineRecord>(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(user_id, error = %e, "Discarding unreadable baseline record");
                Ok(None)
            }
        }
    }

    /// Baseline wallet value for `month`, creating it from `current_wallet`
    /// on first use in that month. The new record is persisted before returning.
    pub fn get_or_create(
        &self,
        user_id: i64,
        month: MonthKey,
        current_wallet: Decimal,
    ) -> PersistenceResult<Decimal> {
        let _guard = self.write_lock.lock();

        let previous = self.get(user_id)?;
        if let Some(record) = &previous {
            if record.month == month {
                return Ok(record.start_wallet);
            }
        }

        let record = BaselineRecord {
            month,
            start_wallet: current_wallet,
        };
        self.store
            .put(&Self::key(user_id), &serde_json::to_string(&record)?)?;

        info!(
            user_id,
            month = %month,
            start_wallet = %current_wallet,
            superseded = ?previous.map(|r| r.month.to_string()),
            "Captured month baseline"
        );
        Ok(current_wallet)
    }
}
