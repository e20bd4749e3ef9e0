//! Periodic statistics summary.
//!
//! Reads the process-wide counters and writes a summary to the log,
//! hourly while running and once at shutdown.

use crate::metrics::{
    ALERTS_SENT_TOTAL, CALLBACKS_TOTAL, COMMANDS_TOTAL, DELETE_FAILURES_TOTAL,
    EXCHANGE_ERRORS_TOTAL, MESSAGES_DELETED_TOTAL, POLL_CONFLICTS_TOTAL, REJECTED_CHATS_TOTAL,
    UPDATES_RECEIVED_TOTAL,
};
use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use prometheus::IntCounterVec;
use serde::Serialize;
use tracing::info;

/// Counter totals at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub updates_received: u64,
    pub commands: u64,
    pub callbacks: u64,
    pub rejected_chats: u64,
    pub exchange_errors: u64,
    pub messages_deleted: u64,
    pub delete_failures: u64,
    pub alerts_sent: u64,
    pub poll_conflicts: u64,
}

/// Logs counter summaries since process start.
pub struct StatsReporter {
    start_time: DateTime<Utc>,
}

impl Default for StatsReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsReporter {
    pub fn new() -> Self {
        Self {
            start_time: Utc::now(),
        }
    }

    /// Current counter totals.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            updates_received: UPDATES_RECEIVED_TOTAL.get(),
            commands: sum_vec(&COMMANDS_TOTAL),
            callbacks: sum_vec(&CALLBACKS_TOTAL),
            rejected_chats: REJECTED_CHATS_TOTAL.get(),
            exchange_errors: sum_vec(&EXCHANGE_ERRORS_TOTAL),
            messages_deleted: MESSAGES_DELETED_TOTAL.get(),
            delete_failures: DELETE_FAILURES_TOTAL.get(),
            alerts_sent: ALERTS_SENT_TOTAL.get(),
            poll_conflicts: POLL_CONFLICTS_TOTAL.get(),
        }
    }

    /// Write a summary to the log.
    pub fn output_summary(&self) {
        let s = self.snapshot();
        let duration = Utc::now() - self.start_time;

        info!(
            since = %self.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
            hours = duration.num_hours(),
            minutes = duration.num_minutes() % 60,
            updates = s.updates_received,
            commands = s.commands,
            callbacks = s.callbacks,
            rejected_chats = s.rejected_chats,
            exchange_errors = s.exchange_errors,
            deleted = s.messages_deleted,
            delete_failures = s.delete_failures,
            alerts = s.alerts_sent,
            conflicts = s.poll_conflicts,
            "Statistics summary"
        );
    }
}

/// Sum of all label combinations of a counter vector.
fn sum_vec(counter: &IntCounterVec) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|family| family.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}
