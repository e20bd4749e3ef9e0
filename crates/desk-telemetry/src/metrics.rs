//! Prometheus counters for wallet-desk.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means duplicate metric
//! names, a programming error that should crash at first use.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

/// Updates received from the chat platform.
pub static UPDATES_RECEIVED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "desk_updates_received_total",
        "Total chat updates received"
    )
    .unwrap()
});

/// Commands handled. Labels: command
pub static COMMANDS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "desk_commands_total",
        "Total commands handled",
        &["command"]
    )
    .unwrap()
});

/// Callback selections handled. Labels: action
pub static CALLBACKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "desk_callbacks_total",
        "Total inline-keyboard selections handled",
        &["action"]
    )
    .unwrap()
});

/// Updates dropped because the chat is not allowed.
pub static REJECTED_CHATS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "desk_rejected_chats_total",
        "Total updates ignored from non-allowed chats"
    )
    .unwrap()
});

/// Exchange request failures. Labels: operation
pub static EXCHANGE_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "desk_exchange_errors_total",
        "Total exchange request failures",
        &["operation"]
    )
    .unwrap()
});

/// Messages deleted by the cleanup scheduler.
pub static MESSAGES_DELETED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "desk_messages_deleted_total",
        "Total messages deleted by scheduled cleanup"
    )
    .unwrap()
});

/// Scheduled deletions that failed.
pub static DELETE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "desk_delete_failures_total",
        "Total scheduled deletions that failed"
    )
    .unwrap()
});

/// Price alerts delivered.
pub static ALERTS_SENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("desk_alerts_sent_total", "Total price alerts sent").unwrap()
});

/// Long-poll conflicts (another consumer on the same token).
pub static POLL_CONFLICTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "desk_poll_conflicts_total",
        "Total update-poll conflicts"
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a batch of received updates.
    pub fn updates_received(count: usize) {
        UPDATES_RECEIVED_TOTAL.inc_by(count as u64);
    }

    /// Record a handled command.
    pub fn command_handled(command: &str) {
        COMMANDS_TOTAL.with_label_values(&[command]).inc();
    }

    /// Record a handled callback selection.
    pub fn callback_handled(action: &str) {
        CALLBACKS_TOTAL.with_label_values(&[action]).inc();
    }

    /// Record an update from a non-allowed chat.
    pub fn chat_rejected() {
        REJECTED_CHATS_TOTAL.inc();
    }

    /// Record a failed exchange operation.
    pub fn exchange_error(operation: &str) {
        EXCHANGE_ERRORS_TOTAL.with_label_values(&[operation]).inc();
    }

    /// Record the outcome of a scheduled deletion.
    pub fn message_deleted(success: bool) {
        if success {
            MESSAGES_DELETED_TOTAL.inc();
        } else {
            DELETE_FAILURES_TOTAL.inc();
        }
    }

    /// Record a delivered price alert.
    pub fn alert_sent() {
        ALERTS_SENT_TOTAL.inc();
    }

    /// Record a long-poll conflict.
    pub fn poll_conflict() {
        POLL_CONFLICTS_TOTAL.inc();
    }
}
