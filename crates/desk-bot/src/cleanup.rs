//! Deferred message deletion.
//!
//! Each job runs in its own tokio task: sleep for the delay, then delete
//! every message id in order. Jobs run concurrently with the dispatcher and
//! with each other. A job is moved into its task, so it fires at most once.

use desk_chat::{ChatGateway, ChatId, MessageId};
use desk_telemetry::Metrics;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Messages to delete from one chat after a delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupJob {
    pub chat_id: ChatId,
    pub message_ids: Vec<MessageId>,
    pub delay: Duration,
}

/// Spawns cleanup jobs and tracks how many are still waiting.
#[derive(Clone)]
pub struct CleanupScheduler {
    chat: Arc<dyn ChatGateway>,
    pending: Arc<AtomicUsize>,
}

impl CleanupScheduler {
    pub fn new(chat: Arc<dyn ChatGateway>) -> Self {
        Self {
            chat,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Schedule `job`. The task resolves to the number of messages deleted.
    pub fn schedule(&self, job: CleanupJob) -> JoinHandle<usize> {
        let chat = Arc::clone(&self.chat);
        let pending = Arc::clone(&self.pending);
        pending.fetch_add(1, Ordering::SeqCst);

        debug!(
            chat_id = job.chat_id,
            message_ids = ?job.message_ids,
            delay_secs = job.delay.as_secs(),
            "Cleanup scheduled"
        );

        tokio::spawn(async move {
            tokio::time::sleep(job.delay).await;

            let mut deleted = 0;
            for message_id in &job.message_ids {
                let ok = chat.delete_message(job.chat_id, *message_id).await;
                Metrics::message_deleted(ok);
                if ok {
                    deleted += 1;
                }
            }

            pending.fetch_sub(1, Ordering::SeqCst);
            debug!(
                chat_id = job.chat_id,
                deleted,
                requested = job.message_ids.len(),
                "Cleanup fired"
            );
            deleted
        })
    }

    /// Jobs scheduled but not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}
