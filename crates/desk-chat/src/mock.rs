//! Recording chat gateway double for tests.

use crate::error::{ChatError, ChatResult};
use crate::gateway::{BoxFuture, ChatGateway};
use crate::types::{ChatId, InlineKeyboardMarkup, MessageId, Update};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// A message recorded by [`MockChatGateway`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub chat_id: ChatId,
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
    /// Id assigned by the mock; `None` when the send failed.
    pub message_id: Option<MessageId>,
}

/// A callback acknowledgement recorded by [`MockChatGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnsweredCallback {
    pub callback_id: String,
    pub text: Option<String>,
    pub show_alert: bool,
}

/// Mock gateway that records every call and serves queued update batches.
#[derive(Debug)]
pub struct MockChatGateway {
    sent: Mutex<Vec<SentMessage>>,
    deleted: Mutex<Vec<(ChatId, MessageId)>>,
    answered: Mutex<Vec<AnsweredCallback>>,
    polled_offsets: Mutex<Vec<Option<i64>>>,
    batches: Mutex<VecDeque<ChatResult<Vec<Update>>>>,
    next_message_id: AtomicI64,
    fail_sends: AtomicBool,
    delete_result: AtomicBool,
    /// `drop_pending_updates` argument of each webhook removal.
    webhook_drops: Mutex<Vec<bool>>,
}

impl Default for MockChatGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChatGateway {
    /// Message ids start at 1000.
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            answered: Mutex::new(Vec::new()),
            polled_offsets: Mutex::new(Vec::new()),
            batches: Mutex::new(VecDeque::new()),
            next_message_id: AtomicI64::new(1000),
            fail_sends: AtomicBool::new(false),
            delete_result: AtomicBool::new(true),
            webhook_drops: Mutex::new(Vec::new()),
        }
    }

    /// Queue the result of the next `poll_updates` call.
    pub fn push_batch(&self, batch: ChatResult<Vec<Update>>) {
        self.batches.lock().push_back(batch);
    }

    /// Make every `send_message` fail.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Result reported by `delete_message`.
    pub fn set_delete_result(&self, ok: bool) {
        self.delete_result.store(ok, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().iter().map(|m| m.text.clone()).collect()
    }

    pub fn deleted(&self) -> Vec<(ChatId, MessageId)> {
        self.deleted.lock().clone()
    }

    pub fn answered(&self) -> Vec<AnsweredCallback> {
        self.answered.lock().clone()
    }

    pub fn polled_offsets(&self) -> Vec<Option<i64>> {
        self.polled_offsets.lock().clone()
    }

    pub fn webhook_deletes(&self) -> usize {
        self.webhook_drops.lock().len()
    }

    pub fn webhook_drop_flags(&self) -> Vec<bool> {
        self.webhook_drops.lock().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
        self.deleted.lock().clear();
        self.answered.lock().clear();
    }
}

impl ChatGateway for MockChatGateway {
    fn send_message<'a>(
        &'a self,
        chat_id: ChatId,
        text: &'a str,
        keyboard: Option<&'a InlineKeyboardMarkup>,
    ) -> BoxFuture<'a, ChatResult<MessageId>> {
        Box::pin(async move {
            let result = if self.fail_sends.load(Ordering::SeqCst) {
                Err(ChatError::Api {
                    code: 400,
                    description: "Bad Request: chat not found".to_string(),
                })
            } else {
                Ok(self.next_message_id.fetch_add(1, Ordering::SeqCst))
            };

            self.sent.lock().push(SentMessage {
                chat_id,
                text: text.to_string(),
                keyboard: keyboard.cloned(),
                message_id: result.as_ref().ok().copied(),
            });
            result
        })
    }

    fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            self.deleted.lock().push((chat_id, message_id));
            self.delete_result.load(Ordering::SeqCst)
        })
    }

    fn answer_callback<'a>(
        &'a self,
        callback_id: &'a str,
        text: Option<&'a str>,
        show_alert: bool,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.answered.lock().push(AnsweredCallback {
                callback_id: callback_id.to_string(),
                text: text.map(str::to_string),
                show_alert,
            });
        })
    }

    fn poll_updates(&self, offset: Option<i64>) -> BoxFuture<'_, ChatResult<Vec<Update>>> {
        Box::pin(async move {
            self.polled_offsets.lock().push(offset);
            self.batches.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
        })
    }

    fn delete_webhook(&self, drop_pending_updates: bool) -> BoxFuture<'_, ChatResult<()>> {
        Box::pin(async move {
            self.webhook_drops.lock().push(drop_pending_updates);
            Ok(())
        })
    }
}
