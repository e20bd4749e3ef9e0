//! Long-poll update dispatcher.
//!
//! One call to [`UpdateDispatcher::poll_once`] pulls a batch, advances the
//! offset past it, then routes each update in order:
//! - text messages are matched against the command table
//! - callback queries from the wallet menu are acknowledged and answered
//!
//! Replies register their message ids with the cleanup scheduler so the
//! conversation disappears from the chat after a delay.

use crate::cleanup::{CleanupJob, CleanupScheduler};
use crate::commands::{CallbackAction, Command};
use crate::context::{ContextStoreHandle, InteractionContext};
use crate::error::AppResult;
use crate::handlers::{format, AccountService};
use crate::users::UserDirectory;
use chrono::Utc;
use desk_chat::{CallbackQuery, ChatGateway, ChatId, Message, MessageId, Update};
use desk_telemetry::Metrics;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Next update id to request.
///
/// Not persisted: after a restart the platform redelivers whatever it
/// still holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOffset {
    next: Option<i64>,
}

impl UpdateOffset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> Option<i64> {
        self.next
    }

    /// Move past the highest id in `updates`. Never moves backwards.
    pub fn advance_past(&mut self, updates: &[Update]) {
        if let Some(max_id) = updates.iter().map(|u| u.update_id).max() {
            let candidate = max_id + 1;
            self.next = Some(self.next.map_or(candidate, |n| n.max(candidate)));
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    /// Only chat served, `/id` excepted. `None` serves every chat.
    pub allowed_chat: Option<ChatId>,
    /// Cleanup delay for the wallet menu flow.
    pub menu_delay: Duration,
    /// Cleanup delay for single-step commands.
    pub command_delay: Duration,
}

pub struct UpdateDispatcher {
    chat: Arc<dyn ChatGateway>,
    users: UserDirectory,
    accounts: AccountService,
    contexts: ContextStoreHandle,
    cleanup: CleanupScheduler,
    settings: DispatcherSettings,
    offset: UpdateOffset,
}

impl UpdateDispatcher {
    pub fn new(
        chat: Arc<dyn ChatGateway>,
        users: UserDirectory,
        accounts: AccountService,
        contexts: ContextStoreHandle,
        settings: DispatcherSettings,
    ) -> Self {
        let cleanup = CleanupScheduler::new(Arc::clone(&chat));
        Self {
            chat,
            users,
            accounts,
            contexts,
            cleanup,
            settings,
            offset: UpdateOffset::new(),
        }
    }

    pub fn offset(&self) -> UpdateOffset {
        self.offset
    }

    pub fn cleanup(&self) -> &CleanupScheduler {
        &self.cleanup
    }

    /// Poll one batch and dispatch it. Returns the batch size.
    ///
    /// The offset advances before dispatch, so a handler failure never
    /// causes the batch to be fetched again. A transport failure while
    /// building a reply abandons the rest of the batch.
    pub async fn poll_once(&mut self) -> AppResult<usize> {
        let updates = self.chat.poll_updates(self.offset.next()).await?;
        if updates.is_empty() {
            return Ok(0);
        }

        Metrics::updates_received(updates.len());
        self.offset.advance_past(&updates);
        trace!(count = updates.len(), next_offset = ?self.offset.next(), "Batch received");

        for update in &updates {
            self.dispatch(update).await?;
        }
        Ok(updates.len())
    }

    pub async fn dispatch(&self, update: &Update) -> AppResult<()> {
        if let Some(callback) = &update.callback_query {
            self.handle_callback(callback).await
        } else if let Some(message) = &update.message {
            self.handle_message(message).await
        } else {
            Ok(())
        }
    }

    fn chat_allowed(&self, chat_id: ChatId) -> bool {
        self.settings.allowed_chat.map_or(true, |allowed| allowed == chat_id)
    }

    async fn handle_message(&self, message: &Message) -> AppResult<()> {
        let Some(text) = message.text.as_deref() else {
            return Ok(());
        };
        let Some(command) = Command::parse(text) else {
            trace!(chat_id = message.chat.id, "Ignoring non-command text");
            return Ok(());
        };

        let chat_id = message.chat.id;
        if !command.allowed_anywhere() && !self.chat_allowed(chat_id) {
            Metrics::chat_rejected();
            debug!(chat_id, %command, "Command from chat outside allow-list dropped");
            return Ok(());
        }

        Metrics::command_handled(command.label());
        let user_id = message.from.as_ref().map(|u| u.id);
        debug!(chat_id, ?user_id, %command, "Command received");

        let credentials = user_id.and_then(|id| self.users.credentials(id).map(|c| (id, c)));
        if command.requires_credentials() && credentials.is_none() {
            self.reply_and_cleanup(chat_id, message.message_id, format::NOT_CONFIGURED)
                .await;
            return Ok(());
        }

        match (command, credentials) {
            (Command::Id, _) => {
                let text = format::identity(message.from.as_ref(), &message.chat);
                self.reply_and_cleanup(chat_id, message.message_id, &text).await;
            }
            (Command::Commands, _) => {
                self.reply_and_cleanup(chat_id, message.message_id, &format::command_list())
                    .await;
            }
            (Command::Pnl, Some((user_id, creds))) => {
                let text = self
                    .accounts
                    .month_to_date_reply(user_id, creds, Utc::now())
                    .await?;
                self.reply_and_cleanup(chat_id, message.message_id, &text).await;
            }
            (Command::Wallet, Some((user_id, _))) => {
                self.open_wallet_menu(user_id, message).await;
            }
            (Command::Pnl | Command::Wallet, None) => {}
        }
        Ok(())
    }

    /// Send the wallet menu and remember it for the follow-up selection.
    async fn open_wallet_menu(&self, user_id: i64, message: &Message) {
        let chat_id = message.chat.id;
        let keyboard = format::wallet_keyboard();
        let menu_message_id = match self
            .chat
            .send_message(chat_id, format::WALLET_MENU, Some(&keyboard))
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(chat_id, error = %e, "Failed to send wallet menu");
                return;
            }
        };

        let context = InteractionContext {
            chat_id,
            command_message_id: message.message_id,
            menu_message_id,
        };
        if let Some(orphan) = self.contexts.insert(user_id, context).await {
            debug!(user_id, menu = orphan.menu_message_id, "Replacing pending wallet menu");
            self.cleanup.schedule(CleanupJob {
                chat_id: orphan.chat_id,
                message_ids: orphan.message_ids().to_vec(),
                delay: self.settings.menu_delay,
            });
        }
    }

    async fn handle_callback(&self, callback: &CallbackQuery) -> AppResult<()> {
        // Stop the client spinner whatever happens next.
        self.chat.answer_callback(&callback.id, None, false).await;

        let Some(chat_id) = callback.message.as_ref().map(|m| m.chat.id) else {
            debug!(callback_id = %callback.id, "Callback without message ignored");
            return Ok(());
        };
        if !self.chat_allowed(chat_id) {
            Metrics::chat_rejected();
            debug!(chat_id, "Callback from chat outside allow-list dropped");
            return Ok(());
        }

        let user_id = callback.from.id;
        let action = CallbackAction::parse(callback.data.as_deref().unwrap_or_default());
        Metrics::callback_handled(action.label());
        debug!(chat_id, user_id, action = action.label(), "Callback received");

        let text = match (&action, self.users.credentials(user_id)) {
            (CallbackAction::Unknown(_), _) => format::UNKNOWN_OPTION.to_string(),
            (_, None) => format::NOT_CONFIGURED.to_string(),
            (_, Some(creds)) => self.accounts.callback_reply(&action, creds).await?,
        };

        let reply_id = match self.chat.send_message(chat_id, &text, None).await {
            Ok(id) => id,
            Err(e) => {
                warn!(chat_id, error = %e, "Failed to send callback reply");
                return Ok(());
            }
        };

        if let Some(context) = self.contexts.take(user_id).await {
            self.cleanup.schedule(CleanupJob {
                chat_id: context.chat_id,
                message_ids: vec![
                    context.command_message_id,
                    context.menu_message_id,
                    reply_id,
                ],
                delay: self.settings.menu_delay,
            });
        }
        Ok(())
    }

    async fn reply_and_cleanup(&self, chat_id: ChatId, command_message_id: MessageId, text: &str) {
        match self.chat.send_message(chat_id, text, None).await {
            Ok(reply_id) => {
                self.cleanup.schedule(CleanupJob {
                    chat_id,
                    message_ids: vec![command_message_id, reply_id],
                    delay: self.settings.command_delay,
                });
            }
            Err(e) => warn!(chat_id, error = %e, "Failed to send reply"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(id: i64) -> Update {
        Update {
            update_id: id,
            message: None,
            callback_query: None,
        }
    }

    #[test]
    fn test_offset_starts_empty() {
        assert_eq!(UpdateOffset::new().next(), None);
    }

    #[test]
    fn test_offset_moves_past_highest_id() {
        let mut offset = UpdateOffset::new();
        offset.advance_past(&[update(41), update(43), update(42)]);
        assert_eq!(offset.next(), Some(44));
    }

    #[test]
    fn test_offset_ignores_empty_and_stale_batches() {
        let mut offset = UpdateOffset::new();
        offset.advance_past(&[update(10)]);
        offset.advance_past(&[]);
        assert_eq!(offset.next(), Some(11));

        offset.advance_past(&[update(3)]);
        assert_eq!(offset.next(), Some(11));
    }
}
