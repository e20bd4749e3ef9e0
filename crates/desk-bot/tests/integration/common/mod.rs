//! Update builders and a dispatcher wired to recording doubles.

#![allow(dead_code)]

use desk_bot::{
    spawn_context_store, AccountService, ContextStoreHandle, DispatcherSettings, UpdateDispatcher,
    UserDirectory,
};
use desk_chat::{
    CallbackQuery, Chat, ChatId, Message, MessageId, MockChatGateway, Update, User,
};
use desk_exchange::{ApiCredentials, MockExchange};
use desk_persistence::{BaselineStore, MemoryStore};
use std::sync::Arc;
use std::time::Duration;

/// The allowed group chat.
pub const GROUP: ChatId = -1_001;
/// A chat outside the allow-list.
pub const OTHER_CHAT: ChatId = -2_002;
/// User with exchange credentials.
pub const TRADER: i64 = 42;
/// User without credentials.
pub const STRANGER: i64 = 7;

pub const MENU_DELAY: Duration = Duration::from_secs(5);
pub const COMMAND_DELAY: Duration = Duration::from_secs(60);

pub fn user(id: i64) -> User {
    User {
        id,
        is_bot: false,
        first_name: format!("User{id}"),
        last_name: None,
        username: Some(format!("user{id}")),
    }
}

pub fn chat(id: ChatId) -> Chat {
    Chat {
        id,
        kind: "supergroup".to_string(),
        title: Some("Desk".to_string()),
    }
}

pub fn text_update(
    update_id: i64,
    chat_id: ChatId,
    user_id: i64,
    message_id: MessageId,
    text: &str,
) -> Update {
    Update {
        update_id,
        message: Some(Message {
            message_id,
            chat: chat(chat_id),
            from: Some(user(user_id)),
            text: Some(text.to_string()),
        }),
        callback_query: None,
    }
}

/// Callback pressed on the menu message `menu_message_id`.
pub fn callback_update(
    update_id: i64,
    chat_id: ChatId,
    user_id: i64,
    menu_message_id: MessageId,
    data: &str,
) -> Update {
    Update {
        update_id,
        message: None,
        callback_query: Some(CallbackQuery {
            id: format!("cb-{update_id}"),
            from: user(user_id),
            message: Some(Message {
                message_id: menu_message_id,
                chat: chat(chat_id),
                from: None,
                text: None,
            }),
            data: Some(data.to_string()),
        }),
    }
}

pub struct Harness {
    pub chat: Arc<MockChatGateway>,
    pub exchange: Arc<MockExchange>,
    pub contexts: ContextStoreHandle,
    pub dispatcher: UpdateDispatcher,
}

impl Harness {
    /// Dispatcher serving only [`GROUP`], with [`TRADER`] configured.
    pub fn new() -> Self {
        Self::with_allowed_chat(Some(GROUP))
    }

    pub fn with_allowed_chat(allowed_chat: Option<ChatId>) -> Self {
        let chat = Arc::new(MockChatGateway::new());
        let exchange = Arc::new(MockExchange::new());

        let mut users = UserDirectory::new();
        users.insert(TRADER, ApiCredentials::new("trader-key", "trader-secret"));

        let baselines = Arc::new(BaselineStore::new(Arc::new(MemoryStore::new())));
        let accounts = AccountService::new(exchange.clone(), baselines, 12);
        let (contexts, _join) = spawn_context_store(16);

        let dispatcher = UpdateDispatcher::new(
            chat.clone(),
            users,
            accounts,
            contexts.clone(),
            DispatcherSettings {
                allowed_chat,
                menu_delay: MENU_DELAY,
                command_delay: COMMAND_DELAY,
            },
        );

        Self {
            chat,
            exchange,
            contexts,
            dispatcher,
        }
    }

    /// Queue `updates` as one batch and dispatch it.
    pub async fn deliver(&mut self, updates: Vec<Update>) -> usize {
        self.chat.push_batch(Ok(updates));
        self.dispatcher.poll_once().await.expect("poll")
    }

    /// Let paused time run past `delay` so due cleanups fire.
    pub async fn elapse(&self, delay: Duration) {
        tokio::time::sleep(delay + Duration::from_secs(1)).await;
    }
}
