//! Chat platform gateway for wallet-desk.
//!
//! A thin wrapper over the handful of Bot API methods the bot needs:
//! send, delete, answer callback, long-poll updates and webhook removal.

pub mod error;
pub mod gateway;
pub mod mock;
pub mod types;

pub use error::{ChatError, ChatResult};
pub use gateway::{BoxFuture, ChatGateway, GatewaySettings, TelegramGateway};
pub use mock::{AnsweredCallback, MockChatGateway, SentMessage};
pub use types::{
    CallbackQuery, Chat, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, Message, MessageId,
    Update, User,
};
