//! Bot API gateway.
//!
//! Every call is a JSON `POST` to `{api_base}/bot{token}/{method}`.
//! Failures of best-effort calls (delete, answer callback) are logged and
//! swallowed; the others surface as [`ChatError`].

use crate::error::{ChatError, ChatResult};
use crate::types::{BotResponse, ChatId, InlineKeyboardMarkup, Message, MessageId, Update};
use desk_telemetry::Metrics;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, trace, warn};
use zeroize::Zeroizing;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

const PARSE_MODE: &str = "HTML";
const CONFLICT_CODE: i64 = 409;

/// Chat operations used by the dispatcher.
pub trait ChatGateway: Send + Sync {
    /// Send a message, optionally with an inline keyboard. Returns its id.
    fn send_message<'a>(
        &'a self,
        chat_id: ChatId,
        text: &'a str,
        keyboard: Option<&'a InlineKeyboardMarkup>,
    ) -> BoxFuture<'a, ChatResult<MessageId>>;

    /// Delete a message. `false` on any failure (already gone, no permission).
    fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> BoxFuture<'_, bool>;

    /// Acknowledge a callback so the client stops its spinner.
    fn answer_callback<'a>(
        &'a self,
        callback_id: &'a str,
        text: Option<&'a str>,
        show_alert: bool,
    ) -> BoxFuture<'a, ()>;

    /// Long-poll for updates with id `>= offset`.
    ///
    /// A poll conflict backs off and yields an empty batch.
    fn poll_updates(&self, offset: Option<i64>) -> BoxFuture<'_, ChatResult<Vec<Update>>>;

    /// Remove any webhook so long polling works.
    fn delete_webhook(&self, drop_pending_updates: bool) -> BoxFuture<'_, ChatResult<()>>;
}

/// Connection settings.
#[derive(Clone)]
pub struct GatewaySettings {
    /// e.g. `https://api.telegram.org`
    pub api_base: String,
    pub token: Zeroizing<String>,
    /// Server-side long-poll timeout.
    pub poll_timeout: Duration,
    /// Sleep after a poll conflict.
    pub conflict_backoff: Duration,
    /// Timeout of non-poll requests.
    pub http_timeout: Duration,
}

impl fmt::Debug for GatewaySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewaySettings")
            .field("api_base", &self.api_base)
            .field("token", &"<redacted>")
            .field("poll_timeout", &self.poll_timeout)
            .field("conflict_backoff", &self.conflict_backoff)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

/// Telegram Bot API gateway over reqwest.
pub struct TelegramGateway {
    client: Client,
    settings: GatewaySettings,
}

impl TelegramGateway {
    pub fn new(settings: GatewaySettings) -> ChatResult<Self> {
        let client = Client::builder()
            .timeout(settings.http_timeout)
            .build()
            .map_err(|e| ChatError::HttpClient(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, settings })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.settings.api_base.trim_end_matches('/'),
            self.settings.token.as_str(),
            method
        )
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &Value,
        timeout: Duration,
    ) -> ChatResult<T> {
        let response = self
            .client
            .post(self.method_url(method))
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            // The URL carries the bot token.
            .map_err(|e| ChatError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChatError::Transport(e.without_url().to_string()))?;
        trace!(method, %status, "Bot API response");

        interpret_response(status, &body)
    }

    pub async fn send(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> ChatResult<MessageId> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": PARSE_MODE,
            "disable_web_page_preview": true,
        });
        if let Some(kb) = keyboard {
            payload["reply_markup"] = serde_json::to_value(kb)
                .map_err(|e| ChatError::Decode(format!("keyboard: {e}")))?;
        }

        let message: Message = self
            .call("sendMessage", &payload, self.settings.http_timeout)
            .await?;
        debug!(chat_id, message_id = message.message_id, "Message sent");
        Ok(message.message_id)
    }

    pub async fn delete(&self, chat_id: ChatId, message_id: MessageId) -> bool {
        let payload = json!({ "chat_id": chat_id, "message_id": message_id });
        match self
            .call::<bool>("deleteMessage", &payload, self.settings.http_timeout)
            .await
        {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!(chat_id, message_id, error = %e, "Failed to delete message");
                false
            }
        }
    }

    pub async fn answer(&self, callback_id: &str, text: Option<&str>, show_alert: bool) {
        let mut payload = json!({ "callback_query_id": callback_id, "show_alert": show_alert });
        if let Some(text) = text {
            payload["text"] = Value::String(text.to_string());
        }
        if let Err(e) = self
            .call::<bool>("answerCallbackQuery", &payload, self.settings.http_timeout)
            .await
        {
            warn!(callback_id, error = %e, "Failed to answer callback");
        }
    }

    pub async fn get_updates(&self, offset: Option<i64>) -> ChatResult<Vec<Update>> {
        let mut payload = json!({
            "timeout": self.settings.poll_timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            payload["offset"] = json!(offset);
        }

        // Request timeout must outlast the server-side hold.
        let timeout = self.settings.poll_timeout + self.settings.http_timeout;
        match self.call::<Vec<Update>>("getUpdates", &payload, timeout).await {
            Ok(updates) => Ok(updates),
            Err(ChatError::Conflict(description)) => {
                Metrics::poll_conflict();
                warn!(
                    %description,
                    backoff_secs = self.settings.conflict_backoff.as_secs(),
                    "Another consumer is polling this bot, backing off"
                );
                tokio::time::sleep(self.settings.conflict_backoff).await;
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn remove_webhook(&self, drop_pending_updates: bool) -> ChatResult<()> {
        let payload = json!({ "drop_pending_updates": drop_pending_updates });
        self.call::<bool>("deleteWebhook", &payload, self.settings.http_timeout)
            .await?;
        debug!(drop_pending_updates, "Webhook removed");
        Ok(())
    }
}

/// Map an HTTP status and body to the method result.
///
/// The Bot API answers errors with a JSON envelope and a 4xx/5xx status,
/// so the body is decoded before the status is considered.
pub(crate) fn interpret_response<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> ChatResult<T> {
    let envelope: BotResponse<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => return Err(ChatError::Decode(e.to_string())),
        Err(_) => {
            return Err(ChatError::Transport(format!(
                "HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            )))
        }
    };

    if !envelope.ok {
        let code = envelope
            .error_code
            .unwrap_or_else(|| i64::from(status.as_u16()));
        let description = envelope.description.unwrap_or_default();
        if code == CONFLICT_CODE {
            return Err(ChatError::Conflict(description));
        }
        return Err(ChatError::Api { code, description });
    }

    envelope
        .result
        .ok_or_else(|| ChatError::Decode("missing result".to_string()))
}

impl ChatGateway for TelegramGateway {
    fn send_message<'a>(
        &'a self,
        chat_id: ChatId,
        text: &'a str,
        keyboard: Option<&'a InlineKeyboardMarkup>,
    ) -> BoxFuture<'a, ChatResult<MessageId>> {
        Box::pin(self.send(chat_id, text, keyboard))
    }

    fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> BoxFuture<'_, bool> {
        Box::pin(self.delete(chat_id, message_id))
    }

    fn answer_callback<'a>(
        &'a self,
        callback_id: &'a str,
        text: Option<&'a str>,
        show_alert: bool,
    ) -> BoxFuture<'a, ()> {
        Box::pin(self.answer(callback_id, text, show_alert))
    }

    fn poll_updates(&self, offset: Option<i64>) -> BoxFuture<'_, ChatResult<Vec<Update>>> {
        Box::pin(self.get_updates(offset))
    }

    fn delete_webhook(&self, drop_pending_updates: bool) -> BoxFuture<'_, ChatResult<()>> {
        Box::pin(self.remove_webhook(drop_pending_updates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpret_success() {
        let body = r#"{"ok": true, "result": {"message_id": 9, "chat": {"id": 1, "type": "private"}}}"#;
        let msg: Message = interpret_response(StatusCode::OK, body).unwrap();
        assert_eq!(msg.message_id, 9);
    }

    #[test]
    fn test_interpret_conflict() {
        let body = r#"{"ok": false, "error_code": 409, "description": "Conflict: terminated by other getUpdates request"}"#;
        let err = interpret_response::<Vec<Update>>(StatusCode::CONFLICT, body).unwrap_err();
        assert!(matches!(err, ChatError::Conflict(ref d) if d.starts_with("Conflict")));
    }

    #[test]
    fn test_interpret_api_error() {
        let body = r#"{"ok": false, "error_code": 400, "description": "Bad Request: message to delete not found"}"#;
        match interpret_response::<bool>(StatusCode::BAD_REQUEST, body) {
            Err(ChatError::Api { code, description }) => {
                assert_eq!(code, 400);
                assert!(description.contains("not found"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_interpret_non_json_gateway_error() {
        let err = interpret_response::<bool>(StatusCode::BAD_GATEWAY, "<html>502</html>").unwrap_err();
        assert!(matches!(err, ChatError::Transport(ref m) if m.contains("502")));
    }

    #[test]
    fn test_method_url_and_redacted_debug() {
        let settings = GatewaySettings {
            api_base: "https://api.telegram.org/".to_string(),
            token: Zeroizing::new("123:secret".to_string()),
            poll_timeout: Duration::from_secs(30),
            conflict_backoff: Duration::from_secs(5),
            http_timeout: Duration::from_secs(20),
        };
        assert!(!format!("{settings:?}").contains("secret"));

        let gateway = TelegramGateway::new(settings).unwrap();
        assert_eq!(
            gateway.method_url("getUpdates"),
            "https://api.telegram.org/bot123:secret/getUpdates"
        );
    }
}
