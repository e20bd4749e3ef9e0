//! Application configuration.
//!
//! Non-secret settings come from a TOML file with a `DESK__SECTION__KEY`
//! environment overlay. Secrets (bot token, API keys) come from the
//! environment only, see [`EnvSettings`].

use crate::error::{AppError, AppResult};
use desk_chat::{ChatId, GatewaySettings};
use desk_core::AccountType;
use desk_exchange::{ClientSettings, PositionScope, RECV_WINDOW_MS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroizing;

/// Chat platform settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    /// Long-poll hold time (seconds).
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    /// Sleep after a poll conflict (seconds).
    #[serde(default = "default_conflict_backoff_secs")]
    pub conflict_backoff_secs: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_conflict_backoff_secs() -> u64 {
    5
}

fn default_http_timeout_secs() -> u64 {
    20
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: default_telegram_api_base(),
            poll_timeout_secs: default_poll_timeout_secs(),
            conflict_backoff_secs: default_conflict_backoff_secs(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// Exchange REST settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default = "default_mainnet_url")]
    pub mainnet_url: String,
    #[serde(default = "default_testnet_url")]
    pub testnet_url: String,
    #[serde(default = "default_recv_window_ms")]
    pub recv_window_ms: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Wallet-balance fallback order.
    #[serde(default = "default_account_types")]
    pub account_types: Vec<AccountType>,
    #[serde(default = "default_coins")]
    pub coins: String,
    #[serde(default = "default_position_scopes")]
    pub position_scopes: Vec<PositionScope>,
    #[serde(default = "default_ticker_categories")]
    pub ticker_categories: Vec<String>,
}

fn default_mainnet_url() -> String {
    "https://api.bybit.com".to_string()
}

fn default_testnet_url() -> String {
    "https://api-testnet.bybit.com".to_string()
}

fn default_recv_window_ms() -> u64 {
    RECV_WINDOW_MS
}

fn default_account_types() -> Vec<AccountType> {
    ClientSettings::default().account_types
}

fn default_coins() -> String {
    ClientSettings::default().coins
}

fn default_position_scopes() -> Vec<PositionScope> {
    ClientSettings::default().position_scopes
}

fn default_ticker_categories() -> Vec<String> {
    ClientSettings::default().ticker_categories
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            mainnet_url: default_mainnet_url(),
            testnet_url: default_testnet_url(),
            recv_window_ms: default_recv_window_ms(),
            http_timeout_secs: default_http_timeout_secs(),
            account_types: default_account_types(),
            coins: default_coins(),
            position_scopes: default_position_scopes(),
            ticker_categories: default_ticker_categories(),
        }
    }
}

/// Broadcast price alert settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_alert_symbol")]
    pub symbol: String,
    /// Minimum seconds between two alerts. `BTC_ALERT_SECONDS` overrides.
    #[serde(default = "default_alert_cooldown_secs")]
    pub cooldown_secs: u64,
}

fn default_alert_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_alert_cooldown_secs() -> u64 {
    2700
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            symbol: default_alert_symbol(),
            cooldown_secs: default_alert_cooldown_secs(),
        }
    }
}

/// Deferred deletion delays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Menu flows (command, menu, result). `AUTO_DELETE_SECONDS` overrides.
    #[serde(default = "default_menu_delay_secs")]
    pub menu_delay_secs: u64,
    /// Single-step commands (command, reply).
    #[serde(default = "default_command_delay_secs")]
    pub command_delay_secs: u64,
}

fn default_menu_delay_secs() -> u64 {
    5
}

fn default_command_delay_secs() -> u64 {
    60
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            menu_delay_secs: default_menu_delay_secs(),
            command_delay_secs: default_command_delay_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Directory for the baseline and alert-clock files.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
}

fn default_state_dir() -> String {
    "./state".to_string()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
        }
    }
}

/// Main loop pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default = "default_loop_sleep_ms")]
    pub loop_sleep_ms: u64,
    /// Sleep after a failed cycle.
    #[serde(default = "default_error_sleep_ms")]
    pub error_sleep_ms: u64,
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
    /// Maximum positions listed in one reply.
    #[serde(default = "default_position_cap")]
    pub position_cap: usize,
    /// Context store inbox size.
    #[serde(default = "default_context_capacity")]
    pub context_capacity: usize,
}

fn default_loop_sleep_ms() -> u64 {
    1_000
}

fn default_error_sleep_ms() -> u64 {
    5_000
}

fn default_stats_interval_secs() -> u64 {
    3_600
}

fn default_position_cap() -> usize {
    12
}

fn default_context_capacity() -> usize {
    64
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            loop_sleep_ms: default_loop_sleep_ms(),
            error_sleep_ms: default_error_sleep_ms(),
            stats_interval_secs: default_stats_interval_secs(),
            position_cap: default_position_cap(),
            context_capacity: default_context_capacity(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

impl AppConfig {
    /// Load from `path` plus the `DESK__*` environment overlay.
    ///
    /// A missing file yields defaults.
    pub fn load(path: &str) -> AppResult<Self> {
        if !Path::new(path).exists() {
            tracing::warn!(path = %path, "Config file not found, using defaults");
        }

        let settings = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Toml).required(false))
            .add_source(
                config::Environment::with_prefix("DESK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text without any environment overlay.
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = settings
            .try_deserialize()
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.exchange.account_types.is_empty() {
            return Err(AppError::Config(
                "exchange.account_types must not be empty".to_string(),
            ));
        }
        if self.exchange.position_scopes.is_empty() {
            return Err(AppError::Config(
                "exchange.position_scopes must not be empty".to_string(),
            ));
        }
        if self.alert.symbol.trim().is_empty() {
            return Err(AppError::Config("alert.symbol must not be empty".to_string()));
        }
        if self.telegram.poll_timeout_secs == 0 {
            return Err(AppError::Config(
                "telegram.poll_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment overrides that predate the config file.
    pub fn apply_env(&mut self, env: &EnvSettings) {
        if let Some(secs) = env.alert_cooldown_secs {
            self.alert.cooldown_secs = secs;
        }
        if let Some(secs) = env.auto_delete_secs {
            self.cleanup.menu_delay_secs = secs;
        }
    }

    /// Exchange client settings for the selected network.
    pub fn client_settings(&self, testnet: bool) -> ClientSettings {
        let base_url = if testnet {
            self.exchange.testnet_url.clone()
        } else {
            self.exchange.mainnet_url.clone()
        };
        ClientSettings {
            base_url,
            recv_window_ms: self.exchange.recv_window_ms,
            timeout: Duration::from_secs(self.exchange.http_timeout_secs),
            account_types: self.exchange.account_types.clone(),
            coins: self.exchange.coins.clone(),
            position_scopes: self.exchange.position_scopes.clone(),
            ticker_categories: self.exchange.ticker_categories.clone(),
        }
    }

    pub fn gateway_settings(&self, token: Zeroizing<String>) -> GatewaySettings {
        GatewaySettings {
            api_base: self.telegram.api_base.clone(),
            token,
            poll_timeout: Duration::from_secs(self.telegram.poll_timeout_secs),
            conflict_backoff: Duration::from_secs(self.telegram.conflict_backoff_secs),
            http_timeout: Duration::from_secs(self.telegram.http_timeout_secs),
        }
    }

    pub fn menu_delay(&self) -> Duration {
        Duration::from_secs(self.cleanup.menu_delay_secs)
    }

    pub fn command_delay(&self) -> Duration {
        Duration::from_secs(self.cleanup.command_delay_secs)
    }
}

/// Settings read from process environment variables.
pub struct EnvSettings {
    pub bot_token: Zeroizing<String>,
    /// Allowed chat and alert broadcast target.
    pub chat_id: Option<ChatId>,
    pub testnet: bool,
    pub alert_cooldown_secs: Option<u64>,
    pub auto_delete_secs: Option<u64>,
}

impl std::fmt::Debug for EnvSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvSettings")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("testnet", &self.testnet)
            .field("alert_cooldown_secs", &self.alert_cooldown_secs)
            .field("auto_delete_secs", &self.auto_delete_secs)
            .finish()
    }
}

impl EnvSettings {
    /// Read from the process environment.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bot_token = get("TELEGRAM_BOT_TOKEN")
            .ok_or_else(|| AppError::Config("TELEGRAM_BOT_TOKEN is not set".to_string()))?;

        Ok(Self {
            bot_token: Zeroizing::new(bot_token),
            chat_id: parse_opt("TELEGRAM_CHAT_ID", get("TELEGRAM_CHAT_ID"))?,
            testnet: get("BYBIT_TESTNET")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(false),
            alert_cooldown_secs: parse_opt("BTC_ALERT_SECONDS", get("BTC_ALERT_SECONDS"))?,
            auto_delete_secs: parse_opt("AUTO_DELETE_SECONDS", get("AUTO_DELETE_SECONDS"))?,
        })
    }
}

fn parse_opt<T: FromStr>(key: &str, value: Option<String>) -> AppResult<Option<T>> {
    value
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| AppError::Config(format!("{key} is not a valid number: {v:?}")))
        })
        .transpose()
}
