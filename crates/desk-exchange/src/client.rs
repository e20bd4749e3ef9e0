//! HTTP client for the exchange's v5 REST API.
//!
//! Account-level reads walk an ordered list of categories:
//! - wallet balance: first account type with a non-empty successful answer wins
//! - open positions: every (category, settle coin) scope is queried and the
//!   open positions of all successful scopes are merged
//! - ticker: first category with a usable mark or last price wins

use crate::error::{ExchangeError, ExchangeResult};
use crate::signer::{
    ApiCredentials, RequestSigner, HEADER_API_KEY, HEADER_RECV_WINDOW, HEADER_SIGN,
    HEADER_TIMESTAMP, RECV_WINDOW_MS,
};
use crate::types::{ApiEnvelope, ListResult, RawPosition, RawTicker, RawWalletAccount, TickerQuote};
use desk_core::{AccountSnapshot, AccountType, Position};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

const WALLET_BALANCE_PATH: &str = "/v5/account/wallet-balance";
const POSITION_LIST_PATH: &str = "/v5/position/list";
const TICKERS_PATH: &str = "/v5/market/tickers";

/// Read-only exchange operations used by the bot.
///
/// Implemented by [`BybitClient`]; tests substitute recording doubles.
pub trait ExchangeApi: Send + Sync {
    /// Wallet snapshot from the first account type that answers with data.
    fn fetch_account_snapshot<'a>(
        &'a self,
        credentials: &'a ApiCredentials,
    ) -> BoxFuture<'a, ExchangeResult<AccountSnapshot>>;

    /// Open positions merged across all configured scopes.
    fn fetch_open_positions<'a>(
        &'a self,
        credentials: &'a ApiCredentials,
    ) -> BoxFuture<'a, ExchangeResult<Vec<Position>>>;

    /// Reference price for `symbol`; `Ok(None)` when no category has one.
    fn fetch_ticker_price<'a>(
        &'a self,
        symbol: &'a str,
    ) -> BoxFuture<'a, ExchangeResult<Option<TickerQuote>>>;
}

/// A (category, settlement coin) pair queried for positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionScope {
    pub category: String,
    pub settle_coin: String,
}

impl PositionScope {
    pub fn new(category: impl Into<String>, settle_coin: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            settle_coin: settle_coin.into(),
        }
    }
}

impl std::fmt::Display for PositionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.category, self.settle_coin)
    }
}

/// Fallback order and request parameters.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// REST base URL (mainnet or testnet).
    pub base_url: String,
    /// Receive window for signed requests (ms).
    pub recv_window_ms: u64,
    /// HTTP timeout per request.
    pub timeout: Duration,
    /// Account types tried in order for the wallet balance.
    pub account_types: Vec<AccountType>,
    /// Comma-separated coin filter for the wallet balance.
    pub coins: String,
    /// Scopes queried for open positions.
    pub position_scopes: Vec<PositionScope>,
    /// Categories tried in order for ticker prices.
    pub ticker_categories: Vec<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.bybit.com".to_string(),
            recv_window_ms: RECV_WINDOW_MS,
            timeout: DEFAULT_TIMEOUT,
            account_types: vec![AccountType::Unified, AccountType::Contract, AccountType::Spot],
            coins: "USDT,USDC,BTC,ETH".to_string(),
            position_scopes: vec![
                PositionScope::new("linear", "USDT"),
                PositionScope::new("linear", "USDC"),
                PositionScope::new("inverse", "BTC"),
                PositionScope::new("inverse", "USDT"),
            ],
            ticker_categories: vec!["linear".to_string(), "spot".to_string()],
        }
    }
}

/// Accumulates open positions across scopes.
///
/// A failing scope is remembered but does not discard positions from the
/// others. An error is reported only if nothing was collected and at least
/// one scope failed; a scope answering with an empty list is not a failure.
/// When no scope got an answer at all the last transport error is returned
/// as is.
#[derive(Debug, Default)]
pub struct PositionAggregate {
    positions: Vec<Position>,
    last_error: Option<(String, ExchangeError)>,
    answered: bool,
}

impl PositionAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in the outcome of one scope.
    pub fn absorb(&mut self, scope: &PositionScope, outcome: ExchangeResult<Vec<RawPosition>>) {
        match outcome {
            Ok(raw) => {
                self.answered = true;
                self.positions
                    .extend(raw.into_iter().filter_map(RawPosition::into_open_position));
            }
            Err(e) => {
                debug!(%scope, error = %e, "Position scope failed");
                self.answered |= !e.is_transport();
                self.last_error = Some((scope.to_string(), e));
            }
        }
    }

    pub fn finish(self) -> ExchangeResult<Vec<Position>> {
        match self.last_error {
            Some((_, err)) if self.positions.is_empty() && !self.answered => Err(err),
            Some((scope, err)) if self.positions.is_empty() => {
                Err(ExchangeError::AllAttemptsFailed(format!("{err} ({scope})")))
            }
            _ => Ok(self.positions),
        }
    }
}

/// Signed client for the exchange REST API.
pub struct BybitClient {
    /// HTTP client.
    client: Client,
    signer: RequestSigner,
    settings: ClientSettings,
}

impl BybitClient {
    /// Create a new client.
    pub fn new(settings: ClientSettings) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ExchangeError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            signer: RequestSigner::new(settings.recv_window_ms),
            settings,
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> ExchangeResult<Url> {
        let base = format!("{}{}", self.settings.base_url.trim_end_matches('/'), path);
        Url::parse_with_params(&base, params)
            .map_err(|e| ExchangeError::HttpClient(format!("Invalid URL {base}: {e}")))
    }

    /// Signed GET. The signed query string is exactly the one sent.
    async fn signed_get<T: DeserializeOwned>(
        &self,
        credentials: &ApiCredentials,
        path: &str,
        params: &[(&str, &str)],
    ) -> ExchangeResult<ApiEnvelope<T>> {
        let url = self.endpoint(path, params)?;
        let headers = self
            .signer
            .sign_now(credentials, url.query().unwrap_or_default())?;

        let request = self
            .client
            .get(url)
            .header(HEADER_API_KEY, headers.api_key)
            .header(HEADER_TIMESTAMP, headers.timestamp)
            .header(HEADER_RECV_WINDOW, headers.recv_window)
            .header(HEADER_SIGN, headers.signature);

        Self::decode(request.send().await).await
    }

    /// Unsigned GET for public market data.
    async fn public_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> ExchangeResult<ApiEnvelope<T>> {
        let url = self.endpoint(path, params)?;
        Self::decode(self.client.get(url).send().await).await
    }

    async fn decode<T: DeserializeOwned>(
        sent: reqwest::Result<reqwest::Response>,
    ) -> ExchangeResult<ApiEnvelope<T>> {
        let response = sent.map_err(|e| ExchangeError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Transport(format!(
                "status {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        response
            .json::<ApiEnvelope<T>>()
            .await
            .map_err(|e| ExchangeError::Decode(e.to_string()))
    }

    /// Try each account type in order.
    pub async fn wallet_snapshot(
        &self,
        credentials: &ApiCredentials,
    ) -> ExchangeResult<AccountSnapshot> {
        let mut failures = Vec::with_capacity(self.settings.account_types.len());
        let mut last_transport = None;
        let mut transport_failures = 0;

        for account_type in &self.settings.account_types {
            let params = [
                ("accountType", account_type.as_str()),
                ("coin", self.settings.coins.as_str()),
            ];
            let outcome = self
                .signed_get::<ListResult<RawWalletAccount>>(credentials, WALLET_BALANCE_PATH, &params)
                .await
                .and_then(ApiEnvelope::into_result);

            match outcome {
                Ok(Some(result)) if !result.list.is_empty() => {
                    let account = result.list.into_iter().next().unwrap_or_default();
                    info!(account_type = %account_type, "Fetched wallet balance");
                    return Ok(account.into_snapshot(*account_type));
                }
                Ok(_) => {
                    debug!(account_type = %account_type, "Wallet balance empty");
                    failures.push(format!("{account_type}: empty response"));
                }
                Err(e) => {
                    warn!(account_type = %account_type, error = %e, "Wallet balance failed");
                    failures.push(format!("{account_type}: {e}"));
                    if e.is_transport() {
                        transport_failures += 1;
                        last_transport = Some(e);
                    }
                }
            }
        }

        // Nothing but transport failures means the exchange was never reached.
        match last_transport {
            Some(e) if transport_failures == failures.len() => Err(e),
            _ => Err(ExchangeError::AllAttemptsFailed(failures.join("; "))),
        }
    }

    /// Query every scope and merge open positions.
    pub async fn open_positions(
        &self,
        credentials: &ApiCredentials,
    ) -> ExchangeResult<Vec<Position>> {
        let mut aggregate = PositionAggregate::new();

        for scope in &self.settings.position_scopes {
            let params = [
                ("category", scope.category.as_str()),
                ("settleCoin", scope.settle_coin.as_str()),
            ];
            let outcome = self
                .signed_get::<ListResult<RawPosition>>(credentials, POSITION_LIST_PATH, &params)
                .await
                .and_then(ApiEnvelope::into_result)
                .map(|result| result.map(|r| r.list).unwrap_or_default());
            aggregate.absorb(scope, outcome);
        }

        let positions = aggregate.finish()?;
        info!(count = positions.len(), "Fetched open positions");
        Ok(positions)
    }

    /// Walk ticker categories until one yields a usable price.
    pub async fn ticker_price(&self, symbol: &str) -> ExchangeResult<Option<TickerQuote>> {
        for category in &self.settings.ticker_categories {
            let params = [("category", category.as_str()), ("symbol", symbol)];
            let outcome = self
                .public_get::<ListResult<RawTicker>>(TICKERS_PATH, &params)
                .await
                .and_then(ApiEnvelope::into_result);

            match outcome {
                Ok(result) => {
                    let quote = result
                        .map(|r| r.list)
                        .unwrap_or_default()
                        .iter()
                        .filter(|t| t.symbol.eq_ignore_ascii_case(symbol))
                        .find_map(|t| t.to_quote(category));
                    if let Some(quote) = quote {
                        debug!(symbol, category = %category, kind = %quote.kind, "Ticker price");
                        return Ok(Some(quote));
                    }
                }
                Err(e) => {
                    warn!(symbol, category = %category, error = %e, "Ticker request failed");
                }
            }
        }

        Ok(None)
    }
}

impl ExchangeApi for BybitClient {
    fn fetch_account_snapshot<'a>(
        &'a self,
        credentials: &'a ApiCredentials,
    ) -> BoxFuture<'a, ExchangeResult<AccountSnapshot>> {
        Box::pin(self.wallet_snapshot(credentials))
    }

    fn fetch_open_positions<'a>(
        &'a self,
        credentials: &'a ApiCredentials,
    ) -> BoxFuture<'a, ExchangeResult<Vec<Position>>> {
        Box::pin(self.open_positions(credentials))
    }

    fn fetch_ticker_price<'a>(
        &'a self,
        symbol: &'a str,
    ) -> BoxFuture<'a, ExchangeResult<Option<TickerQuote>>> {
        Box::pin(self.ticker_price(symbol))
    }
}
