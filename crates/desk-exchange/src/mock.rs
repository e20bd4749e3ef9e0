//! Recording exchange double for tests.

use crate::client::{BoxFuture, ExchangeApi};
use crate::error::{ExchangeError, ExchangeResult};
use crate::signer::ApiCredentials;
use crate::types::TickerQuote;
use desk_core::{AccountSnapshot, AccountType, Position};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Mock exchange returning canned results and counting calls.
#[derive(Debug)]
pub struct MockExchange {
    snapshot: Mutex<ExchangeResult<AccountSnapshot>>,
    positions: Mutex<ExchangeResult<Vec<Position>>>,
    ticker: Mutex<ExchangeResult<Option<TickerQuote>>>,
    /// API keys seen by account-level calls, in call order.
    seen_keys: Mutex<Vec<String>>,
    snapshot_calls: AtomicUsize,
    positions_calls: AtomicUsize,
    ticker_calls: AtomicUsize,
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExchange {
    /// Empty unified account, no positions, no ticker.
    pub fn new() -> Self {
        Self {
            snapshot: Mutex::new(Ok(AccountSnapshot::empty(AccountType::Unified))),
            positions: Mutex::new(Ok(Vec::new())),
            ticker: Mutex::new(Ok(None)),
            seen_keys: Mutex::new(Vec::new()),
            snapshot_calls: AtomicUsize::new(0),
            positions_calls: AtomicUsize::new(0),
            ticker_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_snapshot(&self, result: ExchangeResult<AccountSnapshot>) {
        *self.snapshot.lock() = result;
    }

    pub fn set_positions(&self, result: ExchangeResult<Vec<Position>>) {
        *self.positions.lock() = result;
    }

    pub fn set_ticker(&self, result: ExchangeResult<Option<TickerQuote>>) {
        *self.ticker.lock() = result;
    }

    pub fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    pub fn positions_calls(&self) -> usize {
        self.positions_calls.load(Ordering::SeqCst)
    }

    pub fn ticker_calls(&self) -> usize {
        self.ticker_calls.load(Ordering::SeqCst)
    }

    /// Total calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.snapshot_calls() + self.positions_calls() + self.ticker_calls()
    }

    pub fn seen_keys(&self) -> Vec<String> {
        self.seen_keys.lock().clone()
    }
}

impl ExchangeApi for MockExchange {
    fn fetch_account_snapshot<'a>(
        &'a self,
        credentials: &'a ApiCredentials,
    ) -> BoxFuture<'a, ExchangeResult<AccountSnapshot>> {
        Box::pin(async move {
            self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
            self.seen_keys.lock().push(credentials.api_key().to_string());
            self.snapshot.lock().clone()
        })
    }

    fn fetch_open_positions<'a>(
        &'a self,
        credentials: &'a ApiCredentials,
    ) -> BoxFuture<'a, ExchangeResult<Vec<Position>>> {
        Box::pin(async move {
            self.positions_calls.fetch_add(1, Ordering::SeqCst);
            self.seen_keys.lock().push(credentials.api_key().to_string());
            self.positions.lock().clone()
        })
    }

    fn fetch_ticker_price<'a>(
        &'a self,
        _symbol: &'a str,
    ) -> BoxFuture<'a, ExchangeResult<Option<TickerQuote>>> {
        Box::pin(async move {
            self.ticker_calls.fetch_add(1, Ordering::SeqCst);
            self.ticker.lock().clone()
        })
    }
}

/// Shorthand for an exchange-side rejection.
pub fn api_error(code: i64, message: &str) -> ExchangeError {
    ExchangeError::Api {
        code,
        message: message.to_string(),
    }
}
