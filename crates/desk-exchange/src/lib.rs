//! Signed read-only exchange client for wallet-desk.
//!
//! Fetches wallet balances, open positions and ticker prices from the
//! exchange's v5 REST API and normalizes them into `desk-core` types.
//!
//! Every account-level call walks an ordered list of categories and falls
//! back to the next one on failure, so callers never deal with account-type
//! differences.

pub mod client;
pub mod error;
pub mod mock;
pub mod signer;
pub mod types;

pub use client::{
    BoxFuture, BybitClient, ClientSettings, ExchangeApi, PositionAggregate, PositionScope,
};
pub use error::{ExchangeError, ExchangeResult};
pub use mock::{api_error, MockExchange};
pub use signer::{ApiCredentials, RequestSigner, RECV_WINDOW_MS};
pub use types::{PriceKind, TickerQuote};
