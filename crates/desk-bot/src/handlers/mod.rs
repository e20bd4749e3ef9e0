//! Account replies built from exchange data.
//!
//! Every method yields the reply text. Exchange answers (rejected keys,
//! exhausted account types) become a formatted error line; transport
//! failures come back as `Err` so the dispatcher can abort the cycle
//! without messaging the user.

pub mod format;

use crate::commands::CallbackAction;
use chrono::{DateTime, Utc};
use desk_core::{month_to_date_pct, DerivedMetrics, MetricsEngine, MonthKey};
use desk_exchange::{ApiCredentials, ExchangeApi, ExchangeError, ExchangeResult};
use desk_persistence::BaselineStore;
use desk_telemetry::Metrics;
use std::sync::Arc;
use tracing::{error, warn};

/// Builds account replies for one user's credentials.
pub struct AccountService {
    exchange: Arc<dyn ExchangeApi>,
    baselines: Arc<BaselineStore>,
    position_cap: usize,
}

/// Error line for an exchange answer; transport failures pass through.
fn error_reply(e: ExchangeError) -> ExchangeResult<String> {
    if e.is_transport() {
        return Err(e);
    }
    Ok(format::exchange_error(&e))
}

impl AccountService {
    pub fn new(
        exchange: Arc<dyn ExchangeApi>,
        baselines: Arc<BaselineStore>,
        position_cap: usize,
    ) -> Self {
        Self {
            exchange,
            baselines,
            position_cap,
        }
    }

    /// Snapshot plus open positions, reduced to dashboard figures.
    ///
    /// A positions call rejected by the exchange degrades open PnL to zero
    /// instead of failing the whole derivation. A transport failure on
    /// either call is returned.
    pub async fn derive_metrics(
        &self,
        credentials: &ApiCredentials,
    ) -> ExchangeResult<DerivedMetrics> {
        let snapshot = match self.exchange.fetch_account_snapshot(credentials).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                Metrics::exchange_error("wallet_balance");
                warn!(error = %e, "Wallet balance unavailable");
                return Err(e);
            }
        };

        let positions = match self.exchange.fetch_open_positions(credentials).await {
            Ok(positions) => positions,
            Err(e) if e.is_transport() => {
                Metrics::exchange_error("open_positions");
                return Err(e);
            }
            Err(e) => {
                Metrics::exchange_error("open_positions");
                warn!(error = %e, "Open positions unavailable, assuming no open PnL");
                Vec::new()
            }
        };

        Ok(MetricsEngine::derive(&snapshot, &positions))
    }

    /// Reply for a known wallet-menu selection.
    pub async fn callback_reply(
        &self,
        action: &CallbackAction,
        credentials: &ApiCredentials,
    ) -> ExchangeResult<String> {
        match action {
            CallbackAction::OpenPositions => self.open_positions_reply(credentials).await,
            CallbackAction::FreeCapital => self.free_capital_reply(credentials).await,
            CallbackAction::CapitalInTrade => self.capital_in_trade_reply(credentials).await,
            CallbackAction::Unknown(_) => Ok(format::UNKNOWN_OPTION.to_string()),
        }
    }

    pub async fn free_capital_reply(&self, credentials: &ApiCredentials) -> ExchangeResult<String> {
        match self.derive_metrics(credentials).await {
            Ok(m) => Ok(format::free_capital(&m)),
            Err(e) => error_reply(e),
        }
    }

    pub async fn capital_in_trade_reply(
        &self,
        credentials: &ApiCredentials,
    ) -> ExchangeResult<String> {
        match self.derive_metrics(credentials).await {
            Ok(m) => Ok(format::capital_in_trade(&m)),
            Err(e) => error_reply(e),
        }
    }

    pub async fn open_positions_reply(
        &self,
        credentials: &ApiCredentials,
    ) -> ExchangeResult<String> {
        match self.exchange.fetch_open_positions(credentials).await {
            Ok(positions) => Ok(format::open_positions(&positions, self.position_cap)),
            Err(e) => {
                Metrics::exchange_error("open_positions");
                error_reply(e)
            }
        }
    }

    /// Month-to-date PnL against the baseline captured at first use in `now`'s month.
    pub async fn month_to_date_reply(
        &self,
        user_id: i64,
        credentials: &ApiCredentials,
        now: DateTime<Utc>,
    ) -> ExchangeResult<String> {
        let metrics = match self.derive_metrics(credentials).await {
            Ok(m) => m,
            Err(e) => return error_reply(e),
        };

        let month = MonthKey::of(&now);
        let start = match self
            .baselines
            .get_or_create(user_id, month, metrics.wallet_balance)
        {
            Ok(start) => start,
            Err(e) => {
                error!(user_id, error = %e, "Failed to read or store month baseline");
                return Ok(format!("❌ Storage: {}", format::escape_html(&e.to_string())));
            }
        };

        let pct = month_to_date_pct(start, metrics.equity_mtm);
        Ok(format::month_to_date(month, start, &metrics, pct))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use desk_core::{AccountSnapshot, AccountType, Position, Side, Size};
    use desk_exchange::{api_error, MockExchange};
    use desk_persistence::MemoryStore;
    use rust_decimal_macros::dec;

    fn service(exchange: Arc<MockExchange>) -> AccountService {
        let baselines = Arc::new(BaselineStore::new(Arc::new(MemoryStore::new())));
        AccountService::new(exchange, baselines, 12)
    }

    fn creds() -> ApiCredentials {
        ApiCredentials::new("key", "secret")
    }

    fn wallet(balance: rust_decimal::Decimal) -> AccountSnapshot {
        let mut snap = AccountSnapshot::empty(AccountType::Unified);
        snap.wallet_balance = balance;
        snap.total_margin_balance = balance;
        snap.total_available_balance = balance;
        snap
    }

    #[tokio::test]
    async fn test_positions_failure_degrades_open_pnl() {
        let exchange = Arc::new(MockExchange::new());
        exchange.set_snapshot(Ok(wallet(dec!(1000))));
        exchange.set_positions(Err(api_error(10001, "category not supported")));

        let m = service(exchange.clone()).derive_metrics(&creds()).await.unwrap();
        assert_eq!(m.pnl_open, dec!(0));
        assert_eq!(m.equity_mtm, dec!(1000));
    }

    #[tokio::test]
    async fn test_snapshot_failure_surfaces_message() {
        let exchange = Arc::new(MockExchange::new());
        exchange.set_snapshot(Err(api_error(10003, "API key is invalid.")));

        let text = service(exchange.clone()).free_capital_reply(&creds()).await.unwrap();
        assert_eq!(text, "❌ Exchange: API key is invalid. (retCode=10003)");
        assert_eq!(exchange.positions_calls(), 0);
    }

    #[tokio::test]
    async fn test_open_positions_reply_surfaces_error() {
        let exchange = Arc::new(MockExchange::new());
        exchange.set_positions(Err(api_error(10002, "timestamp outside recv window")));

        let text = service(exchange.clone()).open_positions_reply(&creds()).await.unwrap();
        assert!(text.starts_with("❌ Exchange: timestamp outside recv window"));
        assert_eq!(exchange.snapshot_calls(), 0);
    }

    #[tokio::test]
    async fn test_month_to_date_uses_first_baseline_of_month() {
        let exchange = Arc::new(MockExchange::new());
        let svc = service(exchange.clone());
        let oct_1 = Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap();
        let oct_20 = Utc.with_ymd_and_hms(2026, 10, 20, 8, 0, 0).unwrap();

        exchange.set_snapshot(Ok(wallet(dec!(1000))));
        let first = svc.month_to_date_reply(5, &creds(), oct_1).await.unwrap();
        assert!(first.contains("Change: <b>+0.00%</b>"), "{first}");

        exchange.set_snapshot(Ok(wallet(dec!(1080))));
        exchange.set_positions(Ok(vec![Position {
            symbol: "BTCUSDT".to_string(),
            side: Side::Long,
            size: Size::new(dec!(0.1)),
            unrealized_pnl: dec!(20),
        }]));
        let later = svc.month_to_date_reply(5, &creds(), oct_20).await.unwrap();
        assert!(later.contains("PnL 2026-10"), "{later}");
        assert!(later.contains("Month start: $1,000.00"), "{later}");
        assert!(later.contains("Now (wallet + open PnL): $1,100.00"), "{later}");
        assert!(later.contains("Change: <b>+10.00%</b>"), "{later}");
    }

    #[tokio::test]
    async fn test_unknown_action_makes_no_exchange_call() {
        let exchange = Arc::new(MockExchange::new());
        let text = service(exchange.clone())
            .callback_reply(&CallbackAction::Unknown("x".to_string()), &creds())
            .await
            .unwrap();
        assert_eq!(text, format::UNKNOWN_OPTION);
        assert_eq!(exchange.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_a_reply() {
        let exchange = Arc::new(MockExchange::new());
        exchange.set_snapshot(Err(ExchangeError::Transport("connection refused".to_string())));
        let svc = service(exchange.clone());

        let err = svc.free_capital_reply(&creds()).await.unwrap_err();
        assert!(err.is_transport());
        assert!(svc.month_to_date_reply(5, &creds(), Utc::now()).await.is_err());
        assert!(svc
            .callback_reply(&CallbackAction::CapitalInTrade, &creds())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_positions_transport_failure_is_not_degraded() {
        let exchange = Arc::new(MockExchange::new());
        exchange.set_snapshot(Ok(wallet(dec!(1000))));
        exchange.set_positions(Err(ExchangeError::Transport("status 502: Bad Gateway".to_string())));
        let svc = service(exchange.clone());

        assert!(svc.derive_metrics(&creds()).await.is_err());
        assert!(svc.open_positions_reply(&creds()).await.is_err());
    }
}
