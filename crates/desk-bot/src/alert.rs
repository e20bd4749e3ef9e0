//! Broadcast price alert with a persisted cooldown.
//!
//! Ticked once per dispatcher cycle. The last successful send time is
//! kept in an [`AlertClock`] so a restart does not re-send early.

use crate::handlers::format;
use desk_chat::{ChatGateway, ChatId};
use desk_exchange::ExchangeApi;
use desk_persistence::AlertClock;
use desk_telemetry::Metrics;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one alert tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    /// No broadcast chat configured.
    NoTarget,
    /// Cooldown has not elapsed since the last send.
    CoolingDown,
    /// Ticker unavailable or failed.
    NoPrice,
    Sent,
    SendFailed,
}

pub struct PriceAlertService {
    exchange: Arc<dyn ExchangeApi>,
    chat: Arc<dyn ChatGateway>,
    clock: AlertClock,
    target: Option<ChatId>,
    symbol: String,
    cooldown_secs: u64,
    last_sent: i64,
}

impl PriceAlertService {
    /// Build the service and read the persisted last-sent time.
    pub fn new(
        exchange: Arc<dyn ExchangeApi>,
        chat: Arc<dyn ChatGateway>,
        clock: AlertClock,
        target: Option<ChatId>,
        symbol: impl Into<String>,
        cooldown_secs: u64,
    ) -> Self {
        let last_sent = clock.load();
        Self {
            exchange,
            chat,
            clock,
            target,
            symbol: symbol.into(),
            cooldown_secs,
            last_sent,
        }
    }

    pub fn last_sent(&self) -> i64 {
        self.last_sent
    }

    fn is_due(&self, now_ts: i64) -> bool {
        now_ts.saturating_sub(self.last_sent) >= self.cooldown_secs as i64
    }

    /// Send the alert if due. `force` skips the cooldown check.
    pub async fn tick(&mut self, now_ts: i64, force: bool) -> AlertOutcome {
        let Some(target) = self.target else {
            return AlertOutcome::NoTarget;
        };
        if !force && !self.is_due(now_ts) {
            return AlertOutcome::CoolingDown;
        }

        let quote = match self.exchange.fetch_ticker_price(&self.symbol).await {
            Ok(Some(quote)) => quote,
            Ok(None) => {
                debug!(symbol = %self.symbol, "No price for alert");
                return AlertOutcome::NoPrice;
            }
            Err(e) => {
                Metrics::exchange_error("ticker");
                warn!(symbol = %self.symbol, error = %e, "Ticker fetch failed");
                return AlertOutcome::NoPrice;
            }
        };

        let text = format::price_alert(&quote);
        match self.chat.send_message(target, &text, None).await {
            Ok(_) => {
                self.last_sent = now_ts;
                self.clock.save(now_ts);
                Metrics::alert_sent();
                info!(
                    symbol = %quote.symbol,
                    price = %quote.price,
                    change_pct = %quote.change_24h_pct,
                    forced = force,
                    "Price alert sent"
                );
                AlertOutcome::Sent
            }
            Err(e) => {
                warn!(chat_id = target, error = %e, "Price alert send failed");
                AlertOutcome::SendFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_chat::MockChatGateway;
    use desk_exchange::{api_error, MockExchange, PriceKind, TickerQuote};
    use desk_persistence::{KeyValueStore, MemoryStore};
    use rust_decimal_macros::dec;

    struct Harness {
        exchange: Arc<MockExchange>,
        chat: Arc<MockChatGateway>,
        store: Arc<MemoryStore>,
    }

    impl Harness {
        fn new() -> Self {
            let exchange = Arc::new(MockExchange::new());
            exchange.set_ticker(Ok(Some(TickerQuote {
                symbol: "BTCUSDT".to_string(),
                category: "linear".to_string(),
                price: dec!(65010.5),
                kind: PriceKind::Mark,
                change_24h_pct: dec!(1.234),
            })));
            Self {
                exchange,
                chat: Arc::new(MockChatGateway::new()),
                store: Arc::new(MemoryStore::new()),
            }
        }

        fn service(&self, target: Option<ChatId>) -> PriceAlertService {
            PriceAlertService::new(
                self.exchange.clone(),
                self.chat.clone(),
                AlertClock::new(self.store.clone()),
                target,
                "BTCUSDT",
                2700,
            )
        }
    }

    #[tokio::test]
    async fn test_no_target_skips_everything() {
        let h = Harness::new();
        let mut svc = h.service(None);
        assert_eq!(svc.tick(10_000, true).await, AlertOutcome::NoTarget);
        assert_eq!(h.exchange.ticker_calls(), 0);
    }

    #[tokio::test]
    async fn test_cooldown_then_due() {
        let h = Harness::new();
        let mut svc = h.service(Some(-100));

        assert_eq!(svc.tick(10_000, false).await, AlertOutcome::Sent);
        assert_eq!(svc.tick(10_000 + 2699, false).await, AlertOutcome::CoolingDown);
        assert_eq!(svc.tick(10_000 + 2700, false).await, AlertOutcome::Sent);

        assert_eq!(h.exchange.ticker_calls(), 2);
        assert_eq!(
            h.chat.sent_texts()[0],
            "📈 <b>BTC</b> $65,010.50 (+1.23%)"
        );
    }

    #[tokio::test]
    async fn test_forced_send_bypasses_cooldown_and_persists() {
        let h = Harness::new();
        let mut svc = h.service(Some(-100));
        svc.tick(10_000, false).await;

        assert_eq!(svc.tick(10_001, true).await, AlertOutcome::Sent);
        assert_eq!(h.store.get("alert_last_sent").unwrap().as_deref(), Some("10001"));
    }

    #[tokio::test]
    async fn test_restart_respects_persisted_time() {
        let h = Harness::new();
        h.service(Some(-100)).tick(10_000, false).await;

        let mut restarted = h.service(Some(-100));
        assert_eq!(restarted.last_sent(), 10_000);
        assert_eq!(restarted.tick(10_100, false).await, AlertOutcome::CoolingDown);
    }

    #[tokio::test]
    async fn test_failures_do_not_advance_clock() {
        let h = Harness::new();
        let mut svc = h.service(Some(-100));

        h.chat.set_fail_sends(true);
        assert_eq!(svc.tick(10_000, false).await, AlertOutcome::SendFailed);
        assert_eq!(svc.last_sent(), 0);

        h.chat.set_fail_sends(false);
        h.exchange.set_ticker(Err(api_error(10001, "symbol invalid")));
        assert_eq!(svc.tick(10_000, false).await, AlertOutcome::NoPrice);

        h.exchange.set_ticker(Ok(None));
        assert_eq!(svc.tick(10_000, false).await, AlertOutcome::NoPrice);
        assert_eq!(h.store.get("alert_last_sent").unwrap(), None);
    }
}
