//! Reply texts (HTML parse mode).

use crate::commands::{CallbackAction, COMMAND_TABLE};
use desk_chat::{Chat, InlineKeyboardButton, InlineKeyboardMarkup, User};
use desk_core::{DerivedMetrics, MonthKey, Position};
use desk_exchange::{ExchangeError, TickerQuote};
use num_format::{Locale, ToFormattedString};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

pub const NOT_CONFIGURED: &str = "⛔️ No exchange API is configured for you in this bot.";
pub const UNKNOWN_OPTION: &str = "Unknown option.";
pub const WALLET_MENU: &str = "📍 <b>Wallet</b>\nChoose:";

/// Quote suffixes stripped to get the alert label ("BTCUSDT" → "BTC").
const QUOTE_SUFFIXES: &[&str] = &["USDT", "USDC", "PERP", "USD"];

/// `$1,234.56`, or `-$12.34` for negative values.
pub fn fmt_usd(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    let magnitude = rounded.abs();
    let dollars = magnitude.trunc().to_u128().unwrap_or_default();
    let cents = (magnitude.fract() * Decimal::ONE_HUNDRED)
        .to_u32()
        .unwrap_or_default();

    format!("{sign}${}.{cents:02}", dollars.to_formatted_string(&Locale::en))
}

/// Signed percentage with two decimals: `+1.23%`, `-0.50%`.
pub fn fmt_pct(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        "+"
    };
    format!("{sign}{:.2}%", rounded.abs())
}

/// Minimal escaping for text interpolated into HTML replies.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn exchange_error(error: &ExchangeError) -> String {
    format!("❌ Exchange: {}", escape_html(&error.to_string()))
}

pub fn wallet_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "📌 Open positions",
            CallbackAction::OPEN_POSITIONS,
        )],
        vec![
            InlineKeyboardButton::callback("🟢 Free capital", CallbackAction::FREE_CAPITAL),
            InlineKeyboardButton::callback(
                "🟠 Capital in trade (cost)",
                CallbackAction::CAPITAL_IN_TRADE,
            ),
        ],
    ])
}

pub fn identity(user: Option<&User>, chat: &Chat) -> String {
    let user_id = user
        .map(|u| u.id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let name = user
        .map(User::display_name)
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "-".to_string());
    let username = user
        .and_then(|u| u.username.as_deref())
        .map(|u| format!("@{u}"))
        .unwrap_or_else(|| "-".to_string());

    format!(
        "🆔 <b>IDs</b>\n\
         👤 user_id: <b>{user_id}</b>\n\
         👤 name: <b>{}</b> ({})\n\
         💬 chat_id: <b>{}</b>\n\
         💬 chat_type: <b>{}</b>",
        escape_html(&name),
        escape_html(&username),
        chat.id,
        escape_html(&chat.kind),
    )
}

pub fn command_list() -> String {
    let mut out = String::from("📋 <b>Commands</b>");
    for spec in COMMAND_TABLE {
        out.push_str(&format!("\n{} - {}", spec.name, spec.description));
        if !spec.aliases.is_empty() {
            out.push_str(&format!(" <i>(also {})</i>", spec.aliases.join(", ")));
        }
    }
    out
}

pub fn free_capital(m: &DerivedMetrics) -> String {
    format!(
        "🟢 <b>Free capital</b> <i>{}</i>\n\
         Free to use: <b>{}</b>\n\
         Buffer (spare margin): {}\n\n\
         ℹ️ Wallet: {}\n\
         ℹ️ Assets (now): {}",
        m.account_type,
        fmt_usd(m.free_to_use()),
        fmt_usd(m.capital_free_real),
        fmt_usd(m.wallet_balance.max(Decimal::ZERO)),
        fmt_usd(m.assets_now.max(Decimal::ZERO)),
    )
}

pub fn capital_in_trade(m: &DerivedMetrics) -> String {
    format!(
        "🟠 <b>Capital in trade (cost)</b> <i>{}</i>\n\
         Capital (cost): <b>{}</b>\n\
         Assets (now): {}\n\
         Available margin: {}\n\n\
         ℹ️ In use: {} | Open PnL: {}",
        m.account_type,
        fmt_usd(m.capital_cost.max(Decimal::ZERO)),
        fmt_usd(m.assets_now.max(Decimal::ZERO)),
        fmt_usd(m.available_margin.max(Decimal::ZERO)),
        fmt_usd(m.used),
        fmt_usd(m.pnl_open),
    )
}

/// At most `cap` lines, then a count of the hidden rest.
pub fn open_positions(positions: &[Position], cap: usize) -> String {
    let open: Vec<&Position> = positions.iter().filter(|p| p.is_open()).collect();
    if open.is_empty() {
        return "📌 <b>Open positions</b>\n— none —".to_string();
    }

    let mut out = String::from("📌 <b>Open positions</b>");
    for p in open.iter().take(cap) {
        out.push_str(&format!(
            "\n• <b>{}</b> {} | size: {} | UPL: {}",
            escape_html(&p.symbol),
            p.side,
            p.size,
            fmt_usd(p.unrealized_pnl),
        ));
    }
    if open.len() > cap {
        out.push_str(&format!("\n<i>+{} hidden</i>", open.len() - cap));
    }
    out
}

/// Money figures are shown clamped at zero; open PnL and `pct` keep their sign.
pub fn month_to_date(month: MonthKey, start: Decimal, m: &DerivedMetrics, pct: Decimal) -> String {
    format!(
        "📅 <b>PnL {month}</b> <i>{}</i>\n\
         Month start: {}\n\
         Now (wallet + open PnL): {}\n\
         Open PnL: {}\n\
         Change: <b>{}</b>",
        m.account_type,
        fmt_usd(start.max(Decimal::ZERO)),
        fmt_usd(m.equity_mtm.max(Decimal::ZERO)),
        fmt_usd(m.pnl_open),
        fmt_pct(pct),
    )
}

/// Indicator for a 24h change in percent.
pub fn trend_emoji(change_pct: Decimal) -> &'static str {
    if change_pct > Decimal::from(5) {
        "🚀"
    } else if change_pct > Decimal::ONE {
        "📈"
    } else if change_pct < Decimal::from(-5) {
        "📉"
    } else if change_pct < Decimal::ZERO {
        "🔻"
    } else {
        "📊"
    }
}

/// Base asset of a symbol.
pub fn asset_label(symbol: &str) -> &str {
    QUOTE_SUFFIXES
        .iter()
        .find_map(|suffix| symbol.strip_suffix(suffix).filter(|base| !base.is_empty()))
        .unwrap_or(symbol)
}

pub fn price_alert(quote: &TickerQuote) -> String {
    format!(
        "{} <b>{}</b> {} ({})",
        trend_emoji(quote.change_24h_pct),
        escape_html(asset_label(&quote.symbol)),
        fmt_usd(quote.price),
        fmt_pct(quote.change_24h_pct),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_core::{AccountSnapshot, AccountType, MetricsEngine, Side, Size};
    use desk_exchange::PriceKind;
    use rust_decimal_macros::dec;

    fn position(symbol: &str, size: Decimal, upl: Decimal) -> Position {
        Position {
            symbol: symbol.to_string(),
            side: Side::Short,
            size: Size::new(size),
            unrealized_pnl: upl,
        }
    }

    #[test]
    fn test_fmt_usd() {
        assert_eq!(fmt_usd(dec!(1234.56)), "$1,234.56");
        assert_eq!(fmt_usd(dec!(-12.34)), "-$12.34");
        assert_eq!(fmt_usd(dec!(0)), "$0.00");
        assert_eq!(fmt_usd(dec!(1234567.891)), "$1,234,567.89");
        assert_eq!(fmt_usd(dec!(999.995)), "$1,000.00");
        assert_eq!(fmt_usd(dec!(100)), "$100.00");
        assert_eq!(fmt_usd(dec!(-0.001)), "$0.00");
    }

    #[test]
    fn test_fmt_usd_groups_large_values() {
        assert_eq!(
            fmt_usd(dec!(12345678901234567890.5)),
            "$12,345,678,901,234,567,890.50"
        );
        assert_eq!(fmt_usd(dec!(-1000000)), "-$1,000,000.00");
        assert_eq!(fmt_usd(dec!(0.07)), "$0.07");
    }

    #[test]
    fn test_fmt_pct() {
        assert_eq!(fmt_pct(dec!(1.234)), "+1.23%");
        assert_eq!(fmt_pct(dec!(-0.5)), "-0.50%");
        assert_eq!(fmt_pct(dec!(0)), "+0.00%");
    }

    #[test]
    fn test_trend_emoji_thresholds() {
        assert_eq!(trend_emoji(dec!(5.01)), "🚀");
        assert_eq!(trend_emoji(dec!(5)), "📈");
        assert_eq!(trend_emoji(dec!(1.5)), "📈");
        assert_eq!(trend_emoji(dec!(1)), "📊");
        assert_eq!(trend_emoji(dec!(0)), "📊");
        assert_eq!(trend_emoji(dec!(-0.1)), "🔻");
        assert_eq!(trend_emoji(dec!(-5)), "🔻");
        assert_eq!(trend_emoji(dec!(-5.01)), "📉");
    }

    #[test]
    fn test_asset_label() {
        assert_eq!(asset_label("BTCUSDT"), "BTC");
        assert_eq!(asset_label("ETHUSD"), "ETH");
        assert_eq!(asset_label("USDT"), "USDT");
    }

    #[test]
    fn test_price_alert() {
        let quote = TickerQuote {
            symbol: "BTCUSDT".to_string(),
            category: "linear".to_string(),
            price: dec!(65010.5),
            kind: PriceKind::Mark,
            change_24h_pct: dec!(1.23),
        };
        assert_eq!(price_alert(&quote), "📈 <b>BTC</b> $65,010.50 (+1.23%)");
    }

    #[test]
    fn test_open_positions_cap() {
        let positions: Vec<Position> = (0..15)
            .map(|i| position(&format!("SYM{i}USDT"), dec!(1), dec!(-1)))
            .collect();
        let text = open_positions(&positions, 12);
        assert_eq!(text.matches('•').count(), 12);
        assert!(text.ends_with("<i>+3 hidden</i>"));
        assert!(text.contains("• <b>SYM0USDT</b> Short | size: 1 | UPL: -$1.00"));
    }

    #[test]
    fn test_open_positions_skips_flat_and_handles_empty() {
        let flat = vec![position("BTCUSDT", dec!(0), dec!(0))];
        assert!(open_positions(&flat, 12).contains("— none —"));
    }

    #[test]
    fn test_free_capital_reply() {
        let mut snap = AccountSnapshot::empty(AccountType::Unified);
        snap.wallet_balance = dec!(1000);
        snap.position_initial_margin = dec!(200);
        snap.order_initial_margin = dec!(50);
        snap.maintenance_margin = dec!(10);
        snap.total_available_balance = dec!(-5);
        let m = MetricsEngine::derive(&snap, &[]);

        let text = free_capital(&m);
        assert!(text.contains("<i>UNIFIED</i>"), "{text}");
        assert!(text.contains("Free to use: <b>$0.00</b>"), "{text}");
        assert!(text.contains("Buffer (spare margin): $740.00"), "{text}");
    }

    #[test]
    fn test_capital_in_trade_keeps_pnl_sign_only() {
        let mut snap = AccountSnapshot::empty(AccountType::Contract);
        snap.total_margin_balance = dec!(100);
        snap.total_available_balance = dec!(40);
        let positions = vec![position("BTCUSDT", dec!(1), dec!(150))];
        let m = MetricsEngine::derive(&snap, &positions);

        let text = capital_in_trade(&m);
        assert!(text.contains("Capital (cost): <b>$0.00</b>"), "{text}");
        assert!(text.contains("In use: $60.00 | Open PnL: $150.00"), "{text}");

        let losing = vec![position("BTCUSDT", dec!(1), dec!(-12.5))];
        let text = capital_in_trade(&MetricsEngine::derive(&snap, &losing));
        assert!(text.contains("Open PnL: -$12.50"), "{text}");
    }

    #[test]
    fn test_month_to_date_clamps_money_not_change() {
        let mut snap = AccountSnapshot::empty(AccountType::Unified);
        snap.wallet_balance = dec!(100);
        let m = MetricsEngine::derive(&snap, &[position("ETHUSDT", dec!(2), dec!(-150))]);
        assert_eq!(m.equity_mtm, dec!(-50));

        let month = MonthKey::new(2026, 10).unwrap();
        let text = month_to_date(month, dec!(100), &m, dec!(-150));
        assert!(text.contains("Month start: $100.00"), "{text}");
        assert!(text.contains("Now (wallet + open PnL): $0.00"), "{text}");
        assert!(text.contains("Open PnL: -$150.00"), "{text}");
        assert!(text.contains("Change: <b>-150.00%</b>"), "{text}");
        assert!(!text.contains("-$50.00"), "{text}");
    }

    #[test]
    fn test_identity_escapes_names() {
        let user = User {
            id: 42,
            first_name: "<Ana>".to_string(),
            username: Some("ana".to_string()),
            ..Default::default()
        };
        let chat = Chat {
            id: -100,
            kind: "group".to_string(),
            title: None,
        };
        let text = identity(Some(&user), &chat);
        assert!(text.contains("user_id: <b>42</b>"));
        assert!(text.contains("name: <b>&lt;Ana&gt;</b> (@ana)"));
        assert!(text.contains("chat_id: <b>-100</b>"));
    }

    #[test]
    fn test_command_list_mentions_aliases() {
        let text = command_list();
        assert!(text.contains("/wallet"));
        assert!(text.contains("/saldo"));
        assert!(text.contains("/comandos, /help"));
    }
}
