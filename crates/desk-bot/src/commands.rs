//! Command table and callback tokens.
//!
//! Commands match by case-insensitive prefix, so `/Saldo`, `/saldo@desk_bot`
//! and `/saldo now` all resolve to the wallet menu. Callback tokens match
//! exactly.

use std::fmt;

/// A text command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Show user and chat identifiers. Allowed from any chat.
    Id,
    /// List available commands.
    Commands,
    /// Month-to-date PnL against the stored baseline.
    Pnl,
    /// Wallet menu with an inline keyboard.
    Wallet,
}

/// Canonical name, legacy aliases and description of one command.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub command: Command,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
}

pub const COMMAND_TABLE: &[CommandSpec] = &[
    CommandSpec {
        command: Command::Wallet,
        name: "/wallet",
        aliases: &["/saldo"],
        description: "wallet menu (positions, free capital, capital in trade)",
    },
    CommandSpec {
        command: Command::Pnl,
        name: "/pnl",
        aliases: &["/lucro"],
        description: "month-to-date PnL",
    },
    CommandSpec {
        command: Command::Commands,
        name: "/commands",
        aliases: &["/comandos", "/help"],
        description: "this list",
    },
    CommandSpec {
        command: Command::Id,
        name: "/id",
        aliases: &[],
        description: "your user id and this chat's id",
    },
];

impl Command {
    /// Resolve message text to a command.
    ///
    /// Longer names are tried first so a short name never shadows a longer one.
    pub fn parse(text: &str) -> Option<Self> {
        let lowered = text.trim().to_lowercase();
        if !lowered.starts_with('/') {
            return None;
        }

        let mut patterns: Vec<(&str, Command)> = COMMAND_TABLE
            .iter()
            .flat_map(|spec| {
                std::iter::once(spec.name)
                    .chain(spec.aliases.iter().copied())
                    .map(move |p| (p, spec.command))
            })
            .collect();
        patterns.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        patterns
            .into_iter()
            .find(|(pattern, _)| lowered.starts_with(pattern))
            .map(|(_, command)| command)
    }

    pub fn spec(&self) -> &'static CommandSpec {
        COMMAND_TABLE
            .iter()
            .find(|spec| spec.command == *self)
            .unwrap_or(&COMMAND_TABLE[0])
    }

    /// Canonical name without the slash, used as a metrics label.
    pub fn label(&self) -> &'static str {
        self.spec().name.trim_start_matches('/')
    }

    pub fn requires_credentials(&self) -> bool {
        matches!(self, Self::Pnl | Self::Wallet)
    }

    /// Whether the command is honoured outside the allowed chat.
    pub fn allowed_anywhere(&self) -> bool {
        matches!(self, Self::Id)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec().name)
    }
}

/// Selection from the wallet-menu keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    OpenPositions,
    FreeCapital,
    CapitalInTrade,
    /// Any other token; answered with a fixed text.
    Unknown(String),
}

impl CallbackAction {
    pub const OPEN_POSITIONS: &'static str = "pos:open";
    pub const FREE_CAPITAL: &'static str = "cap:free";
    pub const CAPITAL_IN_TRADE: &'static str = "cap:trade";

    pub fn parse(token: &str) -> Self {
        match token {
            Self::OPEN_POSITIONS => Self::OpenPositions,
            Self::FREE_CAPITAL => Self::FreeCapital,
            Self::CAPITAL_IN_TRADE => Self::CapitalInTrade,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Metrics label; unknown tokens share one label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::OpenPositions => Self::OPEN_POSITIONS,
            Self::FreeCapital => Self::FREE_CAPITAL,
            Self::CapitalInTrade => Self::CAPITAL_IN_TRADE,
            Self::Unknown(_) => "unknown",
        }
    }
}
