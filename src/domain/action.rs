//! Actions emitted by the policy evaluator.
//!
//! Actions are transient: built and consumed inside one cycle. Their order
//! is significant because earlier actions can make later ones moot (once
//! [`Action::CloseAll`] fires, nothing per-position follows).

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::Symbol;
use super::position::{Position, Side};

/// Why a position was closed or a block issued.
///
/// The set is closed: it doubles as the audit trail in trade history and
/// as the oracle the tests assert against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    MaxDrawdown,
    MaxTradesExceeded,
    LeverageExceeded,
    DailyLimitReached,
    SymbolBlocked,
}

impl ReasonCode {
    /// Stable code written to storage and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MaxDrawdown => "MAX_DRAWDOWN",
            Self::MaxTradesExceeded => "MAX_TRADES_EXCEEDED",
            Self::LeverageExceeded => "LEVERAGE_EXCEEDED",
            Self::DailyLimitReached => "DAILY_LIMIT_REACHED",
            Self::SymbolBlocked => "SYMBOL_BLOCKED",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl AlertLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trade-history entry for a position the engine closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: Symbol,
    pub side: Side,
    pub entry: Decimal,
    /// Mark price at the time the close was issued.
    pub exit: Decimal,
    pub pnl_percent: Decimal,
    pub reason: ReasonCode,
    pub leverage: Decimal,
    pub size: Decimal,
}

impl TradeRecord {
    /// Build the history entry for closing `position` with `reason`.
    #[must_use]
    pub fn closing(position: &Position, pnl_percent: Decimal, reason: ReasonCode) -> Self {
        Self {
            symbol: position.symbol.clone(),
            side: position.side,
            entry: position.entry_price,
            exit: position.mark_price,
            pnl_percent,
            reason,
            leverage: position.leverage,
            size: position.contracts,
        }
    }
}

/// One step of a cycle's decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Close `size` contracts of one position.
    CloseOne {
        symbol: Symbol,
        side: Side,
        size: Decimal,
        reason: ReasonCode,
    },
    CloseAll {
        reason: ReasonCode,
    },
    BlockSymbolUntil {
        symbol: Symbol,
        until: DateTime<Utc>,
    },
    BlockAccountUntil {
        until: DateTime<Utc>,
    },
    Alert {
        level: AlertLevel,
        message: String,
        context: serde_json::Value,
    },
    RecordTrade(TradeRecord),
}

impl Action {
    /// Convenience constructor for [`Action::Alert`].
    pub fn alert(level: AlertLevel, message: impl Into<String>, context: serde_json::Value) -> Self {
        Self::Alert {
            level,
            message: message.into(),
            context,
        }
    }

    /// Symbol this action is about, if it targets one.
    #[must_use]
    pub fn symbol(&self) -> Option<&Symbol> {
        match self {
            Self::CloseOne { symbol, .. } | Self::BlockSymbolUntil { symbol, .. } => Some(symbol),
            Self::RecordTrade(record) => Some(&record.symbol),
            Self::CloseAll { .. } | Self::BlockAccountUntil { .. } | Self::Alert { .. } => None,
        }
    }

    /// Reason code carried by close actions and trade records.
    #[must_use]
    pub fn reason(&self) -> Option<ReasonCode> {
        match self {
            Self::CloseOne { reason, .. } | Self::CloseAll { reason } => Some(*reason),
            Self::RecordTrade(record) => Some(record.reason),
            _ => None,
        }
    }

    /// Short kind name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CloseOne { .. } => "close_one",
            Self::CloseAll { .. } => "close_all",
            Self::BlockSymbolUntil { .. } => "block_symbol",
            Self::BlockAccountUntil { .. } => "block_account",
            Self::Alert { .. } => "alert",
            Self::RecordTrade(_) => "record_trade",
        }
    }
}
