//! Builders for domain primitives used across tests.
//!
//! Provides concise factory functions for [`Position`], [`RiskParams`]
//! and [`Account`] so tests focus on assertions rather than construction
//! boilerplate.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::domain::{Account, AccountId, Position, RiskParams, Side, Symbol};

/// Parse an RFC 3339 instant.
///
/// # Panics
/// Panics on malformed input; test helper only.
pub fn at(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .unwrap_or_else(|e| panic!("bad timestamp {raw}: {e}"))
        .with_timezone(&Utc)
}

/// Risk parameters with the given limits.
///
/// # Panics
/// Panics if a limit is negative.
pub fn params(daily: Decimal, max: Decimal, leverage: Decimal, max_open_trades: u32) -> RiskParams {
    RiskParams::try_new(daily, max, leverage, max_open_trades)
        .unwrap_or_else(|e| panic!("invalid test params: {e}"))
}

/// 5% daily, 10% total, 20x leverage, 3 open trades.
pub fn default_params() -> RiskParams {
    params(
        Decimal::new(5, 0),
        Decimal::new(10, 0),
        Decimal::new(20, 0),
        3,
    )
}

/// An active account with an empty blocking state on the paper exchange.
pub fn account(id: &str, risk_params: RiskParams, initial_balance: Decimal) -> Account {
    Account::activated(AccountId::from(id), "paper", risk_params, initial_balance)
}

/// Start building a long, 1x, flat position on `symbol`.
pub fn position(symbol: &str) -> PositionBuilder {
    PositionBuilder::new(symbol)
}

/// Fluent builder for [`Position`].
///
/// Defaults: long, leverage 1, entry and mark 100, one contract, opened
/// at the Unix epoch, no exchange-reported P&L.
#[derive(Debug, Clone)]
pub struct PositionBuilder {
    position: Position,
}

impl PositionBuilder {
    pub fn new(symbol: &str) -> Self {
        let hundred = Decimal::ONE_HUNDRED;
        Self {
            position: Position {
                symbol: Symbol::from(symbol),
                side: Side::Long,
                leverage: Decimal::ONE,
                entry_price: hundred,
                mark_price: hundred,
                contracts: Decimal::ONE,
                opened_at: DateTime::<Utc>::UNIX_EPOCH,
                reported_pnl_percent: None,
            },
        }
    }

    #[must_use]
    pub fn short(mut self) -> Self {
        self.position.side = Side::Short;
        self
    }

    #[must_use]
    pub fn leverage(mut self, leverage: Decimal) -> Self {
        self.position.leverage = leverage;
        self
    }

    #[must_use]
    pub fn entry(mut self, price: Decimal) -> Self {
        self.position.entry_price = price;
        self
    }

    #[must_use]
    pub fn mark(mut self, price: Decimal) -> Self {
        self.position.mark_price = price;
        self
    }

    #[must_use]
    pub fn contracts(mut self, contracts: Decimal) -> Self {
        self.position.contracts = contracts;
        self
    }

    /// Exchange-reported P&L percent.
    #[must_use]
    pub fn pnl(mut self, percent: Decimal) -> Self {
        self.position.reported_pnl_percent = Some(percent);
        self
    }

    #[must_use]
    pub fn opened_at(mut self, opened_at: DateTime<Utc>) -> Self {
        self.position.opened_at = opened_at;
        self
    }

    /// Opened `seconds` after the Unix epoch, for ordering tests.
    #[must_use]
    pub fn opened_secs(self, seconds: i64) -> Self {
        self.opened_at(DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(seconds))
    }

    pub fn build(self) -> Position {
        self.position
    }
}

impl From<PositionBuilder> for Position {
    fn from(builder: PositionBuilder) -> Self {
        builder.build()
    }
}
