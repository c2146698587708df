//! Open position snapshot types.
//!
//! A [`Position`] is a transient, per-cycle value: the snapshot provider
//! supplies a fresh list every cycle and the engine never persists it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::Symbol;

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Profits when the mark price rises.
    Long,
    /// Profits when the mark price falls.
    Short,
}

impl Side {
    /// Stable lowercase name used in storage and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }

    /// Order side that reduces a position of this side.
    #[must_use]
    pub const fn closing_order_side(self) -> &'static str {
        match self {
            Self::Long => "sell",
            Self::Short => "buy",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "long" | "buy" => Ok(Self::Long),
            "short" | "sell" => Ok(Self::Short),
            other => Err(DomainError::UnknownSide(other.to_string())),
        }
    }
}

/// Resolve when a position was opened from the fields an exchange reports.
///
/// The chain is fixed: the millisecond timestamp wins, then the ISO-8601
/// datetime string, and when neither parses the position is treated as
/// opened at the Unix epoch. An epoch fallback sorts as the *oldest*
/// position, so it is never preferred for excess-trade trimming.
#[must_use]
pub fn resolve_opened_at(timestamp_ms: Option<i64>, datetime: Option<&str>) -> DateTime<Utc> {
    if let Some(ts) = timestamp_ms.and_then(|ms| Utc.timestamp_millis_opt(ms).single()) {
        return ts;
    }
    if let Some(ts) = datetime.and_then(|raw| DateTime::parse_from_rfc3339(raw).ok()) {
        return ts.with_timezone(&Utc);
    }
    DateTime::<Utc>::UNIX_EPOCH
}

/// One open trade as reported by the exchange for the current cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    pub side: Side,
    pub leverage: Decimal,
    pub entry_price: Decimal,
    pub mark_price: Decimal,
    /// Position size; strictly positive for an open position.
    pub contracts: Decimal,
    pub opened_at: DateTime<Utc>,
    /// Exchange-computed P&L percent. Authoritative when present and non-zero.
    pub reported_pnl_percent: Option<Decimal>,
}

impl Position {
    /// Whether the snapshot describes a position that is actually open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.contracts > Decimal::ZERO
    }

    /// Trade P&L in percent.
    ///
    /// Uses the exchange-reported figure when it is present and non-zero,
    /// otherwise derives it from entry and mark price scaled by leverage.
    /// Fees and funding are not included. A zero entry price yields zero.
    #[must_use]
    pub fn pnl_percent(&self) -> Decimal {
        if let Some(reported) = self.reported_pnl_percent {
            if !reported.is_zero() {
                return reported;
            }
        }
        if self.entry_price.is_zero() {
            return Decimal::ZERO;
        }
        let hundred = Decimal::ONE_HUNDRED;
        let move_pct = match self.side {
            Side::Long => (self.mark_price - self.entry_price) / self.entry_price,
            Side::Short => (self.entry_price - self.mark_price) / self.entry_price,
        };
        move_pct * hundred * self.leverage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(side: Side, entry: Decimal, mark: Decimal, leverage: Decimal) -> Position {
        Position {
            symbol: Symbol::from("BTC/USDT"),
            side,
            leverage,
            entry_price: entry,
            mark_price: mark,
            contracts: dec!(1),
            opened_at: DateTime::<Utc>::UNIX_EPOCH,
            reported_pnl_percent: None,
        }
    }

    #[test]
    fn long_pnl_is_derived_from_prices() {
        let p = position(Side::Long, dec!(100), dec!(94), dec!(1));
        assert_eq!(p.pnl_percent(), dec!(-6));
    }

    #[test]
    fn short_pnl_scales_with_leverage() {
        let p = position(Side::Short, dec!(100), dec!(98), dec!(5));
        assert_eq!(p.pnl_percent(), dec!(10));
    }

    #[test]
    fn reported_pnl_wins_when_nonzero() {
        let mut p = position(Side::Long, dec!(100), dec!(94), dec!(1));
        p.reported_pnl_percent = Some(dec!(-2.5));
        assert_eq!(p.pnl_percent(), dec!(-2.5));
    }

    #[test]
    fn zero_reported_pnl_falls_back_to_prices() {
        let mut p = position(Side::Long, dec!(100), dec!(110), dec!(2));
        p.reported_pnl_percent = Some(Decimal::ZERO);
        assert_eq!(p.pnl_percent(), dec!(20));
    }

    #[test]
    fn zero_entry_price_yields_zero_pnl() {
        let p = position(Side::Long, dec!(0), dec!(10), dec!(3));
        assert_eq!(p.pnl_percent(), Decimal::ZERO);
    }

    #[test]
    fn opened_at_prefers_timestamp_then_datetime_then_epoch() {
        let from_ts = resolve_opened_at(Some(1_700_000_000_000), Some("2020-01-01T00:00:00Z"));
        assert_eq!(from_ts.timestamp_millis(), 1_700_000_000_000);

        let from_dt = resolve_opened_at(None, Some("2020-01-01T00:00:00Z"));
        assert_eq!(from_dt.to_rfc3339(), "2020-01-01T00:00:00+00:00");

        let fallback = resolve_opened_at(None, Some("not a date"));
        assert_eq!(fallback, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn side_parses_order_aliases() {
        assert_eq!("SELL".parse::<Side>().unwrap(), Side::Short);
        assert_eq!("long".parse::<Side>().unwrap(), Side::Long);
        assert!("flat".parse::<Side>().is_err());
    }
}
