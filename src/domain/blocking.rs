//! Per-account blocking state and the daily reset boundary.
//!
//! Blocks are plain expiry timestamps. A block is active only while its
//! timestamp is strictly in the future; a block whose timestamp equals
//! "now" has already expired. Expired entries are removed when the state
//! is read ([`BlockingState::purge_expired`]), which is the only reset
//! mechanism: there is no scheduled midnight job.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::id::Symbol;

/// Start of the next calendar day in `tz`, as a UTC instant.
///
/// This is a fixed daily boundary, not a rolling window: a block issued
/// at 23:59 local time expires one minute later. When local midnight does
/// not exist because of a DST gap, the first valid local instant after it
/// is used.
#[must_use]
pub fn next_daily_reset(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let local_date = now.with_timezone(&tz).date_naive();
    let next_date = local_date.succ_opt().unwrap_or(local_date);
    let midnight: NaiveDateTime = next_date.and_time(chrono::NaiveTime::MIN);

    let mut candidate = midnight;
    // DST gaps are at most a couple of hours; step forward until the local
    // time exists.
    for _ in 0..=4 * 60 {
        if let Some(resolved) = tz.from_local_datetime(&candidate).earliest() {
            return resolved.with_timezone(&Utc);
        }
        candidate += Duration::minutes(1);
    }
    Utc.from_utc_datetime(&midnight)
}

/// Account-level and symbol-level blocks for one account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingState {
    /// When set and in the future, the account is skipped entirely.
    pub account_blocked_until: Option<DateTime<Utc>>,
    /// Symbol to unblock instant. Keys are unique.
    pub symbol_blocks: BTreeMap<Symbol, DateTime<Utc>>,
}

impl BlockingState {
    /// Create an empty (fully unblocked) state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the account block is active at `now`.
    #[must_use]
    pub fn is_account_blocked(&self, now: DateTime<Utc>) -> bool {
        self.account_blocked_until.is_some_and(|until| until > now)
    }

    /// Whether `symbol` is under an active block at `now`.
    #[must_use]
    pub fn is_symbol_blocked(&self, symbol: &Symbol, now: DateTime<Utc>) -> bool {
        self.symbol_blocks
            .get(symbol)
            .is_some_and(|until| *until > now)
    }

    /// Block the whole account until `until`.
    pub fn block_account(&mut self, until: DateTime<Utc>) {
        self.account_blocked_until = Some(until);
    }

    /// Block one symbol until `until`, replacing any earlier block.
    pub fn block_symbol(&mut self, symbol: Symbol, until: DateTime<Utc>) {
        self.symbol_blocks.insert(symbol, until);
    }

    /// Remove the account block. Returns whether one was present.
    pub fn clear_account_block(&mut self) -> bool {
        self.account_blocked_until.take().is_some()
    }

    /// Remove one symbol block. Returns whether one was present.
    pub fn clear_symbol_block(&mut self, symbol: &Symbol) -> bool {
        self.symbol_blocks.remove(symbol).is_some()
    }

    /// Drop every block with `until <= now`.
    ///
    /// Returns what was removed so callers can log or alert on it.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> PurgeReport {
        let mut report = PurgeReport::default();

        if let Some(until) = self.account_blocked_until {
            if until <= now {
                self.account_blocked_until = None;
                report.account_unblocked = true;
            }
        }

        let expired: Vec<Symbol> = self
            .symbol_blocks
            .iter()
            .filter(|(_, until)| **until <= now)
            .map(|(symbol, _)| symbol.clone())
            .collect();
        for symbol in expired {
            self.symbol_blocks.remove(&symbol);
            report.symbols_unblocked.push(symbol);
        }

        report
    }

    /// Whether no block of any kind is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.account_blocked_until.is_none() && self.symbol_blocks.is_empty()
    }
}

/// Blocks removed by a [`BlockingState::purge_expired`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub account_unblocked: bool,
    pub symbols_unblocked: Vec<Symbol>,
}

impl PurgeReport {
    /// Whether anything expired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.account_unblocked && self.symbols_unblocked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn reset_is_next_utc_midnight() {
        let now = at("2026-03-14T23:59:00Z");
        assert_eq!(next_daily_reset(now, Tz::UTC), at("2026-03-15T00:00:00Z"));
    }

    #[test]
    fn reset_at_exact_midnight_moves_to_following_day() {
        let now = at("2026-03-15T00:00:00Z");
        assert_eq!(next_daily_reset(now, Tz::UTC), at("2026-03-16T00:00:00Z"));
    }

    #[test]
    fn reset_respects_configured_zone() {
        // 22:30 UTC on 2026-07-01 is already 00:30 on 07-02 in Berlin (UTC+2).
        let now = at("2026-07-01T22:30:00Z");
        let reset = next_daily_reset(now, Tz::Europe__Berlin);
        assert_eq!(reset, at("2026-07-02T22:00:00Z"));
    }

    #[test]
    fn reset_skips_missing_local_midnight() {
        // Santiago springs forward at local midnight on 2026-09-06.
        let now = at("2026-09-05T12:00:00Z");
        let reset = next_daily_reset(now, Tz::America__Santiago);
        let local = reset.with_timezone(&Tz::America__Santiago);
        assert_eq!(local.date_naive().to_string(), "2026-09-06");
        assert!(reset > now);
    }

    #[test]
    fn block_equal_to_now_is_expired() {
        let now = at("2026-03-15T00:00:00Z");
        let mut state = BlockingState::new();
        state.block_account(now);
        state.block_symbol(Symbol::from("ETH/USDT"), now);

        assert!(!state.is_account_blocked(now));
        assert!(!state.is_symbol_blocked(&Symbol::from("ETH/USDT"), now));

        let report = state.purge_expired(now);
        assert!(report.account_unblocked);
        assert_eq!(report.symbols_unblocked, vec![Symbol::from("ETH/USDT")]);
        assert!(state.is_empty());
    }

    #[test]
    fn purge_keeps_future_blocks() {
        let now = at("2026-03-15T10:00:00Z");
        let mut state = BlockingState::new();
        state.block_symbol(Symbol::from("BTC/USDT"), at("2026-03-16T00:00:00Z"));
        state.block_symbol(Symbol::from("SOL/USDT"), at("2026-03-15T09:00:00Z"));

        let report = state.purge_expired(now);

        assert_eq!(report.symbols_unblocked, vec![Symbol::from("SOL/USDT")]);
        assert!(state.is_symbol_blocked(&Symbol::from("BTC/USDT"), now));
        assert_eq!(state.symbol_blocks.len(), 1);
    }
}
