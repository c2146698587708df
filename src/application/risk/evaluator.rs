//! Per-cycle risk policy evaluation.
//!
//! [`PolicyEvaluator::evaluate`] is a pure function of its input: it never
//! reads the clock or touches I/O. The caller applies the returned actions
//! in order and persists the returned blocking state.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::debug;

use super::ordering::select_excess;
use crate::domain::{
    next_daily_reset, AccountMetrics, Action, AlertLevel, BlockingState, Position, ReasonCode,
    RiskParams, TradeRecord,
};

/// Everything one evaluation needs.
#[derive(Debug, Clone)]
pub struct EvaluationInput<'a> {
    pub risk_params: &'a RiskParams,
    pub blocking: BlockingState,
    pub balance: Decimal,
    pub initial_balance: Decimal,
    pub positions: &'a [Position],
    pub now: DateTime<Utc>,
}

/// Decision for one account and one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Actions to apply, in order.
    pub actions: Vec<Action>,
    /// Blocking state to persist.
    pub blocking: BlockingState,
    /// The account tripped its max drawdown and must stop being monitored
    /// until the account block expires.
    pub deactivate_account: bool,
    /// Absent when the account-block gate skipped the cycle.
    pub metrics: Option<AccountMetrics>,
}

impl Evaluation {
    fn skipped(blocking: BlockingState) -> Self {
        Self {
            actions: Vec::new(),
            blocking,
            deactivate_account: false,
            metrics: None,
        }
    }

    /// Whether the account-block gate short-circuited the cycle.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.metrics.is_none()
    }
}

/// Account drawdown in percent relative to the activation balance.
///
/// Without a positive baseline there is nothing to measure against and
/// the drawdown is reported as zero.
#[must_use]
pub fn total_drawdown_percent(balance: Decimal, initial_balance: Decimal) -> Decimal {
    if initial_balance <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (balance - initial_balance) / initial_balance * Decimal::ONE_HUNDRED
}

/// Turns an account snapshot into an ordered action list.
#[derive(Debug, Clone, Copy)]
pub struct PolicyEvaluator {
    timezone: Tz,
}

impl Default for PolicyEvaluator {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl PolicyEvaluator {
    /// Create an evaluator whose daily reset follows `timezone`.
    #[must_use]
    pub const fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Evaluate one account snapshot.
    ///
    /// Steps, in order:
    /// 1. account-block gate (skip everything while blocked),
    /// 2. account drawdown (close all, block the account, stop),
    /// 3. excess open trades (close the newest),
    /// 4. per-position leverage, daily-loss and blocked-symbol checks.
    #[must_use]
    pub fn evaluate(&self, input: EvaluationInput<'_>) -> Evaluation {
        let EvaluationInput {
            risk_params,
            mut blocking,
            balance,
            initial_balance,
            positions,
            now,
        } = input;

        if blocking.is_account_blocked(now) {
            debug!(until = ?blocking.account_blocked_until, "Account blocked, skipping evaluation");
            return Evaluation::skipped(blocking);
        }
        blocking.purge_expired(now);

        let drawdown = total_drawdown_percent(balance, initial_balance);
        let metrics = AccountMetrics {
            balance,
            initial_balance,
            total_drawdown_percent: drawdown,
            open_positions: positions.len(),
            recorded_at: now,
        };
        let reset_at = next_daily_reset(now, self.timezone);
        let mut actions = Vec::new();

        if drawdown <= risk_params.account_loss_threshold() {
            actions.push(Action::alert(
                AlertLevel::Critical,
                format!(
                    "Max drawdown reached: {}% (limit {}%). Closing all positions.",
                    drawdown.round_dp(2),
                    risk_params.max_drawdown_limit
                ),
                json!({
                    "balance": balance,
                    "initial_balance": initial_balance,
                    "drawdown_percent": drawdown,
                    "limit_percent": risk_params.max_drawdown_limit,
                }),
            ));
            actions.push(Action::CloseAll {
                reason: ReasonCode::MaxDrawdown,
            });
            actions.push(Action::BlockAccountUntil { until: reset_at });
            blocking.block_account(reset_at);

            return Evaluation {
                actions,
                blocking,
                deactivate_account: true,
                metrics: Some(metrics),
            };
        }

        let max_open = usize::try_from(risk_params.max_open_trades).unwrap_or(usize::MAX);
        for index in select_excess(positions, max_open) {
            let position = &positions[index];
            actions.push(Action::CloseOne {
                symbol: position.symbol.clone(),
                side: position.side,
                size: position.contracts,
                reason: ReasonCode::MaxTradesExceeded,
            });
            actions.push(Action::RecordTrade(TradeRecord::closing(
                position,
                position.pnl_percent(),
                ReasonCode::MaxTradesExceeded,
            )));
        }

        // Positions closed above are still checked: the snapshot is only
        // refreshed next cycle.
        for position in positions {
            self.check_position(position, risk_params, reset_at, now, &mut blocking, &mut actions);
        }

        Evaluation {
            actions,
            blocking,
            deactivate_account: false,
            metrics: Some(metrics),
        }
    }

    fn check_position(
        &self,
        position: &Position,
        risk_params: &RiskParams,
        reset_at: DateTime<Utc>,
        now: DateTime<Utc>,
        blocking: &mut BlockingState,
        actions: &mut Vec<Action>,
    ) {
        let pnl = position.pnl_percent();
        let context = json!({
            "symbol": position.symbol,
            "side": position.side,
            "leverage": position.leverage,
            "pnl_percent": pnl,
            "entry_price": position.entry_price,
            "mark_price": position.mark_price,
        });

        let reason = if position.leverage > risk_params.max_leverage {
            actions.push(Action::alert(
                AlertLevel::Warning,
                format!(
                    "Leverage {}x on {} exceeds limit {}x. Closing position.",
                    position.leverage, position.symbol, risk_params.max_leverage
                ),
                context,
            ));
            ReasonCode::LeverageExceeded
        } else if pnl <= risk_params.daily_loss_threshold() {
            actions.push(Action::alert(
                AlertLevel::Critical,
                format!(
                    "Daily loss limit reached on {}: {}% (limit {}%). Closing position.",
                    position.symbol,
                    pnl.round_dp(2),
                    risk_params.daily_drawdown_limit
                ),
                context.clone(),
            ));
            self.push_close(position, pnl, ReasonCode::DailyLimitReached, actions);
            actions.push(Action::BlockSymbolUntil {
                symbol: position.symbol.clone(),
                until: reset_at,
            });
            actions.push(Action::alert(
                AlertLevel::Warning,
                format!("{} blocked until {}", position.symbol, reset_at.to_rfc3339()),
                json!({ "symbol": position.symbol, "until": reset_at }),
            ));
            blocking.block_symbol(position.symbol.clone(), reset_at);
            return;
        } else if blocking.is_symbol_blocked(&position.symbol, now) {
            actions.push(Action::alert(
                AlertLevel::Warning,
                format!(
                    "Position opened on blocked symbol {}. Closing position.",
                    position.symbol
                ),
                context,
            ));
            ReasonCode::SymbolBlocked
        } else {
            return;
        };

        self.push_close(position, pnl, reason, actions);
    }

    fn push_close(
        &self,
        position: &Position,
        pnl: Decimal,
        reason: ReasonCode,
        actions: &mut Vec<Action>,
    ) {
        actions.push(Action::CloseOne {
            symbol: position.symbol.clone(),
            side: position.side,
            size: position.contracts,
            reason,
        });
        actions.push(Action::RecordTrade(TradeRecord::closing(position, pnl, reason)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Side, Symbol};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 15, 30, 0).unwrap()
    }

    fn params() -> RiskParams {
        RiskParams::try_new(dec!(5), dec!(10), dec!(20), 3).unwrap()
    }

    fn long(symbol: &str, entry: Decimal, mark: Decimal, leverage: Decimal) -> Position {
        Position {
            symbol: Symbol::from(symbol),
            side: Side::Long,
            leverage,
            entry_price: entry,
            mark_price: mark,
            contracts: dec!(2),
            opened_at: now() - chrono::Duration::hours(1),
            reported_pnl_percent: None,
        }
    }

    fn evaluate(blocking: BlockingState, balance: Decimal, positions: &[Position]) -> Evaluation {
        let params = params();
        PolicyEvaluator::default().evaluate(EvaluationInput {
            risk_params: &params,
            blocking,
            balance,
            initial_balance: dec!(1000),
            positions,
            now: now(),
        })
    }

    #[test]
    fn drawdown_is_relative_to_initial_balance() {
        assert_eq!(total_drawdown_percent(dec!(900), dec!(1000)), dec!(-10));
        assert_eq!(total_drawdown_percent(dec!(900), dec!(0)), Decimal::ZERO);
    }

    #[test]
    fn quiet_snapshot_produces_only_metrics() {
        let positions = vec![long("BTC/USDT", dec!(100), dec!(101), dec!(3))];
        let eval = evaluate(BlockingState::new(), dec!(1010), &positions);

        assert!(eval.actions.is_empty());
        assert!(!eval.deactivate_account);
        let metrics = eval.metrics.unwrap();
        assert_eq!(metrics.total_drawdown_percent, dec!(1));
        assert_eq!(metrics.open_positions, 1);
    }

    #[test]
    fn daily_block_targets_next_midnight() {
        let positions = vec![long("ETH/USDT", dec!(100), dec!(94), dec!(1))];
        let eval = evaluate(BlockingState::new(), dec!(1000), &positions);

        let midnight = Utc.with_ymd_and_hms(2026, 5, 5, 0, 0, 0).unwrap();
        assert!(eval.actions.contains(&Action::BlockSymbolUntil {
            symbol: Symbol::from("ETH/USDT"),
            until: midnight,
        }));
        assert_eq!(
            eval.blocking.symbol_blocks.get(&Symbol::from("ETH/USDT")),
            Some(&midnight)
        );
    }

    #[test]
    fn daily_trip_emits_actions_in_order() {
        let positions = vec![long("ETH/USDT", dec!(100), dec!(94), dec!(1))];
        let eval = evaluate(BlockingState::new(), dec!(1000), &positions);

        let kinds: Vec<&str> = eval.actions.iter().map(Action::kind).collect();
        assert_eq!(
            kinds,
            vec!["alert", "close_one", "record_trade", "block_symbol", "alert"]
        );
        assert!(matches!(
            eval.actions[0],
            Action::Alert { level: AlertLevel::Critical, .. }
        ));
        assert!(matches!(
            eval.actions[4],
            Action::Alert { level: AlertLevel::Warning, .. }
        ));
    }

    #[test]
    fn expired_symbol_block_is_purged_and_ignored() {
        let mut blocking = BlockingState::new();
        blocking.block_symbol(Symbol::from("BTC/USDT"), now());
        let positions = vec![long("BTC/USDT", dec!(100), dec!(100), dec!(1))];

        let eval = evaluate(blocking, dec!(1000), &positions);

        assert!(eval.actions.is_empty());
        assert!(eval.blocking.symbol_blocks.is_empty());
    }

    #[test]
    fn second_position_on_freshly_blocked_symbol_is_closed_as_blocked() {
        let positions = vec![
            long("ETH/USDT", dec!(100), dec!(90), dec!(1)),
            long("ETH/USDT", dec!(100), dec!(99), dec!(1)),
        ];
        let eval = evaluate(BlockingState::new(), dec!(1000), &positions);

        let reasons: Vec<ReasonCode> = eval
            .actions
            .iter()
            .filter(|a| matches!(a, Action::CloseOne { .. }))
            .filter_map(Action::reason)
            .collect();
        assert_eq!(
            reasons,
            vec![ReasonCode::DailyLimitReached, ReasonCode::SymbolBlocked]
        );
    }

    #[test]
    fn drawdown_trip_deactivates_and_blocks_account() {
        let positions = vec![long("BTC/USDT", dec!(100), dec!(50), dec!(30))];
        let eval = evaluate(BlockingState::new(), dec!(850), &positions);

        assert!(eval.deactivate_account);
        assert_eq!(eval.actions.len(), 3);
        let midnight = Utc.with_ymd_and_hms(2026, 5, 5, 0, 0, 0).unwrap();
        assert_eq!(eval.blocking.account_blocked_until, Some(midnight));
    }
}
