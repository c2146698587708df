//! Policy evaluator properties.

use chrono::{DateTime, Duration, Utc};
use riskguard::application::risk::{Evaluation, EvaluationInput, PolicyEvaluator};
use riskguard::domain::{
    next_daily_reset, Action, AlertLevel, BlockingState, Position, ReasonCode, RiskParams, Symbol,
};
use riskguard::testkit::domain::{at, default_params, params, position};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn evaluate(
    risk: &RiskParams,
    blocking: BlockingState,
    balance: Decimal,
    positions: &[Position],
    now: DateTime<Utc>,
) -> Evaluation {
    PolicyEvaluator::default().evaluate(EvaluationInput {
        risk_params: risk,
        blocking,
        balance,
        initial_balance: dec!(1000),
        positions,
        now,
    })
}

fn closes(actions: &[Action]) -> Vec<(String, ReasonCode)> {
    actions
        .iter()
        .filter_map(|action| match action {
            Action::CloseOne { symbol, reason, .. } => Some((symbol.to_string(), *reason)),
            _ => None,
        })
        .collect()
}

fn mentions(action: &Action, symbol: &str) -> bool {
    match action {
        Action::CloseOne { symbol: s, .. } | Action::BlockSymbolUntil { symbol: s, .. } => {
            s.as_str() == symbol
        }
        Action::RecordTrade(trade) => trade.symbol.as_str() == symbol,
        Action::Alert { message, .. } => message.contains(symbol),
        Action::CloseAll { .. } | Action::BlockAccountUntil { .. } => false,
    }
}

#[test]
fn account_block_gate_yields_nothing() {
    let now = at("2026-03-10T12:00:00Z");
    let mut blocking = BlockingState::new();
    blocking.block_account(now + Duration::hours(6));
    blocking.block_symbol(Symbol::from("ETH/USDT"), now - Duration::hours(1));

    let positions = vec![position("BTC/USDT").leverage(dec!(50)).build()];
    let evaluation = evaluate(&default_params(), blocking.clone(), dec!(500), &positions, now);

    assert!(evaluation.actions.is_empty());
    assert!(evaluation.is_skipped());
    assert!(!evaluation.deactivate_account);
    // The gate runs before the purge, so the expired symbol block is untouched.
    assert_eq!(evaluation.blocking, blocking);
}

#[test]
fn max_drawdown_closes_everything_and_stops() {
    let now = at("2026-03-10T12:00:00Z");
    let positions = vec![
        position("BTC/USDT").leverage(dec!(50)).build(),
        position("ETH/USDT").entry(dec!(100)).mark(dec!(80)).build(),
        position("SOL/USDT").opened_secs(10).build(),
        position("XRP/USDT").opened_secs(20).build(),
        position("ADA/USDT").opened_secs(30).build(),
    ];

    let evaluation = evaluate(&default_params(), BlockingState::new(), dec!(899), &positions, now);

    assert_eq!(evaluation.actions.len(), 3);
    assert!(matches!(
        evaluation.actions[0],
        Action::Alert {
            level: AlertLevel::Critical,
            ..
        }
    ));
    assert_eq!(
        evaluation.actions[1],
        Action::CloseAll {
            reason: ReasonCode::MaxDrawdown
        }
    );
    let reset = next_daily_reset(now, chrono_tz::UTC);
    assert_eq!(evaluation.actions[2], Action::BlockAccountUntil { until: reset });
    assert!(evaluation.deactivate_account);
    assert_eq!(evaluation.blocking.account_blocked_until, Some(reset));
}

#[test]
fn drawdown_exactly_at_limit_trips() {
    let now = at("2026-03-10T12:00:00Z");
    let evaluation = evaluate(&default_params(), BlockingState::new(), dec!(900), &[], now);
    assert!(evaluation.deactivate_account);
}

#[test]
fn excess_trades_close_the_newest() {
    let now = at("2026-03-10T12:00:00Z");
    let positions: Vec<Position> = (0..6)
        .map(|i| position(&format!("S{i}/USDT")).opened_secs(100 + i).build())
        .collect();

    let evaluation = evaluate(&default_params(), BlockingState::new(), dec!(1000), &positions, now);

    assert_eq!(
        closes(&evaluation.actions),
        vec![
            ("S5/USDT".to_string(), ReasonCode::MaxTradesExceeded),
            ("S4/USDT".to_string(), ReasonCode::MaxTradesExceeded),
            ("S3/USDT".to_string(), ReasonCode::MaxTradesExceeded),
        ]
    );
    let trades = evaluation
        .actions
        .iter()
        .filter(|a| matches!(a, Action::RecordTrade(t) if t.reason == ReasonCode::MaxTradesExceeded))
        .count();
    assert_eq!(trades, 3);
    for oldest in ["S0/USDT", "S1/USDT", "S2/USDT"] {
        assert!(!evaluation.actions.iter().any(|a| mentions(a, oldest)));
    }
}

#[test]
fn excess_close_carries_the_selected_size() {
    let now = at("2026-03-10T12:00:00Z");
    let positions = vec![
        position("BTC/USDT").contracts(dec!(1)).opened_secs(100).build(),
        position("BTC/USDT").contracts(dec!(5)).opened_secs(200).build(),
    ];

    let evaluation = evaluate(
        &params(dec!(5), dec!(10), dec!(20), 1),
        BlockingState::new(),
        dec!(1000),
        &positions,
        now,
    );

    assert!(matches!(
        &evaluation.actions[0],
        Action::CloseOne { size, reason: ReasonCode::MaxTradesExceeded, .. } if *size == dec!(5)
    ));
}

#[test]
fn leverage_breach_closes_without_daily_or_blocked_actions() {
    let now = at("2026-03-10T12:00:00Z");
    let mut blocking = BlockingState::new();
    blocking.block_symbol(Symbol::from("BTC/USDT"), now + Duration::hours(2));
    let positions = vec![position("BTC/USDT")
        .leverage(dec!(25))
        .entry(dec!(100))
        .mark(dec!(90))
        .build()];

    let evaluation = evaluate(&default_params(), blocking, dec!(1000), &positions, now);

    assert_eq!(
        closes(&evaluation.actions),
        vec![("BTC/USDT".to_string(), ReasonCode::LeverageExceeded)]
    );
    assert!(!evaluation
        .actions
        .iter()
        .any(|a| matches!(a, Action::BlockSymbolUntil { .. })));
}

#[test]
fn daily_loss_closes_and_blocks_until_midnight() {
    let now = at("2026-03-10T12:00:00Z");
    let positions = vec![position("BTC/USDT").entry(dec!(100)).mark(dec!(94)).build()];

    let evaluation = evaluate(&default_params(), BlockingState::new(), dec!(1000), &positions, now);

    let midnight = at("2026-03-11T00:00:00Z");
    assert_eq!(
        closes(&evaluation.actions),
        vec![("BTC/USDT".to_string(), ReasonCode::DailyLimitReached)]
    );
    assert!(evaluation.actions.contains(&Action::BlockSymbolUntil {
        symbol: Symbol::from("BTC/USDT"),
        until: midnight,
    }));
    assert_eq!(
        evaluation.blocking.symbol_blocks.get(&Symbol::from("BTC/USDT")),
        Some(&midnight)
    );
}

#[test]
fn daily_reset_follows_configured_zone() {
    let now = at("2026-03-10T12:00:00Z");
    let positions = vec![position("BTC/USDT").pnl(dec!(-7)).build()];
    let risk = default_params();

    let evaluation = PolicyEvaluator::new(chrono_tz::America::New_York).evaluate(EvaluationInput {
        risk_params: &risk,
        blocking: BlockingState::new(),
        balance: dec!(1000),
        initial_balance: dec!(1000),
        positions: &positions,
        now,
    });

    // New York is on EDT (UTC-4) from 2026-03-08.
    assert_eq!(
        evaluation.blocking.symbol_blocks.get(&Symbol::from("BTC/USDT")),
        Some(&at("2026-03-11T04:00:00Z"))
    );
}

#[test]
fn blocked_symbol_without_positions_is_idempotent() {
    let now = at("2026-03-10T12:00:00Z");
    let mut blocking = BlockingState::new();
    blocking.block_symbol(Symbol::from("BTC/USDT"), now + Duration::hours(3));
    let positions = vec![position("ETH/USDT").build()];

    let evaluation = evaluate(&default_params(), blocking.clone(), dec!(1000), &positions, now);

    assert!(!evaluation.actions.iter().any(|a| mentions(a, "BTC/USDT")));
    assert_eq!(evaluation.blocking, blocking);
}

#[test]
fn reopened_position_on_blocked_symbol_is_closed() {
    let now = at("2026-03-10T12:00:00Z");
    let mut blocking = BlockingState::new();
    blocking.block_symbol(Symbol::from("BTC/USDT"), now + Duration::hours(3));
    let positions = vec![position("BTC/USDT").build()];

    let evaluation = evaluate(&default_params(), blocking, dec!(1000), &positions, now);

    assert_eq!(
        closes(&evaluation.actions),
        vec![("BTC/USDT".to_string(), ReasonCode::SymbolBlocked)]
    );
}

#[test]
fn block_expiring_exactly_now_is_expired() {
    let now = at("2026-03-11T00:00:00Z");
    let mut blocking = BlockingState::new();
    blocking.block_symbol(Symbol::from("BTC/USDT"), now);
    blocking.block_account(now);
    let positions = vec![position("BTC/USDT").build()];

    let evaluation = evaluate(&default_params(), blocking, dec!(1000), &positions, now);

    assert!(!evaluation.is_skipped());
    assert!(evaluation.actions.is_empty());
    assert!(evaluation.blocking.is_empty());
}

#[test]
fn healthy_account_produces_metrics_only() {
    let now = at("2026-03-10T12:00:00Z");
    let positions = vec![position("BTC/USDT").entry(dec!(100)).mark(dec!(103)).build()];

    let evaluation = evaluate(
        &params(dec!(5), dec!(10), dec!(20), 3),
        BlockingState::new(),
        dec!(1030),
        &positions,
        now,
    );

    assert!(evaluation.actions.is_empty());
    let metrics = evaluation.metrics.expect("metrics for an evaluated cycle");
    assert_eq!(metrics.total_drawdown_percent, dec!(3));
    assert_eq!(metrics.open_positions, 1);
}
