//! SQLite persistence through the store and sink ports.

use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use riskguard::adapter::outbound::sqlite::database::connection::open;
use riskguard::adapter::outbound::sqlite::{SqliteAccountStore, SqliteReportSink};
use riskguard::application::monitor::{CycleRunner, CycleTimeouts, MonitoredAccount};
use riskguard::application::risk::PolicyEvaluator;
use riskguard::domain::{AccountId, Symbol};
use riskguard::error::Error;
use riskguard::port::{AccountStore, Credentials};
use riskguard::testkit::domain::{account, at, default_params, position};
use riskguard::testkit::exchange::ScriptedExchange;
use rust_decimal_macros::dec;
use tempfile::TempDir;

fn database(dir: &TempDir) -> String {
    dir.path().join("riskguard.db").to_string_lossy().to_string()
}

#[tokio::test]
async fn blocking_state_round_trip_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let store = SqliteAccountStore::new(open(&database(&dir)).unwrap());
    let now = at("2026-03-10T12:34:56.789123Z");

    let mut acct = account("main", default_params(), dec!(1234.5678));
    acct.blocking.block_account(now + ChronoDuration::hours(11));
    acct.blocking
        .block_symbol(Symbol::from("BTC/USDT"), at("2026-03-11T00:00:00Z"));
    acct.blocking
        .block_symbol(Symbol::from("ETH-PERP"), at("2026-03-11T00:00:00.000001Z"));
    store.save_account(&acct).await.unwrap();

    let id = AccountId::from("main");
    let loaded = store.load_blocking_state(&id).await.unwrap();
    store.save_blocking_state(&id, &loaded).await.unwrap();

    assert_eq!(store.load_blocking_state(&id).await.unwrap(), acct.blocking);
    assert_eq!(store.load_account(&id).await.unwrap(), Some(acct));
}

#[tokio::test]
async fn blocking_state_of_unknown_account_is_an_error() {
    let dir = TempDir::new().unwrap();
    let store = SqliteAccountStore::new(open(&database(&dir)).unwrap());

    let result = store.load_blocking_state(&AccountId::from("ghost")).await;

    assert!(matches!(result, Err(Error::AccountNotFound(_))));
}

#[tokio::test]
async fn state_survives_reopening_the_database() {
    let dir = TempDir::new().unwrap();
    let mut acct = account("main", default_params(), dec!(1000));
    acct.is_active = false;
    acct.blocking.block_account(at("2026-03-11T00:00:00Z"));

    {
        let store = SqliteAccountStore::new(open(&database(&dir)).unwrap());
        store.save_account(&acct).await.unwrap();
    }

    let reopened = SqliteAccountStore::new(open(&database(&dir)).unwrap());
    let accounts = reopened.list_accounts().await.unwrap();
    assert_eq!(accounts, vec![acct]);
}

#[tokio::test]
async fn cycle_against_sqlite_records_history() {
    let dir = TempDir::new().unwrap();
    let pool = open(&database(&dir)).unwrap();
    let store = Arc::new(SqliteAccountStore::new(pool.clone()));
    let sink = Arc::new(SqliteReportSink::new(pool));
    store
        .save_account(&account("main", default_params(), dec!(1000)))
        .await
        .unwrap();

    let exchange = Arc::new(ScriptedExchange::new(dec!(990)).with_positions([position("BTC/USDT")
        .entry(dec!(100))
        .mark(dec!(93))
        .build()]));
    let runner = CycleRunner::new(
        store.clone(),
        sink.clone(),
        PolicyEvaluator::default(),
        CycleTimeouts::default(),
    );
    let target = MonitoredAccount {
        id: AccountId::from("main"),
        credentials: Credentials::new("key", "secret"),
        client: exchange.clone(),
    };

    runner
        .run(&target, at("2026-03-10T12:00:00Z"))
        .await
        .unwrap();

    let id = AccountId::from("main");
    let trades = sink.recent_trades(&id, 10).unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].trade.symbol, Symbol::from("BTC/USDT"));
    assert_eq!(trades[0].trade.exit, dec!(93));

    let metrics = sink.latest_metrics(&id).unwrap().unwrap();
    assert_eq!(metrics.balance, dec!(990));
    assert_eq!(metrics.total_drawdown_percent, dec!(-1));

    let alerts = sink.recent_alerts(&id, 10).unwrap();
    assert!(alerts.iter().any(|a| a.level == "critical"));
    assert!(alerts
        .iter()
        .any(|a| a.message.starts_with("BTC/USDT blocked until")));

    let stored = store.load_account(&id).await.unwrap().unwrap();
    assert!(stored
        .blocking
        .is_symbol_blocked(&Symbol::from("BTC/USDT"), at("2026-03-10T23:59:59Z")));
}
