//! Handler for the `status` command.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use crate::adapter::inbound::cli::command::StatusArgs;
use crate::adapter::inbound::cli::output;
use crate::adapter::outbound::sqlite::AlertEntry;
use crate::application::monitor::load_refreshed;
use crate::domain::{Account, AccountId, AccountMetrics};
use crate::error::{Error, Result};
use crate::infrastructure::bootstrap::{open_storage, Storage};
use crate::infrastructure::config::Config;
use crate::port::AccountStore;

/// One account as shown by `status`.
#[derive(Debug)]
struct AccountStatus {
    account: Account,
    metrics: Option<AccountMetrics>,
    alerts: Vec<AlertEntry>,
}

/// Execute the status command.
///
/// Reads go through lazy expiry, so blocks that have lapsed are purged and
/// written back before they are shown.
pub async fn execute(args: &StatusArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    let db_path = Path::new(&config.database);

    if !db_path.exists() {
        if output::is_json() {
            output::json_document(&json!({
                "command": "status",
                "database": config.database,
                "status": "missing_database",
            }));
        } else {
            output::warning(&format!("Database not found ({})", config.database));
            output::note("Run `riskguard run` to activate accounts and create the database.");
        }
        return Ok(());
    }

    let storage = open_storage(&config)?;
    let now = Utc::now();
    let statuses = collect(&storage, args, now).await?;

    if output::is_json() {
        output::json_document(&json!({
            "command": "status",
            "database": config.database,
            "status": "ok",
            "accounts": statuses.iter().map(|s| status_to_json(s, now)).collect::<Vec<_>>(),
        }));
        return Ok(());
    }
    if output::is_quiet() {
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Database", &config.database);
    output::field("Accounts", statuses.len());
    if statuses.is_empty() {
        output::note("No accounts have been activated yet.");
    }
    for status in &statuses {
        display(status, now);
    }
    Ok(())
}

async fn collect(storage: &Storage, args: &StatusArgs, now: DateTime<Utc>) -> Result<Vec<AccountStatus>> {
    let store: &dyn AccountStore = storage.store.as_ref();

    let ids = match &args.account {
        Some(raw) => vec![AccountId::try_new(raw.as_str())?],
        None => store
            .list_accounts()
            .await?
            .into_iter()
            .map(|account| account.id)
            .collect(),
    };

    let mut statuses = Vec::with_capacity(ids.len());
    for id in ids {
        let account = load_refreshed(store, &id, now)
            .await?
            .ok_or_else(|| Error::AccountNotFound(id.to_string()))?;
        statuses.push(AccountStatus {
            metrics: storage.sink.latest_metrics(&id)?,
            alerts: storage.sink.recent_alerts(&id, args.alerts)?,
            account,
        });
    }
    Ok(statuses)
}

fn state_label(account: &Account, now: DateTime<Utc>) -> &'static str {
    if account.blocking.is_account_blocked(now) {
        "blocked"
    } else if account.is_active {
        "active"
    } else {
        "inactive"
    }
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn status_to_json(status: &AccountStatus, now: DateTime<Utc>) -> serde_json::Value {
    let account = &status.account;
    let symbol_blocks: serde_json::Map<String, serde_json::Value> = account
        .blocking
        .symbol_blocks
        .iter()
        .map(|(symbol, until)| (symbol.to_string(), json!(rfc3339(*until))))
        .collect();

    json!({
        "id": account.id.as_str(),
        "exchange": account.exchange,
        "state": state_label(account, now),
        "is_active": account.is_active,
        "initial_balance": account.initial_balance.to_string(),
        "account_blocked_until": account.blocking.account_blocked_until.map(rfc3339),
        "symbol_blocks": symbol_blocks,
        "risk": {
            "daily_drawdown_limit": account.risk_params.daily_drawdown_limit.to_string(),
            "max_drawdown_limit": account.risk_params.max_drawdown_limit.to_string(),
            "max_leverage": account.risk_params.max_leverage.to_string(),
            "max_open_trades": account.risk_params.max_open_trades,
        },
        "metrics": status.metrics.as_ref().map(|m| json!({
            "balance": m.balance.to_string(),
            "total_drawdown_percent": m.total_drawdown_percent.to_string(),
            "open_positions": m.open_positions,
            "recorded_at": rfc3339(m.recorded_at),
        })),
        "alerts": status.alerts.iter().map(|alert| json!({
            "level": alert.level,
            "message": alert.message,
            "created_at": rfc3339(alert.created_at),
        })).collect::<Vec<_>>(),
    })
}

fn display(status: &AccountStatus, now: DateTime<Utc>) {
    let account = &status.account;
    output::section(account.id.as_str());
    output::field("Exchange", &account.exchange);

    let state = state_label(account, now);
    let state = match state {
        "active" => output::positive(state),
        "blocked" => output::negative(state),
        _ => output::muted(state),
    };
    output::field("State", state);
    output::field("Baseline", account.initial_balance);

    if let Some(metrics) = &status.metrics {
        output::field("Balance", metrics.balance);
        output::field("Drawdown", format_drawdown(metrics.total_drawdown_percent));
        output::field("Positions", metrics.open_positions);
        output::field("Last cycle", output::muted(rfc3339(metrics.recorded_at)));
    } else {
        output::field("Last cycle", output::muted("never"));
    }

    if let Some(until) = account.blocking.account_blocked_until {
        output::field("Blocked until", rfc3339(until));
    }
    for (symbol, until) in &account.blocking.symbol_blocks {
        output::field("Symbol block", format!("{symbol} until {}", rfc3339(*until)));
    }

    for alert in &status.alerts {
        output::alert(&rfc3339(alert.created_at), &alert.level, &alert.message);
    }
}

fn format_drawdown(percent: Decimal) -> String {
    let text = format!("{}%", percent.round_dp(2));
    if percent < Decimal::ZERO {
        output::negative(text)
    } else {
        output::positive(text)
    }
}
