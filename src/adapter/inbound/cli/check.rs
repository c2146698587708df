//! Handler for the `check` command.

use rust_decimal::Decimal;
use serde_json::json;

use crate::adapter::inbound::cli::command::CheckArgs;
use crate::adapter::inbound::cli::output;
use crate::error::{ConfigError, Error, Result};
use crate::infrastructure::config::{AccountConfig, Config};
use crate::infrastructure::exchange::ExchangeFactory;

/// Result of checking one configured account.
#[derive(Debug)]
struct AccountCheck {
    id: String,
    exchange: String,
    /// Balance when `--live` was given.
    result: std::result::Result<Option<Decimal>, String>,
}

/// Validate configuration without starting the monitor.
///
/// Every account is connected through the exchange factory, which checks
/// the exchange name, adapter settings and credential variables. With
/// `--live` each account's balance is also fetched.
pub async fn execute(args: &CheckArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    let factory = ExchangeFactory::new(config.monitor.cycle_timeouts().snapshot);

    let mut checks = Vec::with_capacity(config.accounts.len());
    for account in &config.accounts {
        checks.push(check_account(&factory, account, args.live, &config).await);
    }
    let failures = checks.iter().filter(|c| c.result.is_err()).count();

    if output::is_json() {
        output::json_document(&json!({
            "command": "check",
            "config": args.config.display().to_string(),
            "valid": failures == 0,
            "accounts": checks.iter().map(|c| json!({
                "id": c.id,
                "exchange": c.exchange,
                "ok": c.result.is_ok(),
                "balance": c.result.as_ref().ok().copied().flatten().map(|b| b.to_string()),
                "error": c.result.as_ref().err(),
            })).collect::<Vec<_>>(),
        }));
    } else {
        output::section("Configuration Check");
        output::field("Config", args.config.display());
        output::success("Configuration file is valid");
        output::field("Database", &config.database);
        output::field("Reset zone", &config.monitor.timezone);
        output::field("Interval", format!("{}s", config.monitor.interval_secs));

        output::section("Accounts");
        if checks.is_empty() {
            output::warning("No accounts configured");
        }
        for check in &checks {
            match &check.result {
                Ok(Some(balance)) => output::success(&format!(
                    "{} ({}) balance {balance}",
                    check.id, check.exchange
                )),
                Ok(None) => output::success(&format!("{} ({})", check.id, check.exchange)),
                Err(reason) => output::error(&format!("{} ({}): {reason}", check.id, check.exchange)),
            }
        }
    }

    if failures > 0 {
        return Err(Error::Config(ConfigError::Other(format!(
            "{failures} account(s) failed the check"
        ))));
    }
    Ok(())
}

async fn check_account(
    factory: &ExchangeFactory,
    account: &AccountConfig,
    live: bool,
    config: &Config,
) -> AccountCheck {
    let result = match factory.connect(account) {
        Err(e) => Err(e.to_string()),
        Ok(_) if !live => Ok(None),
        Ok((client, credentials)) => {
            let timeout = config.monitor.cycle_timeouts().snapshot;
            match tokio::time::timeout(timeout, client.fetch_balance(&credentials)).await {
                Ok(Ok(balance)) if balance > Decimal::ZERO => Ok(Some(balance)),
                Ok(Ok(balance)) => Err(format!("balance {balance} is not positive")),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(format!("balance request timed out after {}s", timeout.as_secs())),
            }
        }
    };

    AccountCheck {
        id: account.id.clone(),
        exchange: account.exchange.clone(),
        result,
    }
}
