use std::fs;
use std::time::Duration;

use riskguard::error::{ConfigError, Error};
use riskguard::infrastructure::config::Config;
use rust_decimal_macros::dec;
use tempfile::TempDir;

const VALID: &str = r#"
database = "state/riskguard.db"

[monitor]
interval_secs = 15
cycle_timeout_secs = 8
timezone = "Europe/Berlin"

[logging]
level = "debug"
format = "json"

[[accounts]]
id = "main"
exchange = "rest"
api_url = "https://gateway.example.com"
api_key_env = "MAIN_API_KEY"
api_secret_env = "MAIN_API_SECRET"

[accounts.risk]
daily_drawdown_limit = 5
max_drawdown_limit = 12.5
max_leverage = 20
max_open_trades = 4

[[accounts]]
id = "sandbox"
exchange = "paper"
paper_balance = 10000
api_key_env = "SANDBOX_KEY"
api_secret_env = "SANDBOX_SECRET"

[accounts.risk]
daily_drawdown_limit = 3
max_drawdown_limit = 8
max_leverage = 10
max_open_trades = 2
"#;

fn with_account_risk(daily: &str) -> String {
    format!(
        r#"
[[accounts]]
id = "main"
exchange = "paper"
paper_balance = 1000
api_key_env = "K"
api_secret_env = "S"

[accounts.risk]
daily_drawdown_limit = {daily}
max_drawdown_limit = 10
max_leverage = 20
max_open_trades = 3
"#
    )
}

#[test]
fn config_loads_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, VALID).expect("write temp config");

    let config = Config::load(&path).unwrap();

    assert_eq!(config.database, "state/riskguard.db");
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.monitor.scheduler_settings().interval, Duration::from_secs(15));
    assert_eq!(config.monitor.cycle_timeouts().snapshot, Duration::from_secs(8));
    assert_eq!(config.monitor.timezone().unwrap(), chrono_tz::Europe::Berlin);

    assert_eq!(config.accounts.len(), 2);
    let params = config.accounts[0].risk.to_params().unwrap();
    assert_eq!(params.max_drawdown_limit, dec!(12.5));
    assert_eq!(params.max_open_trades, 4);
    assert_eq!(config.accounts[1].paper_balance, Some(dec!(10000)));
}

#[test]
fn config_rejects_negative_risk_limit() {
    let result = Config::parse_toml(&with_account_risk("-5"));

    match result {
        Err(Error::Config(ConfigError::InvalidValue {
            field: "daily_drawdown_limit",
            ..
        })) => {}
        Err(err) => panic!("Expected negative limit error, got {err}"),
        Ok(_) => panic!("Expected negative daily limit to be rejected"),
    }
}

#[test]
fn config_rejects_zero_interval() {
    let result = Config::parse_toml("[monitor]\ninterval_secs = 0\n");

    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidValue {
            field: "interval_secs",
            ..
        }))
    ));
}

#[test]
fn config_rejects_unknown_timezone() {
    let result = Config::parse_toml("[monitor]\ntimezone = \"Mars/Olympus_Mons\"\n");

    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidValue {
            field: "timezone",
            ..
        }))
    ));
}

#[test]
fn config_rejects_malformed_toml() {
    let result = Config::parse_toml("[monitor\ninterval_secs = 5");
    assert!(matches!(result, Err(Error::Config(ConfigError::Parse(_)))));
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = TempDir::new().unwrap();
    let result = Config::load(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(Error::Config(ConfigError::ReadFile(_)))));
}

#[test]
fn zero_limits_are_accepted() {
    assert!(Config::parse_toml(&with_account_risk("0")).is_ok());
}
