//! Exchange client factory.
//!
//! Provides [`ExchangeFactory`] for creating the exchange client and
//! resolving the credentials of a configured account.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::adapter::outbound::paper::PaperExchange;
use crate::adapter::outbound::rest::RestExchange;
use crate::error::ConfigError;
use crate::infrastructure::config::AccountConfig;
use crate::port::{Credentials, ExchangeClient};

/// Exchange adapter names accepted in `accounts.exchange`.
pub const SUPPORTED_EXCHANGES: &[&str] = &["paper", "rest"];

/// Factory for creating exchange clients.
///
/// Dispatches to the appropriate exchange adapter based on configuration.
#[derive(Debug, Clone, Copy)]
pub struct ExchangeFactory {
    request_timeout: Duration,
}

impl ExchangeFactory {
    #[must_use]
    pub const fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }

    /// Read the account's credentials from the environment.
    ///
    /// # Errors
    /// Returns [`ConfigError::Credentials`] when a variable is unset or empty.
    pub fn credentials(account: &AccountConfig) -> Result<Credentials, ConfigError> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::Credentials {
                    account: account.id.clone(),
                    reason: format!("environment variable {name} is not set"),
                })
        };
        Ok(Credentials::new(
            read(&account.api_key_env)?,
            read(&account.api_secret_env)?,
        ))
    }

    /// Build the client for `account` along with its credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange name is unknown, the adapter's
    /// settings are missing or invalid, or credentials are unavailable.
    pub fn connect(
        &self,
        account: &AccountConfig,
    ) -> Result<(Arc<dyn ExchangeClient>, Credentials), ConfigError> {
        let credentials = Self::credentials(account)?;

        let client: Arc<dyn ExchangeClient> = match account.exchange.as_str() {
            "paper" => {
                let balance = account.paper_balance.ok_or(ConfigError::MissingField {
                    field: "paper_balance",
                })?;
                Arc::new(PaperExchange::new().with_account(credentials.api_key.clone(), balance))
            }
            "rest" => {
                let api_url = account
                    .api_url
                    .as_deref()
                    .ok_or(ConfigError::MissingField { field: "api_url" })?;
                url::Url::parse(api_url).map_err(|e| ConfigError::InvalidValue {
                    field: "api_url",
                    reason: e.to_string(),
                })?;
                Arc::new(RestExchange::new(api_url, self.request_timeout))
            }
            other => {
                return Err(ConfigError::UnsupportedExchange {
                    account: account.id.clone(),
                    exchange: other.to_string(),
                })
            }
        };

        debug!(account = %account.id, exchange = client.name(), "Exchange client created");
        Ok((client, credentials))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::RiskLimitsConfig;
    use rust_decimal_macros::dec;

    fn account(exchange: &str, key_env: &str) -> AccountConfig {
        AccountConfig {
            id: "acct".to_string(),
            exchange: exchange.to_string(),
            api_url: None,
            api_key_env: key_env.to_string(),
            api_secret_env: format!("{key_env}_SECRET"),
            paper_balance: Some(dec!(1000)),
            risk: RiskLimitsConfig {
                daily_drawdown_limit: dec!(5),
                max_drawdown_limit: dec!(10),
                max_leverage: dec!(20),
                max_open_trades: 3,
            },
        }
    }

    fn set_credentials(key_env: &str) {
        std::env::set_var(key_env, "key");
        std::env::set_var(format!("{key_env}_SECRET"), "secret");
    }

    #[test]
    fn unsupported_exchange_is_rejected() {
        set_credentials("FACTORY_TEST_UNSUPPORTED");
        let result = ExchangeFactory::new(Duration::from_secs(1))
            .connect(&account("binance", "FACTORY_TEST_UNSUPPORTED"));
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedExchange { .. })
        ));
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let result = ExchangeFactory::new(Duration::from_secs(1))
            .connect(&account("paper", "FACTORY_TEST_NEVER_SET"));
        assert!(matches!(result, Err(ConfigError::Credentials { .. })));
    }

    #[test]
    fn rest_requires_a_valid_url() {
        set_credentials("FACTORY_TEST_REST");
        let mut cfg = account("rest", "FACTORY_TEST_REST");
        cfg.api_url = Some("not a url".to_string());
        let result = ExchangeFactory::new(Duration::from_secs(1)).connect(&cfg);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "api_url", .. })
        ));
    }

    #[test]
    fn paper_account_connects() {
        set_credentials("FACTORY_TEST_PAPER");
        let (client, creds) = ExchangeFactory::new(Duration::from_secs(1))
            .connect(&account("paper", "FACTORY_TEST_PAPER"))
            .unwrap();
        assert_eq!(client.name(), "paper");
        assert_eq!(creds.api_key, "key");
    }
}
