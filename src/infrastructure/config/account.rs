//! Per-account configuration.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{AccountId, DomainError, RiskParams};
use crate::error::ConfigError;

/// `[[accounts]]` entry.
///
/// Credentials are never part of the file: `api_key_env` and
/// `api_secret_env` name the environment variables that hold them.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub id: String,

    /// Exchange adapter name (`paper` or `rest`).
    pub exchange: String,

    /// Gateway base URL for the `rest` adapter.
    #[serde(default)]
    pub api_url: Option<String>,

    pub api_key_env: String,
    pub api_secret_env: String,

    /// Starting balance for the `paper` adapter.
    #[serde(default)]
    pub paper_balance: Option<Decimal>,

    pub risk: RiskLimitsConfig,
}

/// `[accounts.risk]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskLimitsConfig {
    pub daily_drawdown_limit: Decimal,
    pub max_drawdown_limit: Decimal,
    pub max_leverage: Decimal,
    pub max_open_trades: u32,
}

impl RiskLimitsConfig {
    /// Convert into validated domain parameters.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] naming the negative limit.
    pub fn to_params(&self) -> Result<RiskParams, ConfigError> {
        RiskParams::try_new(
            self.daily_drawdown_limit,
            self.max_drawdown_limit,
            self.max_leverage,
            self.max_open_trades,
        )
        .map_err(|e| match e {
            DomainError::NegativeRiskLimit { field, value } => ConfigError::InvalidValue {
                field,
                reason: format!("must be 0 or greater, got {value}"),
            },
            other => ConfigError::Other(other.to_string()),
        })
    }
}

impl AccountConfig {
    /// # Errors
    /// Returns [`ConfigError::MissingField`] for an empty ID.
    pub fn account_id(&self) -> Result<AccountId, ConfigError> {
        AccountId::try_new(self.id.trim()).map_err(|_| ConfigError::MissingField {
            field: "accounts.id",
        })
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        self.account_id()?;
        self.risk.to_params()?;
        if self.api_key_env.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "api_key_env",
            });
        }
        if self.api_secret_env.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "api_secret_env",
            });
        }
        Ok(())
    }
}
