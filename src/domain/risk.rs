//! Per-account risk limits.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Risk limits attached to a monitored account.
///
/// Percent limits are positive magnitudes: a `daily_drawdown_limit` of 5
/// trips when a single trade is down 5% or more. A limit of zero trips on
/// any non-positive reading, which effectively forbids the exposure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskParams {
    /// Per-trade loss limit in percent.
    pub daily_drawdown_limit: Decimal,
    /// Account-level loss limit in percent, measured against the initial balance.
    pub max_drawdown_limit: Decimal,
    /// Highest leverage multiplier allowed on any open position.
    pub max_leverage: Decimal,
    /// Maximum number of simultaneously open positions.
    pub max_open_trades: u32,
}

impl RiskParams {
    /// Create validated risk parameters.
    ///
    /// # Errors
    /// Returns [`DomainError::NegativeRiskLimit`] if any decimal limit is negative.
    pub fn try_new(
        daily_drawdown_limit: Decimal,
        max_drawdown_limit: Decimal,
        max_leverage: Decimal,
        max_open_trades: u32,
    ) -> Result<Self, DomainError> {
        let params = Self {
            daily_drawdown_limit,
            max_drawdown_limit,
            max_leverage,
            max_open_trades,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check the non-negativity invariant.
    ///
    /// # Errors
    /// Returns the first limit found to be negative.
    pub fn validate(&self) -> Result<(), DomainError> {
        for (field, value) in [
            ("daily_drawdown_limit", self.daily_drawdown_limit),
            ("max_drawdown_limit", self.max_drawdown_limit),
            ("max_leverage", self.max_leverage),
        ] {
            if value < Decimal::ZERO {
                return Err(DomainError::NegativeRiskLimit { field, value });
            }
        }
        Ok(())
    }

    /// Loss threshold for a single trade, as a negative percent.
    #[must_use]
    pub fn daily_loss_threshold(&self) -> Decimal {
        -self.daily_drawdown_limit.abs()
    }

    /// Loss threshold for the whole account, as a negative percent.
    #[must_use]
    pub fn account_loss_threshold(&self) -> Decimal {
        -self.max_drawdown_limit.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn thresholds_are_negative_magnitudes() {
        let params = RiskParams::try_new(dec!(5), dec!(10), dec!(20), 3).unwrap();
        assert_eq!(params.daily_loss_threshold(), dec!(-5));
        assert_eq!(params.account_loss_threshold(), dec!(-10));
    }

    #[test]
    fn zero_limits_are_allowed() {
        assert!(RiskParams::try_new(dec!(0), dec!(0), dec!(0), 0).is_ok());
    }

    #[test]
    fn negative_leverage_is_rejected() {
        let err = RiskParams::try_new(dec!(5), dec!(10), dec!(-1), 3).unwrap_err();
        assert_eq!(
            err,
            DomainError::NegativeRiskLimit {
                field: "max_leverage",
                value: dec!(-1)
            }
        );
    }
}
