//! The monitored account aggregate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::blocking::{BlockingState, PurgeReport};
use super::id::AccountId;
use super::risk::RiskParams;

/// Persisted record for one monitored account.
///
/// The aggregate owns its risk parameters, the drawdown baseline and the
/// blocking state. Only the cycle that evaluated it writes it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Exchange adapter name the account was configured with.
    pub exchange: String,
    pub risk_params: RiskParams,
    /// Balance recorded at activation; the drawdown baseline for the
    /// account's whole lifetime.
    pub initial_balance: Decimal,
    pub is_active: bool,
    pub blocking: BlockingState,
}

/// What changed when an account was refreshed against the clock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub purged: PurgeReport,
    /// The account block expired and monitoring resumed.
    pub reactivated: bool,
}

impl RefreshOutcome {
    /// Whether the refresh mutated the account.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.reactivated || !self.purged.is_empty()
    }
}

impl Account {
    /// Create a newly activated account with an empty blocking state.
    #[must_use]
    pub fn activated(
        id: AccountId,
        exchange: impl Into<String>,
        risk_params: RiskParams,
        initial_balance: Decimal,
    ) -> Self {
        Self {
            id,
            exchange: exchange.into(),
            risk_params,
            initial_balance,
            is_active: true,
            blocking: BlockingState::new(),
        }
    }

    /// Apply lazy expiry at `now`.
    ///
    /// Expired blocks are purged. An inactive account whose account block
    /// just expired is reactivated; an inactive account without a block
    /// (never activated, or disabled by an operator) stays inactive.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> RefreshOutcome {
        let purged = self.blocking.purge_expired(now);
        let reactivated = purged.account_unblocked && !self.is_active;
        if reactivated {
            self.is_active = true;
        }
        RefreshOutcome {
            purged,
            reactivated,
        }
    }

    /// Whether the scheduler should run cycles for this account at `now`.
    #[must_use]
    pub fn is_monitored(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.blocking.is_account_blocked(now)
    }
}

/// Per-cycle account figures handed to the reporting sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountMetrics {
    pub balance: Decimal,
    pub initial_balance: Decimal,
    pub total_drawdown_percent: Decimal,
    pub open_positions: usize,
    pub recorded_at: DateTime<Utc>,
}
