//! In-memory store and reporting sink.
//!
//! Used by tests and by embedders that keep no state on disk.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{Account, AccountId, AccountMetrics, AlertLevel, TradeRecord};
use crate::error::Result;
use crate::port::{AccountStore, ReportSink};

/// In-memory account store.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<BTreeMap<AccountId, Account>>,
}

impl MemoryAccountStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `accounts`.
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let store = Self::new();
        {
            let mut map = store.accounts.write();
            for account in accounts {
                map.insert(account.id.clone(), account);
            }
        }
        store
    }

    /// Synchronous read, for assertions.
    pub fn get(&self, id: &AccountId) -> Option<Account> {
        self.accounts.read().get(id).cloned()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn load_account(&self, id: &AccountId) -> Result<Option<Account>> {
        Ok(self.accounts.read().get(id).cloned())
    }

    async fn save_account(&self, account: &Account) -> Result<()> {
        self.accounts
            .write()
            .insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.accounts.read().values().cloned().collect())
    }
}

/// An alert captured by [`MemoryReportSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAlert {
    pub account: AccountId,
    pub level: AlertLevel,
    pub message: String,
    pub context: serde_json::Value,
}

/// Reporting sink that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryReportSink {
    alerts: RwLock<Vec<RecordedAlert>>,
    metrics: RwLock<Vec<(AccountId, AccountMetrics)>>,
    trades: RwLock<Vec<(AccountId, TradeRecord)>>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<RecordedAlert> {
        self.alerts.read().clone()
    }

    /// Alerts for one account at `level`.
    pub fn alerts_at(&self, account: &AccountId, level: AlertLevel) -> Vec<RecordedAlert> {
        self.alerts
            .read()
            .iter()
            .filter(|a| &a.account == account && a.level == level)
            .cloned()
            .collect()
    }

    pub fn metrics(&self) -> Vec<(AccountId, AccountMetrics)> {
        self.metrics.read().clone()
    }

    pub fn trades(&self) -> Vec<(AccountId, TradeRecord)> {
        self.trades.read().clone()
    }
}

#[async_trait]
impl ReportSink for MemoryReportSink {
    async fn record_alert(
        &self,
        account: &AccountId,
        level: AlertLevel,
        message: &str,
        context: &serde_json::Value,
    ) -> Result<()> {
        self.alerts.write().push(RecordedAlert {
            account: account.clone(),
            level,
            message: message.to_string(),
            context: context.clone(),
        });
        Ok(())
    }

    async fn record_metrics(&self, account: &AccountId, metrics: &AccountMetrics) -> Result<()> {
        self.metrics
            .write()
            .push((account.clone(), metrics.clone()));
        Ok(())
    }

    async fn record_trade(&self, account: &AccountId, trade: &TradeRecord) -> Result<()> {
        self.trades.write().push((account.clone(), trade.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BlockingState, RiskParams, Symbol};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn account(id: &str) -> Account {
        Account::activated(
            AccountId::from(id),
            "paper",
            RiskParams::try_new(dec!(5), dec!(10), dec!(20), 3).unwrap(),
            dec!(1000),
        )
    }

    #[tokio::test]
    async fn list_is_ordered_by_id() {
        let store = MemoryAccountStore::with_accounts([account("b"), account("a")]);
        let ids: Vec<String> = store
            .list_accounts()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn blocking_state_round_trips() {
        let store = MemoryAccountStore::with_accounts([account("a")]);
        let id = AccountId::from("a");
        let mut state = BlockingState::new();
        state.block_symbol(
            Symbol::from("BTC/USDT"),
            Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap(),
        );

        store.save_blocking_state(&id, &state).await.unwrap();

        assert_eq!(store.load_blocking_state(&id).await.unwrap(), state);
    }

    #[tokio::test]
    async fn blocking_state_of_unknown_account_is_an_error() {
        let store = MemoryAccountStore::new();
        let result = store.load_blocking_state(&AccountId::from("ghost")).await;
        assert!(matches!(result, Err(crate::error::Error::AccountNotFound(_))));
    }
}
