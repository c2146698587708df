//! Persistence port for account records and their blocking state.

use async_trait::async_trait;

use crate::domain::{Account, AccountId, BlockingState};
use crate::error::{Error, Result};

/// Durable storage for [`Account`] aggregates.
///
/// Implementations must round-trip losslessly: saving a freshly loaded
/// value leaves the stored value unchanged.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Get an account by ID.
    async fn load_account(&self, id: &AccountId) -> Result<Option<Account>>;

    /// Insert or replace an account.
    async fn save_account(&self, account: &Account) -> Result<()>;

    /// List every stored account, ordered by ID.
    async fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Load only the blocking state of an account.
    ///
    /// # Errors
    /// Returns [`Error::AccountNotFound`] for unknown accounts.
    async fn load_blocking_state(&self, id: &AccountId) -> Result<BlockingState> {
        self.load_account(id)
            .await?
            .map(|account| account.blocking)
            .ok_or_else(|| Error::AccountNotFound(id.to_string()))
    }

    /// Replace only the blocking state of an account.
    ///
    /// # Errors
    /// Returns [`Error::AccountNotFound`] for unknown accounts.
    async fn save_blocking_state(&self, id: &AccountId, state: &BlockingState) -> Result<()> {
        let mut account = self
            .load_account(id)
            .await?
            .ok_or_else(|| Error::AccountNotFound(id.to_string()))?;
        account.blocking = state.clone();
        self.save_account(&account).await
    }
}
