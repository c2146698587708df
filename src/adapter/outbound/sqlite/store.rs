//! SQLite account store implementation.
//!
//! Provides persistent storage for account records, including their
//! blocking state, using SQLite and Diesel ORM.

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use crate::adapter::outbound::sqlite::database::connection::DbPool;
use crate::adapter::outbound::sqlite::database::model::AccountRow;
use crate::adapter::outbound::sqlite::database::schema::accounts;
use crate::domain::{Account, AccountId, BlockingState, RiskParams, Symbol};
use crate::error::{Error, Result};
use crate::port::AccountStore;

pub(crate) fn parse_decimal(field: &str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw).map_err(|e| Error::Parse(format!("{field}: {e}")))
}

pub(crate) fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("{field}: {e}")))
}

/// SQLite-backed account store.
///
/// Implements the [`AccountStore`] trait. Decimals are stored as text so
/// they round-trip without loss.
pub struct SqliteAccountStore {
    /// Database connection pool.
    pool: DbPool,
}

impl SqliteAccountStore {
    /// Create a new SQLite account store with the given connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn to_row(account: &Account) -> Result<AccountRow> {
        let params = &account.risk_params;
        let max_open_trades = i32::try_from(params.max_open_trades)
            .map_err(|e| Error::Parse(format!("max_open_trades: {e}")))?;

        Ok(AccountRow {
            id: account.id.to_string(),
            exchange: account.exchange.clone(),
            daily_drawdown_limit: params.daily_drawdown_limit.to_string(),
            max_drawdown_limit: params.max_drawdown_limit.to_string(),
            max_leverage: params.max_leverage.to_string(),
            max_open_trades,
            initial_balance: account.initial_balance.to_string(),
            is_active: account.is_active,
            account_blocked_until: account
                .blocking
                .account_blocked_until
                .map(|t| t.to_rfc3339()),
            symbol_blocks: serde_json::to_string(&account.blocking.symbol_blocks)?,
            updated_at: Utc::now().to_rfc3339(),
        })
    }

    fn from_row(row: AccountRow) -> Result<Account> {
        let max_open_trades = u32::try_from(row.max_open_trades)
            .map_err(|e| Error::Parse(format!("max_open_trades: {e}")))?;
        let risk_params = RiskParams::try_new(
            parse_decimal("daily_drawdown_limit", &row.daily_drawdown_limit)?,
            parse_decimal("max_drawdown_limit", &row.max_drawdown_limit)?,
            parse_decimal("max_leverage", &row.max_leverage)?,
            max_open_trades,
        )?;
        let account_blocked_until = row
            .account_blocked_until
            .as_deref()
            .map(|raw| parse_timestamp("account_blocked_until", raw))
            .transpose()?;
        let symbol_blocks: BTreeMap<Symbol, DateTime<Utc>> =
            serde_json::from_str(&row.symbol_blocks)?;

        Ok(Account {
            id: AccountId::from(row.id),
            exchange: row.exchange,
            risk_params,
            initial_balance: parse_decimal("initial_balance", &row.initial_balance)?,
            is_active: row.is_active,
            blocking: BlockingState {
                account_blocked_until,
                symbol_blocks,
            },
        })
    }
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn load_account(&self, id: &AccountId) -> Result<Option<Account>> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))?;

        let row: Option<AccountRow> = accounts::table
            .find(id.as_str())
            .select(AccountRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        row.map(Self::from_row).transpose()
    }

    async fn save_account(&self, account: &Account) -> Result<()> {
        let row = Self::to_row(account)?;
        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))?;

        diesel::replace_into(accounts::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))?;

        let rows: Vec<AccountRow> = accounts::table
            .order(accounts::id.asc())
            .select(AccountRow::as_select())
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        rows.into_iter().map(Self::from_row).collect()
    }
}
