//! Database model types for Diesel ORM.

use diesel::prelude::*;

use super::schema::{accounts, alerts, metrics, trades};

/// Database row for an account.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AccountRow {
    pub id: String,
    pub exchange: String,
    pub daily_drawdown_limit: String,
    pub max_drawdown_limit: String,
    pub max_leverage: String,
    pub max_open_trades: i32,
    pub initial_balance: String,
    pub is_active: bool,
    pub account_blocked_until: Option<String>,
    /// JSON object of symbol to RFC 3339 expiry.
    pub symbol_blocks: String,
    pub updated_at: String,
}

/// Database row for an alert (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = alerts)]
pub struct NewAlertRow {
    pub account_id: String,
    pub level: String,
    pub message: String,
    pub context: String,
    pub created_at: String,
}

/// Database row for an alert (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = alerts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AlertRow {
    pub id: Option<i32>,
    pub account_id: String,
    pub level: String,
    pub message: String,
    pub context: String,
    pub created_at: String,
}

/// Database row for a metrics sample (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = metrics)]
pub struct NewMetricsRow {
    pub account_id: String,
    pub balance: String,
    pub initial_balance: String,
    pub total_drawdown_percent: String,
    pub open_positions: i32,
    pub recorded_at: String,
}

/// Database row for a metrics sample (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = metrics)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MetricsRow {
    pub id: Option<i32>,
    pub account_id: String,
    pub balance: String,
    pub initial_balance: String,
    pub total_drawdown_percent: String,
    pub open_positions: i32,
    pub recorded_at: String,
}

/// Database row for a closed trade (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = trades)]
pub struct NewTradeRow {
    pub account_id: String,
    pub symbol: String,
    pub side: String,
    pub entry_price: String,
    pub exit_price: String,
    pub pnl_percent: String,
    pub reason: String,
    pub leverage: String,
    pub size: String,
    pub closed_at: String,
}

/// Database row for a closed trade (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = trades)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TradeRow {
    pub id: Option<i32>,
    pub account_id: String,
    pub symbol: String,
    pub side: String,
    pub entry_price: String,
    pub exit_price: String,
    pub pnl_percent: String,
    pub reason: String,
    pub leverage: String,
    pub size: String,
    pub closed_at: String,
}
