//! SQLite reporting sink.
//!
//! Appends alerts, metrics samples and closed trades, and serves the
//! read queries behind the `status` command.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use tracing::debug;

use crate::adapter::outbound::sqlite::database::connection::DbPool;
use crate::adapter::outbound::sqlite::database::model::{
    AlertRow, MetricsRow, NewAlertRow, NewMetricsRow, NewTradeRow, TradeRow,
};
use crate::adapter::outbound::sqlite::database::schema::{alerts, metrics, trades};
use crate::adapter::outbound::sqlite::store::{parse_decimal, parse_timestamp};
use crate::domain::{AccountId, AccountMetrics, AlertLevel, Side, TradeRecord};
use crate::error::{Error, Result};
use crate::port::ReportSink;

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// A stored alert, as shown by `status`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEntry {
    pub level: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// A stored closed trade.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeEntry {
    pub trade: TradeRecord,
    pub closed_at: DateTime<Utc>,
}

/// SQLite-backed reporting sink.
pub struct SqliteReportSink {
    /// Database connection pool.
    pool: DbPool,
}

impl SqliteReportSink {
    /// Create a new reporting sink with the given connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(
        &self,
    ) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>>
    {
        self.pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))
    }

    /// Most recent alerts for `account`, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored row is malformed.
    pub fn recent_alerts(&self, account: &AccountId, limit: i64) -> Result<Vec<AlertEntry>> {
        let mut conn = self.conn()?;
        let rows: Vec<AlertRow> = alerts::table
            .filter(alerts::account_id.eq(account.as_str()))
            .order((alerts::created_at.desc(), alerts::id.desc()))
            .limit(limit)
            .select(AlertRow::as_select())
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                Ok(AlertEntry {
                    created_at: parse_timestamp("created_at", &row.created_at)?,
                    level: row.level,
                    message: row.message,
                })
            })
            .collect()
    }

    /// Latest metrics sample for `account`.
    ///
    /// # Errors
    /// Returns an error if the query fails or the stored row is malformed.
    pub fn latest_metrics(&self, account: &AccountId) -> Result<Option<AccountMetrics>> {
        let mut conn = self.conn()?;
        let row: Option<MetricsRow> = metrics::table
            .filter(metrics::account_id.eq(account.as_str()))
            .order((metrics::recorded_at.desc(), metrics::id.desc()))
            .select(MetricsRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        row.map(|row| {
            Ok(AccountMetrics {
                balance: parse_decimal("balance", &row.balance)?,
                initial_balance: parse_decimal("initial_balance", &row.initial_balance)?,
                total_drawdown_percent: parse_decimal(
                    "total_drawdown_percent",
                    &row.total_drawdown_percent,
                )?,
                open_positions: usize::try_from(row.open_positions)
                    .map_err(|e| Error::Parse(format!("open_positions: {e}")))?,
                recorded_at: parse_timestamp("recorded_at", &row.recorded_at)?,
            })
        })
        .transpose()
    }

    /// Most recent closed trades for `account`, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored row is malformed.
    pub fn recent_trades(&self, account: &AccountId, limit: i64) -> Result<Vec<TradeEntry>> {
        let mut conn = self.conn()?;
        let rows: Vec<TradeRow> = trades::table
            .filter(trades::account_id.eq(account.as_str()))
            .order((trades::closed_at.desc(), trades::id.desc()))
            .limit(limit)
            .select(TradeRow::as_select())
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        rows.into_iter().map(Self::trade_from_row).collect()
    }

    fn trade_from_row(row: TradeRow) -> Result<TradeEntry> {
        let side: Side = row.side.parse()?;
        let reason = serde_json::from_value(serde_json::Value::String(row.reason))?;
        Ok(TradeEntry {
            trade: TradeRecord {
                symbol: row.symbol.into(),
                side,
                entry: parse_decimal("entry_price", &row.entry_price)?,
                exit: parse_decimal("exit_price", &row.exit_price)?,
                pnl_percent: parse_decimal("pnl_percent", &row.pnl_percent)?,
                reason,
                leverage: parse_decimal("leverage", &row.leverage)?,
                size: parse_decimal("size", &row.size)?,
            },
            closed_at: parse_timestamp("closed_at", &row.closed_at)?,
        })
    }
}

#[async_trait]
impl ReportSink for SqliteReportSink {
    async fn record_alert(
        &self,
        account: &AccountId,
        level: AlertLevel,
        message: &str,
        context: &serde_json::Value,
    ) -> Result<()> {
        let row = NewAlertRow {
            account_id: account.to_string(),
            level: level.as_str().to_string(),
            message: message.to_string(),
            context: context.to_string(),
            created_at: timestamp(Utc::now()),
        };
        let mut conn = self.conn()?;
        diesel::insert_into(alerts::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        debug!(account = %account, level = %level, "Alert recorded");
        Ok(())
    }

    async fn record_metrics(&self, account: &AccountId, sample: &AccountMetrics) -> Result<()> {
        let row = NewMetricsRow {
            account_id: account.to_string(),
            balance: sample.balance.to_string(),
            initial_balance: sample.initial_balance.to_string(),
            total_drawdown_percent: sample.total_drawdown_percent.to_string(),
            open_positions: i32::try_from(sample.open_positions).unwrap_or(i32::MAX),
            recorded_at: timestamp(sample.recorded_at),
        };
        let mut conn = self.conn()?;
        diesel::insert_into(metrics::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn record_trade(&self, account: &AccountId, trade: &TradeRecord) -> Result<()> {
        let row = NewTradeRow {
            account_id: account.to_string(),
            symbol: trade.symbol.to_string(),
            side: trade.side.as_str().to_string(),
            entry_price: trade.entry.to_string(),
            exit_price: trade.exit.to_string(),
            pnl_percent: trade.pnl_percent.to_string(),
            reason: trade.reason.as_str().to_string(),
            leverage: trade.leverage.to_string(),
            size: trade.size.to_string(),
            closed_at: timestamp(Utc::now()),
        };
        let mut conn = self.conn()?;
        diesel::insert_into(trades::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        debug!(account = %account, symbol = %trade.symbol, reason = %trade.reason, "Trade recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::sqlite::database::connection::open;
    use crate::domain::ReasonCode;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn setup() -> (tempfile::TempDir, SqliteReportSink) {
        let dir = tempfile::tempdir().unwrap();
        let url = dir.path().join("sink.db").to_string_lossy().into_owned();
        (dir, SqliteReportSink::new(open(&url).unwrap()))
    }

    #[tokio::test]
    async fn alerts_are_returned_newest_first() {
        let (_dir, sink) = setup();
        let id = AccountId::from("acct-1");
        sink.record_alert(&id, AlertLevel::Warning, "first", &json!({}))
            .await
            .unwrap();
        sink.record_alert(&id, AlertLevel::Critical, "second", &json!({"k": 1}))
            .await
            .unwrap();
        sink.record_alert(&AccountId::from("other"), AlertLevel::Info, "x", &json!({}))
            .await
            .unwrap();

        let alerts = sink.recent_alerts(&id, 10).unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].message, "second");
        assert_eq!(alerts[0].level, "critical");
    }

    #[tokio::test]
    async fn latest_metrics_round_trip() {
        let (_dir, sink) = setup();
        let id = AccountId::from("acct-1");
        let sample = AccountMetrics {
            balance: dec!(950.25),
            initial_balance: dec!(1000),
            total_drawdown_percent: dec!(-4.975),
            open_positions: 2,
            recorded_at: Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap(),
        };
        sink.record_metrics(&id, &sample).await.unwrap();

        assert_eq!(sink.latest_metrics(&id).unwrap(), Some(sample));
        assert_eq!(sink.latest_metrics(&AccountId::from("none")).unwrap(), None);
    }

    #[tokio::test]
    async fn trades_keep_reason_codes() {
        let (_dir, sink) = setup();
        let id = AccountId::from("acct-1");
        let trade = TradeRecord {
            symbol: "BTC/USDT".into(),
            side: Side::Short,
            entry: dec!(100),
            exit: dec!(104),
            pnl_percent: dec!(-8),
            reason: ReasonCode::DailyLimitReached,
            leverage: dec!(2),
            size: dec!(0.5),
        };
        sink.record_trade(&id, &trade).await.unwrap();

        let stored = sink.recent_trades(&id, 5).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].trade, trade);
    }
}
