//! Reporting sink port for alerts, metrics and trade history.

use async_trait::async_trait;

use crate::domain::{AccountId, AccountMetrics, AlertLevel, TradeRecord};
use crate::error::Result;

/// Write-side reporting backend.
///
/// From the engine's perspective every call is fire-and-forget: callers
/// log failures and carry on, they never roll back a risk decision.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn record_alert(
        &self,
        account: &AccountId,
        level: AlertLevel,
        message: &str,
        context: &serde_json::Value,
    ) -> Result<()>;

    async fn record_metrics(&self, account: &AccountId, metrics: &AccountMetrics) -> Result<()>;

    async fn record_trade(&self, account: &AccountId, trade: &TradeRecord) -> Result<()>;
}
