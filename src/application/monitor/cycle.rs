//! One evaluation cycle for one account.
//!
//! The runner loads the account record (applying lazy expiry), takes a
//! snapshot from the exchange, runs the policy evaluator and applies the
//! resulting actions in order before persisting the account.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::application::risk::{Evaluation, EvaluationInput, PolicyEvaluator};
use crate::domain::{
    Account, AccountId, Action, AlertLevel, Position, ReasonCode, Side, Symbol, TradeRecord,
};
use crate::error::{Error, ExchangeError, Result};
use crate::port::{AccountStore, Credentials, ExchangeClient, ReportSink};

/// An activated account the scheduler runs cycles for.
#[derive(Clone)]
pub struct MonitoredAccount {
    pub id: AccountId,
    pub credentials: Credentials,
    pub client: Arc<dyn ExchangeClient>,
}

impl std::fmt::Debug for MonitoredAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoredAccount")
            .field("id", &self.id)
            .field("credentials", &self.credentials)
            .field("client", &self.client.name())
            .finish()
    }
}

/// Deadlines for exchange calls made during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTimeouts {
    /// Balance plus positions.
    pub snapshot: Duration,
    /// Each individual close order.
    pub close: Duration,
}

impl Default for CycleTimeouts {
    fn default() -> Self {
        Self {
            snapshot: Duration::from_secs(10),
            close: Duration::from_secs(10),
        }
    }
}

/// Why a cycle did not evaluate the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Deactivated and not yet due for reactivation.
    Inactive,
    /// The account block is still in force.
    AccountBlocked,
}

/// Summary of an evaluated cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub actions: usize,
    pub closes_succeeded: usize,
    pub closes_failed: usize,
    pub deactivated: bool,
}

/// Result of a completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Skipped(SkipReason),
    Evaluated(CycleReport),
}

/// Runs single cycles against the store, the sink and an exchange.
pub struct CycleRunner {
    store: Arc<dyn AccountStore>,
    sink: Arc<dyn ReportSink>,
    evaluator: PolicyEvaluator,
    timeouts: CycleTimeouts,
}

impl CycleRunner {
    pub fn new(
        store: Arc<dyn AccountStore>,
        sink: Arc<dyn ReportSink>,
        evaluator: PolicyEvaluator,
        timeouts: CycleTimeouts,
    ) -> Self {
        Self {
            store,
            sink,
            evaluator,
            timeouts,
        }
    }

    #[must_use]
    pub fn sink(&self) -> &Arc<dyn ReportSink> {
        &self.sink
    }

    /// Run one cycle for `target` at `now`.
    ///
    /// # Errors
    /// Returns an error when the account record is missing, the snapshot
    /// cannot be taken in time, or the updated account cannot be saved.
    /// On snapshot failure no action is applied and no decision is
    /// persisted.
    pub async fn run(&self, target: &MonitoredAccount, now: DateTime<Utc>) -> Result<CycleOutcome> {
        let loaded = self
            .store
            .load_account(&target.id)
            .await?
            .ok_or_else(|| Error::AccountNotFound(target.id.to_string()))?;

        let mut account = loaded.clone();
        let refresh = account.refresh(now);
        for symbol in &refresh.purged.symbols_unblocked {
            info!(account = %account.id, symbol = %symbol, "Symbol block expired");
        }
        if refresh.reactivated {
            info!(account = %account.id, "Account block expired, monitoring resumed");
            self.alert(
                &account.id,
                AlertLevel::Info,
                "Account block expired. Monitoring resumed.",
                &json!({}),
            )
            .await;
        }
        if refresh.changed() {
            self.store.save_account(&account).await?;
        }

        if !account.is_active {
            debug!(account = %account.id, "Account inactive, skipping cycle");
            return Ok(CycleOutcome::Skipped(SkipReason::Inactive));
        }
        if account.blocking.is_account_blocked(now) {
            debug!(account = %account.id, "Account blocked, skipping cycle");
            return Ok(CycleOutcome::Skipped(SkipReason::AccountBlocked));
        }

        let (balance, positions) = self.snapshot(target).await?;
        debug!(
            account = %account.id,
            balance = %balance,
            positions = positions.len(),
            "Snapshot taken"
        );

        let evaluation = self.evaluator.evaluate(EvaluationInput {
            risk_params: &account.risk_params,
            blocking: account.blocking.clone(),
            balance,
            initial_balance: account.initial_balance,
            positions: &positions,
            now,
        });
        if evaluation.is_skipped() {
            return Ok(CycleOutcome::Skipped(SkipReason::AccountBlocked));
        }

        let report = self.apply(target, &positions, &evaluation).await;

        account.blocking = evaluation.blocking;
        if evaluation.deactivate_account {
            warn!(account = %account.id, "Account deactivated until block expires");
            account.is_active = false;
        }
        if account != loaded {
            self.store.save_account(&account).await?;
        }

        Ok(CycleOutcome::Evaluated(CycleReport {
            deactivated: evaluation.deactivate_account,
            ..report
        }))
    }

    async fn snapshot(&self, target: &MonitoredAccount) -> Result<(Decimal, Vec<Position>)> {
        let fetch = async {
            let balance = target.client.fetch_balance(&target.credentials).await?;
            let positions = target
                .client
                .fetch_open_positions(&target.credentials)
                .await;
            Ok::<_, Error>((balance, positions))
        };

        tokio::time::timeout(self.timeouts.snapshot, fetch)
            .await
            .map_err(|_| Error::Timeout {
                operation: "snapshot",
                seconds: self.timeouts.snapshot.as_secs(),
            })?
    }

    async fn apply(
        &self,
        target: &MonitoredAccount,
        positions: &[Position],
        evaluation: &Evaluation,
    ) -> CycleReport {
        let id = &target.id;
        let mut report = CycleReport {
            actions: evaluation.actions.len(),
            ..CycleReport::default()
        };
        // Outcome of the most recent close per (symbol, side) this cycle.
        let mut closed: HashMap<(Symbol, Side), bool> = HashMap::new();

        for action in &evaluation.actions {
            match action {
                Action::Alert {
                    level,
                    message,
                    context,
                } => {
                    self.alert(id, *level, message, context).await;
                }
                Action::CloseOne {
                    symbol,
                    side,
                    size,
                    reason,
                } => {
                    let ok = self.close(target, symbol, *side, *size, *reason).await;
                    report.tally(ok);
                    closed.insert((symbol.clone(), *side), ok);
                }
                Action::RecordTrade(trade) => {
                    if closed.get(&(trade.symbol.clone(), trade.side)) == Some(&false) {
                        debug!(account = %id, symbol = %trade.symbol, "Close failed, trade not recorded");
                        continue;
                    }
                    self.trade(id, trade).await;
                }
                Action::CloseAll { reason } => {
                    for position in positions {
                        let ok = self
                            .close(target, &position.symbol, position.side, position.contracts, *reason)
                            .await;
                        report.tally(ok);
                        if ok {
                            let trade =
                                TradeRecord::closing(position, position.pnl_percent(), *reason);
                            self.trade(id, &trade).await;
                        }
                    }
                }
                Action::BlockSymbolUntil { symbol, until } => {
                    info!(account = %id, symbol = %symbol, until = %until, "Symbol blocked");
                }
                Action::BlockAccountUntil { until } => {
                    info!(account = %id, until = %until, "Account blocked");
                }
            }
        }

        if let Some(metrics) = &evaluation.metrics {
            if let Err(e) = self.sink.record_metrics(id, metrics).await {
                warn!(account = %id, error = %e, "Failed to record metrics");
            }
        }

        report
    }

    /// Issue one close order. Failures are reported, never retried.
    async fn close(
        &self,
        target: &MonitoredAccount,
        symbol: &Symbol,
        side: Side,
        size: Decimal,
        reason: ReasonCode,
    ) -> bool {
        let attempt = tokio::time::timeout(
            self.timeouts.close,
            target
                .client
                .close_position(&target.credentials, symbol, side, size),
        )
        .await
        .unwrap_or_else(|_| {
            Err(ExchangeError::CloseFailed {
                symbol: symbol.to_string(),
                reason: format!("timed out after {}s", self.timeouts.close.as_secs()),
            }
            .into())
        });

        match attempt {
            Ok(confirmation) => {
                info!(
                    account = %target.id,
                    symbol = %symbol,
                    side = side.as_str(),
                    size = %size,
                    reason = %reason,
                    order_id = %confirmation.order_id,
                    "Position closed"
                );
                true
            }
            Err(e) => {
                warn!(account = %target.id, symbol = %symbol, error = %e, "Close failed");
                self.alert(
                    &target.id,
                    AlertLevel::Error,
                    &format!("Failed to close {symbol} {}: {e}", side.as_str()),
                    &json!({ "symbol": symbol, "side": side, "reason": reason }),
                )
                .await;
                false
            }
        }
    }

    async fn alert(
        &self,
        id: &AccountId,
        level: AlertLevel,
        message: &str,
        context: &serde_json::Value,
    ) {
        if let Err(e) = self.sink.record_alert(id, level, message, context).await {
            warn!(account = %id, error = %e, "Failed to record alert");
        }
    }

    async fn trade(&self, id: &AccountId, trade: &TradeRecord) {
        if let Err(e) = self.sink.record_trade(id, trade).await {
            warn!(account = %id, error = %e, "Failed to record trade");
        }
    }
}

impl CycleReport {
    fn tally(&mut self, ok: bool) {
        if ok {
            self.closes_succeeded += 1;
        } else {
            self.closes_failed += 1;
        }
    }
}

/// Load an account and apply lazy expiry, persisting any change.
///
/// Read paths outside the scheduler (the `status` and `unblock` commands)
/// use this so they never show stale blocks.
///
/// # Errors
/// Propagates store failures.
pub async fn load_refreshed(
    store: &dyn AccountStore,
    id: &AccountId,
    now: DateTime<Utc>,
) -> Result<Option<Account>> {
    let Some(mut account) = store.load_account(id).await? else {
        return Ok(None);
    };
    if account.refresh(now).changed() {
        store.save_account(&account).await?;
    }
    Ok(Some(account))
}
