//! Periodic dispatch of account cycles.
//!
//! Every tick spawns one cycle per monitored account into a [`JoinSet`].
//! An account whose previous cycle is still running is skipped for that
//! tick. Failures and panics stay inside the account's task.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinError, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::cycle::{CycleOutcome, CycleRunner, MonitoredAccount};
use crate::domain::{AccountId, AlertLevel};

/// Tick and shutdown timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub interval: Duration,
    /// How long in-flight cycles may finish after shutdown is requested.
    pub shutdown_grace: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

/// Final state of one dispatched cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleResult {
    pub account: AccountId,
    pub outcome: Result<CycleOutcome, String>,
}

/// Accounts with a cycle currently running.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    accounts: Arc<Mutex<HashSet<AccountId>>>,
}

impl InFlight {
    /// Claim `id`, or `None` if a cycle for it is already running.
    pub fn try_claim(&self, id: &AccountId) -> Option<InFlightGuard> {
        if !self.accounts.lock().insert(id.clone()) {
            return None;
        }
        Some(InFlightGuard {
            accounts: Arc::clone(&self.accounts),
            id: id.clone(),
        })
    }

    #[must_use]
    pub fn contains(&self, id: &AccountId) -> bool {
        self.accounts.lock().contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases an in-flight claim when dropped, including on panic or abort.
#[derive(Debug)]
pub struct InFlightGuard {
    accounts: Arc<Mutex<HashSet<AccountId>>>,
    id: AccountId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.accounts.lock().remove(&self.id);
    }
}

/// Aborts the inner cycle task if the supervising task is dropped.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Drives cycles for a fixed set of activated accounts.
pub struct Scheduler {
    runner: Arc<CycleRunner>,
    accounts: Vec<Arc<MonitoredAccount>>,
    in_flight: InFlight,
    settings: SchedulerSettings,
}

impl Scheduler {
    pub fn new(
        runner: Arc<CycleRunner>,
        accounts: Vec<MonitoredAccount>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            runner,
            accounts: accounts.into_iter().map(Arc::new).collect(),
            in_flight: InFlight::default(),
            settings,
        }
    }

    #[must_use]
    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Spawn one cycle per account not already in flight.
    ///
    /// Returns the number of cycles spawned.
    pub fn dispatch(&self, tasks: &mut JoinSet<CycleResult>, now: DateTime<Utc>) -> usize {
        let mut spawned = 0;
        for target in &self.accounts {
            let Some(guard) = self.in_flight.try_claim(&target.id) else {
                debug!(account = %target.id, "Previous cycle still running, skipping tick");
                continue;
            };

            let runner = Arc::clone(&self.runner);
            let target = Arc::clone(target);
            tasks.spawn(supervise(runner, target, guard, now));
            spawned += 1;
        }
        spawned
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            accounts = self.accounts.len(),
            interval_secs = self.settings.interval.as_secs(),
            "Risk monitor started"
        );

        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                result = shutdown.changed() => {
                    match result {
                        Ok(()) => {
                            if *shutdown.borrow() {
                                info!("Shutdown signal received");
                                break;
                            }
                        }
                        Err(_) => {
                            info!("Shutdown channel closed");
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    self.dispatch(&mut tasks, Utc::now());
                }
                Some(joined) = tasks.join_next() => reap(joined),
            }
        }

        self.drain(tasks).await;
        info!("Risk monitor stopped");
    }

    /// Let in-flight cycles finish within the grace period, then abort.
    async fn drain(&self, mut tasks: JoinSet<CycleResult>) {
        if tasks.is_empty() {
            return;
        }
        info!(in_flight = tasks.len(), "Waiting for in-flight cycles");

        let grace = self.settings.shutdown_grace;
        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = tasks.join_next().await {
                reap(joined);
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = tasks.len(),
                grace_secs = grace.as_secs(),
                "Grace period elapsed, aborting cycles"
            );
            tasks.shutdown().await;
        }
    }
}

/// Run a cycle in its own task so a panic is caught at the join boundary.
async fn supervise(
    runner: Arc<CycleRunner>,
    target: Arc<MonitoredAccount>,
    _guard: InFlightGuard,
    now: DateTime<Utc>,
) -> CycleResult {
    let inner_runner = Arc::clone(&runner);
    let inner_target = Arc::clone(&target);
    let handle = tokio::spawn(async move { inner_runner.run(&inner_target, now).await });
    let _abort = AbortOnDrop(handle.abort_handle());

    let outcome = match handle.await {
        Ok(Ok(outcome)) => Ok(outcome),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) if e.is_panic() => Err(format!("cycle panicked: {}", panic_message(e))),
        Err(e) => {
            debug!(account = %target.id, error = %e, "Cycle cancelled");
            return CycleResult {
                account: target.id.clone(),
                outcome: Err("cycle cancelled".to_string()),
            };
        }
    };

    if let Err(reason) = &outcome {
        error!(account = %target.id, error = %reason, "Cycle failed");
        let context = json!({ "error": reason });
        if let Err(e) = runner
            .sink()
            .record_alert(&target.id, AlertLevel::Error, &format!("Cycle failed: {reason}"), &context)
            .await
        {
            warn!(account = %target.id, error = %e, "Failed to record alert");
        }
    }

    CycleResult {
        account: target.id.clone(),
        outcome,
    }
}

fn panic_message(error: JoinError) -> String {
    let payload = error.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn reap(joined: Result<CycleResult, JoinError>) {
    match joined {
        Ok(CycleResult {
            account,
            outcome: Ok(outcome),
        }) => debug!(account = %account, ?outcome, "Cycle finished"),
        Ok(_) => {}
        Err(e) if e.is_panic() => error!(error = %e, "Cycle supervisor panicked"),
        Err(_) => {}
    }
}
