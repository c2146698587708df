//! Composition root for runtime wiring.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::adapter::outbound::sqlite::database::connection::open;
use crate::adapter::outbound::sqlite::{SqliteAccountStore, SqliteReportSink};
use crate::application::monitor::{
    Activation, ActivationRequest, Activator, CycleRunner, Scheduler,
};
use crate::application::risk::PolicyEvaluator;
use crate::error::Result;
use crate::infrastructure::config::Config;
use crate::infrastructure::exchange::ExchangeFactory;
use crate::port::{AccountStore, ReportSink};

/// SQLite-backed store and sink sharing one pool.
pub struct Storage {
    pub store: Arc<SqliteAccountStore>,
    pub sink: Arc<SqliteReportSink>,
}

/// Open the configured database, running pending migrations.
///
/// # Errors
/// Returns an error if the database cannot be opened or migrated.
pub fn open_storage(config: &Config) -> Result<Storage> {
    let pool = open(&config.database)?;
    info!(database = %config.database, "Database initialized");
    Ok(Storage {
        store: Arc::new(SqliteAccountStore::new(pool.clone())),
        sink: Arc::new(SqliteReportSink::new(pool)),
    })
}

/// Build activation requests for every configured account.
///
/// # Errors
/// Returns an error if an account entry fails validation.
pub fn activation_requests(config: &Config) -> Result<Vec<ActivationRequest>> {
    let factory = ExchangeFactory::new(config.monitor.cycle_timeouts().snapshot);
    config
        .accounts
        .iter()
        .map(|account| -> Result<ActivationRequest> {
            Ok(ActivationRequest {
                id: account.account_id()?,
                exchange: account.exchange.clone(),
                risk_params: account.risk.to_params()?,
                connection: factory.connect(account),
            })
        })
        .collect()
}

/// Activate configured accounts and build the scheduler for them.
///
/// # Errors
/// Returns an error on invalid configuration or store failure. Accounts
/// rejected at activation are alerted on and left out.
pub async fn build_scheduler(
    config: &Config,
    store: Arc<dyn AccountStore>,
    sink: Arc<dyn ReportSink>,
) -> Result<Scheduler> {
    let timezone = config.monitor.timezone()?;
    let timeouts = config.monitor.cycle_timeouts();

    let activator = Activator::new(Arc::clone(&store), Arc::clone(&sink), timeouts.snapshot);
    let activations = activator
        .activate_all(activation_requests(config)?)
        .await?;

    let mut monitored = Vec::with_capacity(activations.len());
    for activation in activations {
        match activation {
            Activation::Monitored(account) => monitored.push(account),
            Activation::Rejected { id, rejection } => {
                warn!(account = %id, ?rejection, "Account excluded from monitoring");
            }
        }
    }

    let runner = CycleRunner::new(store, sink, PolicyEvaluator::new(timezone), timeouts);
    Ok(Scheduler::new(
        Arc::new(runner),
        monitored,
        config.monitor.scheduler_settings(),
    ))
}

/// Run the monitor until `shutdown` fires.
///
/// # Errors
/// Returns an error if startup fails; the loop itself never errors.
pub async fn run_with_shutdown(config: &Config, shutdown: watch::Receiver<bool>) -> Result<()> {
    let storage = open_storage(config)?;
    let scheduler = build_scheduler(config, storage.store, storage.sink).await?;

    if scheduler.account_count() == 0 {
        warn!("No accounts activated, monitor will idle");
    }
    scheduler.run(shutdown).await;
    Ok(())
}
