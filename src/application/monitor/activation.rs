//! Account activation at startup.
//!
//! Every configured account is registered in the store. A new account
//! records its current balance as the drawdown baseline; an existing one
//! keeps its baseline and blocking state but picks up the configured risk
//! parameters. Configuration failures disable only the affected account.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::json;
use tracing::{error, info, warn};

use super::cycle::MonitoredAccount;
use crate::domain::{Account, AccountId, AlertLevel, RiskParams};
use crate::error::{ConfigError, Error, ExchangeError, Result};
use crate::port::{AccountStore, Credentials, ExchangeClient, ReportSink};

/// A configured account and its exchange connection, if one could be built.
pub struct ActivationRequest {
    pub id: AccountId,
    pub exchange: String,
    pub risk_params: RiskParams,
    pub connection: std::result::Result<(Arc<dyn ExchangeClient>, Credentials), ConfigError>,
}

/// Why an account was left out of monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Bad exchange name, credentials or baseline. Needs operator action.
    Config(String),
    /// The exchange could not be reached; retried on next start.
    Unavailable(String),
}

/// Outcome of one activation attempt.
#[derive(Debug)]
pub enum Activation {
    Monitored(MonitoredAccount),
    Rejected { id: AccountId, rejection: Rejection },
}

impl Activation {
    #[must_use]
    pub fn into_monitored(self) -> Option<MonitoredAccount> {
        match self {
            Self::Monitored(account) => Some(account),
            Self::Rejected { .. } => None,
        }
    }
}

/// Registers configured accounts with the store.
pub struct Activator {
    store: Arc<dyn AccountStore>,
    sink: Arc<dyn ReportSink>,
    balance_timeout: Duration,
}

impl Activator {
    pub fn new(
        store: Arc<dyn AccountStore>,
        sink: Arc<dyn ReportSink>,
        balance_timeout: Duration,
    ) -> Self {
        Self {
            store,
            sink,
            balance_timeout,
        }
    }

    /// Activate every request, in order.
    ///
    /// # Errors
    /// Only store failures abort the batch.
    pub async fn activate_all(&self, requests: Vec<ActivationRequest>) -> Result<Vec<Activation>> {
        let mut activations = Vec::with_capacity(requests.len());
        for request in requests {
            activations.push(self.activate(request).await?);
        }
        Ok(activations)
    }

    /// Activate one account.
    ///
    /// # Errors
    /// Returns an error when the store cannot be read or written.
    pub async fn activate(&self, request: ActivationRequest) -> Result<Activation> {
        let ActivationRequest {
            id,
            exchange,
            risk_params,
            connection,
        } = request;

        let (client, credentials) = match connection {
            Ok(connection) => connection,
            Err(e) => return Ok(self.reject_config(id, e.to_string()).await),
        };

        if let Some(mut account) = self.store.load_account(&id).await? {
            account.exchange = exchange;
            account.risk_params = risk_params;
            self.store.save_account(&account).await?;
            info!(
                account = %id,
                initial_balance = %account.initial_balance,
                active = account.is_active,
                "Account resumed"
            );
            return Ok(Activation::Monitored(MonitoredAccount {
                id,
                credentials,
                client,
            }));
        }

        let balance = match self.fetch_baseline(client.as_ref(), &credentials).await {
            Ok(balance) => balance,
            Err(Error::Exchange(ExchangeError::AuthFailed(reason))) => {
                return Ok(self
                    .reject_config(id, format!("authentication rejected: {reason}"))
                    .await);
            }
            Err(e) => return Ok(self.reject_unavailable(id, e.to_string()).await),
        };

        if balance <= Decimal::ZERO {
            return Ok(self
                .reject_config(id, format!("initial balance must be positive, got {balance}"))
                .await);
        }

        let account = Account::activated(id.clone(), exchange, risk_params, balance);
        self.store.save_account(&account).await?;
        info!(account = %id, initial_balance = %balance, "Account activated");

        Ok(Activation::Monitored(MonitoredAccount {
            id,
            credentials,
            client,
        }))
    }

    async fn fetch_baseline(
        &self,
        client: &dyn ExchangeClient,
        credentials: &Credentials,
    ) -> Result<Decimal> {
        tokio::time::timeout(self.balance_timeout, client.fetch_balance(credentials))
            .await
            .map_err(|_| Error::Timeout {
                operation: "balance",
                seconds: self.balance_timeout.as_secs(),
            })?
    }

    async fn reject_config(&self, id: AccountId, reason: String) -> Activation {
        error!(account = %id, reason = %reason, "Account not activated");
        self.alert(
            &id,
            AlertLevel::Critical,
            &format!("Account not activated: {reason}"),
        )
        .await;
        Activation::Rejected {
            id,
            rejection: Rejection::Config(reason),
        }
    }

    async fn reject_unavailable(&self, id: AccountId, reason: String) -> Activation {
        warn!(account = %id, reason = %reason, "Account activation deferred");
        self.alert(
            &id,
            AlertLevel::Error,
            &format!("Could not fetch initial balance: {reason}"),
        )
        .await;
        Activation::Rejected {
            id,
            rejection: Rejection::Unavailable(reason),
        }
    }

    async fn alert(&self, id: &AccountId, level: AlertLevel, message: &str) {
        let context = json!({ "account": id });
        if let Err(e) = self.sink.record_alert(id, level, message, &context).await {
            warn!(account = %id, error = %e, "Failed to record alert");
        }
    }
}
