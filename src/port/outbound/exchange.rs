//! Exchange port for account snapshots and position closes.
//!
//! This module defines the traits for interacting with a derivatives
//! exchange. Adapters normalize exchange payloads into domain
//! [`Position`]s before they reach the engine.

use std::fmt;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{position::Position, position::Side, Symbol};
use crate::error::Result;

/// API credentials for one account.
///
/// Resolved from the environment at startup; the secret is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Exchange acknowledgement of a close order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseConfirmation {
    /// Order ID assigned by the exchange.
    pub order_id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub size: Decimal,
}

/// Source of balance and open positions for an account.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Current account balance.
    ///
    /// # Errors
    /// Fails with [`ExchangeError::BalanceUnavailable`](crate::error::ExchangeError)
    /// on transport or authentication failure.
    async fn fetch_balance(&self, credentials: &Credentials) -> Result<Decimal>;

    /// Positions with strictly positive size.
    ///
    /// Fails soft: a transport error is logged by the adapter and yields an
    /// empty list.
    async fn fetch_open_positions(&self, credentials: &Credentials) -> Vec<Position>;
}

/// Applies close decisions against the exchange.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Close an open position with a reduce-only market order in the
    /// opposite direction of `side`.
    ///
    /// Must never open a new position. Not retried within a cycle.
    ///
    /// # Errors
    /// Fails with [`ExchangeError::CloseFailed`](crate::error::ExchangeError).
    async fn close_position(
        &self,
        credentials: &Credentials,
        symbol: &Symbol,
        side: Side,
        size: Decimal,
    ) -> Result<CloseConfirmation>;
}

/// A full exchange collaborator: snapshots plus execution.
pub trait ExchangeClient: SnapshotProvider + ActionExecutor {
    /// Adapter name for logs.
    fn name(&self) -> &'static str;
}
