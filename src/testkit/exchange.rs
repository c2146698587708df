//! Scripted exchange double for cycle and scheduler tests.
//!
//! [`ScriptedExchange`] serves a fixed balance and position list and can
//! be told to fail, hang, panic or stall on the balance call. Close orders
//! reduce the matching position by the order size unless the symbol is
//! scripted to fail.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::domain::{Position, Side, Symbol};
use crate::error::{ExchangeError, Result};
use crate::port::{ActionExecutor, CloseConfirmation, Credentials, ExchangeClient, SnapshotProvider};

/// How the next balance requests behave.
#[derive(Debug, Clone)]
pub enum SnapshotBehavior {
    /// Return the scripted balance.
    Respond,
    /// Fail with this error.
    Fail(ExchangeError),
    /// Never complete.
    Hang,
    /// Panic inside the call.
    Panic,
    /// Return the balance after a delay.
    Delay(Duration),
}

/// A close order the exchange received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseCall {
    pub symbol: Symbol,
    pub side: Side,
    pub size: Decimal,
}

/// Exchange double with scripted snapshots and close outcomes.
#[derive(Debug)]
pub struct ScriptedExchange {
    balance: RwLock<Decimal>,
    positions: RwLock<Vec<Position>>,
    behavior: RwLock<SnapshotBehavior>,
    failing_closes: RwLock<HashSet<Symbol>>,
    closes: RwLock<Vec<CloseCall>>,
    balance_calls: AtomicU32,
    active: Arc<AtomicU32>,
    max_active: AtomicU32,
}

impl ScriptedExchange {
    pub fn new(balance: Decimal) -> Self {
        Self {
            balance: RwLock::new(balance),
            positions: RwLock::new(Vec::new()),
            behavior: RwLock::new(SnapshotBehavior::Respond),
            failing_closes: RwLock::new(HashSet::new()),
            closes: RwLock::new(Vec::new()),
            balance_calls: AtomicU32::new(0),
            active: Arc::new(AtomicU32::new(0)),
            max_active: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn with_positions(self, positions: impl IntoIterator<Item = Position>) -> Self {
        *self.positions.write() = positions.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_behavior(self, behavior: SnapshotBehavior) -> Self {
        self.set_behavior(behavior);
        self
    }

    /// Make every close of `symbol` fail.
    #[must_use]
    pub fn failing_close(self, symbol: &str) -> Self {
        self.failing_closes.write().insert(Symbol::from(symbol));
        self
    }

    pub fn set_balance(&self, balance: Decimal) {
        *self.balance.write() = balance;
    }

    pub fn set_positions(&self, positions: impl IntoIterator<Item = Position>) {
        *self.positions.write() = positions.into_iter().collect();
    }

    pub fn set_behavior(&self, behavior: SnapshotBehavior) {
        *self.behavior.write() = behavior;
    }

    /// Positions still open.
    pub fn positions(&self) -> Vec<Position> {
        self.positions.read().clone()
    }

    /// Close orders received so far, in order.
    pub fn closes(&self) -> Vec<CloseCall> {
        self.closes.read().clone()
    }

    /// Number of balance requests made.
    pub fn balance_calls(&self) -> u32 {
        self.balance_calls.load(Ordering::SeqCst)
    }

    /// Highest number of balance requests ever running at once.
    pub fn max_concurrent_snapshots(&self) -> u32 {
        self.max_active.load(Ordering::SeqCst)
    }
}

/// Counts a running balance request until dropped.
struct ActiveCall(Arc<AtomicU32>);

impl Drop for ActiveCall {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SnapshotProvider for ScriptedExchange {
    async fn fetch_balance(&self, _credentials: &Credentials) -> Result<Decimal> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(running, Ordering::SeqCst);
        let _active = ActiveCall(Arc::clone(&self.active));

        let behavior = self.behavior.read().clone();
        match behavior {
            SnapshotBehavior::Respond => {}
            SnapshotBehavior::Fail(error) => return Err(error.into()),
            SnapshotBehavior::Hang => std::future::pending::<()>().await,
            SnapshotBehavior::Panic => panic!("scripted exchange panic"),
            SnapshotBehavior::Delay(delay) => tokio::time::sleep(delay).await,
        }
        Ok(*self.balance.read())
    }

    async fn fetch_open_positions(&self, _credentials: &Credentials) -> Vec<Position> {
        self.positions
            .read()
            .iter()
            .filter(|p| p.is_open())
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ActionExecutor for ScriptedExchange {
    async fn close_position(
        &self,
        _credentials: &Credentials,
        symbol: &Symbol,
        side: Side,
        size: Decimal,
    ) -> Result<CloseConfirmation> {
        self.closes.write().push(CloseCall {
            symbol: symbol.clone(),
            side,
            size,
        });

        if self.failing_closes.read().contains(symbol) {
            return Err(ExchangeError::CloseFailed {
                symbol: symbol.to_string(),
                reason: "scripted rejection".to_string(),
            }
            .into());
        }

        let mut positions = self.positions.write();
        let matching = |p: &Position| &p.symbol == symbol && p.side == side;
        let Some(index) = positions
            .iter()
            .position(|p| matching(p) && p.contracts == size)
            .or_else(|| positions.iter().position(|p| matching(p)))
        else {
            return Err(ExchangeError::CloseFailed {
                symbol: symbol.to_string(),
                reason: "no open position".to_string(),
            }
            .into());
        };
        let current = positions[index].contracts;
        positions[index].contracts -= size.min(current);
        if !positions[index].is_open() {
            positions.remove(index);
        }
        drop(positions);

        Ok(CloseConfirmation {
            order_id: format!("scripted-{}", self.closes.read().len()),
            symbol: symbol.clone(),
            side,
            size,
        })
    }
}

impl ExchangeClient for ScriptedExchange {
    fn name(&self) -> &'static str {
        "scripted"
    }
}
