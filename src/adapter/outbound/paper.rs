//! Paper exchange: simulated balances and positions held in memory.
//!
//! Books are keyed by API key so one instance can serve several
//! accounts. Closes are reduce-only: closing a position that is not open
//! fails instead of opening the opposite side.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::info;

use crate::domain::{Position, Side, Symbol};
use crate::error::{ExchangeError, Result};
use crate::port::{ActionExecutor, CloseConfirmation, Credentials, ExchangeClient, SnapshotProvider};

#[derive(Debug, Clone, Default)]
struct PaperBook {
    balance: Decimal,
    positions: Vec<Position>,
}

/// In-memory simulated exchange.
#[derive(Debug, Default)]
pub struct PaperExchange {
    books: RwLock<HashMap<String, PaperBook>>,
    next_order: AtomicU64,
}

impl PaperExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or reset) the book for `api_key`.
    pub fn with_account(self, api_key: impl Into<String>, balance: Decimal) -> Self {
        self.books.write().insert(
            api_key.into(),
            PaperBook {
                balance,
                positions: Vec::new(),
            },
        );
        self
    }

    pub fn set_balance(&self, api_key: &str, balance: Decimal) {
        self.books
            .write()
            .entry(api_key.to_string())
            .or_default()
            .balance = balance;
    }

    pub fn open_position(&self, api_key: &str, position: Position) {
        self.books
            .write()
            .entry(api_key.to_string())
            .or_default()
            .positions
            .push(position);
    }

    /// Open positions for `api_key`, in opening order.
    pub fn positions(&self, api_key: &str) -> Vec<Position> {
        self.books
            .read()
            .get(api_key)
            .map(|book| book.positions.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SnapshotProvider for PaperExchange {
    async fn fetch_balance(&self, credentials: &Credentials) -> Result<Decimal> {
        self.books
            .read()
            .get(&credentials.api_key)
            .map(|book| book.balance)
            .ok_or_else(|| ExchangeError::AuthFailed("unknown paper api key".to_string()).into())
    }

    async fn fetch_open_positions(&self, credentials: &Credentials) -> Vec<Position> {
        self.positions(&credentials.api_key)
            .into_iter()
            .filter(Position::is_open)
            .collect()
    }
}

#[async_trait]
impl ActionExecutor for PaperExchange {
    async fn close_position(
        &self,
        credentials: &Credentials,
        symbol: &Symbol,
        side: Side,
        size: Decimal,
    ) -> Result<CloseConfirmation> {
        let mut books = self.books.write();
        let book = books
            .get_mut(&credentials.api_key)
            .ok_or_else(|| ExchangeError::AuthFailed("unknown paper api key".to_string()))?;

        let index = reduce_target(&book.positions, symbol, side, size).ok_or_else(|| {
            ExchangeError::CloseFailed {
                symbol: symbol.to_string(),
                reason: "no open position to reduce".to_string(),
            }
        })?;
        // Reduce-only: never flip the position.
        let filled = size.min(book.positions[index].contracts);
        book.positions[index].contracts -= filled;
        let closed = if book.positions[index].is_open() {
            book.positions[index].clone()
        } else {
            book.positions.remove(index)
        };

        let order_id = format!("paper-{}", self.next_order.fetch_add(1, Ordering::Relaxed) + 1);
        info!(
            symbol = %symbol,
            side = side.closing_order_side(),
            amount = %filled,
            order_id = %order_id,
            "Paper close filled"
        );

        Ok(CloseConfirmation {
            order_id,
            symbol: closed.symbol,
            side,
            size: filled,
        })
    }
}

/// Position a reduce order of `size` applies to: the one holding exactly
/// `size` contracts if any, otherwise the first with that symbol and side.
fn reduce_target(positions: &[Position], symbol: &Symbol, side: Side, size: Decimal) -> Option<usize> {
    let matching = |p: &Position| &p.symbol == symbol && p.side == side && p.is_open();
    positions
        .iter()
        .position(|p| matching(p) && p.contracts == size)
        .or_else(|| positions.iter().position(|p| matching(p)))
}

impl ExchangeClient for PaperExchange {
    fn name(&self) -> &'static str {
        "paper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn position(symbol: &str, side: Side) -> Position {
        Position {
            symbol: Symbol::from(symbol),
            side,
            leverage: dec!(2),
            entry_price: dec!(100),
            mark_price: dec!(101),
            contracts: dec!(1),
            opened_at: Utc::now(),
            reported_pnl_percent: None,
        }
    }

    #[tokio::test]
    async fn close_removes_the_position() {
        let exchange = PaperExchange::new().with_account("key", dec!(500));
        exchange.open_position("key", position("BTC/USDT", Side::Long));
        let creds = Credentials::new("key", "secret");

        let ack = exchange
            .close_position(&creds, &Symbol::from("BTC/USDT"), Side::Long, dec!(1))
            .await
            .unwrap();

        assert_eq!(ack.order_id, "paper-1");
        assert!(exchange.fetch_open_positions(&creds).await.is_empty());
    }

    #[tokio::test]
    async fn close_reduces_the_position_of_matching_size() {
        let exchange = PaperExchange::new().with_account("key", dec!(500));
        exchange.open_position("key", position("BTC/USDT", Side::Long));
        exchange.open_position(
            "key",
            Position {
                contracts: dec!(5),
                ..position("BTC/USDT", Side::Long)
            },
        );
        let creds = Credentials::new("key", "secret");
        let btc = Symbol::from("BTC/USDT");

        exchange
            .close_position(&creds, &btc, Side::Long, dec!(5))
            .await
            .unwrap();
        let open = exchange.positions("key");
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].contracts, dec!(1));

        let ack = exchange
            .close_position(&creds, &btc, Side::Long, dec!(0.4))
            .await
            .unwrap();
        assert_eq!(ack.size, dec!(0.4));
        assert_eq!(exchange.positions("key")[0].contracts, dec!(0.6));
    }

    #[tokio::test]
    async fn closing_a_missing_position_fails() {
        let exchange = PaperExchange::new().with_account("key", dec!(500));
        exchange.open_position("key", position("BTC/USDT", Side::Long));
        let creds = Credentials::new("key", "secret");

        let result = exchange
            .close_position(&creds, &Symbol::from("BTC/USDT"), Side::Short, dec!(1))
            .await;

        assert!(matches!(
            result,
            Err(Error::Exchange(ExchangeError::CloseFailed { .. }))
        ));
        assert_eq!(exchange.positions("key").len(), 1);
    }

    #[tokio::test]
    async fn unknown_key_is_an_auth_failure() {
        let exchange = PaperExchange::new();
        let result = exchange.fetch_balance(&Credentials::new("nope", "x")).await;
        assert!(matches!(
            result,
            Err(Error::Exchange(ExchangeError::AuthFailed(_)))
        ));
    }
}
