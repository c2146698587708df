//! Exchange-agnostic domain types.
//!
//! Everything here is pure data plus invariants: no I/O, no wall-clock
//! reads. Time always arrives as an explicit `now` argument.

pub mod account;
pub mod action;
pub mod blocking;
pub mod error;
pub mod id;
pub mod position;
pub mod risk;

pub use account::{Account, AccountMetrics, RefreshOutcome};
pub use action::{Action, AlertLevel, ReasonCode, TradeRecord};
pub use blocking::{next_daily_reset, BlockingState, PurgeReport};
pub use error::DomainError;
pub use id::{AccountId, Symbol};
pub use position::{resolve_opened_at, Position, Side};
pub use risk::RiskParams;
