//! riskguard - Autonomous risk-limit monitoring for trading accounts.
//!
//! This crate evaluates open positions and account balances against
//! per-account risk limits and closes or blocks positions when a limit is
//! breached. Blocks expire lazily at the next daily reset in a configured
//! time zone.
//!
//! # Architecture
//!
//! The crate follows a ports-and-adapters layout:
//!
//! - **`domain`** - Accounts, positions, risk parameters, blocking state and
//!   the actions the evaluator emits
//! - **`application::risk`** - The pure policy evaluator
//! - **`application::monitor`** - Activation, per-account cycles and the
//!   scheduler that drives them
//! - **`port`** - Traits for exchanges, account storage and reporting
//! - **`adapter`** - SQLite, in-memory, paper and REST implementations plus
//!   the CLI
//! - **`infrastructure`** - Configuration, exchange factory and wiring
//!
//! # Features
//!
//! - `testkit` - Builders and scripted collaborators for integration tests
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use riskguard::application::risk::{EvaluationInput, PolicyEvaluator};
//! use riskguard::domain::{BlockingState, RiskParams};
//! use rust_decimal::Decimal;
//!
//! let params = RiskParams::try_new(
//!     Decimal::new(5, 0),
//!     Decimal::new(10, 0),
//!     Decimal::new(20, 0),
//!     3,
//! )
//! .unwrap();
//! let evaluation = PolicyEvaluator::default().evaluate(EvaluationInput {
//!     risk_params: &params,
//!     blocking: BlockingState::new(),
//!     balance: Decimal::new(1000, 0),
//!     initial_balance: Decimal::new(1000, 0),
//!     positions: &[],
//!     now: Utc::now(),
//! });
//! assert!(evaluation.actions.is_empty());
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
