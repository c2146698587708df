//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`domain`]: Builders for positions, risk parameters and accounts.
//! - [`exchange`]: [`ScriptedExchange`](exchange::ScriptedExchange), an
//!   exchange double that can fail, hang, panic or stall on demand.

pub mod domain;
pub mod exchange;
