//! Exchange wiring.
//!
//! ## Adding a New Exchange
//!
//! 1. Create an adapter under `adapter/outbound/<name>.rs`
//! 2. Implement [`crate::port::SnapshotProvider`], [`crate::port::ActionExecutor`]
//!    and [`crate::port::ExchangeClient`]
//! 3. Add its name to [`SUPPORTED_EXCHANGES`] and a branch in
//!    [`ExchangeFactory::connect`]

mod factory;

pub use factory::{ExchangeFactory, SUPPORTED_EXCHANGES};
