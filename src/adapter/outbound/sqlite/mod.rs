//! SQLite persistence adapters.
//!
//! Provides the SQLite-backed account store and reporting sink using
//! Diesel ORM.

pub mod database;
pub mod recorder;
pub mod store;

pub use recorder::{AlertEntry, SqliteReportSink, TradeEntry};
pub use store::SqliteAccountStore;
