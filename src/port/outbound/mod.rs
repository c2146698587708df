//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe infrastructure dependencies: the exchange
//! (snapshots and closes), the account store, and the reporting sink.

pub mod exchange;
pub mod report;
pub mod store;
