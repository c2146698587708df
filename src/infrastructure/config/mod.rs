//! Infrastructure configuration modules.

pub mod account;
pub mod logging;
pub mod monitor;
pub mod settings;

pub use account::{AccountConfig, RiskLimitsConfig};
pub use logging::LoggingConfig;
pub use monitor::MonitorConfig;
pub use settings::Config;
