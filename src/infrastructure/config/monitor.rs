//! Scheduler timing configuration.

use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::application::monitor::{CycleTimeouts, SchedulerSettings};
use crate::error::ConfigError;

/// `[monitor]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Deadline for fetching balance and positions.
    #[serde(default = "default_timeout_secs")]
    pub cycle_timeout_secs: u64,

    /// Deadline for each close order.
    #[serde(default = "default_timeout_secs")]
    pub close_timeout_secs: u64,

    /// How long in-flight cycles may run after shutdown is requested.
    #[serde(default = "default_timeout_secs")]
    pub shutdown_grace_secs: u64,

    /// IANA time zone whose midnight ends daily blocks.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_interval_secs() -> u64 {
    5
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            cycle_timeout_secs: default_timeout_secs(),
            close_timeout_secs: default_timeout_secs(),
            shutdown_grace_secs: default_timeout_secs(),
            timezone: default_timezone(),
        }
    }
}

impl MonitorConfig {
    /// Parsed reset time zone.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] for names not in the IANA database.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "timezone",
                reason: e.to_string(),
            })
    }

    #[must_use]
    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            interval: Duration::from_secs(self.interval_secs),
            shutdown_grace: Duration::from_secs(self.shutdown_grace_secs),
        }
    }

    #[must_use]
    pub fn cycle_timeouts(&self) -> CycleTimeouts {
        CycleTimeouts {
            snapshot: Duration::from_secs(self.cycle_timeout_secs),
            close: Duration::from_secs(self.close_timeout_secs),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("interval_secs", self.interval_secs),
            ("cycle_timeout_secs", self.cycle_timeout_secs),
            ("close_timeout_secs", self.close_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than 0".to_string(),
                });
            }
        }
        self.timezone()?;
        Ok(())
    }
}
