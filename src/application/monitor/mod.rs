//! Continuous monitoring of activated accounts.

pub mod activation;
pub mod cycle;
pub mod scheduler;

pub use activation::{Activation, ActivationRequest, Activator, Rejection};
pub use cycle::{
    load_refreshed, CycleOutcome, CycleReport, CycleRunner, CycleTimeouts, MonitoredAccount,
    SkipReason,
};
pub use scheduler::{CycleResult, InFlight, InFlightGuard, Scheduler, SchedulerSettings};
