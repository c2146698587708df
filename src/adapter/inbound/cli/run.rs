//! Handler for the `run` command.

use tokio::sync::watch;
use tracing::{info, warn};

use crate::adapter::inbound::cli::command::ConfigPathArg;
use crate::adapter::inbound::cli::output;
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::Config;

/// Execute the run command.
///
/// Runs the monitor in the foreground until Ctrl-C, then lets in-flight
/// cycles drain before returning.
pub async fn execute(args: &ConfigPathArg) -> Result<()> {
    let config = Config::load(&args.config)?;
    config.init_logging();

    print_startup(&args.config.display().to_string(), &config);
    info!(accounts = config.accounts.len(), "riskguard starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = bootstrap::run_with_shutdown(&config, shutdown_rx);
    tokio::pin!(monitor);

    tokio::select! {
        result = &mut monitor => return result,
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                info!("Shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => warn!(error = %e, "Unable to listen for shutdown signal"),
        },
    }

    let result = monitor.await;
    info!("riskguard stopped");
    result
}

fn print_startup(config_path: &str, config: &Config) {
    if output::is_json() {
        return;
    }
    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Config", config_path);
    output::field("Database", &config.database);
    output::field("Accounts", config.accounts.len());
    output::field("Interval", format!("{}s", config.monitor.interval_secs));
    output::field("Reset zone", &config.monitor.timezone);
    if config.accounts.is_empty() {
        output::warning("No accounts configured");
    }
}
