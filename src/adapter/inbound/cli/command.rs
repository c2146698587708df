//! Command-line interface definitions.
//!
//! Defines the CLI structure for the riskguard application using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG: &str = "config.toml";

/// Autonomous risk-limit monitor for trading accounts
#[derive(Parser, Debug)]
#[command(name = "riskguard")]
#[command(version)]
pub struct Cli {
    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Explicit override, or `None` for terminal detection.
    #[must_use]
    pub const fn forced(self) -> Option<bool> {
        match self {
            Self::Auto => None,
            Self::Always => Some(true),
            Self::Never => Some(false),
        }
    }
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the risk monitor (foreground)
    Run(ConfigPathArg),

    /// Show account state, blocks and recent alerts
    Status(StatusArgs),

    /// Lift an account block or a single symbol block
    Unblock(UnblockArgs),

    /// Validate configuration and exchange credentials
    Check(CheckArgs),
}

/// Shared argument struct for commands that require only a configuration path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to the configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Only show this account.
    pub account: Option<String>,

    /// Path to the configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Number of recent alerts to show per account.
    #[arg(long, default_value = "5")]
    pub alerts: i64,
}

/// Arguments for the `unblock` subcommand.
#[derive(Parser, Debug)]
pub struct UnblockArgs {
    /// Account to unblock.
    pub account: String,

    /// Clear only this symbol's block instead of the account block.
    #[arg(long)]
    pub symbol: Option<String>,

    /// Path to the configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
}

/// Arguments for the `check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Path to the configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Also fetch each account's balance from its exchange.
    #[arg(long)]
    pub live: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unblock_with_symbol() {
        let cli = Cli::parse_from(["riskguard", "unblock", "main", "--symbol", "BTC/USDT"]);
        match cli.command {
            Commands::Unblock(args) => {
                assert_eq!(args.account, "main");
                assert_eq!(args.symbol.as_deref(), Some("BTC/USDT"));
                assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["riskguard", "status", "--json", "-c", "other.toml"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Status(ref a) if a.config == PathBuf::from("other.toml")));
    }
}
