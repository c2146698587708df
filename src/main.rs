use clap::Parser;

use riskguard::adapter::inbound::cli::command::{Cli, Commands};
use riskguard::adapter::inbound::cli::output::{self, OutputConfig};
use riskguard::adapter::inbound::cli::{check, run, status, unblock};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    output::set_color(cli.color.forced());
    output::configure(OutputConfig::new(cli.json, cli.quiet));

    let result = match &cli.command {
        Commands::Run(args) => run::execute(args).await,
        Commands::Status(args) => status::execute(args).await,
        Commands::Unblock(args) => unblock::execute(args).await,
        Commands::Check(args) => check::execute(args).await,
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
