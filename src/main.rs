use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;
mod config;
mod error;
mod interaction_log;
mod invoke;
mod output;
mod pipeline;
mod provider;
#[cfg(test)]
mod testing;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing - only show logs with --verbose
    let filter = if cli.verbose {
        EnvFilter::new("casegen=debug")
    } else {
        EnvFilter::new("casegen=warn")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate(args) => cli::generate::execute(args).await,
        Commands::Schema => cli::schema::execute(),
    }
}
