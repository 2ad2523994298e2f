mod auth;
mod cli;
mod config;
mod error;
mod operations;
mod output;
mod providers;
mod repositories;
mod report;
mod watchdog;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting pipewatch - GitLab pipeline watchdog");
    cli.execute().await?;

    Ok(())
}
