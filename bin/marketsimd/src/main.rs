//! ---
//! msim_section: "01-core-functionality"
//! msim_subsection: "binary"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Binary entrypoint for the Marketsim daemon."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use marketsim_common::config::{hash_app_config, AppConfig};
use marketsim_common::logging::init_tracing;
use marketsim_decision::DecisionEngine;
use marketsim_driver::WebDriver;
use marketsim_orchestrator::Simulation;
use marketsim_session::SessionStore;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Marketsim synthetic shopper traffic generator",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Override the configured random seed")]
    seed: Option<u64>,

    #[arg(long, help = "Override the configured user count")]
    users: Option<u32>,

    #[arg(long, help = "Override the configured user name prefix")]
    prefix: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run one simulation to completion")]
    Run,
    #[command(about = "Validate the configuration and print its hash")]
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/marketsim.toml"));
    candidates.push(PathBuf::from("configs/example.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    if let Some(seed) = cli.seed {
        config.simulation.random_seed = seed;
    }
    if let Some(users) = cli.users {
        config.simulation.user_count = users;
    }
    if let Some(prefix) = cli.prefix {
        config.simulation.user_prefix = prefix;
    }
    config.validate()?;
    let config_hash = hash_app_config(&config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::CheckConfig => {
            println!("config source: {}", loaded.source.display());
            println!("config hash:   {config_hash}");
            Ok(())
        }
        Commands::Run => {
            init_tracing("marketsimd", &config.logging)?;
            info!(
                source = %loaded.source.display(),
                config_hash = %config_hash,
                "configuration loaded"
            );

            let driver = WebDriver::new(&config.driver)
                .with_context(|| "unable to construct the WebDriver adapter")?;
            let store = SessionStore::from_config(&config.store).with_context(|| {
                format!(
                    "unable to open session store at {}",
                    config.store.directory.display()
                )
            })?;
            let engine = DecisionEngine::from_config(&config);

            let report = Simulation::new(&config, store, engine, &driver).run().await;
            print!("{report}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_declaration_is_consistent() {
        Cli::command().debug_assert();
    }
}
