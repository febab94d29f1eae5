//! ---
//! cea_section: "05-networking-external-interfaces"
//! cea_subsection: "binary"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Command line entry point for the thermal network and building solvers."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cea_common::{init_tracing, AppConfig};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

mod building;
mod evaluate;
mod network;

const DEFAULT_CONFIG: &str = "configs/cea.toml";

#[derive(Debug, Parser)]
#[command(
    name = "cea",
    author,
    version,
    about = "District thermal network and building R-C solver",
    long_about = None
)]
struct Cli {
    #[arg(long, global = true, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(subcommand, about = "Thermal network actions")]
    Network(network::NetworkCommand),
    #[command(subcommand, about = "Building R-C model actions")]
    Building(building::BuildingCommand),
    #[command(about = "Evaluate one optimizer candidate and print its fitness vector")]
    Evaluate(evaluate::EvaluateCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing("cea", &config.logging)?;
    info!(command = ?cli.command, "cea started");

    match cli.command {
        Commands::Network(cmd) => network::run(cmd, &config),
        Commands::Building(cmd) => building::run(cmd, &config),
        Commands::Evaluate(cmd) => evaluate::run(cmd, &config),
    }
}

/// Explicit path, then `CEA_CONFIG`, then the default location; built-in
/// defaults when none of them is present.
fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let mut candidates = Vec::new();
    if let Some(path) = explicit {
        candidates.push(path.to_path_buf());
    }
    candidates.push(PathBuf::from(DEFAULT_CONFIG));

    let env_override = std::env::var(AppConfig::ENV_CONFIG_PATH)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false);
    if explicit.is_none() && !env_override && !Path::new(DEFAULT_CONFIG).exists() {
        return Ok(AppConfig::default());
    }
    AppConfig::load(&candidates).context("failed to load configuration")
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON output")?;
    println!("{rendered}");
    Ok(())
}
