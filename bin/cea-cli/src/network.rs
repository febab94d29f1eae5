//! ---
//! cea_section: "05-networking-external-interfaces"
//! cea_subsection: "binary"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Network simulation subcommands."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use cea_common::{AppConfig, NetworkType};
use cea_network::{
    demand::DemandUnit,
    io::{load_demand_series, load_network_from_file, load_network_from_tables, load_pipe_catalog},
    simulate_network_with_options,
    simulation::RunBudget,
};
use clap::{Args, Subcommand, ValueEnum};

use crate::print_json;

pub fn run(command: NetworkCommand, config: &AppConfig) -> Result<()> {
    match command {
        NetworkCommand::Simulate(cmd) => cmd.execute(config),
    }
}

#[derive(Debug, Subcommand)]
pub enum NetworkCommand {
    /// Simulate a network over a demand horizon and print its totals.
    #[command(name = "simulate")]
    Simulate(SimulateCommand),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum NetworkTypeArg {
    Dh,
    Dc,
}

impl From<NetworkTypeArg> for NetworkType {
    fn from(value: NetworkTypeArg) -> Self {
        match value {
            NetworkTypeArg::Dh => NetworkType::DistrictHeating,
            NetworkTypeArg::Dc => NetworkType::DistrictCooling,
        }
    }
}

#[derive(Debug, Args)]
pub struct SimulateCommand {
    /// Named scenario from the configuration supplying network, catalog and demand.
    #[arg(long, value_name = "NAME", conflicts_with_all = ["network", "nodes", "edges"])]
    scenario: Option<String>,

    /// Network file (JSON or YAML).
    #[arg(long, value_name = "FILE", conflicts_with_all = ["nodes", "edges"])]
    network: Option<PathBuf>,

    /// Node table (CSV), used together with --edges.
    #[arg(long, value_name = "FILE", requires = "edges")]
    nodes: Option<PathBuf>,

    /// Edge table (CSV), used together with --nodes.
    #[arg(long, value_name = "FILE", requires = "nodes")]
    edges: Option<PathBuf>,

    /// Pipe catalog (CSV, JSON or YAML).
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Nodal demand time series (CSV or JSON).
    #[arg(long, value_name = "FILE")]
    demand: Option<PathBuf>,

    /// Unit of CSV demand values (`W` or `kg/s`).
    #[arg(long = "demand-unit", value_name = "UNIT", default_value = "W")]
    demand_unit: DemandUnit,

    /// Override the configured network type.
    #[arg(long = "network-type", value_enum)]
    network_type: Option<NetworkTypeArg>,

    /// Directory receiving JSON and CSV reports.
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,
}

impl SimulateCommand {
    fn execute(self, config: &AppConfig) -> Result<()> {
        let scenario = match &self.scenario {
            Some(name) => Some(
                config
                    .scenario(name)
                    .ok_or_else(|| anyhow!("scenario '{}' is not configured", name))?,
            ),
            None => None,
        };

        let model = match (&self.network, &self.nodes, &self.edges, scenario) {
            (Some(path), _, _, _) => load_network_from_file(path)
                .with_context(|| format!("failed to load network {}", path.display()))?,
            (None, Some(nodes), Some(edges), _) => load_network_from_tables(nodes, edges)
                .context("failed to load node and edge tables")?,
            (_, _, _, Some(s)) => load_network_from_file(&s.network)
                .with_context(|| format!("failed to load network {}", s.network.display()))?,
            _ => return Err(anyhow!("provide --network, --nodes/--edges or --scenario")),
        };
        let catalog_path = self
            .catalog
            .clone()
            .or_else(|| scenario.map(|s| s.catalog.clone()))
            .ok_or_else(|| anyhow!("--catalog is required"))?;
        let demand_path = self
            .demand
            .clone()
            .or_else(|| scenario.map(|s| s.demand.clone()))
            .ok_or_else(|| anyhow!("--demand is required"))?;
        let output = self
            .output
            .clone()
            .or_else(|| scenario.and_then(|s| s.output_dir.clone()));

        let catalog = load_pipe_catalog(&catalog_path)
            .with_context(|| format!("failed to load pipe catalog {}", catalog_path.display()))?;
        let demand = load_demand_series(&demand_path, self.demand_unit)
            .with_context(|| format!("failed to load demand {}", demand_path.display()))?;

        let mut config = config.clone();
        if let Some(network_type) = self.network_type {
            config.thermal.network_type = network_type.into();
        }
        let budget = run_budget(&config);
        let summary = simulate_network_with_options(
            &model,
            &catalog,
            &demand,
            &config,
            &budget,
            output.as_deref(),
        )?;
        print_json(&summary.totals)
    }
}

fn run_budget(config: &AppConfig) -> RunBudget {
    let mut budget = RunBudget::unlimited();
    if let Some(limit) = config.evaluation.max_wall_time {
        budget = budget.with_wall_time(limit);
    }
    if let Some(steps) = config.evaluation.max_time_steps {
        budget = budget.with_max_time_steps(steps);
    }
    budget
}
