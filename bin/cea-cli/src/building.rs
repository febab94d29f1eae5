//! ---
//! cea_section: "05-networking-external-interfaces"
//! cea_subsection: "binary"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Building R-C model subcommands."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{Context, Result};
use cea_building::{
    io::{load_boundary_series, load_building_definition},
    simulate_building,
};
use cea_common::AppConfig;
use clap::{Args, Subcommand};

use crate::print_json;

pub fn run(command: BuildingCommand, config: &AppConfig) -> Result<()> {
    match command {
        BuildingCommand::Simulate(cmd) => cmd.execute(config),
    }
}

#[derive(Debug, Subcommand)]
pub enum BuildingCommand {
    /// Run the R-C model over an hourly boundary series and print its totals.
    #[command(name = "simulate")]
    Simulate(SimulateCommand),
}

#[derive(Debug, Args)]
pub struct SimulateCommand {
    /// Building definition (JSON or YAML).
    #[arg(long, value_name = "FILE")]
    building: PathBuf,

    /// Hourly boundary conditions (CSV or JSON).
    #[arg(long, value_name = "FILE")]
    series: PathBuf,

    /// Starting mass temperature, overriding the configuration.
    #[arg(long = "initial-mass-temperature", value_name = "CELSIUS")]
    initial_mass_temperature_c: Option<f64>,

    /// Directory receiving the totals and hourly reports.
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,
}

impl SimulateCommand {
    fn execute(self, config: &AppConfig) -> Result<()> {
        let definition = load_building_definition(&self.building)
            .with_context(|| format!("failed to load building {}", self.building.display()))?;
        let series = load_boundary_series(&self.series)
            .with_context(|| format!("failed to load series {}", self.series.display()))?;

        let mut building_config = config.building.clone();
        if let Some(t) = self.initial_mass_temperature_c {
            building_config.initial_mass_temperature_c = Some(t);
        }
        let summary = simulate_building(
            &definition,
            &series,
            &building_config,
            self.output.as_deref(),
        )?;
        print_json(&summary.totals)
    }
}
