//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "District heating and cooling network solver."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
pub mod demand;
pub mod errors;
pub mod flow_direction;
pub mod hydraulics;
pub mod incidence;
pub mod io;
pub mod loops;
pub mod model;
pub mod physics;
pub mod reports;
pub mod simulation;
pub mod thermal;
pub mod topology;

use cea_common::{AppConfig, NetworkType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    demand::NodalDemandSeries,
    model::{NetworkModel, PipeCatalog},
    reports::ReportExporter,
    simulation::{NetworkRun, NetworkSimulation, RunBudget},
};

pub use errors::{NetworkError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetworkTotals {
    pub steps: usize,
    pub loops: usize,
    pub pumping_energy_kwh: f64,
    pub thermal_loss_kwh: f64,
    pub plant_heat_kwh: f64,
    pub peak_pressure_loss_pa: f64,
    pub unconverged_steps: usize,
}

impl From<&NetworkRun> for NetworkTotals {
    fn from(run: &NetworkRun) -> Self {
        Self {
            steps: run.steps.len(),
            loops: run.loops,
            pumping_energy_kwh: run.pumping_energy_kwh(),
            thermal_loss_kwh: run.thermal_loss_kwh(),
            plant_heat_kwh: run.plant_heat_kwh(),
            peak_pressure_loss_pa: run.peak_pressure_loss_pa(),
            unconverged_steps: run.unconverged_steps(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub timestamp: DateTime<Utc>,
    pub model_version: Option<String>,
    pub network_type: NetworkType,
    pub totals: NetworkTotals,
    pub run: NetworkRun,
}

impl NetworkSummary {
    pub fn exporter(&self) -> ReportExporter<'_> {
        ReportExporter::new(self)
    }
}

/// Simulates every demand step without exporting reports.
pub fn simulate_network(
    model: &NetworkModel,
    catalog: &PipeCatalog,
    demand: &NodalDemandSeries,
    config: &AppConfig,
) -> Result<NetworkSummary> {
    simulate_network_with_options(model, catalog, demand, config, &RunBudget::unlimited(), None)
}

/// Simulates every demand step under `budget`, exporting to `output_dir` when given.
pub fn simulate_network_with_options(
    model: &NetworkModel,
    catalog: &PipeCatalog,
    demand: &NodalDemandSeries,
    config: &AppConfig,
    budget: &RunBudget,
    output_dir: Option<&std::path::Path>,
) -> Result<NetworkSummary> {
    info!(
        network = model.label(),
        nodes = model.nodes.len(),
        edges = model.edges.len(),
        steps = demand.len(),
        "Running thermal network simulation..."
    );
    let simulation = NetworkSimulation::new(model, catalog, &config.solver, &config.thermal)?;
    let run = simulation.run(demand, budget)?;

    let summary = NetworkSummary {
        timestamp: Utc::now(),
        model_version: model.version.clone(),
        network_type: config.thermal.network_type,
        totals: NetworkTotals::from(&run),
        run,
    };

    if let Some(dir) = output_dir {
        summary.exporter().export_all(dir)?;
    }
    Ok(summary)
}
