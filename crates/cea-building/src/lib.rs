//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Lumped-capacitance building thermal model."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
pub mod control;
pub mod errors;
pub mod io;
pub mod model;
pub mod params;
pub mod rc_model;
pub mod reports;
pub mod simulation;

use cea_common::BuildingConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    model::{BoundaryConditions, BuildingDefinition},
    reports::ReportExporter,
    simulation::{BuildingRun, BuildingSimulation},
};

pub use errors::{BuildingError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BuildingTotals {
    pub building_id: String,
    pub steps: usize,
    pub heating_kwh: f64,
    pub cooling_kwh: f64,
    pub unmet_kwh: f64,
    pub capacity_exceeded_steps: usize,
}

impl From<&BuildingRun> for BuildingTotals {
    fn from(run: &BuildingRun) -> Self {
        Self {
            building_id: run.building_id.clone(),
            steps: run.steps.len(),
            heating_kwh: run.heating_kwh(),
            cooling_kwh: run.cooling_kwh(),
            unmet_kwh: run.unmet_kwh(),
            capacity_exceeded_steps: run.capacity_exceeded_steps(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingSummary {
    pub timestamp: DateTime<Utc>,
    pub model_version: Option<String>,
    pub totals: BuildingTotals,
    pub run: BuildingRun,
}

impl BuildingSummary {
    pub fn exporter(&self) -> ReportExporter<'_> {
        ReportExporter::new(self)
    }
}

/// Runs the R-C model over `series`, exporting to `output_dir` when given.
pub fn simulate_building(
    definition: &BuildingDefinition,
    series: &[BoundaryConditions],
    config: &BuildingConfig,
    output_dir: Option<&std::path::Path>,
) -> Result<BuildingSummary> {
    let run = BuildingSimulation::new(definition, config)?.run(series);
    let summary = BuildingSummary {
        timestamp: Utc::now(),
        model_version: definition.version.clone(),
        totals: BuildingTotals::from(&run),
        run,
    };
    if let Some(dir) = output_dir {
        summary.exporter().export_all(dir)?;
    }
    Ok(summary)
}
