//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "JSON and CSV exports of building simulation results."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use std::{fs, path::Path};

use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::{control::HvacMode, errors::Result, BuildingSummary};

#[derive(Debug)]
pub struct ReportExporter<'a> {
    summary: &'a BuildingSummary,
}

impl<'a> ReportExporter<'a> {
    pub fn new(summary: &'a BuildingSummary) -> Self {
        Self { summary }
    }

    pub fn export_all(&self, output_dir: &Path) -> Result<()> {
        if !output_dir.exists() {
            fs::create_dir_all(output_dir)?;
        }
        let id = &self.summary.run.building_id;
        let envelope = ReportEnvelope {
            timestamp: self.summary.timestamp.to_rfc3339(),
            model_version: self.summary.model_version.clone(),
            schema: totals_schema(),
            data: &self.summary.totals,
        };
        let serialized = serde_json::to_string_pretty(&envelope)?;
        fs::write(output_dir.join(format!("{id}_totals.json")), serialized)?;

        let mut writer = csv::Writer::from_path(output_dir.join(format!("{id}_hourly.csv")))?;
        for step in &self.summary.run.steps {
            writer.serialize(StepRow {
                time_step: step.time_step,
                mode: step.mode,
                zone_air_temperature_c: step.zone_air_temperature_c,
                operative_temperature_c: step.operative_temperature_c,
                mass_temperature_c: step.mass_temperature_c,
                heating_demand_w: step.heating_demand_w,
                cooling_demand_w: step.cooling_demand_w,
                capacity_exceeded: step.capacity_exceeded,
                opaque_gain_w: step.balance.opaque_w,
                window_gain_w: step.balance.windows_w,
                ventilation_gain_w: step.balance.ventilation_w,
            })?;
        }
        writer.flush()?;

        info!("Building reports exported to {}", output_dir.display());
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct StepRow {
    time_step: usize,
    mode: HvacMode,
    zone_air_temperature_c: f64,
    operative_temperature_c: f64,
    mass_temperature_c: f64,
    heating_demand_w: f64,
    cooling_demand_w: f64,
    capacity_exceeded: bool,
    opaque_gain_w: f64,
    window_gain_w: f64,
    ventilation_gain_w: f64,
}

#[derive(Debug, Serialize)]
struct ReportEnvelope<'a, T: Serialize> {
    timestamp: String,
    model_version: Option<String>,
    schema: serde_json::Value,
    data: &'a T,
}

fn totals_schema() -> serde_json::Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "BuildingTotals",
        "type": "object",
        "properties": {
            "building_id": {"type": "string"},
            "steps": {"type": "integer", "minimum": 0},
            "heating_kwh": {"type": "number", "minimum": 0},
            "cooling_kwh": {"type": "number", "minimum": 0},
            "unmet_kwh": {"type": "number", "minimum": 0},
            "capacity_exceeded_steps": {"type": "integer", "minimum": 0}
        },
        "required": ["building_id", "steps", "heating_kwh", "cooling_kwh"]
    })
}
