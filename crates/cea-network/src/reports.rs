//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "JSON and CSV exports of network simulation results."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use std::{fs, path::Path};

use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::{errors::Result, NetworkSummary};

#[derive(Debug)]
pub struct ReportExporter<'a> {
    summary: &'a NetworkSummary,
}

impl<'a> ReportExporter<'a> {
    pub fn new(summary: &'a NetworkSummary) -> Self {
        Self { summary }
    }

    pub fn export_all(&self, output_dir: &Path) -> Result<()> {
        if !output_dir.exists() {
            fs::create_dir_all(output_dir)?;
        }

        let timestamp = self.summary.timestamp.to_rfc3339();
        let version = self.summary.model_version.clone();

        let totals = ReportEnvelope::new(&timestamp, version.clone(), totals_schema(), &self.summary.totals);
        let steps = ReportEnvelope::new(&timestamp, version, steps_schema(), &self.summary.run.steps);

        write_json(output_dir.join("network_totals.json"), &totals)?;
        write_json(output_dir.join("network_steps.json"), &steps)?;
        self.write_edges_csv(&output_dir.join("edges.csv"))?;
        self.write_nodes_csv(&output_dir.join("nodes.csv"))?;

        info!("Network reports exported to {}", output_dir.display());
        Ok(())
    }

    fn write_edges_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for step in &self.summary.run.steps {
            for edge in &step.edges {
                writer.serialize(EdgeRow {
                    time_step: step.time_step,
                    edge_id: &edge.edge_id,
                    start_node: &edge.start_node,
                    end_node: &edge.end_node,
                    mass_flow_kg_s: edge.mass_flow_kg_s,
                    pressure_loss_pa: edge.pressure_loss_pa,
                    velocity_m_s: edge.velocity_m_s,
                    supply_heat_loss_w: edge.supply_heat_loss_w,
                    return_heat_loss_w: edge.return_heat_loss_w,
                })?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    fn write_nodes_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for step in &self.summary.run.steps {
            for node in &step.nodes {
                writer.serialize(NodeRow {
                    time_step: step.time_step,
                    node_id: &node.node_id,
                    demand_kg_s: node.demand_kg_s,
                    supply_temperature_c: node.supply_temperature_c,
                    return_temperature_c: node.return_temperature_c,
                })?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct EdgeRow<'a> {
    time_step: usize,
    edge_id: &'a str,
    start_node: &'a str,
    end_node: &'a str,
    mass_flow_kg_s: f64,
    pressure_loss_pa: f64,
    velocity_m_s: f64,
    supply_heat_loss_w: f64,
    return_heat_loss_w: f64,
}

#[derive(Debug, Serialize)]
struct NodeRow<'a> {
    time_step: usize,
    node_id: &'a str,
    demand_kg_s: f64,
    supply_temperature_c: f64,
    return_temperature_c: f64,
}

#[derive(Debug, Serialize)]
struct ReportEnvelope<'a, T: Serialize> {
    timestamp: &'a str,
    model_version: Option<String>,
    schema: serde_json::Value,
    data: &'a T,
}

impl<'a, T: Serialize> ReportEnvelope<'a, T> {
    fn new(
        timestamp: &'a str,
        model_version: Option<String>,
        schema: serde_json::Value,
        data: &'a T,
    ) -> Self {
        Self {
            timestamp,
            model_version,
            schema,
            data,
        }
    }
}

pub(crate) fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(value)?;
    fs::write(path, serialized)?;
    Ok(())
}

fn totals_schema() -> serde_json::Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "NetworkTotals",
        "type": "object",
        "properties": {
            "steps": {"type": "integer", "minimum": 0},
            "loops": {"type": "integer", "minimum": 0},
            "pumping_energy_kwh": {"type": "number"},
            "thermal_loss_kwh": {"type": "number"},
            "plant_heat_kwh": {"type": "number"},
            "peak_pressure_loss_pa": {"type": "number"},
            "unconverged_steps": {"type": "integer", "minimum": 0}
        },
        "required": ["steps", "pumping_energy_kwh", "thermal_loss_kwh", "unconverged_steps"]
    })
}

fn steps_schema() -> serde_json::Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "NetworkSteps",
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "time_step": {"type": "integer"},
                "convergence": {
                    "type": "object",
                    "properties": {
                        "converged": {"type": "boolean"},
                        "iterations": {"type": "integer", "minimum": 1}
                    },
                    "required": ["converged", "iterations"]
                },
                "edges": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "edge_id": {"type": "string"},
                            "start_node": {"type": "string"},
                            "end_node": {"type": "string"},
                            "mass_flow_kg_s": {"type": "number", "minimum": 0}
                        },
                        "required": ["edge_id", "start_node", "end_node", "mass_flow_kg_s"]
                    }
                },
                "nodes": {"type": "array"},
                "plant_heat_w": {"type": "number"},
                "thermal_loss_w": {"type": "number"},
                "flags": {"type": "object"}
            },
            "required": ["time_step", "convergence", "edges", "nodes"]
        }
    })
}
