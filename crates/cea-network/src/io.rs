//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Readers for network, pipe catalog, and demand inputs."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use std::{fs, path::Path};

use crate::{
    demand::{DemandUnit, NodalDemandSeries},
    errors::{NetworkError, Result},
    model::{Edge, NetworkModel, Node, PipeCatalog, PipeType},
};

/// Leading columns that index rows rather than name nodes.
const INDEX_COLUMNS: [&str; 3] = ["time_step", "hour", "date"];

fn is_json(data: &str) -> bool {
    let trimmed = data.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[')
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

pub fn load_network_from_file(path: impl AsRef<Path>) -> Result<NetworkModel> {
    let data = fs::read_to_string(path)?;
    let model = if is_json(&data) {
        serde_json::from_str(&data)?
    } else {
        serde_yaml::from_str(&data).map_err(NetworkError::YamlSerializationFailed)?
    };
    Ok(model)
}

/// Node table (`node_id,type,building_id`) plus edge table
/// (`edge_id,start_node,end_node,length_m,pipe_type_code`).
pub fn load_network_from_tables(
    nodes_csv: impl AsRef<Path>,
    edges_csv: impl AsRef<Path>,
) -> Result<NetworkModel> {
    let nodes = csv::Reader::from_path(nodes_csv)?
        .deserialize::<Node>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let edges = csv::Reader::from_path(edges_csv)?
        .deserialize::<Edge>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(NetworkModel {
        version: None,
        name: None,
        nodes,
        edges,
    })
}

/// Catalog from a CSV table or a JSON/YAML list of pipe types.
pub fn load_pipe_catalog(path: impl AsRef<Path>) -> Result<PipeCatalog> {
    let path = path.as_ref();
    let entries: Vec<PipeType> = if is_csv(path) {
        csv::Reader::from_path(path)?
            .deserialize()
            .collect::<std::result::Result<_, _>>()?
    } else {
        let data = fs::read_to_string(path)?;
        if is_json(&data) {
            serde_json::from_str(&data)?
        } else {
            serde_yaml::from_str(&data).map_err(NetworkError::YamlSerializationFailed)?
        }
    };
    PipeCatalog::from_entries(entries)
}

/// Demand series from a wide CSV (one column per node) or a JSON document.
///
/// `unit` applies to CSV input; JSON documents carry their own unit.
pub fn load_demand_series(path: impl AsRef<Path>, unit: DemandUnit) -> Result<NodalDemandSeries> {
    let path = path.as_ref();
    if !is_csv(path) {
        let data = fs::read_to_string(path)?;
        return Ok(serde_json::from_str(&data)?);
    }

    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let skip = headers
        .iter()
        .next()
        .is_some_and(|first| INDEX_COLUMNS.contains(&first.trim().to_lowercase().as_str()));
    let offset = usize::from(skip);
    let node_ids: Vec<String> = headers
        .iter()
        .skip(offset)
        .map(|h| h.trim().to_owned())
        .collect();

    let mut steps = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let values = record
            .iter()
            .skip(offset)
            .zip(&node_ids)
            .map(|(field, node)| {
                let field = field.trim();
                if field.is_empty() {
                    return Ok(0.0);
                }
                field.parse::<f64>().map_err(|_| NetworkError::InvalidDemand {
                    node: node.clone(),
                    reason: format!("row {row}: cannot parse '{field}'"),
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        if values.len() != node_ids.len() {
            return Err(NetworkError::DemandShapeMismatch {
                expected: node_ids.len(),
                found: values.len(),
            });
        }
        steps.push(values);
    }

    Ok(NodalDemandSeries {
        unit,
        node_ids,
        steps,
    })
}
