//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Folds building R-C loads into the nodal demand of consumer nodes."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use cea_common::ThermalConfig;
use cea_network::{
    demand::{DemandUnit, NodalDemandSeries},
    model::NetworkModel,
    physics::WATER_HEAT_CAPACITY_J_KGK,
};
use indexmap::IndexMap;
use tracing::debug;

use crate::errors::{EvaluationError, Result};

/// Consumer node id for every building id attached to the network.
pub fn building_nodes(model: &NetworkModel) -> IndexMap<&str, &str> {
    model
        .consumers()
        .filter_map(|node| {
            node.building_id
                .as_deref()
                .map(|building| (building, node.node_id.as_str()))
        })
        .collect()
}

/// Add hourly building loads [W] to the explicit nodal demand.
///
/// Buildings land on the consumer node carrying their `building_id`; nodes
/// without an explicit column gain one. The result keeps the unit of the
/// explicit series, watts when there is none.
pub fn aggregate_demand(
    model: &NetworkModel,
    explicit: Option<&NodalDemandSeries>,
    building_loads: &[(String, Vec<f64>)],
    horizon: usize,
    thermal: &ThermalConfig,
) -> Result<NodalDemandSeries> {
    let mut series = explicit.cloned().unwrap_or_else(|| NodalDemandSeries {
        unit: DemandUnit::Watts,
        node_ids: Vec::new(),
        steps: vec![Vec::new(); horizon],
    });
    if series.len() != horizon {
        return Err(EvaluationError::InvalidRequest(format!(
            "nodal demand has {} steps, expected {horizon}",
            series.len()
        )));
    }
    let scale = match series.unit {
        DemandUnit::Watts => 1.0,
        DemandUnit::KgPerSecond => 1.0 / (WATER_HEAT_CAPACITY_J_KGK * thermal.consumer_delta_t_k),
    };

    let attached = building_nodes(model);
    for (building, load) in building_loads {
        let node = attached
            .get(building.as_str())
            .ok_or_else(|| EvaluationError::UnattachedBuilding {
                building: building.clone(),
            })?;
        if load.len() != horizon {
            return Err(EvaluationError::InvalidRequest(format!(
                "building {building} has {} load values, expected {horizon}",
                load.len()
            )));
        }
        let column = match series.node_ids.iter().position(|id| id == node) {
            Some(column) => column,
            None => {
                series.node_ids.push((*node).to_owned());
                series.steps.iter_mut().for_each(|row| row.push(0.0));
                series.node_ids.len() - 1
            }
        };
        for (row, watts) in series.steps.iter_mut().zip(load) {
            row[column] += watts * scale;
        }
        debug!(building = %building, node = %node, "building load attached");
    }

    debug!(columns = series.node_ids.len(), "nodal demand aggregated");
    Ok(series)
}
