//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Nodal demand time series and their conversion to nodal mass flows."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use cea_common::ThermalConfig;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{NetworkError, Result},
    model::NodeKind,
    physics::WATER_HEAT_CAPACITY_J_KGK,
    thermal::substation_delta_t,
    topology::Topology,
};

/// Plant demands may leave this much mass flow unbalanced per subnetwork.
const BALANCE_TOLERANCE_KG_S: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DemandUnit {
    /// Thermal power; converted with the substation temperature difference.
    #[default]
    #[serde(alias = "W")]
    Watts,
    #[serde(alias = "kg/s")]
    KgPerSecond,
}

impl std::str::FromStr for DemandUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "w" | "watts" => Ok(DemandUnit::Watts),
            "kg/s" | "kg_per_second" => Ok(DemandUnit::KgPerSecond),
            other => Err(format!("unknown demand unit: {}", other)),
        }
    }
}

/// One row per time step, one column per demanding node.
///
/// Consumer values are consumption (positive); plant columns are optional
/// injections (negative) and are otherwise derived from the balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodalDemandSeries {
    #[serde(default)]
    pub unit: DemandUnit,
    pub node_ids: Vec<String>,
    pub steps: Vec<Vec<f64>>,
}

impl NodalDemandSeries {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Map columns onto topology node indices, rejecting unknown or duplicate ids.
    pub fn column_nodes(&self, topology: &Topology) -> Result<Vec<usize>> {
        let mut seen = vec![false; topology.node_count()];
        self.node_ids
            .iter()
            .map(|id| {
                let node = topology
                    .node_index(id)
                    .ok_or_else(|| NetworkError::InvalidDemand {
                        node: id.clone(),
                        reason: "column does not match any network node".into(),
                    })?;
                if std::mem::replace(&mut seen[node], true) {
                    return Err(NetworkError::InvalidDemand {
                        node: id.clone(),
                        reason: "duplicate demand column".into(),
                    });
                }
                Ok(node)
            })
            .collect()
    }

    /// Signed nodal mass flows [kg/s] for one step, plants balancing their subnetwork.
    ///
    /// Heat demands are converted with the temperature difference left by the
    /// supply temperature `supply_c` currently reaching each node.
    pub fn mass_flows(
        &self,
        topology: &Topology,
        columns: &[usize],
        time_step: usize,
        config: &ThermalConfig,
        supply_c: &[f64],
    ) -> Result<Vec<f64>> {
        if supply_c.len() != topology.node_count() {
            return Err(NetworkError::DemandShapeMismatch {
                expected: topology.node_count(),
                found: supply_c.len(),
            });
        }
        let row = self
            .steps
            .get(time_step)
            .ok_or(NetworkError::DemandShapeMismatch {
                expected: time_step + 1,
                found: self.steps.len(),
            })?;
        if row.len() != columns.len() {
            return Err(NetworkError::DemandShapeMismatch {
                expected: columns.len(),
                found: row.len(),
            });
        }

        let n = topology.node_count();
        let mut flows = vec![0.0; n];
        let mut explicit = vec![false; n];
        for (&node, &value) in columns.iter().zip(row) {
            let id = &topology.node(node).node_id;
            if !value.is_finite() {
                return Err(NetworkError::InvalidDemand {
                    node: id.clone(),
                    reason: format!("non-finite value {value}"),
                });
            }
            let magnitude = match self.unit {
                DemandUnit::Watts => {
                    value.abs()
                        / (WATER_HEAT_CAPACITY_J_KGK * substation_delta_t(supply_c[node], config))
                }
                DemandUnit::KgPerSecond => value.abs(),
            };
            if !magnitude.is_finite() {
                return Err(NetworkError::InvalidDemand {
                    node: id.clone(),
                    reason: format!("{value} does not convert to a finite mass flow"),
                });
            }
            flows[node] = match topology.node_kind(node) {
                NodeKind::Consumer => {
                    if self.unit == DemandUnit::KgPerSecond && value < 0.0 {
                        return Err(NetworkError::InvalidDemand {
                            node: id.clone(),
                            reason: "consumer mass flow must not be negative".into(),
                        });
                    }
                    magnitude
                }
                NodeKind::Plant => {
                    if self.unit == DemandUnit::KgPerSecond && value > 0.0 {
                        return Err(NetworkError::InvalidDemand {
                            node: id.clone(),
                            reason: "plant mass flow must not be positive".into(),
                        });
                    }
                    explicit[node] = true;
                    -magnitude
                }
                NodeKind::Junction => {
                    if value != 0.0 {
                        return Err(NetworkError::InvalidDemand {
                            node: id.clone(),
                            reason: "junctions cannot draw or inject flow".into(),
                        });
                    }
                    0.0
                }
            };
        }

        balance_plants(topology, &mut flows, &explicit)?;
        Ok(flows)
    }

    /// Consumer heat per node [W] for one step; `None` for mass-flow series.
    pub fn substation_heat(
        &self,
        topology: &Topology,
        columns: &[usize],
        time_step: usize,
    ) -> Option<Vec<f64>> {
        if self.unit != DemandUnit::Watts {
            return None;
        }
        let row = self.steps.get(time_step)?;
        let mut heat = vec![0.0; topology.node_count()];
        for (&node, &value) in columns.iter().zip(row) {
            if topology.node_kind(node) == NodeKind::Consumer {
                heat[node] = value.abs();
            }
        }
        Some(heat)
    }
}

/// Assign each subnetwork's residual to its first plant without an explicit value.
fn balance_plants(topology: &Topology, flows: &mut [f64], explicit: &[bool]) -> Result<()> {
    let mut residual = vec![0.0; topology.component_count()];
    for (node, flow) in flows.iter().enumerate() {
        residual[topology.component_of(node)] += flow;
    }
    let mut open_plant = vec![None; topology.component_count()];
    for plant in topology.plant_indices() {
        let slot = &mut open_plant[topology.component_of(plant)];
        if slot.is_none() && !explicit[plant] {
            *slot = Some(plant);
        }
    }
    for (component, remaining) in residual.into_iter().enumerate() {
        match open_plant[component] {
            Some(plant) => flows[plant] -= remaining,
            None if remaining.abs() > BALANCE_TOLERANCE_KG_S => {
                let node = (0..topology.node_count())
                    .find(|&n| topology.component_of(n) == component)
                    .map(|n| topology.node(n).node_id.clone())
                    .unwrap_or_default();
                let has_plant = topology
                    .plant_indices()
                    .iter()
                    .any(|&p| topology.component_of(p) == component);
                return Err(if has_plant {
                    NetworkError::DemandImbalance {
                        node,
                        residual_kg_s: remaining,
                    }
                } else {
                    NetworkError::MissingPlant { node }
                });
            }
            None => {}
        }
    }
    Ok(())
}
