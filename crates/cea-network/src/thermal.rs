//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Supply and return temperature propagation with pipe heat losses."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use cea_common::{NetworkType, ThermalConfig};
use petgraph::{algo::toposort, graph::DiGraph};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    errors::{NetworkError, Result},
    hydraulics::HydraulicSolution,
    model::{NodeKind, PipeCatalog, PipeType},
    physics,
    topology::Topology,
};

const SWEEP_TOLERANCE_K: f64 = 1e-9;

/// A substation never works with less than this share of its design temperature difference.
const MIN_SUBSTATION_DELTA_T_FRACTION: f64 = 0.1;

/// Node temperatures carried from one time step to the next.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThermalState {
    pub supply_c: Vec<f64>,
    pub return_c: Vec<f64>,
}

impl ThermalState {
    /// Every node at plant supply temperature, returns offset by the substation temperature difference.
    pub fn initial(node_count: usize, config: &ThermalConfig) -> Self {
        let supply = config.plant_supply_temperature_c;
        let returned = substation_return(supply, config);
        Self {
            supply_c: vec![supply; node_count],
            return_c: vec![returned; node_count],
        }
    }

    /// Mean supply temperature per edge, never below freezing.
    pub fn edge_supply_temperatures(&self, directed: &[(usize, usize)]) -> Vec<f64> {
        directed
            .iter()
            .map(|&(from, to)| ((self.supply_c[from] + self.supply_c[to]) / 2.0).max(0.0))
            .collect()
    }

    fn edge_return_temperatures(&self, directed: &[(usize, usize)]) -> Vec<f64> {
        directed
            .iter()
            .map(|&(from, to)| ((self.return_c[from] + self.return_c[to]) / 2.0).max(0.0))
            .collect()
    }
}

fn substation_return(supply_c: f64, config: &ThermalConfig) -> f64 {
    match config.network_type {
        NetworkType::DistrictHeating => supply_c - config.consumer_delta_t_k,
        NetworkType::DistrictCooling => supply_c + config.consumer_delta_t_k,
    }
}

/// Temperature difference available to a substation whose supply arrives at `supply_c`.
///
/// The return side is held at the design return temperature, so a supply cooled
/// by pipe losses leaves less difference and needs more flow for the same heat.
pub fn substation_delta_t(supply_c: f64, config: &ThermalConfig) -> f64 {
    let design_return = substation_return(config.plant_supply_temperature_c, config);
    let available = match config.network_type {
        NetworkType::DistrictHeating => supply_c - design_return,
        NetworkType::DistrictCooling => design_return - supply_c,
    };
    available.max(MIN_SUBSTATION_DELTA_T_FRACTION * config.consumer_delta_t_k)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThermalSolution {
    pub state: ThermalState,
    /// m * cp * (T_in - T_out) per supply pipe.
    pub supply_heat_loss_w: Vec<f64>,
    pub return_heat_loss_w: Vec<f64>,
    /// Heat delivered by the plants; negative for cooling networks.
    pub plant_heat_w: f64,
    /// Pipes whose temperature change hit the configured limit.
    pub clipped_edges: Vec<usize>,
    /// Nodes ordered by flow could not be found; temperatures came from sweeps.
    pub cyclic_flow: bool,
}

impl ThermalSolution {
    /// Heat exchanged with the ground by supply and return pipes.
    pub fn total_thermal_loss_w(&self) -> f64 {
        self.supply_heat_loss_w
            .iter()
            .chain(&self.return_heat_loss_w)
            .map(|q| q.abs())
            .sum()
    }
}

pub struct ThermalSolver<'a> {
    topology: &'a Topology,
    config: &'a ThermalConfig,
    pipes: Vec<&'a PipeType>,
}

impl<'a> ThermalSolver<'a> {
    pub fn new(
        topology: &'a Topology,
        catalog: &'a PipeCatalog,
        config: &'a ThermalConfig,
    ) -> Result<Self> {
        let pipes = topology
            .edges()
            .iter()
            .map(|edge| {
                catalog
                    .get(&edge.pipe_type_code)
                    .ok_or_else(|| NetworkError::MissingPipeType {
                        edge: edge.edge_id.clone(),
                        pipe_type: edge.pipe_type_code.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            topology,
            config,
            pipes,
        })
    }

    fn conductances(&self, flows: &[f64], temperatures: &[f64]) -> Vec<f64> {
        flows
            .iter()
            .zip(temperatures)
            .enumerate()
            .map(|(edge, (&m, &t))| {
                physics::heat_loss_coefficient(
                    self.pipes[edge],
                    self.topology.edge(edge).length_m,
                    m,
                    t,
                    self.config.burial_depth_m,
                    self.config.network_type,
                )
            })
            .collect()
    }

    fn outlet(&self, inlet_c: f64, flow: f64, conductance: f64) -> (f64, bool) {
        physics::pipe_outlet_temperature(
            inlet_c,
            flow,
            conductance,
            self.config.ground_temperature_c,
            self.config.max_pipe_temperature_drop_k,
        )
    }

    /// Propagate supply temperatures from the plants and return temperatures back to them.
    ///
    /// With `substation_heat_w` every consumer extracts exactly its heat from the
    /// flow it receives; otherwise it returns at the fixed substation offset.
    pub fn solve(
        &self,
        hydraulic: &HydraulicSolution,
        demand_kg_s: &[f64],
        substation_heat_w: Option<&[f64]>,
        previous: &ThermalState,
    ) -> Result<ThermalSolution> {
        let n = self.topology.node_count();
        if demand_kg_s.len() != n {
            return Err(NetworkError::DemandShapeMismatch {
                expected: n,
                found: demand_kg_s.len(),
            });
        }
        if let Some(heat) = substation_heat_w {
            if heat.len() != n {
                return Err(NetworkError::DemandShapeMismatch {
                    expected: n,
                    found: heat.len(),
                });
            }
        }
        let directed = hydraulic.incidence.directed_edges(self.topology)?;
        let flows = &hydraulic.mass_flows_kg_s;

        let mut incoming = vec![Vec::new(); n];
        let mut outgoing = vec![Vec::new(); n];
        let mut graph = DiGraph::<usize, usize>::with_capacity(n, directed.len());
        let indices: Vec<_> = (0..n).map(|node| graph.add_node(node)).collect();
        for (edge, &(from, to)) in directed.iter().enumerate() {
            if flows[edge] > 0.0 {
                incoming[to].push(edge);
                outgoing[from].push(edge);
                graph.add_edge(indices[from], indices[to], edge);
            }
        }
        let order: Option<Vec<usize>> = toposort(&graph, None)
            .ok()
            .map(|sorted| sorted.into_iter().map(|idx| graph[idx]).collect());
        if order.is_none() {
            warn!("flow graph contains a cycle; resolving temperatures by sweeps");
        }

        let supply_k = self.conductances(flows, &previous.edge_supply_temperatures(&directed));
        let return_k = self.conductances(flows, &previous.edge_return_temperatures(&directed));
        let plant_temperature = self.config.plant_supply_temperature_c;

        let supply = propagate(order.as_deref(), previous.supply_c.clone(), |node, temps| {
            if self.topology.node_kind(node) == NodeKind::Plant {
                return plant_temperature;
            }
            let streams: Vec<(f64, f64)> = incoming[node]
                .iter()
                .map(|&edge| {
                    let (from, _) = directed[edge];
                    (flows[edge], self.outlet(temps[from], flows[edge], supply_k[edge]).0)
                })
                .collect();
            physics::mix_temperatures(&streams).unwrap_or(previous.supply_c[node])
        });

        let substation_flow = |node: usize| -> f64 {
            if self.topology.node_kind(node) == NodeKind::Consumer {
                demand_kg_s[node].max(0.0)
            } else {
                0.0
            }
        };
        let reverse_order: Option<Vec<usize>> =
            order.as_ref().map(|o| o.iter().rev().copied().collect());
        let returned = propagate(reverse_order.as_deref(), previous.return_c.clone(), |node, temps| {
            let mut streams: Vec<(f64, f64)> = outgoing[node]
                .iter()
                .map(|&edge| {
                    let (_, to) = directed[edge];
                    (flows[edge], self.outlet(temps[to], flows[edge], return_k[edge]).0)
                })
                .collect();
            let substation = substation_flow(node);
            if substation > 0.0 {
                let returned = match substation_heat_w {
                    Some(heat) => {
                        let drop = heat[node] / (substation * physics::WATER_HEAT_CAPACITY_J_KGK);
                        if self.config.network_type.is_heating() {
                            supply[node] - drop
                        } else {
                            supply[node] + drop
                        }
                    }
                    None => substation_return(supply[node], self.config),
                };
                streams.push((substation, returned));
            }
            physics::mix_temperatures(&streams).unwrap_or(previous.return_c[node])
        });

        let mut supply_heat_loss_w = vec![0.0; directed.len()];
        let mut return_heat_loss_w = vec![0.0; directed.len()];
        let mut clipped_edges = Vec::new();
        for (edge, &(from, to)) in directed.iter().enumerate() {
            let m = flows[edge];
            if m <= 0.0 {
                continue;
            }
            let (supply_out, supply_clipped) = self.outlet(supply[from], m, supply_k[edge]);
            let (return_out, return_clipped) = self.outlet(returned[to], m, return_k[edge]);
            supply_heat_loss_w[edge] =
                m * physics::WATER_HEAT_CAPACITY_J_KGK * (supply[from] - supply_out);
            return_heat_loss_w[edge] =
                m * physics::WATER_HEAT_CAPACITY_J_KGK * (returned[to] - return_out);
            if supply_clipped || return_clipped {
                debug!(
                    edge = %self.topology.edge(edge).edge_id,
                    mass_flow_kg_s = m,
                    "pipe temperature change clipped"
                );
                clipped_edges.push(edge);
            }
        }

        let plant_heat_w = (0..n)
            .filter(|&node| self.topology.node_kind(node) == NodeKind::Plant)
            .map(|node| {
                let m = (-demand_kg_s[node]).max(0.0);
                m * physics::WATER_HEAT_CAPACITY_J_KGK * (plant_temperature - returned[node])
            })
            .sum();

        debug!(plant_heat_w, clipped = clipped_edges.len(), "thermal propagation finished");

        Ok(ThermalSolution {
            state: ThermalState {
                supply_c: supply,
                return_c: returned,
            },
            supply_heat_loss_w,
            return_heat_loss_w,
            plant_heat_w,
            clipped_edges,
            cyclic_flow: order.is_none(),
        })
    }
}

/// Evaluate nodes in flow order, or sweep until temperatures settle when no order exists.
fn propagate(
    order: Option<&[usize]>,
    mut temps: Vec<f64>,
    mut evaluate: impl FnMut(usize, &[f64]) -> f64,
) -> Vec<f64> {
    match order {
        Some(order) => {
            for &node in order {
                temps[node] = evaluate(node, &temps);
            }
        }
        None => {
            for _ in 0..=temps.len() {
                let mut change = 0.0_f64;
                for node in 0..temps.len() {
                    let value = evaluate(node, &temps);
                    change = change.max((value - temps[node]).abs());
                    temps[node] = value;
                }
                if change < SWEEP_TOLERANCE_K {
                    break;
                }
            }
        }
    }
    temps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        flow_direction::initialize_flow_directions,
        hydraulics::HydraulicSolver,
        model::{Edge, NetworkModel, Node},
    };
    use cea_common::SolverConfig;

    fn setup() -> (Topology, PipeCatalog) {
        let nodes = [
            ("P", NodeKind::Plant),
            ("A", NodeKind::Consumer),
            ("B", NodeKind::Consumer),
            ("J", NodeKind::Junction),
        ];
        let edges = [("PJ", "P", "J"), ("JA", "J", "A"), ("JB", "J", "B")];
        let topology = Topology::build(&NetworkModel {
            version: None,
            name: None,
            nodes: nodes
                .iter()
                .map(|(id, kind)| Node {
                    node_id: (*id).into(),
                    kind: *kind,
                    building_id: None,
                })
                .collect(),
            edges: edges
                .iter()
                .map(|(id, s, e)| Edge {
                    edge_id: (*id).into(),
                    start_node: (*s).into(),
                    end_node: (*e).into(),
                    length_m: 200.0,
                    pipe_type_code: "DN50".into(),
                })
                .collect(),
        })
        .unwrap();
        let catalog = PipeCatalog::from_entries(vec![PipeType {
            pipe_type_code: "DN50".into(),
            diameter_m: 0.0545,
            max_flow_kg_s: 5.0,
            resistance_coeff: None,
            insulation_coeff: Some(0.2),
            outer_diameter_m: None,
            insulation_diameter_m: None,
        }])
        .unwrap();
        (topology, catalog)
    }

    #[test]
    fn supply_cools_and_return_mixes_towards_plant() {
        let (topology, catalog) = setup();
        let solver_config = SolverConfig::default();
        let thermal_config = ThermalConfig::default();
        let initial = initialize_flow_directions(&topology).unwrap();
        let hydraulics = HydraulicSolver::new(&topology, &catalog, &initial, &solver_config).unwrap();
        let demand = [-1.5, 1.0, 0.5, 0.0];
        let hydraulic = hydraulics.solve(&demand, &[70.0; 3], None).unwrap();
        let thermal = ThermalSolver::new(&topology, &catalog, &thermal_config).unwrap();
        let previous = ThermalState::initial(4, &thermal_config);
        let solution = thermal.solve(&hydraulic, &demand, None, &previous).unwrap();

        let supply = &solution.state.supply_c;
        assert_eq!(supply[0], 70.0);
        assert!(supply[3] < 70.0);
        // the smaller branch loses more temperature over the same length
        assert!(supply[2] < supply[1]);
        assert!(solution.state.return_c[0] < supply[0] - 19.0);
        assert!(solution.plant_heat_w > 0.0);
        assert!(solution.supply_heat_loss_w.iter().all(|q| *q > 0.0));
        assert!(!solution.cyclic_flow);
    }

    #[test]
    fn nodes_without_inflow_keep_previous_temperature() {
        let (topology, catalog) = setup();
        let solver_config = SolverConfig::default();
        let thermal_config = ThermalConfig::default();
        let initial = initialize_flow_directions(&topology).unwrap();
        let hydraulics = HydraulicSolver::new(&topology, &catalog, &initial, &solver_config).unwrap();
        let demand = [0.0; 4];
        let hydraulic = hydraulics.solve(&demand, &[70.0; 3], None).unwrap();
        let thermal = ThermalSolver::new(&topology, &catalog, &thermal_config).unwrap();
        let previous = ThermalState {
            supply_c: vec![70.0, 55.5, 54.25, 61.0],
            return_c: vec![45.0, 35.5, 34.0, 40.0],
        };
        let solution = thermal.solve(&hydraulic, &demand, None, &previous).unwrap();
        assert_eq!(&solution.state.supply_c[1..], &previous.supply_c[1..]);
        assert_eq!(solution.state.return_c, previous.return_c);
        assert_eq!(solution.total_thermal_loss_w(), 0.0);
    }

    #[test]
    fn substation_extracts_its_heat_from_the_delivered_flow() {
        let (topology, catalog) = setup();
        let solver_config = SolverConfig::default();
        let thermal_config = ThermalConfig::default();
        let initial = initialize_flow_directions(&topology).unwrap();
        let hydraulics = HydraulicSolver::new(&topology, &catalog, &initial, &solver_config).unwrap();
        let demand = [-1.5, 1.0, 0.5, 0.0];
        let heat = [0.0, 60_000.0, 20_000.0, 0.0];
        let hydraulic = hydraulics.solve(&demand, &[70.0; 3], None).unwrap();
        let thermal = ThermalSolver::new(&topology, &catalog, &thermal_config).unwrap();
        let previous = ThermalState::initial(4, &thermal_config);
        let solution = thermal
            .solve(&hydraulic, &demand, Some(&heat), &previous)
            .unwrap();
        let losses = solution.total_thermal_loss_w();
        let delivered: f64 = heat.iter().sum();
        assert!((solution.plant_heat_w - delivered - losses).abs() < 1e-6 * delivered);
    }

    #[test]
    fn substation_delta_t_shrinks_as_supply_cools() {
        let config = ThermalConfig::default();
        let design = substation_delta_t(config.plant_supply_temperature_c, &config);
        assert!((design - config.consumer_delta_t_k).abs() < 1e-12);
        assert!(substation_delta_t(65.0, &config) < design);
        let floor = substation_delta_t(0.0, &config);
        assert!((floor - 0.1 * config.consumer_delta_t_k).abs() < 1e-12);

        let cooling = ThermalConfig {
            network_type: NetworkType::DistrictCooling,
            plant_supply_temperature_c: 6.0,
            consumer_delta_t_k: 8.0,
            ..ThermalConfig::default()
        };
        assert!(substation_delta_t(7.0, &cooling) < substation_delta_t(6.0, &cooling));
    }

    #[test]
    fn cooling_network_warms_towards_ground() {
        let (topology, catalog) = setup();
        let solver_config = SolverConfig::default();
        let thermal_config = ThermalConfig {
            network_type: NetworkType::DistrictCooling,
            plant_supply_temperature_c: 6.0,
            ground_temperature_c: 12.0,
            consumer_delta_t_k: 8.0,
            ..ThermalConfig::default()
        };
        let initial = initialize_flow_directions(&topology).unwrap();
        let hydraulics = HydraulicSolver::new(&topology, &catalog, &initial, &solver_config).unwrap();
        let demand = [-1.5, 1.0, 0.5, 0.0];
        let hydraulic = hydraulics.solve(&demand, &[6.0; 3], None).unwrap();
        let thermal = ThermalSolver::new(&topology, &catalog, &thermal_config).unwrap();
        let previous = ThermalState::initial(4, &thermal_config);
        let solution = thermal.solve(&hydraulic, &demand, None, &previous).unwrap();
        assert!(solution.state.supply_c[1] > 6.0);
        assert!(solution.plant_heat_w < 0.0);
    }
}
