//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Continuity and loop-friction solver for pipe mass flows."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use cea_common::SolverConfig;
use nalgebra::{linalg::LU, linalg::SVD, DMatrix, DVector, Dynamic};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    errors::{NetworkError, Result},
    flow_direction::InitialFlow,
    incidence::IncidenceMatrix,
    loops::{fundamental_loops, FlowLoop},
    model::{PipeCatalog, PipeType},
    physics,
    topology::Topology,
};

/// Flows below this magnitude are treated as exactly zero.
const FLOW_EPSILON_KG_S: f64 = 1e-9;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Convergence {
    pub converged: bool,
    pub iterations: usize,
    pub max_correction_kg_s: f64,
    pub continuity_residual_kg_s: f64,
    pub loop_residual_pa: f64,
}

#[derive(Debug, Clone)]
pub struct HydraulicSolution {
    /// Directions after negative flows were flipped.
    pub incidence: IncidenceMatrix,
    /// Non-negative, along the incidence direction.
    pub mass_flows_kg_s: Vec<f64>,
    pub pressure_losses_pa: Vec<f64>,
    pub velocities_m_s: Vec<f64>,
    pub reynolds: Vec<f64>,
    pub convergence: Convergence,
    pub low_flow_edges: Vec<usize>,
    pub over_capacity_edges: Vec<usize>,
    /// Flows signed against the reference orientation, reused as warm start.
    pub(crate) signed_flows: Vec<f64>,
}

impl HydraulicSolution {
    pub fn total_pressure_loss_pa(&self) -> f64 {
        self.pressure_losses_pa.iter().sum()
    }

    /// Hydraulic power to overcome supply-pipe friction.
    pub fn friction_power_w(&self) -> f64 {
        self.pressure_losses_pa
            .iter()
            .zip(&self.mass_flows_kg_s)
            .map(|(dp, m)| dp * m / physics::WATER_DENSITY_KG_M3)
            .sum()
    }
}

enum Continuity {
    Empty,
    Tree(LU<f64, Dynamic, Dynamic>),
    Meshed(SVD<f64, Dynamic, Dynamic>),
}

/// Solves edge flows for one topology; reusable across time steps.
pub struct HydraulicSolver<'a> {
    topology: &'a Topology,
    config: &'a SolverConfig,
    pipes: Vec<&'a PipeType>,
    reference: IncidenceMatrix,
    reduced_rows: Vec<usize>,
    reduced: DMatrix<f64>,
    continuity: Continuity,
    loops: Vec<FlowLoop>,
}

impl<'a> HydraulicSolver<'a> {
    pub fn new(
        topology: &'a Topology,
        catalog: &'a PipeCatalog,
        initial: &InitialFlow,
        config: &'a SolverConfig,
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

        if !initial.incidence.is_well_formed() {
            let edge = (0..initial.incidence.edge_count())
                .find(|&e| initial.incidence.endpoints(e).is_none())
                .map(|e| topology.edge(e).edge_id.clone())
                .unwrap_or_default();
            return Err(NetworkError::MalformedIncidence { edge });
        }

        // one continuity row per component is redundant; drop its reference plant
        let reference_plants = topology.reference_plants()?;
        let reduced_rows: Vec<usize> = (0..topology.node_count())
            .filter(|node| !reference_plants.contains(node))
            .collect();
        let full = initial.incidence.as_matrix();
        let reduced = DMatrix::from_fn(reduced_rows.len(), topology.edge_count(), |r, c| {
            full[(reduced_rows[r], c)]
        });

        let (continuity, loops) = if topology.edge_count() == 0 {
            (Continuity::Empty, Vec::new())
        } else if topology.is_meshed() {
            let loops = fundamental_loops(topology, initial)?;
            (Continuity::Meshed(reduced.clone().svd(true, true)), loops)
        } else {
            let lu = reduced.clone().lu();
            if !lu.is_invertible() {
                return Err(NetworkError::SingularSystem);
            }
            (Continuity::Tree(lu), Vec::new())
        };

        debug!(
            rows = reduced_rows.len(),
            edges = topology.edge_count(),
            loops = loops.len(),
            "hydraulic solver prepared"
        );

        Ok(Self {
            topology,
            config,
            pipes,
            reference: initial.incidence.clone(),
            reduced_rows,
            reduced,
            continuity,
            loops,
        })
    }

    pub fn reference(&self) -> &IncidenceMatrix {
        &self.reference
    }

    pub fn loop_count(&self) -> usize {
        self.loops.len()
    }

    pub fn pipe(&self, edge: usize) -> &PipeType {
        self.pipes[edge]
    }

    fn signed_loss(&self, edge: usize, flow: f64, temperature_c: f64) -> f64 {
        let length = self.topology.edge(edge).length_m;
        physics::pressure_loss(self.pipes[edge], length, flow, temperature_c).copysign(flow)
    }

    /// Flows satisfying continuity for `demand_kg_s`, iterating loop corrections on meshed networks.
    ///
    /// An exhausted iteration budget is reported through [`Convergence`], never as an error.
    pub fn solve(
        &self,
        demand_kg_s: &[f64],
        edge_temperatures_c: &[f64],
        warm_start: Option<&HydraulicSolution>,
    ) -> Result<HydraulicSolution> {
        let n = self.topology.node_count();
        let e = self.topology.edge_count();
        if demand_kg_s.len() != n {
            return Err(NetworkError::DemandShapeMismatch {
                expected: n,
                found: demand_kg_s.len(),
            });
        }
        if edge_temperatures_c.len() != e {
            return Err(NetworkError::DemandShapeMismatch {
                expected: e,
                found: edge_temperatures_c.len(),
            });
        }

        if let Some(node) = demand_kg_s.iter().position(|d| !d.is_finite()) {
            return Err(NetworkError::InvalidDemand {
                node: self.topology.node(node).node_id.clone(),
                reason: format!("non-finite mass flow {}", demand_kg_s[node]),
            });
        }

        let rhs = DVector::from_iterator(
            self.reduced_rows.len(),
            self.reduced_rows.iter().map(|&node| demand_kg_s[node]),
        );

        let mut convergence = Convergence {
            converged: true,
            iterations: 1,
            max_correction_kg_s: 0.0,
            continuity_residual_kg_s: 0.0,
            loop_residual_pa: 0.0,
        };

        let idle = demand_kg_s.iter().all(|d| *d == 0.0);
        let mut flows = match &self.continuity {
            Continuity::Empty => DVector::zeros(0),
            Continuity::Tree(lu) => lu.solve(&rhs).ok_or(NetworkError::SingularSystem)?,
            // nothing drives a circulation, so none may survive from the previous step
            Continuity::Meshed(_) if idle => DVector::zeros(e),
            Continuity::Meshed(svd) => {
                let mut flows = match warm_start.and_then(|previous| self.reusable(previous, &rhs)) {
                    Some(previous) => {
                        let correction = svd
                            .solve(&(&rhs - &self.reduced * &previous), 1e-12)
                            .map_err(|_| NetworkError::SingularSystem)?;
                        previous + correction
                    }
                    None => svd
                        .solve(&rhs, 1e-12)
                        .map_err(|_| NetworkError::SingularSystem)?,
                };
                convergence = self.correct_loops(&mut flows, edge_temperatures_c);
                flows
            }
        };

        if let Some(edge) = flows.iter().position(|m| !m.is_finite()) {
            return Err(NetworkError::NonFinite {
                quantity: "mass flow".into(),
                element: self.topology.edge(edge).edge_id.clone(),
            });
        }

        let balance = self.reference.node_balance(&flows);
        convergence.continuity_residual_kg_s = balance
            .iter()
            .zip(demand_kg_s)
            .map(|(lhs, rhs)| (lhs - rhs).abs())
            .fold(0.0, f64::max);
        convergence.loop_residual_pa = self
            .loops
            .iter()
            .map(|l| self.loop_residual(l, &flows, edge_temperatures_c).abs())
            .fold(0.0, f64::max);

        for value in flows.iter_mut() {
            if value.abs() < FLOW_EPSILON_KG_S {
                *value = 0.0;
            }
        }
        let signed_flows = flows.as_slice().to_vec();

        let mut incidence = self.reference.clone();
        let mut mass_flows = Vec::with_capacity(e);
        for (edge, &flow) in signed_flows.iter().enumerate() {
            if flow < 0.0 {
                incidence.flip(edge);
            }
            mass_flows.push(flow.abs());
        }

        let mut pressure_losses = Vec::with_capacity(e);
        let mut velocities = Vec::with_capacity(e);
        let mut reynolds = Vec::with_capacity(e);
        let mut low_flow_edges = Vec::new();
        let mut over_capacity_edges = Vec::new();
        for (edge, &m) in mass_flows.iter().enumerate() {
            let pipe = self.pipes[edge];
            let temperature = edge_temperatures_c[edge];
            pressure_losses.push(physics::pressure_loss(
                pipe,
                self.topology.edge(edge).length_m,
                m,
                temperature,
            ));
            velocities.push(physics::velocity(m, pipe));
            reynolds.push(physics::reynolds(m, pipe.diameter_m, temperature));
            if m > 0.0 && m < self.config.minimum_edge_flow_kg_s {
                low_flow_edges.push(edge);
            }
            if m > pipe.max_flow_kg_s {
                over_capacity_edges.push(edge);
            }
        }
        if let Some(edge) = pressure_losses.iter().position(|dp| !dp.is_finite()) {
            return Err(NetworkError::NonFinite {
                quantity: "pressure loss".into(),
                element: self.topology.edge(edge).edge_id.clone(),
            });
        }

        if !convergence.converged {
            warn!(
                iterations = convergence.iterations,
                max_correction_kg_s = convergence.max_correction_kg_s,
                loop_residual_pa = convergence.loop_residual_pa,
                "hydraulic loop iteration did not converge; keeping best iterate"
            );
        }

        Ok(HydraulicSolution {
            incidence,
            mass_flows_kg_s: mass_flows,
            pressure_losses_pa: pressure_losses,
            velocities_m_s: velocities,
            reynolds,
            convergence,
            low_flow_edges,
            over_capacity_edges,
            signed_flows,
        })
    }

    /// Previous signed flows, kept only while every node still draws or injects in the same sense.
    fn reusable(&self, previous: &HydraulicSolution, rhs: &DVector<f64>) -> Option<DVector<f64>> {
        if previous.signed_flows.len() != self.topology.edge_count() {
            return None;
        }
        let previous = DVector::from_column_slice(&previous.signed_flows);
        let served = &self.reduced * &previous;
        let sense = |v: f64| {
            if v > FLOW_EPSILON_KG_S {
                1
            } else if v < -FLOW_EPSILON_KG_S {
                -1
            } else {
                0
            }
        };
        served
            .iter()
            .zip(rhs.iter())
            .all(|(before, now)| sense(*before) == sense(*now))
            .then_some(previous)
    }

    fn loop_residual(&self, flow_loop: &FlowLoop, flows: &DVector<f64>, temps: &[f64]) -> f64 {
        flow_loop
            .edges
            .iter()
            .map(|&(edge, orientation)| orientation * self.signed_loss(edge, flows[edge], temps[edge]))
            .sum()
    }

    /// Hardy-Cross sweeps; each correction circulates along one loop so continuity is untouched.
    fn correct_loops(&self, flows: &mut DVector<f64>, temps: &[f64]) -> Convergence {
        let mut iterations = 0;
        let mut max_correction = 0.0;
        let mut converged = false;
        while iterations < self.config.max_iterations {
            iterations += 1;
            max_correction = 0.0_f64;
            for flow_loop in &self.loops {
                let residual = self.loop_residual(flow_loop, flows, temps);
                let slope: f64 = flow_loop
                    .edges
                    .iter()
                    .map(|&(edge, _)| {
                        physics::pressure_loss_derivative(
                            self.pipes[edge],
                            self.topology.edge(edge).length_m,
                            flows[edge],
                            temps[edge],
                        )
                    })
                    .sum();
                if slope <= f64::EPSILON {
                    continue;
                }
                let correction = -residual / slope;
                for &(edge, orientation) in &flow_loop.edges {
                    flows[edge] += orientation * correction;
                }
                max_correction = max_correction.max(correction.abs());
            }
            if max_correction < self.config.tolerance_kg_s {
                converged = true;
                break;
            }
        }
        debug!(iterations, max_correction, converged, "loop corrections finished");
        Convergence {
            converged,
            iterations: iterations.max(1),
            max_correction_kg_s: max_correction,
            continuity_residual_kg_s: 0.0,
            loop_residual_pa: 0.0,
        }
    }
}
