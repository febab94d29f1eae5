//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Per-time-step driver coupling the hydraulic and thermal solvers."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use cea_common::{SolverConfig, ThermalConfig};
use cea_logging::{cea_debug, cea_warn, LogContext};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    demand::NodalDemandSeries,
    errors::{NetworkError, Result},
    flow_direction::initialize_flow_directions,
    hydraulics::{Convergence, HydraulicSolution, HydraulicSolver},
    model::{NetworkModel, PipeCatalog},
    thermal::{ThermalSolver, ThermalState},
    topology::Topology,
};

/// Edge temperatures closer than this end the hydraulic/thermal coupling.
const COUPLING_TOLERANCE_K: f64 = 0.01;

/// Cooperative limits checked before every time step.
#[derive(Debug, Clone, Default)]
pub struct RunBudget {
    deadline: Option<Instant>,
    max_time_steps: Option<usize>,
    cancel: Option<Arc<AtomicBool>>,
}

impl RunBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_wall_time(mut self, limit: Duration) -> Self {
        self.deadline = Some(Instant::now() + limit);
        self
    }

    pub fn with_max_time_steps(mut self, steps: usize) -> Self {
        self.max_time_steps = Some(steps);
        self
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn check(&self, time_step: usize) -> Result<()> {
        let exhausted = |reason: &str| NetworkError::BudgetExhausted {
            time_step,
            reason: reason.to_owned(),
        };
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(exhausted("cancelled by caller"));
            }
        }
        if let Some(limit) = self.max_time_steps {
            if time_step >= limit {
                return Err(exhausted("time step limit reached"));
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(exhausted("wall-clock limit reached"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeStep {
    pub edge_id: String,
    pub start_node: String,
    pub end_node: String,
    pub mass_flow_kg_s: f64,
    pub pressure_loss_pa: f64,
    pub velocity_m_s: f64,
    pub reynolds: f64,
    pub supply_heat_loss_w: f64,
    pub return_heat_loss_w: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStep {
    pub node_id: String,
    pub demand_kg_s: f64,
    pub supply_temperature_c: f64,
    pub return_temperature_c: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StepFlags {
    pub unconverged: bool,
    pub low_flow_edges: Vec<String>,
    pub over_capacity_edges: Vec<String>,
    pub clipped_edges: Vec<String>,
    pub cyclic_flow: bool,
}

impl StepFlags {
    pub fn is_low_confidence(&self) -> bool {
        self.unconverged || self.cyclic_flow || !self.clipped_edges.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub time_step: usize,
    pub convergence: Convergence,
    pub edges: Vec<EdgeStep>,
    pub nodes: Vec<NodeStep>,
    pub plant_heat_w: f64,
    pub thermal_loss_w: f64,
    /// Supply and return, the return line assumed to mirror the supply line.
    pub network_pressure_loss_pa: f64,
    pub pumping_power_w: f64,
    pub flags: StepFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRun {
    pub network: String,
    pub loops: usize,
    pub steps: Vec<StepResult>,
}

impl NetworkRun {
    pub fn unconverged_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.flags.unconverged).count()
    }

    pub fn peak_pressure_loss_pa(&self) -> f64 {
        self.steps
            .iter()
            .map(|s| s.network_pressure_loss_pa)
            .fold(0.0, f64::max)
    }

    /// Sum over hourly steps, in kWh.
    pub fn pumping_energy_kwh(&self) -> f64 {
        self.steps.iter().map(|s| s.pumping_power_w).sum::<f64>() / 1000.0
    }

    pub fn thermal_loss_kwh(&self) -> f64 {
        self.steps.iter().map(|s| s.thermal_loss_w).sum::<f64>() / 1000.0
    }

    pub fn plant_heat_kwh(&self) -> f64 {
        self.steps.iter().map(|s| s.plant_heat_w).sum::<f64>() / 1000.0
    }
}

/// Owns one candidate network for the duration of an evaluation.
pub struct NetworkSimulation<'a> {
    name: String,
    topology: Topology,
    catalog: &'a PipeCatalog,
    solver: &'a SolverConfig,
    thermal: &'a ThermalConfig,
}

impl<'a> NetworkSimulation<'a> {
    pub fn new(
        model: &NetworkModel,
        catalog: &'a PipeCatalog,
        solver: &'a SolverConfig,
        thermal: &'a ThermalConfig,
    ) -> Result<Self> {
        let topology = Topology::build(model)?;
        topology.check_catalog(catalog)?;
        Ok(Self {
            name: model.label().to_owned(),
            topology,
            catalog,
            solver,
            thermal,
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Solve every time step in order, carrying temperatures and flows forward.
    pub fn run(&self, demand: &NodalDemandSeries, budget: &RunBudget) -> Result<NetworkRun> {
        let initial = initialize_flow_directions(&self.topology)?;
        let hydraulics = HydraulicSolver::new(&self.topology, self.catalog, &initial, self.solver)?;
        let thermal = ThermalSolver::new(&self.topology, self.catalog, self.thermal)?;
        let columns = demand.column_nodes(&self.topology)?;

        let mut state = ThermalState::initial(self.topology.node_count(), self.thermal);
        let mut warm_start: Option<HydraulicSolution> = None;
        let mut steps = Vec::with_capacity(demand.len());

        for time_step in 0..demand.len() {
            budget.check(time_step)?;
            let ctx = LogContext::new()
                .with_network(&self.name)
                .with_time_step(time_step);

            let heat = demand.substation_heat(&self.topology, &columns, time_step);
            let directions = warm_start
                .as_ref()
                .map_or(&initial.incidence, |previous| &previous.incidence);
            let directed = directions
                .directed_edges(&self.topology)
                .map_err(|err| err.at_time_step(time_step))?;
            let mut edge_temperatures = state.edge_supply_temperatures(&directed);
            let mut supply_c = state.supply_c.clone();

            // flows depend on temperatures through viscosity and, for heat demand,
            // through the supply temperature reaching each substation
            let mut passes = 0;
            let (nodal, hydraulic, solution) = loop {
                passes += 1;
                let nodal = demand
                    .mass_flows(&self.topology, &columns, time_step, self.thermal, &supply_c)
                    .map_err(|err| err.at_time_step(time_step))?;
                let hydraulic = hydraulics
                    .solve(&nodal, &edge_temperatures, warm_start.as_ref())
                    .map_err(|err| err.at_time_step(time_step))?;
                let solution = thermal
                    .solve(&hydraulic, &nodal, heat.as_deref(), &state)
                    .map_err(|err| err.at_time_step(time_step))?;
                if passes >= self.solver.coupling_iterations {
                    break (nodal, hydraulic, solution);
                }
                let directed = hydraulic
                    .incidence
                    .directed_edges(&self.topology)
                    .map_err(|err| err.at_time_step(time_step))?;
                let updated = solution.state.edge_supply_temperatures(&directed);
                let mut drift = max_difference(&updated, &edge_temperatures);
                if heat.is_some() {
                    drift = drift.max(max_difference(&solution.state.supply_c, &supply_c));
                }
                if drift < COUPLING_TOLERANCE_K {
                    break (nodal, hydraulic, solution);
                }
                edge_temperatures = updated;
                supply_c.clone_from(&solution.state.supply_c);
            };

            if !hydraulic.convergence.converged {
                cea_warn!(
                    context = ctx,
                    "hydraulic iteration unconverged after {} iterations",
                    hydraulic.convergence.iterations
                );
                if !self.solver.accept_unconverged {
                    return Err(NetworkError::Unconverged {
                        iterations: hydraulic.convergence.iterations,
                        max_correction_kg_s: hydraulic.convergence.max_correction_kg_s,
                    }
                    .at_time_step(time_step));
                }
            }

            let step = self.collect_step(time_step, &nodal, &hydraulic, &solution)?;
            for edge in &step.flags.clipped_edges {
                cea_warn!(
                    context = ctx.clone().with_element(edge),
                    "pipe temperature change clipped at {} K",
                    self.thermal.max_pipe_temperature_drop_k
                );
            }
            for edge in &step.flags.over_capacity_edges {
                cea_warn!(
                    context = ctx.clone().with_element(edge),
                    "edge flow exceeds pipe capacity"
                );
            }
            for edge in &step.flags.low_flow_edges {
                cea_debug!(
                    context = ctx.clone().with_element(edge),
                    "edge flow below {} kg/s",
                    self.solver.minimum_edge_flow_kg_s
                );
            }
            cea_debug!(
                context = ctx,
                "step solved: plant {:.1} W, losses {:.1} W, {} pass(es)",
                step.plant_heat_w,
                step.thermal_loss_w,
                passes
            );
            state = solution.state;
            warm_start = Some(hydraulic);
            steps.push(step);
        }

        let run = NetworkRun {
            network: self.name.clone(),
            loops: hydraulics.loop_count(),
            steps,
        };
        info!(
            network = %run.network,
            steps = run.steps.len(),
            unconverged = run.unconverged_steps(),
            thermal_loss_kwh = run.thermal_loss_kwh(),
            "network simulation completed"
        );
        Ok(run)
    }

    fn collect_step(
        &self,
        time_step: usize,
        nodal: &[f64],
        hydraulic: &HydraulicSolution,
        thermal: &crate::thermal::ThermalSolution,
    ) -> Result<StepResult> {
        let directed = hydraulic
            .incidence
            .directed_edges(&self.topology)
            .map_err(|err| err.at_time_step(time_step))?;
        let edge_id = |edge: usize| self.topology.edge(edge).edge_id.clone();

        let edges = directed
            .iter()
            .enumerate()
            .map(|(edge, &(from, to))| EdgeStep {
                edge_id: edge_id(edge),
                start_node: self.topology.node(from).node_id.clone(),
                end_node: self.topology.node(to).node_id.clone(),
                mass_flow_kg_s: hydraulic.mass_flows_kg_s[edge],
                pressure_loss_pa: hydraulic.pressure_losses_pa[edge],
                velocity_m_s: hydraulic.velocities_m_s[edge],
                reynolds: hydraulic.reynolds[edge],
                supply_heat_loss_w: thermal.supply_heat_loss_w[edge],
                return_heat_loss_w: thermal.return_heat_loss_w[edge],
            })
            .collect();

        let nodes = self
            .topology
            .nodes()
            .iter()
            .enumerate()
            .map(|(idx, node)| NodeStep {
                node_id: node.node_id.clone(),
                demand_kg_s: nodal[idx],
                supply_temperature_c: thermal.state.supply_c[idx],
                return_temperature_c: thermal.state.return_c[idx],
            })
            .collect();

        let flags = StepFlags {
            unconverged: !hydraulic.convergence.converged,
            low_flow_edges: hydraulic.low_flow_edges.iter().map(|&e| edge_id(e)).collect(),
            over_capacity_edges: hydraulic
                .over_capacity_edges
                .iter()
                .map(|&e| edge_id(e))
                .collect(),
            clipped_edges: thermal.clipped_edges.iter().map(|&e| edge_id(e)).collect(),
            cyclic_flow: thermal.cyclic_flow,
        };

        Ok(StepResult {
            time_step,
            convergence: hydraulic.convergence.clone(),
            edges,
            nodes,
            plant_heat_w: thermal.plant_heat_w,
            thermal_loss_w: thermal.total_thermal_loss_w(),
            network_pressure_loss_pa: 2.0 * hydraulic.total_pressure_loss_pa(),
            pumping_power_w: 2.0 * hydraulic.friction_power_w(),
            flags,
        })
    }
}

fn max_difference(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_trips_on_step_limit_and_cancel() {
        let budget = RunBudget::unlimited().with_max_time_steps(2);
        assert!(budget.check(1).is_ok());
        assert!(matches!(
            budget.check(2),
            Err(NetworkError::BudgetExhausted { time_step: 2, .. })
        ));

        let flag = Arc::new(AtomicBool::new(false));
        let budget = RunBudget::unlimited().with_cancel_flag(flag.clone());
        assert!(budget.check(0).is_ok());
        flag.store(true, Ordering::Relaxed);
        assert!(budget.check(0).is_err());
    }

    #[test]
    fn zero_wall_time_is_exhausted_immediately() {
        let budget = RunBudget::unlimited().with_wall_time(Duration::from_secs(0));
        assert!(budget.check(0).is_err());
    }
}
