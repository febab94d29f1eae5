//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Black-box candidate evaluation returning a fitness vector."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
//! One call evaluates one candidate network: building R-C models produce
//! hourly loads, the loads are attached to consumer nodes, and the network
//! solver runs the horizon under a cooperative budget. Candidates that cannot
//! be evaluated come back as penalised reports so an optimizer generation is
//! never aborted by a single bad individual.

use std::{
    sync::{atomic::AtomicBool, Arc},
    time::Duration,
};

use cea_building::{simulation::BuildingSimulation, BuildingTotals};
use cea_common::{AppConfig, EvaluationConfig};
use cea_logging::{log_evaluation_event, EvaluationOutcome, LogContext};
use cea_network::simulation::{NetworkRun, NetworkSimulation, RunBudget, StepFlags};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};
use uuid::Uuid;

use crate::{
    aggregation::aggregate_demand,
    errors::{EvaluationError, Result},
    request::EvaluationRequest,
};

/// Cooperative limits checked before every simulated time step.
#[derive(Debug, Clone, Default)]
pub struct EvaluationBudget {
    pub max_wall_time: Option<Duration>,
    pub max_time_steps: Option<usize>,
    cancel: Option<Arc<AtomicBool>>,
}

impl EvaluationBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EvaluationConfig) -> Self {
        Self {
            max_wall_time: config.max_wall_time,
            max_time_steps: config.max_time_steps,
            cancel: None,
        }
    }

    pub fn with_wall_time(mut self, limit: Duration) -> Self {
        self.max_wall_time = Some(limit);
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

    /// Start the wall clock.
    fn start(&self) -> RunBudget {
        let mut budget = RunBudget::unlimited();
        if let Some(limit) = self.max_wall_time {
            budget = budget.with_wall_time(limit);
        }
        if let Some(steps) = self.max_time_steps {
            budget = budget.with_max_time_steps(steps);
        }
        if let Some(flag) = &self.cancel {
            budget = budget.with_cancel_flag(Arc::clone(flag));
        }
        budget
    }
}

/// Objectives handed back to the optimizer; all are minimised.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct FitnessVector {
    pub pumping_energy_kwh: f64,
    pub thermal_loss_kwh: f64,
    pub unmet_demand_kwh: f64,
    pub peak_pressure_loss_pa: f64,
    pub unconverged_steps: usize,
    #[serde(default)]
    pub penalised: bool,
}

impl FitnessVector {
    /// Fitness of a candidate that could not be evaluated.
    pub fn penalised(penalty: f64) -> Self {
        Self {
            pumping_energy_kwh: penalty,
            thermal_loss_kwh: penalty,
            unmet_demand_kwh: penalty,
            peak_pressure_loss_pa: penalty,
            unconverged_steps: 0,
            penalised: true,
        }
    }

    fn from_run(run: &NetworkRun, unmet_demand_kwh: f64) -> Self {
        Self {
            pumping_energy_kwh: run.pumping_energy_kwh(),
            thermal_loss_kwh: run.thermal_loss_kwh(),
            unmet_demand_kwh,
            peak_pressure_loss_pa: run.peak_pressure_loss_pa(),
            unconverged_steps: run.unconverged_steps(),
            penalised: false,
        }
    }

    pub fn objectives(&self) -> [f64; 5] {
        [
            self.pumping_energy_kwh,
            self.thermal_loss_kwh,
            self.unmet_demand_kwh,
            self.peak_pressure_loss_pa,
            self.unconverged_steps as f64,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepFlagRecord {
    pub time_step: usize,
    pub flags: StepFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub evaluation_id: Uuid,
    pub network: String,
    pub fitness: FitnessVector,
    pub buildings: Vec<BuildingTotals>,
    /// Steps that finished with any flag raised.
    pub step_flags: Vec<StepFlagRecord>,
    pub failed_step: Option<usize>,
    pub failure: Option<String>,
}

impl EvaluationReport {
    pub fn is_low_confidence(&self) -> bool {
        self.step_flags.iter().any(|r| r.flags.is_low_confidence())
    }
}

/// Evaluate one candidate, propagating every failure to the caller.
pub fn evaluate(
    request: &EvaluationRequest,
    config: &AppConfig,
    budget: &EvaluationBudget,
) -> Result<EvaluationReport> {
    request.validate()?;
    let evaluation_id = Uuid::new_v4();
    let network = request.network.label().to_owned();
    let span = info_span!("evaluation", %evaluation_id, network = %network);
    let _entered = span.enter();
    let thermal = request.thermal.as_ref().unwrap_or(&config.thermal);
    let solver = request.solver.as_ref().unwrap_or(&config.solver);
    let run_budget = budget.start();

    let horizon = request.horizon()?;
    let catalog = request.pipe_catalog()?;
    let simulation = NetworkSimulation::new(&request.network, &catalog, solver, thermal)?;

    let mut loads = Vec::with_capacity(request.buildings.len());
    let mut buildings = Vec::with_capacity(request.buildings.len());
    for input in &request.buildings {
        run_budget.check(0)?;
        let run = BuildingSimulation::new(&input.definition, &config.building)?.run(&input.series);
        loads.push((
            run.building_id.clone(),
            run.network_load_w(thermal.network_type, horizon)?,
        ));
        buildings.push(BuildingTotals::from(&run));
    }
    let unmet_demand_kwh: f64 = buildings.iter().map(|b| b.unmet_kwh).sum();

    let demand = aggregate_demand(
        &request.network,
        request.demand.as_ref(),
        &loads,
        horizon,
        thermal,
    )?;
    let run = simulation.run(&demand, &run_budget)?;

    let step_flags: Vec<StepFlagRecord> = run
        .steps
        .iter()
        .filter(|step| step.flags != StepFlags::default())
        .map(|step| StepFlagRecord {
            time_step: step.time_step,
            flags: step.flags.clone(),
        })
        .collect();

    let report = EvaluationReport {
        evaluation_id,
        fitness: FitnessVector::from_run(&run, unmet_demand_kwh),
        network,
        buildings,
        step_flags,
        failed_step: None,
        failure: None,
    };

    let ctx = LogContext::new().with_network(&report.network);
    let outcome = if report.is_low_confidence() {
        EvaluationOutcome::Degraded
    } else {
        EvaluationOutcome::Success
    };
    log_evaluation_event(
        Some(&ctx),
        "evaluation.completed",
        &format!("evaluation {} finished over {horizon} steps", report.evaluation_id),
        outcome,
    );
    info!(
        evaluation_id = %report.evaluation_id,
        pumping_energy_kwh = report.fitness.pumping_energy_kwh,
        thermal_loss_kwh = report.fitness.thermal_loss_kwh,
        unmet_demand_kwh = report.fitness.unmet_demand_kwh,
        "candidate evaluated"
    );
    Ok(report)
}

/// Evaluate one candidate; failures attributable to the candidate become a
/// penalised report instead of an error.
///
/// Malformed requests (inconsistent horizons, unreadable input) are still
/// returned as errors since no candidate fitness can be attached to them.
pub fn evaluate_or_penalise(
    request: &EvaluationRequest,
    config: &AppConfig,
    budget: &EvaluationBudget,
) -> Result<EvaluationReport> {
    match evaluate(request, config, budget) {
        Ok(report) => Ok(report),
        Err(err) if err.is_penalised() || err.time_step().is_some() => {
            let network = request.network.label().to_owned();
            let report = EvaluationReport {
                evaluation_id: Uuid::new_v4(),
                fitness: FitnessVector::penalised(config.evaluation.penalty),
                network,
                buildings: Vec::new(),
                step_flags: Vec::new(),
                failed_step: err.time_step(),
                failure: Some(err.to_string()),
            };
            let mut ctx = LogContext::new().with_network(&report.network);
            if let Some(step) = report.failed_step {
                ctx = ctx.with_time_step(step);
            }
            log_evaluation_event(
                Some(&ctx),
                "evaluation.penalised",
                &err.to_string(),
                EvaluationOutcome::Fault,
            );
            Ok(report)
        }
        Err(err) => Err(err),
    }
}
