//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Evaluation boundary used by external network optimizers."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
//! Evaluation oracle: candidate network and building inputs in, fitness
//! vector out.

pub mod aggregation;
pub mod errors;
pub mod evaluator;
pub mod request;

pub use errors::{EvaluationError, Result};
pub use evaluator::{
    evaluate, evaluate_or_penalise, EvaluationBudget, EvaluationReport, FitnessVector,
    StepFlagRecord,
};
pub use request::{load_request, BuildingDemandInput, EvaluationRequest};
