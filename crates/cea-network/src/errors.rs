//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Error taxonomy for the thermal network solver."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NetworkError>;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("invalid topology at {element}: {reason}")]
    InvalidTopology { element: String, reason: String },
    #[error("nodes unreachable from any plant: {}", .nodes.join(", "))]
    UnreachableNodes { nodes: Vec<String> },
    #[error("subnetwork containing node {node} has no plant")]
    MissingPlant { node: String },
    #[error("edge {edge} references unknown pipe type {pipe_type}")]
    MissingPipeType { edge: String, pipe_type: String },
    #[error("pipe type {pipe_type} is invalid: {reason}")]
    InvalidPipe { pipe_type: String, reason: String },
    #[error("incidence column for edge {edge} is malformed")]
    MalformedIncidence { edge: String },
    #[error("continuity system is singular")]
    SingularSystem,
    #[error("invalid demand at node {node}: {reason}")]
    InvalidDemand { node: String, reason: String },
    #[error("demand series has {found} values per step, expected {expected}")]
    DemandShapeMismatch { expected: usize, found: usize },
    #[error("plant demands leave {residual_kg_s:.6} kg/s unbalanced near node {node}")]
    DemandImbalance { node: String, residual_kg_s: f64 },
    #[error("hydraulic iteration did not converge after {iterations} iterations (last correction {max_correction_kg_s:.6} kg/s)")]
    Unconverged {
        iterations: usize,
        max_correction_kg_s: f64,
    },
    #[error("non-finite {quantity} at {element}")]
    NonFinite { quantity: String, element: String },
    #[error("evaluation budget exhausted before time step {time_step}: {reason}")]
    BudgetExhausted { time_step: usize, reason: String },
    #[error("time step {time_step}: {source}")]
    AtTimeStep {
        time_step: usize,
        #[source]
        source: Box<NetworkError>,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    SerializationFailed(#[from] serde_json::Error),
    #[error("yaml serialization error: {0}")]
    YamlSerializationFailed(#[from] serde_yaml::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl NetworkError {
    /// Attach the time step an error occurred in.
    pub fn at_time_step(self, time_step: usize) -> Self {
        match self {
            NetworkError::AtTimeStep { .. } | NetworkError::BudgetExhausted { .. } => self,
            other => NetworkError::AtTimeStep {
                time_step,
                source: Box::new(other),
            },
        }
    }

    /// Malformed graph or catalog; the candidate cannot be evaluated at all.
    pub fn is_structural(&self) -> bool {
        match self {
            NetworkError::InvalidTopology { .. }
            | NetworkError::UnreachableNodes { .. }
            | NetworkError::MissingPlant { .. }
            | NetworkError::MissingPipeType { .. }
            | NetworkError::InvalidPipe { .. }
            | NetworkError::MalformedIncidence { .. }
            | NetworkError::SingularSystem => true,
            NetworkError::AtTimeStep { source, .. } => source.is_structural(),
            _ => false,
        }
    }

    pub fn time_step(&self) -> Option<usize> {
        match self {
            NetworkError::AtTimeStep { time_step, .. }
            | NetworkError::BudgetExhausted { time_step, .. } => Some(*time_step),
            _ => None,
        }
    }
}
