//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Error types for candidate evaluation."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use cea_building::BuildingError;
use cea_network::NetworkError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EvaluationError>;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("invalid evaluation request: {0}")]
    InvalidRequest(String),
    #[error("building {building} is not attached to any consumer node")]
    UnattachedBuilding { building: String },
    #[error("structurally invalid candidate: {source}")]
    Structural {
        #[source]
        source: NetworkError,
    },
    #[error("evaluation budget exhausted before time step {time_step}: {reason}")]
    BudgetExhausted { time_step: usize, reason: String },
    #[error("network evaluation failed: {source}")]
    Network {
        time_step: Option<usize>,
        #[source]
        source: NetworkError,
    },
    #[error(transparent)]
    Building(#[from] BuildingError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<NetworkError> for EvaluationError {
    fn from(err: NetworkError) -> Self {
        if err.is_structural() {
            return EvaluationError::Structural { source: err };
        }
        match err {
            NetworkError::BudgetExhausted { time_step, reason } => {
                EvaluationError::BudgetExhausted { time_step, reason }
            }
            other => EvaluationError::Network {
                time_step: other.time_step(),
                source: other,
            },
        }
    }
}

impl EvaluationError {
    /// Time step the evaluation stopped at, when the failure happened mid-run.
    pub fn time_step(&self) -> Option<usize> {
        match self {
            EvaluationError::BudgetExhausted { time_step, .. } => Some(*time_step),
            EvaluationError::Network { time_step, .. } => *time_step,
            EvaluationError::Structural { source } => source.time_step(),
            _ => None,
        }
    }

    /// The candidate itself is invalid, so evaluating it again cannot succeed.
    pub fn is_penalised(&self) -> bool {
        matches!(
            self,
            EvaluationError::Structural { .. }
                | EvaluationError::UnattachedBuilding { .. }
                | EvaluationError::Building(BuildingError::InvalidParameters { .. })
        )
    }
}
