//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Candidate evaluation request as supplied by an external optimizer."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use std::{fs, path::Path};

use cea_building::model::{BoundaryConditions, BuildingDefinition};
use cea_common::{SolverConfig, ThermalConfig};
use cea_network::{
    demand::NodalDemandSeries,
    model::{NetworkModel, PipeCatalog, PipeType},
};
use serde::{Deserialize, Serialize};

use crate::errors::{EvaluationError, Result};

/// A building whose R-C heating or cooling demand feeds a consumer node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingDemandInput {
    pub definition: BuildingDefinition,
    pub series: Vec<BoundaryConditions>,
}

/// One candidate network plus everything needed to evaluate it.
///
/// `thermal` and `solver` override the corresponding sections of the loaded
/// configuration for this candidate only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub network: NetworkModel,
    pub catalog: Vec<PipeType>,
    #[serde(default)]
    pub demand: Option<NodalDemandSeries>,
    #[serde(default)]
    pub buildings: Vec<BuildingDemandInput>,
    #[serde(default)]
    pub thermal: Option<ThermalConfig>,
    #[serde(default)]
    pub solver: Option<SolverConfig>,
}

impl EvaluationRequest {
    pub fn pipe_catalog(&self) -> Result<PipeCatalog> {
        Ok(PipeCatalog::from_entries(self.catalog.iter().cloned())?)
    }

    /// Reject per-candidate overrides the solvers cannot work with.
    pub fn validate(&self) -> Result<()> {
        if let Some(thermal) = &self.thermal {
            thermal
                .validate()
                .map_err(|err| EvaluationError::InvalidRequest(format!("thermal override: {err}")))?;
        }
        if let Some(solver) = &self.solver {
            solver
                .validate()
                .map_err(|err| EvaluationError::InvalidRequest(format!("solver override: {err}")))?;
        }
        Ok(())
    }

    /// Number of hourly steps the candidate is evaluated over.
    pub fn horizon(&self) -> Result<usize> {
        let mut lengths = self
            .demand
            .iter()
            .map(NodalDemandSeries::len)
            .chain(self.buildings.iter().map(|b| b.series.len()));
        let Some(first) = lengths.next() else {
            return Err(EvaluationError::InvalidRequest(
                "request carries neither nodal demand nor buildings".into(),
            ));
        };
        if let Some(other) = lengths.find(|len| *len != first) {
            return Err(EvaluationError::InvalidRequest(format!(
                "demand horizons differ: {first} and {other} steps"
            )));
        }
        Ok(first)
    }
}

/// Read a request from JSON or YAML.
pub fn load_request(path: impl AsRef<Path>) -> Result<EvaluationRequest> {
    let data = fs::read_to_string(path)?;
    let trimmed = data.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        Ok(serde_json::from_str(&data)?)
    } else {
        Ok(serde_yaml::from_str(&data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const REQUEST: &str = r#"
network:
  name: street
  nodes:
    - { node_id: P, type: PLANT }
    - { node_id: C1, type: CONSUMER, building_id: B01 }
  edges:
    - { edge_id: E1, start_node: P, end_node: C1, length_m: 40, pipe_type_code: DN40 }
catalog:
  - { pipe_type_code: DN40, diameter_m: 0.0431, max_flow_kg_s: 3.0, insulation_coeff: 0.18 }
demand:
  unit: watts
  node_ids: [C1]
  steps: [[1000.0], [2000.0]]
"#;

    #[test]
    fn loads_yaml_request() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("request.yaml");
        fs::write(&path, REQUEST).unwrap();
        let request = load_request(&path).unwrap();
        assert_eq!(request.network.nodes.len(), 2);
        assert_eq!(request.horizon().unwrap(), 2);
        assert_eq!(request.pipe_catalog().unwrap().len(), 1);
        assert!(request.thermal.is_none());
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let mut request: EvaluationRequest = serde_yaml::from_str(REQUEST).unwrap();
        assert!(request.validate().is_ok());
        request.thermal = Some(ThermalConfig {
            consumer_delta_t_k: 0.0,
            ..ThermalConfig::default()
        });
        let err = request.validate().unwrap_err();
        assert!(err.to_string().contains("consumer_delta_t_k"));

        request.thermal = None;
        request.solver = Some(SolverConfig {
            max_iterations: 0,
            ..SolverConfig::default()
        });
        assert!(matches!(
            request.validate(),
            Err(EvaluationError::InvalidRequest(_))
        ));
    }

    #[test]
    fn empty_request_has_no_horizon() {
        let mut request: EvaluationRequest = serde_yaml::from_str(REQUEST).unwrap();
        request.demand = None;
        assert!(matches!(
            request.horizon(),
            Err(EvaluationError::InvalidRequest(_))
        ));
    }
}
