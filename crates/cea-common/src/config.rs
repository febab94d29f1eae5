//! ---
//! cea_section: "01-core-functionality"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Typed solver configuration loading and validation."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_tolerance_kg_s() -> f64 {
    1e-3
}

fn default_max_iterations() -> usize {
    100
}

fn default_coupling_iterations() -> usize {
    3
}

fn default_minimum_edge_flow() -> f64 {
    1e-3
}

fn default_accept_unconverged() -> bool {
    true
}

fn default_supply_temperature() -> f64 {
    70.0
}

fn default_ground_temperature() -> f64 {
    10.0
}

fn default_burial_depth() -> f64 {
    1.0
}

fn default_max_pipe_drop() -> f64 {
    30.0
}

fn default_consumer_delta_t() -> f64 {
    20.0
}

fn default_setpoint_tolerance() -> f64 {
    1e-3
}

fn default_file_logging() -> bool {
    true
}

fn default_penalty() -> f64 {
    1e12
}

/// Primary configuration object for solver runs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub thermal: ThermalConfig,
    #[serde(default)]
    pub building: BuildingConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub scenarios: IndexMap<String, ScenarioConfig>,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "CEA_CONFIG";

    /// Load configuration from disk, respecting the `CEA_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Retrieve a named scenario.
    pub fn scenario(&self, name: &str) -> Option<&ScenarioConfig> {
        self.scenarios.get(name)
    }

    /// Validate numeric ranges and scenario declarations.
    pub fn validate(&self) -> Result<()> {
        self.solver.validate()?;
        self.thermal.validate()?;
        self.building.validate()?;
        for (name, scenario) in &self.scenarios {
            scenario.validate(name)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Write the rolling JSON log file next to the console stream.
    #[serde(default = "default_file_logging")]
    pub file_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            file_logging: default_file_logging(),
        }
    }
}

/// Hydraulic iteration controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Largest per-edge mass-flow correction accepted as converged.
    #[serde(default = "default_tolerance_kg_s")]
    pub tolerance_kg_s: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Hydraulic/thermal passes per time step (viscosity feedback).
    #[serde(default = "default_coupling_iterations")]
    pub coupling_iterations: usize,
    /// Edges carrying less than this (but more than zero) are reported as low flow.
    #[serde(default = "default_minimum_edge_flow")]
    pub minimum_edge_flow_kg_s: f64,
    /// Keep the best iterate when the loop iteration runs out of budget.
    #[serde(default = "default_accept_unconverged")]
    pub accept_unconverged: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance_kg_s: default_tolerance_kg_s(),
            max_iterations: default_max_iterations(),
            coupling_iterations: default_coupling_iterations(),
            minimum_edge_flow_kg_s: default_minimum_edge_flow(),
            accept_unconverged: default_accept_unconverged(),
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance_kg_s > 0.0) {
            return Err(anyhow!(
                "solver tolerance_kg_s must be positive, got {}",
                self.tolerance_kg_s
            ));
        }
        if self.max_iterations == 0 {
            return Err(anyhow!("solver max_iterations must be at least 1"));
        }
        if self.coupling_iterations == 0 {
            return Err(anyhow!("solver coupling_iterations must be at least 1"));
        }
        if self.minimum_edge_flow_kg_s < 0.0 {
            return Err(anyhow!("solver minimum_edge_flow_kg_s must not be negative"));
        }
        Ok(())
    }
}

/// District heating or district cooling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum NetworkType {
    #[default]
    #[serde(rename = "DH", alias = "dh")]
    DistrictHeating,
    #[serde(rename = "DC", alias = "dc")]
    DistrictCooling,
}

impl NetworkType {
    pub fn is_heating(&self) -> bool {
        matches!(self, NetworkType::DistrictHeating)
    }

    pub fn code(&self) -> &'static str {
        match self {
            NetworkType::DistrictHeating => "DH",
            NetworkType::DistrictCooling => "DC",
        }
    }
}

impl std::str::FromStr for NetworkType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DH" => Ok(NetworkType::DistrictHeating),
            "DC" => Ok(NetworkType::DistrictCooling),
            other => Err(format!("unknown network type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThermalConfig {
    #[serde(default)]
    pub network_type: NetworkType,
    #[serde(default = "default_supply_temperature")]
    pub plant_supply_temperature_c: f64,
    #[serde(default = "default_ground_temperature")]
    pub ground_temperature_c: f64,
    #[serde(default = "default_burial_depth")]
    pub burial_depth_m: f64,
    #[serde(default = "default_max_pipe_drop")]
    pub max_pipe_temperature_drop_k: f64,
    #[serde(default = "default_consumer_delta_t")]
    pub consumer_delta_t_k: f64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            network_type: NetworkType::default(),
            plant_supply_temperature_c: default_supply_temperature(),
            ground_temperature_c: default_ground_temperature(),
            burial_depth_m: default_burial_depth(),
            max_pipe_temperature_drop_k: default_max_pipe_drop(),
            consumer_delta_t_k: default_consumer_delta_t(),
        }
    }
}

impl ThermalConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.burial_depth_m > 0.0) {
            return Err(anyhow!("thermal burial_depth_m must be positive"));
        }
        if !(self.max_pipe_temperature_drop_k > 0.0) {
            return Err(anyhow!("thermal max_pipe_temperature_drop_k must be positive"));
        }
        if !(self.consumer_delta_t_k > 0.0) {
            return Err(anyhow!("thermal consumer_delta_t_k must be positive"));
        }
        if !self.plant_supply_temperature_c.is_finite() || !self.ground_temperature_c.is_finite()
        {
            return Err(anyhow!("thermal temperatures must be finite"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingConfig {
    /// Free-float temperatures within this band of a set point do not trigger conditioning.
    #[serde(default = "default_setpoint_tolerance")]
    pub setpoint_tolerance_k: f64,
    /// Seed for the thermal-mass temperature; the first ambient temperature when unset.
    #[serde(default)]
    pub initial_mass_temperature_c: Option<f64>,
}

impl Default for BuildingConfig {
    fn default() -> Self {
        Self {
            setpoint_tolerance_k: default_setpoint_tolerance(),
            initial_mass_temperature_c: None,
        }
    }
}

impl BuildingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.setpoint_tolerance_k < 0.0 {
            return Err(anyhow!("building setpoint_tolerance_k must not be negative"));
        }
        Ok(())
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default)]
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub max_wall_time: Option<Duration>,
    #[serde(default)]
    pub max_time_steps: Option<usize>,
    /// Objective value reported for structurally invalid candidates.
    #[serde(default = "default_penalty")]
    pub penalty: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            max_wall_time: None,
            max_time_steps: None,
            penalty: default_penalty(),
        }
    }
}

/// Named set of input files runnable from the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub description: Option<String>,
    pub network: PathBuf,
    pub catalog: PathBuf,
    pub demand: PathBuf,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl ScenarioConfig {
    pub fn validate(&self, name: &str) -> Result<()> {
        for (label, path) in [
            ("network", &self.network),
            ("catalog", &self.catalog),
            ("demand", &self.demand),
        ] {
            if path.as_os_str().is_empty() {
                return Err(anyhow!("scenario '{}' has an empty {} path", name, label));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::from_str("").unwrap();
        assert_eq!(config.thermal.network_type, NetworkType::DistrictHeating);
        assert_eq!(config.solver.max_iterations, 100);
        assert!(config.evaluation.max_wall_time.is_none());
        assert!(config.scenarios.is_empty());
    }

    #[test]
    fn parses_sections_and_durations() {
        let config = AppConfig::from_str(
            r#"
            [solver]
            tolerance_kg_s = 0.01
            max_iterations = 40

            [thermal]
            network_type = "DC"
            plant_supply_temperature_c = 6.0

            [evaluation]
            max_wall_time = 30
            max_time_steps = 8760

            [scenarios.base]
            network = "inputs/network.json"
            catalog = "inputs/catalog.csv"
            demand = "inputs/demand.csv"
            "#,
        )
        .unwrap();
        assert_eq!(config.solver.max_iterations, 40);
        assert_eq!(config.thermal.network_type, NetworkType::DistrictCooling);
        assert_eq!(
            config.evaluation.max_wall_time,
            Some(Duration::from_secs(30))
        );
        assert!(config.scenario("base").is_some());
    }

    #[test]
    fn rejects_non_positive_tolerance() {
        let err = AppConfig::from_str("[solver]\ntolerance_kg_s = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("tolerance_kg_s"));
    }

    #[test]
    fn load_picks_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cea.toml");
        fs::write(&path, "[thermal]\nburial_depth_m = 1.5\n").unwrap();
        let missing = dir.path().join("missing.toml");
        let loaded = AppConfig::load_with_source(&[missing, path.clone()]).unwrap();
        assert_eq!(loaded.source, path);
        assert!((loaded.config.thermal.burial_depth_m - 1.5).abs() < f64::EPSILON);
    }
}
