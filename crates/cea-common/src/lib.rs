//! ---
//! cea_section: "01-core-functionality"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Shared primitives and utilities for the solver runtime."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
//! Core shared primitives for the CEA solver workspace.
//! This crate exposes configuration loading and tracing initialisation
//! consumed by the network, building, and evaluation crates.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, BuildingConfig, EvaluationConfig, LoadedAppConfig, LoggingConfig, NetworkType,
    ScenarioConfig, SolverConfig, ThermalConfig,
};
pub use logging::{init_tracing, LogFormat};
