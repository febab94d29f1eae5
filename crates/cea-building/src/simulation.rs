//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Hourly time-series driver carrying the building thermal state."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use cea_common::{BuildingConfig, NetworkType};
use cea_logging::{cea_warn, LogContext};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    control::{control_step, HvacMode},
    errors::{BuildingError, Result},
    model::{BoundaryConditions, BuildingDefinition, HvacProperties, RcParameters},
    rc_model::ThermalBalance,
};

/// State carried between steps; a fresh run starts from [`BuildingState::initial`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BuildingState {
    /// End-of-step mass temperature; the previous ambient temperature stands in when unknown.
    pub mass_temperature_c: Option<f64>,
    pub previous_ambient_c: Option<f64>,
}

impl BuildingState {
    pub fn initial(config: &BuildingConfig) -> Self {
        Self {
            mass_temperature_c: config.initial_mass_temperature_c,
            previous_ambient_c: None,
        }
    }

    fn mass_temperature(&self, boundary: &BoundaryConditions) -> f64 {
        self.mass_temperature_c
            .filter(|t| t.is_finite())
            .or(self.previous_ambient_c)
            .unwrap_or(boundary.t_ext_c)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildingStep {
    pub time_step: usize,
    pub mode: HvacMode,
    pub zone_air_temperature_c: f64,
    pub operative_temperature_c: f64,
    pub surface_temperature_c: f64,
    pub mass_temperature_c: f64,
    pub heating_demand_w: f64,
    pub cooling_demand_w: f64,
    pub unmet_demand_w: f64,
    pub capacity_exceeded: bool,
    pub balance: ThermalBalance,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildingRun {
    pub building_id: String,
    pub parameters: RcParameters,
    pub steps: Vec<BuildingStep>,
}

impl BuildingRun {
    pub fn heating_kwh(&self) -> f64 {
        self.steps.iter().map(|s| s.heating_demand_w).sum::<f64>() / 1000.0
    }

    pub fn cooling_kwh(&self) -> f64 {
        self.steps.iter().map(|s| s.cooling_demand_w).sum::<f64>() / 1000.0
    }

    pub fn unmet_kwh(&self) -> f64 {
        self.steps.iter().map(|s| s.unmet_demand_w).sum::<f64>() / 1000.0
    }

    pub fn capacity_exceeded_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.capacity_exceeded).count()
    }

    /// Hourly load the building places on a heating or cooling network [W].
    pub fn network_load_w(&self, network_type: NetworkType, expected_steps: usize) -> Result<Vec<f64>> {
        if self.steps.len() != expected_steps {
            return Err(BuildingError::SeriesLengthMismatch {
                building: self.building_id.clone(),
                expected: expected_steps,
                found: self.steps.len(),
            });
        }
        Ok(self
            .steps
            .iter()
            .map(|s| match network_type {
                NetworkType::DistrictHeating => s.heating_demand_w,
                NetworkType::DistrictCooling => s.cooling_demand_w,
            })
            .collect())
    }
}

/// Owns one building's parameters and state for a simulated horizon.
#[derive(Debug, Clone)]
pub struct BuildingSimulation<'a> {
    building_id: String,
    parameters: RcParameters,
    hvac: HvacProperties,
    config: &'a BuildingConfig,
    state: BuildingState,
}

impl<'a> BuildingSimulation<'a> {
    pub fn new(definition: &BuildingDefinition, config: &'a BuildingConfig) -> Result<Self> {
        let parameters = definition.envelope.derive(&definition.building_id)?;
        Ok(Self::with_parameters(
            &definition.building_id,
            parameters,
            definition.hvac.clone(),
            config,
        ))
    }

    pub fn with_parameters(
        building_id: &str,
        parameters: RcParameters,
        hvac: HvacProperties,
        config: &'a BuildingConfig,
    ) -> Self {
        Self {
            building_id: building_id.to_owned(),
            parameters,
            hvac,
            config,
            state: BuildingState::initial(config),
        }
    }

    pub fn state(&self) -> BuildingState {
        self.state
    }

    /// Advance one hour.
    pub fn step(&mut self, time_step: usize, boundary: &BoundaryConditions) -> BuildingStep {
        let theta_m_prev = self.state.mass_temperature(boundary);
        let outcome = control_step(
            &self.parameters,
            &self.hvac,
            boundary,
            theta_m_prev,
            self.config.setpoint_tolerance_k,
        );

        if outcome.capacity_exceeded {
            let ctx = LogContext::new()
                .with_building(&self.building_id)
                .with_time_step(time_step);
            cea_warn!(
                context = ctx,
                "{:?} capacity exceeded: requested {:.1} W, delivered {:.1} W",
                outcome.mode,
                outcome.unlimited_w,
                outcome.phi_hc_w
            );
        }

        let temps = outcome.temperatures;
        self.state = BuildingState {
            mass_temperature_c: Some(temps.theta_m_t),
            previous_ambient_c: Some(boundary.t_ext_c),
        };

        BuildingStep {
            time_step,
            mode: outcome.mode,
            zone_air_temperature_c: temps.t_int,
            operative_temperature_c: temps.theta_o,
            surface_temperature_c: temps.theta_c,
            mass_temperature_c: temps.theta_m,
            heating_demand_w: outcome.phi_hc_w.max(0.0),
            cooling_demand_w: (-outcome.phi_hc_w).max(0.0),
            unmet_demand_w: outcome.unmet_w(),
            capacity_exceeded: outcome.capacity_exceeded,
            balance: temps.balance,
        }
    }

    /// Simulate every step of `series` in order.
    pub fn run(mut self, series: &[BoundaryConditions]) -> BuildingRun {
        let steps: Vec<BuildingStep> = series
            .iter()
            .enumerate()
            .map(|(t, boundary)| self.step(t, boundary))
            .collect();
        let run = BuildingRun {
            building_id: self.building_id,
            parameters: self.parameters,
            steps,
        };
        info!(
            building = %run.building_id,
            steps = run.steps.len(),
            heating_kwh = run.heating_kwh(),
            cooling_kwh = run.cooling_kwh(),
            capacity_exceeded_steps = run.capacity_exceeded_steps(),
            "building simulation completed"
        );
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EnvelopeProperties, HeatingSystem};

    fn definition() -> BuildingDefinition {
        BuildingDefinition {
            building_id: "B1001".into(),
            version: None,
            envelope: EnvelopeProperties {
                floor_area_m2: 100.0,
                window_area_m2: 20.0,
                wall_area_m2: 120.0,
                roof_area_m2: 100.0,
                basement_area_m2: 0.0,
                u_window: 1.2,
                u_wall: 0.3,
                u_roof: 0.2,
                u_base: 0.0,
                cm_af_j_m2k: 165_000.0,
            },
            hvac: HvacProperties {
                heating_system: Some(HeatingSystem::T1),
                cooling_system: None,
                max_heating_w_m2: 100.0,
                max_cooling_w_m2: 0.0,
            },
        }
    }

    #[test]
    fn state_is_carried_between_steps() {
        let config = BuildingConfig {
            initial_mass_temperature_c: Some(20.0),
            ..BuildingConfig::default()
        };
        let mut sim = BuildingSimulation::new(&definition(), &config).unwrap();
        let cold = BoundaryConditions {
            t_ext_c: 0.0,
            ..BoundaryConditions::default()
        };
        let first = sim.step(0, &cold);
        let carried = sim.state().mass_temperature_c.unwrap();
        assert!(carried < 20.0);
        let second = sim.step(1, &cold);
        assert!(second.mass_temperature_c < first.mass_temperature_c);
    }

    #[test]
    fn network_load_checks_horizon() {
        let config = BuildingConfig::default();
        let series = vec![
            BoundaryConditions {
                t_ext_c: 2.0,
                heating_setpoint_c: Some(20.0),
                ..BoundaryConditions::default()
            };
            3
        ];
        let run = BuildingSimulation::new(&definition(), &config).unwrap().run(&series);
        let load = run.network_load_w(NetworkType::DistrictHeating, 3).unwrap();
        assert!(load.iter().all(|w| *w > 0.0));
        assert!(run
            .network_load_w(NetworkType::DistrictCooling, 3)
            .unwrap()
            .iter()
            .all(|w| *w == 0.0));
        assert!(matches!(
            run.network_load_w(NetworkType::DistrictHeating, 4),
            Err(BuildingError::SeriesLengthMismatch { found: 3, .. })
        ));
    }
}
