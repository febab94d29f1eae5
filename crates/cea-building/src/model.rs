//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Envelope, HVAC, R-C parameter and boundary condition records."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

/// Geometry and thermal properties of the conditioned envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvelopeProperties {
    /// Conditioned floor area (Af).
    pub floor_area_m2: f64,
    pub window_area_m2: f64,
    pub wall_area_m2: f64,
    pub roof_area_m2: f64,
    /// Opaque surface below ground.
    #[serde(default)]
    pub basement_area_m2: f64,
    pub u_window: f64,
    pub u_wall: f64,
    pub u_roof: f64,
    #[serde(default)]
    pub u_base: f64,
    /// Internal heat capacity per floor area [J/(K m2)].
    pub cm_af_j_m2k: f64,
}

/// Space heating emission system.
///
/// T1/T2 radiators, T3 air conditioning, T4 floor heating.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HeatingSystem {
    T1,
    T2,
    T3,
    T4,
}

impl HeatingSystem {
    /// Share of the emitted power delivered to the air node.
    pub fn convective_fraction(self) -> f64 {
        match self {
            HeatingSystem::T1 | HeatingSystem::T2 | HeatingSystem::T3 => 1.0,
            HeatingSystem::T4 => 0.5,
        }
    }
}

/// Space cooling emission system.
///
/// T1 ceiling cooling, T2 split units, T3 central air conditioning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CoolingSystem {
    T1,
    T2,
    T3,
}

impl CoolingSystem {
    pub fn convective_fraction(self) -> f64 {
        match self {
            CoolingSystem::T1 => 0.5,
            CoolingSystem::T2 | CoolingSystem::T3 => 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HvacProperties {
    #[serde(default)]
    pub heating_system: Option<HeatingSystem>,
    #[serde(default)]
    pub cooling_system: Option<CoolingSystem>,
    /// Installed heating capacity per floor area.
    #[serde(default)]
    pub max_heating_w_m2: f64,
    #[serde(default)]
    pub max_cooling_w_m2: f64,
}

/// One building as supplied by the demand preprocessing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildingDefinition {
    pub building_id: String,
    #[serde(default)]
    pub version: Option<String>,
    pub envelope: EnvelopeProperties,
    pub hvac: HvacProperties,
}

/// Lumped parameters of the 5R1C network.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RcParameters {
    /// Conditioned floor area (Af).
    pub af_m2: f64,
    /// Area of all surfaces facing the zone (Atot).
    pub atot_m2: f64,
    /// Effective mass area (Am).
    pub am_m2: f64,
    /// Window area (Aw).
    pub aw_m2: f64,
    /// Internal heat capacity (Cm) [J/K].
    pub cm_j_k: f64,
    /// Opaque transmission coefficient [W/K].
    pub htr_op_w_k: f64,
    /// Window transmission coefficient [W/K].
    pub htr_w_w_k: f64,
}

/// Drivers of one hourly step.
///
/// Gains are sensible heat flows in W; ventilation flows are dry-air mass
/// flows in kg/s. A missing or NaN set point switches that service off.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct BoundaryConditions {
    pub t_ext_c: f64,
    #[serde(default)]
    pub solar_gains_w: f64,
    #[serde(default)]
    pub lighting_gains_w: f64,
    #[serde(default)]
    pub appliance_gains_w: f64,
    #[serde(default)]
    pub people_gains_w: f64,
    #[serde(default)]
    pub m_ve_mech_kg_s: f64,
    #[serde(default)]
    pub m_ve_window_kg_s: f64,
    #[serde(default)]
    pub m_ve_inf_kg_s: f64,
    /// Supply air temperature of mechanical ventilation; outdoor air when absent.
    #[serde(default)]
    pub theta_ve_mech_c: Option<f64>,
    #[serde(default)]
    pub heating_setpoint_c: Option<f64>,
    #[serde(default)]
    pub cooling_setpoint_c: Option<f64>,
}

impl BoundaryConditions {
    pub fn heating_setpoint(&self) -> Option<f64> {
        self.heating_setpoint_c.filter(|t| t.is_finite())
    }

    pub fn cooling_setpoint(&self) -> Option<f64> {
        self.cooling_setpoint_c.filter(|t| t.is_finite())
    }

    pub fn ventilation_kg_s(&self) -> f64 {
        self.m_ve_mech_kg_s + self.m_ve_window_kg_s + self.m_ve_inf_kg_s
    }
}
