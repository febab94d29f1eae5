//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Free-float / controlled state selection and capacity-limited power solve."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

use crate::{
    model::{BoundaryConditions, HvacProperties, RcParameters},
    rc_model::{solve_temperatures, RcTemperatures},
};

/// Probe power per floor area used to interpolate the required power [W/m2].
pub const PROBE_POWER_W_M2: f64 = 10.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HvacMode {
    FreeFloat,
    Heating,
    Cooling,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ControlOutcome {
    pub mode: HvacMode,
    /// Emitted power; positive heats, negative cools.
    pub phi_hc_w: f64,
    /// Power needed to reach the set point without a capacity limit.
    pub unlimited_w: f64,
    pub capacity_exceeded: bool,
    pub temperatures: RcTemperatures,
}

impl ControlOutcome {
    /// Requested but undelivered power magnitude.
    pub fn unmet_w(&self) -> f64 {
        (self.unlimited_w - self.phi_hc_w).abs()
    }
}

/// Decide the mode for one step and solve the delivered power.
///
/// The zone floats freely unless the unconditioned air temperature leaves the
/// band `[heating set point - tolerance, cooling set point + tolerance]`. The
/// required power is interpolated linearly from a probe run and clipped to the
/// installed capacity.
pub fn control_step(
    params: &RcParameters,
    hvac: &HvacProperties,
    boundary: &BoundaryConditions,
    theta_m_prev: f64,
    tolerance_k: f64,
) -> ControlOutcome {
    let free = solve_temperatures(params, boundary, theta_m_prev, 0.0, 0.0);
    let free_float = ControlOutcome {
        mode: HvacMode::FreeFloat,
        phi_hc_w: 0.0,
        unlimited_w: 0.0,
        capacity_exceeded: false,
        temperatures: free,
    };

    let heating = hvac
        .heating_system
        .zip(boundary.heating_setpoint())
        .filter(|(_, set)| free.t_int < set - tolerance_k)
        .map(|(system, set)| {
            (
                HvacMode::Heating,
                set,
                system.convective_fraction(),
                hvac.max_heating_w_m2 * params.af_m2,
            )
        });
    let cooling = hvac
        .cooling_system
        .zip(boundary.cooling_setpoint())
        .filter(|(_, set)| free.t_int > set + tolerance_k)
        .map(|(system, set)| {
            (
                HvacMode::Cooling,
                set,
                system.convective_fraction(),
                -hvac.max_cooling_w_m2 * params.af_m2,
            )
        });

    let Some((mode, setpoint, f_cv, limit)) = heating.or(cooling) else {
        return free_float;
    };

    let emit = |phi: f64| {
        solve_temperatures(params, boundary, theta_m_prev, f_cv * phi, (1.0 - f_cv) * phi)
    };

    let probe = PROBE_POWER_W_M2 * params.af_m2;
    let probed = emit(probe);
    let response = probed.t_int - free.t_int;
    let unlimited = if response.abs() > f64::EPSILON {
        probe * (setpoint - free.t_int) / response
    } else {
        limit
    };

    let (phi, capacity_exceeded) = match mode {
        HvacMode::Heating if unlimited > limit => (limit, true),
        HvacMode::Cooling if unlimited < limit => (limit, true),
        _ => (unlimited, false),
    };

    ControlOutcome {
        mode,
        phi_hc_w: phi,
        unlimited_w: unlimited,
        capacity_exceeded,
        temperatures: emit(phi),
    }
}
