//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Water properties, pipe friction, and pipe heat-loss correlations."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
//! Correlations used by the hydraulic and thermal solvers.
//!
//! Temperatures are in degrees Celsius at the public boundary; property
//! correlations are evaluated in kelvin and never below freezing.

use std::f64::consts::PI;

use cea_common::NetworkType;

use crate::model::PipeType;

pub const WATER_DENSITY_KG_M3: f64 = 998.0;
pub const WATER_HEAT_CAPACITY_J_KGK: f64 = 4185.0;
pub const PIPE_ROUGHNESS_M: f64 = 0.02e-3;
pub const STEEL_CONDUCTIVITY_W_MK: f64 = 76.0;
pub const INSULATION_CONDUCTIVITY_W_MK: f64 = 0.023;
pub const SOIL_CONDUCTIVITY_W_MK: f64 = 1.6;
/// Additional heat transfer through valves and fittings.
pub const FITTINGS_HEAT_TRANSFER_FRACTION: f64 = 0.2;
/// Convective resistance used when the pipe carries no flow.
pub const STAGNANT_CONVECTIVE_RESISTANCE: f64 = 0.2;
pub const KELVIN_OFFSET: f64 = 273.15;

fn property_temperature_k(temperature_c: f64) -> f64 {
    (temperature_c + KELVIN_OFFSET).max(KELVIN_OFFSET)
}

/// Kinematic viscosity of water [m2/s].
pub fn kinematic_viscosity(temperature_c: f64) -> f64 {
    let t = property_temperature_k(temperature_c);
    2.652623e-8 * (557.5447 / (t - 140.0)).exp()
}

/// Thermal conductivity of water [W/(m K)].
pub fn thermal_conductivity(temperature_c: f64) -> f64 {
    let ratio = property_temperature_k(temperature_c) / 298.15;
    0.6065 * (-1.48445 + 4.12292 * ratio - 1.63866 * ratio.powi(2))
}

pub fn prandtl(temperature_c: f64) -> f64 {
    kinematic_viscosity(temperature_c) * WATER_DENSITY_KG_M3 * WATER_HEAT_CAPACITY_J_KGK
        / thermal_conductivity(temperature_c)
}

pub fn reynolds(mass_flow_kg_s: f64, diameter_m: f64, temperature_c: f64) -> f64 {
    4.0 * mass_flow_kg_s.abs()
        / (WATER_DENSITY_KG_M3 * PI * diameter_m * kinematic_viscosity(temperature_c))
}

/// Darcy friction factor: laminar, Blasius, then Swamee-Jain.
pub fn darcy_friction_factor(reynolds: f64, diameter_m: f64) -> f64 {
    if reynolds <= 1.0 {
        0.0
    } else if reynolds <= 2300.0 {
        64.0 / reynolds
    } else if reynolds <= 5000.0 {
        0.316 * reynolds.powf(-0.25)
    } else {
        let log_term =
            (PIPE_ROUGHNESS_M / (3.7 * diameter_m) + 5.74 / reynolds.powf(0.9)).ln();
        1.325 / log_term.powi(2)
    }
}

pub fn velocity(mass_flow_kg_s: f64, pipe: &PipeType) -> f64 {
    mass_flow_kg_s.abs() / (WATER_DENSITY_KG_M3 * pipe.cross_section_m2())
}

/// Pressure loss magnitude [Pa] along one pipe.
pub fn pressure_loss(
    pipe: &PipeType,
    length_m: f64,
    mass_flow_kg_s: f64,
    temperature_c: f64,
) -> f64 {
    let m = mass_flow_kg_s.abs();
    match pipe.resistance_coeff {
        Some(r) => r * length_m * m * m,
        None => {
            let f = darcy_friction_factor(reynolds(m, pipe.diameter_m, temperature_c), pipe.diameter_m);
            f * 8.0 * m * m * length_m
                / (PI.powi(2) * pipe.diameter_m.powi(5) * WATER_DENSITY_KG_M3)
        }
    }
}

/// d(pressure loss)/d(mass flow) magnitude with the friction factor held fixed.
pub fn pressure_loss_derivative(
    pipe: &PipeType,
    length_m: f64,
    mass_flow_kg_s: f64,
    temperature_c: f64,
) -> f64 {
    let m = mass_flow_kg_s.abs();
    match pipe.resistance_coeff {
        Some(r) => 2.0 * r * length_m * m,
        None => {
            let f = darcy_friction_factor(reynolds(m, pipe.diameter_m, temperature_c), pipe.diameter_m);
            f * 16.0 * m * length_m / (PI.powi(2) * pipe.diameter_m.powi(5) * WATER_DENSITY_KG_M3)
        }
    }
}

/// Laminar constant, Gnielinski in transition, Dittus-Boelter when turbulent.
pub fn nusselt(
    mass_flow_kg_s: f64,
    diameter_m: f64,
    temperature_c: f64,
    network_type: NetworkType,
) -> f64 {
    let re = reynolds(mass_flow_kg_s, diameter_m, temperature_c);
    let pr = prandtl(temperature_c);
    if re <= 1.0 {
        0.0
    } else if re <= 2300.0 {
        3.66
    } else if re <= 10000.0 {
        let f = darcy_friction_factor(re, diameter_m);
        (f / 8.0) * (re - 1000.0) * pr / (1.0 + 12.7 * (f / 8.0).sqrt() * (pr.powf(0.67) - 1.0))
    } else {
        let exponent = if network_type.is_heating() { 0.3 } else { 0.4 };
        0.023 * re.powf(0.8) * pr.powf(exponent)
    }
}

/// Overall pipe-to-ground conductance [W/K] of one pipe segment.
pub fn heat_loss_coefficient(
    pipe: &PipeType,
    length_m: f64,
    mass_flow_kg_s: f64,
    temperature_c: f64,
    burial_depth_m: f64,
    network_type: NetworkType,
) -> f64 {
    if let Some(u) = pipe.insulation_coeff {
        return u * length_m;
    }
    let (Some(outer), Some(insulation)) = (pipe.outer_diameter_m, pipe.insulation_diameter_m)
    else {
        return 0.0;
    };
    let inner = pipe.diameter_m;
    let insulation = if network_type.is_heating() {
        insulation
    } else {
        0.25 * insulation
    };

    let r_pipe = (outer / inner).ln() / (2.0 * PI * STEEL_CONDUCTIVITY_W_MK);
    let r_insulation =
        ((insulation + outer) / outer).ln() / (2.0 * PI * INSULATION_CONDUCTIVITY_W_MK);
    let a = (2.0 * burial_depth_m / insulation).max(1.0);
    let r_ground = (a + (a * a - 1.0).sqrt()).ln() / (2.0 * PI * SOIL_CONDUCTIVITY_W_MK);
    let alpha = thermal_conductivity(temperature_c)
        * nusselt(mass_flow_kg_s, inner, temperature_c, network_type)
        / inner;
    let r_conv = if alpha > 1e-9 {
        1.0 / (alpha * PI * inner)
    } else {
        STAGNANT_CONVECTIVE_RESISTANCE
    };

    length_m * (1.0 + FITTINGS_HEAT_TRANSFER_FRACTION) / (r_pipe + r_insulation + r_ground + r_conv)
}

/// Outlet temperature of a pipe exchanging heat with the ground.
///
/// Returns the temperature and whether the change was clipped to `max_change_k`.
pub fn pipe_outlet_temperature(
    inlet_c: f64,
    mass_flow_kg_s: f64,
    conductance_w_k: f64,
    ground_c: f64,
    max_change_k: f64,
) -> (f64, bool) {
    let capacity_rate = mass_flow_kg_s.abs() * WATER_HEAT_CAPACITY_J_KGK;
    let denominator = capacity_rate + conductance_w_k / 2.0;
    if denominator <= 0.0 {
        return (inlet_c, false);
    }
    let outlet = (inlet_c * (capacity_rate - conductance_w_k / 2.0) + conductance_w_k * ground_c)
        / denominator;
    let change = outlet - inlet_c;
    if change.abs() > max_change_k {
        (inlet_c + max_change_k.copysign(change), true)
    } else {
        (outlet, false)
    }
}

/// Mass-flow-weighted perfect mixing; `None` when nothing flows in.
pub fn mix_temperatures(streams: &[(f64, f64)]) -> Option<f64> {
    let active: Vec<(f64, f64)> = streams.iter().copied().filter(|(m, _)| *m > 0.0).collect();
    let (_, first) = *active.first()?;
    if active.iter().all(|(_, t)| *t == first) {
        return Some(first);
    }
    let total: f64 = active.iter().map(|(m, _)| m).sum();
    Some(active.iter().map(|(m, t)| m * t).sum::<f64>() / total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steel_pipe() -> PipeType {
        PipeType {
            pipe_type_code: "DN100".into(),
            diameter_m: 0.1071,
            max_flow_kg_s: 30.0,
            resistance_coeff: None,
            insulation_coeff: None,
            outer_diameter_m: Some(0.1143),
            insulation_diameter_m: Some(0.2),
        }
    }

    #[test]
    fn viscosity_drops_with_temperature() {
        assert!(kinematic_viscosity(70.0) < kinematic_viscosity(10.0));
        assert!((kinematic_viscosity(20.0) - 1.0e-6).abs() < 0.1e-6);
    }

    #[test]
    fn friction_regimes_are_ordered() {
        assert_eq!(darcy_friction_factor(0.5, 0.1), 0.0);
        assert!((darcy_friction_factor(1000.0, 0.1) - 0.064).abs() < 1e-12);
        let turbulent = darcy_friction_factor(1e5, 0.1);
        assert!(turbulent > 0.01 && turbulent < 0.03);
    }

    #[test]
    fn pressure_loss_is_quadratic_for_fixed_resistance() {
        let mut pipe = steel_pipe();
        pipe.resistance_coeff = Some(2.0);
        assert!((pressure_loss(&pipe, 10.0, -3.0, 60.0) - 180.0).abs() < 1e-9);
        assert!((pressure_loss_derivative(&pipe, 10.0, 3.0, 60.0) - 120.0).abs() < 1e-9);
    }

    #[test]
    fn darcy_loss_grows_with_flow() {
        let pipe = steel_pipe();
        let low = pressure_loss(&pipe, 100.0, 2.0, 70.0);
        let high = pressure_loss(&pipe, 100.0, 4.0, 70.0);
        assert!(low > 0.0 && high > 3.0 * low);
    }

    #[test]
    fn conductance_is_positive_and_linear_in_length() {
        let pipe = steel_pipe();
        let k1 = heat_loss_coefficient(&pipe, 50.0, 2.0, 70.0, 1.0, NetworkType::DistrictHeating);
        let k2 = heat_loss_coefficient(&pipe, 100.0, 2.0, 70.0, 1.0, NetworkType::DistrictHeating);
        assert!(k1 > 0.0);
        assert!((k2 - 2.0 * k1).abs() < 1e-9);
    }

    #[test]
    fn outlet_moves_towards_ground_and_clips() {
        let (outlet, clipped) = pipe_outlet_temperature(70.0, 1.0, 50.0, 10.0, 30.0);
        assert!(outlet < 70.0 && outlet > 10.0);
        assert!(!clipped);
        let (outlet, clipped) = pipe_outlet_temperature(70.0, 1e-4, 500.0, 10.0, 30.0);
        assert!(clipped);
        assert_eq!(outlet, 40.0);
    }

    #[test]
    fn mixing_of_equal_streams_is_exact() {
        let t = 63.123456789;
        assert_eq!(mix_temperatures(&[(0.3, t), (1.7, t), (0.01, t)]), Some(t));
        assert_eq!(mix_temperatures(&[(0.0, 40.0)]), None);
        let mixed = mix_temperatures(&[(1.0, 60.0), (3.0, 40.0)]).unwrap();
        assert!((mixed - 45.0).abs() < 1e-12);
    }
}
