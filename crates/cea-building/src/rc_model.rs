//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "5R1C node equations with Crank-Nicolson mass temperature update."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
//! Node temperatures of the SIA 2044 / ISO 13790 Annex C network for one
//! hourly step. Nodes: air (`t_int`), central surface (`theta_c`) and
//! thermal mass (`theta_m`). The exterior, window and mass boundary
//! temperatures all equal the outdoor air temperature.

use serde::{Deserialize, Serialize};

use crate::model::{BoundaryConditions, RcParameters};

/// Convective heat transfer coefficient, internal surfaces [W/(m2 K)].
pub const H_CV_I: f64 = 2.5;
/// Combined internal heat transfer coefficient [W/(m2 K)].
pub const H_IC: f64 = 9.1;
/// Share of solar gains reaching the air node directly.
pub const F_SA: f64 = 0.1;
/// Radiative fractions of lighting, people and appliance gains.
pub const F_R_L: f64 = 0.7;
pub const F_R_P: f64 = 0.5;
pub const F_R_A: f64 = 0.2;
/// Specific heat of air [J/(kg K)].
pub const AIR_HEAT_CAPACITY_J_KGK: f64 = 1005.0;
/// Operative temperature weight of the air node.
const OPERATIVE_AIR_SHARE: f64 = 0.31;
const SECONDS_PER_STEP: f64 = 3600.0;

/// Two conductances in series; zero when either side is open.
fn series(a: f64, b: f64) -> f64 {
    if a <= 0.0 || b <= 0.0 {
        0.0
    } else {
        a * b / (a + b)
    }
}

/// Conductances and gain distribution factors valid for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conductances {
    pub h_ea: f64,
    pub h_ac: f64,
    pub h_ec: f64,
    pub h_em: f64,
    pub h_mc: f64,
    pub h_1: f64,
    pub h_2: f64,
    pub h_3: f64,
    pub f_ic: f64,
    pub f_sc: f64,
    pub f_im: f64,
    pub f_sm: f64,
    /// Supply air temperature mixed over all ventilation streams.
    pub theta_ea: f64,
    /// Mass capacity in Wh/K.
    pub c_m: f64,
}

impl Conductances {
    pub fn new(params: &RcParameters, boundary: &BoundaryConditions) -> Self {
        let a_t = params.atot_m2;
        let a_m = params.am_m2;
        let a_w = params.aw_m2;

        let h_ec = params.htr_w_w_k;
        let h_ac = a_t / (1.0 / H_CV_I - 1.0 / H_IC);
        let h_mc = H_IC * a_m;
        let h_em = if params.htr_op_w_k > 0.0 {
            params.htr_op_w_k * h_mc / (h_mc - params.htr_op_w_k)
        } else {
            0.0
        };

        let ventilation = boundary.ventilation_kg_s();
        let h_ea = ventilation * AIR_HEAT_CAPACITY_J_KGK;
        let theta_ea = if ventilation > 0.0 {
            let supply = boundary.theta_ve_mech_c.unwrap_or(boundary.t_ext_c);
            (boundary.m_ve_mech_kg_s * supply
                + (boundary.m_ve_window_kg_s + boundary.m_ve_inf_kg_s) * boundary.t_ext_c)
                / ventilation
        } else {
            boundary.t_ext_c
        };

        let h_1 = series(h_ea, h_ac);
        let h_2 = h_1 + h_ec;
        let h_3 = series(h_2, h_mc);

        Self {
            h_ea,
            h_ac,
            h_ec,
            h_em,
            h_mc,
            h_1,
            h_2,
            h_3,
            f_ic: (a_t - a_m - h_ec / H_IC) / a_t,
            f_sc: (a_t - a_m - a_w - h_ec / H_IC) / (a_t - a_w),
            f_im: a_m / a_t,
            f_sm: a_m / (a_t - a_w),
            theta_ea,
            c_m: params.cm_j_k / SECONDS_PER_STEP,
        }
    }
}

/// Heat flows from outside into the zone during one step [W].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ThermalBalance {
    pub opaque_w: f64,
    pub windows_w: f64,
    pub ventilation_w: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RcTemperatures {
    /// Mass temperature at the end of the step.
    pub theta_m_t: f64,
    /// Mean mass temperature over the step.
    pub theta_m: f64,
    pub theta_c: f64,
    pub t_int: f64,
    pub theta_o: f64,
    pub balance: ThermalBalance,
}

/// Node temperatures for a given emitted power split into convective and radiative parts.
pub fn solve_temperatures(
    params: &RcParameters,
    boundary: &BoundaryConditions,
    theta_m_prev: f64,
    phi_hc_cv: f64,
    phi_hc_r: f64,
) -> RcTemperatures {
    let h = Conductances::new(params, boundary);
    let theta_e = boundary.t_ext_c;

    let radiative = F_R_L * boundary.lighting_gains_w
        + F_R_P * boundary.people_gains_w
        + F_R_A * boundary.appliance_gains_w
        + phi_hc_r;
    let phi_a = F_SA * boundary.solar_gains_w
        + (1.0 - F_R_L) * boundary.lighting_gains_w
        + (1.0 - F_R_P) * boundary.people_gains_w
        + (1.0 - F_R_A) * boundary.appliance_gains_w
        + phi_hc_cv;
    let phi_c = h.f_ic * radiative + (1.0 - F_SA) * h.f_sc * boundary.solar_gains_w;
    let phi_m = h.f_im * radiative + (1.0 - F_SA) * h.f_sm * boundary.solar_gains_w;

    // air node eliminated; equals h_1 * (phi_a / h_ea + theta_ea) without dividing by h_ea
    let air_term = h.h_ac * (phi_a + h.h_ea * h.theta_ea) / (h.h_ac + h.h_ea);

    let to_mass = if h.h_2 > 0.0 { h.h_3 / h.h_2 } else { 0.0 };
    let phi_m_tot = phi_m + h.h_em * theta_e + to_mass * (phi_c + h.h_ec * theta_e + air_term);

    let damping = 0.5 * (h.h_3 + h.h_em);
    let theta_m_t = (theta_m_prev * (h.c_m - damping) + phi_m_tot) / (h.c_m + damping);
    let theta_m = (theta_m_t + theta_m_prev) / 2.0;

    let theta_c =
        (h.h_mc * theta_m + phi_c + h.h_ec * theta_e + air_term) / (h.h_mc + h.h_ec + h.h_1);
    let t_int = (h.h_ac * theta_c + h.h_ea * h.theta_ea + phi_a) / (h.h_ac + h.h_ea);
    let theta_o = OPERATIVE_AIR_SHARE * t_int + (1.0 - OPERATIVE_AIR_SHARE) * theta_c;

    RcTemperatures {
        theta_m_t,
        theta_m,
        theta_c,
        t_int,
        theta_o,
        balance: ThermalBalance {
            opaque_w: h.h_em * (theta_e - theta_m),
            windows_w: h.h_ec * (theta_e - theta_c),
            ventilation_w: h.h_ea * (h.theta_ea - t_int),
        },
    }
}
