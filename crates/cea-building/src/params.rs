//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Derivation and validation of 5R1C parameters from envelope data."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use crate::{
    errors::{BuildingError, Result},
    model::{EnvelopeProperties, RcParameters},
    rc_model::H_IC,
};

/// Ratio of total internal surface area to floor area.
pub const LAMBDA_AT: f64 = 4.5;
/// Reduction factor for heat flow to the ground.
pub const B_F: f64 = 0.6;

/// Effective mass area per floor area (ISO 13790 Annex G).
pub fn effective_mass_area_factor(cm_af_j_m2k: f64) -> f64 {
    if cm_af_j_m2k <= 0.0 {
        0.0
    } else if cm_af_j_m2k <= 165_000.0 {
        2.5
    } else {
        3.2
    }
}

impl EnvelopeProperties {
    pub fn derive(&self, building: &str) -> Result<RcParameters> {
        let af = self.floor_area_m2;
        let params = RcParameters {
            af_m2: af,
            atot_m2: af * LAMBDA_AT,
            am_m2: effective_mass_area_factor(self.cm_af_j_m2k) * af,
            aw_m2: self.window_area_m2,
            cm_j_k: self.cm_af_j_m2k * af,
            htr_op_w_k: self.wall_area_m2 * self.u_wall
                + self.roof_area_m2 * self.u_roof
                + B_F * self.basement_area_m2 * self.u_base,
            htr_w_w_k: self.window_area_m2 * self.u_window,
        };
        params.validate(building)?;
        Ok(params)
    }
}

impl RcParameters {
    pub fn validate(&self, building: &str) -> Result<()> {
        let invalid = |reason: &str| BuildingError::InvalidParameters {
            building: building.to_owned(),
            reason: reason.to_owned(),
        };
        let values = [
            self.af_m2,
            self.atot_m2,
            self.am_m2,
            self.aw_m2,
            self.cm_j_k,
            self.htr_op_w_k,
            self.htr_w_w_k,
        ];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(invalid("parameters must be finite and non-negative"));
        }
        if self.af_m2 <= 0.0 {
            return Err(invalid("conditioned floor area must be positive"));
        }
        if self.cm_j_k <= 0.0 || self.am_m2 <= 0.0 {
            return Err(invalid("thermal mass capacity and area must be positive"));
        }
        if self.aw_m2 >= self.atot_m2 {
            return Err(invalid("window area must be smaller than the internal surface area"));
        }
        if self.htr_op_w_k >= H_IC * self.am_m2 {
            return Err(invalid(
                "opaque transmission exceeds the mass-to-surface coupling",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> EnvelopeProperties {
        EnvelopeProperties {
            floor_area_m2: 100.0,
            window_area_m2: 20.0,
            wall_area_m2: 120.0,
            roof_area_m2: 100.0,
            basement_area_m2: 100.0,
            u_window: 1.2,
            u_wall: 0.3,
            u_roof: 0.2,
            u_base: 0.4,
            cm_af_j_m2k: 165_000.0,
        }
    }

    #[test]
    fn derives_lumped_parameters() {
        let params = envelope().derive("B1001").unwrap();
        assert_eq!(params.atot_m2, 450.0);
        assert_eq!(params.am_m2, 250.0);
        assert_eq!(params.cm_j_k, 16_500_000.0);
        assert!((params.htr_op_w_k - (36.0 + 20.0 + 24.0)).abs() < 1e-9);
        assert!((params.htr_w_w_k - 24.0).abs() < 1e-9);
    }

    #[test]
    fn mass_area_factor_follows_construction_class() {
        assert_eq!(effective_mass_area_factor(0.0), 0.0);
        assert_eq!(effective_mass_area_factor(110_000.0), 2.5);
        assert_eq!(effective_mass_area_factor(260_000.0), 3.2);
    }

    #[test]
    fn massless_building_is_rejected() {
        let envelope = EnvelopeProperties {
            cm_af_j_m2k: 0.0,
            ..envelope()
        };
        assert!(matches!(
            envelope.derive("B1002"),
            Err(BuildingError::InvalidParameters { .. })
        ));
    }
}
