//! ---
//! cea_section: "15-testing-qa-runbook"
//! cea_subsection: "integration-tests"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Scenario tests of the building R-C model."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use cea_building::{
    control::HvacMode,
    model::{
        BoundaryConditions, BuildingDefinition, CoolingSystem, EnvelopeProperties, HeatingSystem,
        HvacProperties,
    },
    simulate_building, BuildingError,
};
use cea_common::BuildingConfig;
use tempfile::tempdir;

fn office(max_heating_w_m2: f64) -> BuildingDefinition {
    BuildingDefinition {
        building_id: "B1001".into(),
        version: Some("2026.1".into()),
        envelope: EnvelopeProperties {
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
        },
        hvac: HvacProperties {
            heating_system: Some(HeatingSystem::T1),
            cooling_system: Some(CoolingSystem::T3),
            max_heating_w_m2,
            max_cooling_w_m2: 50.0,
        },
    }
}

fn config(initial_mass_c: f64) -> BuildingConfig {
    BuildingConfig {
        initial_mass_temperature_c: Some(initial_mass_c),
        ..BuildingConfig::default()
    }
}

#[test]
fn equilibrium_at_set_point_needs_no_heating() {
    let boundary = BoundaryConditions {
        t_ext_c: 21.0,
        m_ve_inf_kg_s: 0.03,
        heating_setpoint_c: Some(21.0),
        cooling_setpoint_c: Some(26.0),
        ..BoundaryConditions::default()
    };
    let summary = simulate_building(&office(100.0), &[boundary; 4], &config(21.0), None).unwrap();
    for step in &summary.run.steps {
        assert_eq!(step.mode, HvacMode::FreeFloat);
        assert_eq!(step.heating_demand_w, 0.0);
        assert!((step.zone_air_temperature_c - 21.0).abs() < 1e-9);
    }
    assert_eq!(summary.totals.heating_kwh, 0.0);
}

#[test]
fn undersized_heating_is_clipped_and_flagged() {
    let boundary = BoundaryConditions {
        t_ext_c: -10.0,
        m_ve_inf_kg_s: 0.05,
        heating_setpoint_c: Some(21.0),
        ..BoundaryConditions::default()
    };
    let summary = simulate_building(&office(2.0), &[boundary; 3], &config(20.0), None).unwrap();
    for step in &summary.run.steps {
        assert_eq!(step.mode, HvacMode::Heating);
        assert!(step.capacity_exceeded);
        assert_eq!(step.heating_demand_w, 200.0);
        assert!(step.zone_air_temperature_c < 21.0);
        assert!(step.unmet_demand_w > 0.0);
    }
    assert_eq!(summary.totals.capacity_exceeded_steps, 3);
    assert!((summary.totals.heating_kwh - 0.6).abs() < 1e-9);
}

#[test]
fn free_float_decays_towards_ambient() {
    let boundary = BoundaryConditions {
        t_ext_c: 0.0,
        ..BoundaryConditions::default()
    };
    let summary = simulate_building(&office(0.0), &[boundary; 48], &config(20.0), None).unwrap();
    let air: Vec<f64> = summary
        .run
        .steps
        .iter()
        .map(|s| s.zone_air_temperature_c)
        .collect();
    assert!(air.windows(2).all(|w| w[1] < w[0]));
    assert!(air.iter().all(|t| *t > 0.0 && *t < 20.0));
}

#[test]
fn invalid_envelope_is_rejected() {
    let mut definition = office(100.0);
    definition.envelope.window_area_m2 = 1_000.0;
    let result = simulate_building(&definition, &[], &BuildingConfig::default(), None);
    assert!(matches!(result, Err(BuildingError::InvalidParameters { .. })));
}

#[test]
fn exports_totals_and_hourly_rows() {
    let dir = tempdir().unwrap();
    let boundary = BoundaryConditions {
        t_ext_c: 5.0,
        m_ve_inf_kg_s: 0.05,
        heating_setpoint_c: Some(20.0),
        ..BoundaryConditions::default()
    };
    let summary =
        simulate_building(&office(100.0), &[boundary; 5], &config(18.0), Some(dir.path())).unwrap();
    assert!(summary.totals.heating_kwh > 0.0);

    let totals = std::fs::read_to_string(dir.path().join("B1001_totals.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&totals).unwrap();
    assert_eq!(parsed["model_version"], "2026.1");
    assert_eq!(parsed["schema"]["title"], "BuildingTotals");
    assert_eq!(parsed["data"]["steps"], 5);

    let hourly = std::fs::read_to_string(dir.path().join("B1001_hourly.csv")).unwrap();
    let mut lines = hourly.lines();
    assert!(lines.next().unwrap().starts_with("time_step,mode,"));
    assert_eq!(lines.count(), 5);
}
