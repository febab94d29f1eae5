//! ---
//! cea_section: "15-testing-qa-runbook"
//! cea_subsection: "integration-tests"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Building demand through the network solver to the fitness vector."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use cea_building::{
    model::{
        BoundaryConditions, BuildingDefinition, CoolingSystem, EnvelopeProperties, HeatingSystem,
        HvacProperties,
    },
    simulation::BuildingSimulation,
};
use cea_common::{AppConfig, NetworkType, ThermalConfig};
use cea_core::{
    aggregation::aggregate_demand, evaluate, BuildingDemandInput, EvaluationBudget,
    EvaluationRequest,
};
use cea_network::{
    model::{Edge, NetworkModel, Node, NodeKind, PipeCatalog, PipeType},
    simulate_network_with_options,
    simulation::RunBudget,
};
use tempfile::tempdir;

fn definition(id: &str, floor_area_m2: f64) -> BuildingDefinition {
    BuildingDefinition {
        building_id: id.into(),
        version: None,
        envelope: EnvelopeProperties {
            floor_area_m2,
            window_area_m2: 0.2 * floor_area_m2,
            wall_area_m2: 1.1 * floor_area_m2,
            roof_area_m2: floor_area_m2,
            basement_area_m2: floor_area_m2,
            u_window: 1.3,
            u_wall: 0.3,
            u_roof: 0.2,
            u_base: 0.4,
            cm_af_j_m2k: 165_000.0,
        },
        hvac: HvacProperties {
            heating_system: Some(HeatingSystem::T4),
            cooling_system: Some(CoolingSystem::T3),
            max_heating_w_m2: 70.0,
            max_cooling_w_m2: 60.0,
        },
    }
}

/// Winter day with a night setback.
fn winter_day() -> Vec<BoundaryConditions> {
    (0..24)
        .map(|hour| {
            let occupied = (7..19).contains(&hour);
            BoundaryConditions {
                t_ext_c: -4.0 + 5.0 * ((hour as f64 - 14.0) * std::f64::consts::PI / 12.0).cos(),
                solar_gains_w: if occupied { 800.0 } else { 0.0 },
                people_gains_w: if occupied { 900.0 } else { 100.0 },
                appliance_gains_w: if occupied { 1200.0 } else { 300.0 },
                m_ve_inf_kg_s: 0.06,
                m_ve_mech_kg_s: if occupied { 0.1 } else { 0.0 },
                theta_ve_mech_c: Some(16.0),
                heating_setpoint_c: Some(if occupied { 21.0 } else { 17.0 }),
                cooling_setpoint_c: Some(26.0),
                ..BoundaryConditions::default()
            }
        })
        .collect()
}

fn summer_day() -> Vec<BoundaryConditions> {
    (0..24)
        .map(|hour| BoundaryConditions {
            t_ext_c: 27.0 + 6.0 * ((hour as f64 - 15.0) * std::f64::consts::PI / 12.0).cos(),
            solar_gains_w: if (8..18).contains(&hour) { 6000.0 } else { 0.0 },
            people_gains_w: 900.0,
            m_ve_inf_kg_s: 0.06,
            heating_setpoint_c: Some(f64::NAN),
            cooling_setpoint_c: Some(25.0),
            ..BoundaryConditions::default()
        })
        .collect()
}

fn street() -> NetworkModel {
    let node = |id: &str, kind, building: Option<&str>| Node {
        node_id: id.into(),
        kind,
        building_id: building.map(Into::into),
    };
    let edge = |id: &str, start: &str, end: &str, length_m| Edge {
        edge_id: id.into(),
        start_node: start.into(),
        end_node: end.into(),
        length_m,
        pipe_type_code: "DN65".into(),
    };
    NetworkModel {
        version: Some("e2e".into()),
        name: Some("street".into()),
        nodes: vec![
            node("PLANT", NodeKind::Plant, None),
            node("J1", NodeKind::Junction, None),
            node("J2", NodeKind::Junction, None),
            node("C1", NodeKind::Consumer, Some("B01")),
            node("C2", NodeKind::Consumer, Some("B02")),
            node("C3", NodeKind::Consumer, Some("B03")),
        ],
        edges: vec![
            edge("E1", "PLANT", "J1", 120.0),
            edge("E2", "J1", "C1", 35.0),
            edge("E3", "J2", "J1", 80.0),
            edge("E4", "J2", "C2", 25.0),
            edge("E5", "C3", "J2", 40.0),
        ],
    }
}

fn pipes() -> Vec<PipeType> {
    vec![PipeType {
        pipe_type_code: "DN65".into(),
        diameter_m: 0.0703,
        max_flow_kg_s: 8.0,
        resistance_coeff: None,
        insulation_coeff: Some(0.25),
        outer_diameter_m: None,
        insulation_diameter_m: None,
    }]
}

#[test]
fn plant_heat_balances_building_demand_and_losses() {
    let config = AppConfig::default();
    let series = winter_day();
    let buildings = [("B01", 180.0), ("B02", 320.0), ("B03", 240.0)];

    let mut loads = Vec::new();
    let mut building_heat_kwh = 0.0;
    for (id, area) in buildings {
        let run = BuildingSimulation::new(&definition(id, area), &config.building)
            .unwrap()
            .run(&series);
        building_heat_kwh += run.heating_kwh();
        loads.push((
            id.to_owned(),
            run.network_load_w(NetworkType::DistrictHeating, series.len())
                .unwrap(),
        ));
    }
    assert!(building_heat_kwh > 0.0);

    let model = street();
    let demand = aggregate_demand(&model, None, &loads, series.len(), &config.thermal).unwrap();
    let catalog = PipeCatalog::from_entries(pipes()).unwrap();
    let dir = tempdir().unwrap();
    let summary = simulate_network_with_options(
        &model,
        &catalog,
        &demand,
        &config,
        &RunBudget::unlimited(),
        Some(dir.path()),
    )
    .unwrap();

    assert_eq!(summary.totals.steps, 24);
    assert_eq!(summary.totals.loops, 0);
    assert_eq!(summary.totals.unconverged_steps, 0);
    assert!(summary.totals.thermal_loss_kwh > 0.0);
    let delivered = building_heat_kwh + summary.totals.thermal_loss_kwh;
    assert!(
        (summary.totals.plant_heat_kwh - delivered).abs() < 1e-3 * delivered,
        "plant {} kWh vs delivered {} kWh",
        summary.totals.plant_heat_kwh,
        delivered
    );

    let totals: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("network_totals.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(totals["data"]["steps"], 24);
}

#[test]
fn cooling_candidate_is_evaluated_end_to_end() {
    let request = EvaluationRequest {
        network: street(),
        catalog: pipes(),
        demand: None,
        buildings: ["B01", "B02", "B03"]
            .into_iter()
            .map(|id| BuildingDemandInput {
                definition: definition(id, 250.0),
                series: summer_day(),
            })
            .collect(),
        thermal: Some(ThermalConfig {
            network_type: NetworkType::DistrictCooling,
            plant_supply_temperature_c: 6.0,
            consumer_delta_t_k: 8.0,
            ..ThermalConfig::default()
        }),
        solver: None,
    };
    let report = evaluate(&request, &AppConfig::default(), &EvaluationBudget::unlimited()).unwrap();

    assert!(!report.fitness.penalised);
    assert_eq!(report.buildings.len(), 3);
    assert!(report.buildings.iter().all(|b| b.cooling_kwh > 0.0));
    assert!(report.buildings.iter().all(|b| b.heating_kwh == 0.0));
    assert!(report.fitness.pumping_energy_kwh > 0.0);
    assert!(report.fitness.peak_pressure_loss_pa > 0.0);
    assert_eq!(report.fitness.unconverged_steps, 0);
}
