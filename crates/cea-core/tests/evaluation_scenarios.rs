//! ---
//! cea_section: "15-testing-qa-runbook"
//! cea_subsection: "integration-tests"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Candidate evaluation scenarios across building and network models."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use cea_building::model::{
    BoundaryConditions, BuildingDefinition, EnvelopeProperties, HeatingSystem, HvacProperties,
};
use cea_common::{AppConfig, ThermalConfig};
use cea_core::{
    evaluate, evaluate_or_penalise, BuildingDemandInput, EvaluationBudget, EvaluationError,
    EvaluationRequest,
};
use cea_network::model::{Edge, NetworkModel, Node, NodeKind, PipeType};

fn node(id: &str, kind: NodeKind, building: Option<&str>) -> Node {
    Node {
        node_id: id.into(),
        kind,
        building_id: building.map(Into::into),
    }
}

fn edge(id: &str, start: &str, end: &str) -> Edge {
    Edge {
        edge_id: id.into(),
        start_node: start.into(),
        end_node: end.into(),
        length_m: 60.0,
        pipe_type_code: "DN40".into(),
    }
}

fn building(id: &str) -> BuildingDemandInput {
    let definition = BuildingDefinition {
        building_id: id.into(),
        version: None,
        envelope: EnvelopeProperties {
            floor_area_m2: 200.0,
            window_area_m2: 40.0,
            wall_area_m2: 240.0,
            roof_area_m2: 200.0,
            basement_area_m2: 0.0,
            u_window: 1.4,
            u_wall: 0.35,
            u_roof: 0.25,
            u_base: 0.0,
            cm_af_j_m2k: 165_000.0,
        },
        hvac: HvacProperties {
            heating_system: Some(HeatingSystem::T1),
            cooling_system: None,
            max_heating_w_m2: 80.0,
            max_cooling_w_m2: 0.0,
        },
    };
    let hour = BoundaryConditions {
        t_ext_c: -2.0,
        m_ve_inf_kg_s: 0.08,
        people_gains_w: 600.0,
        heating_setpoint_c: Some(21.0),
        ..BoundaryConditions::default()
    };
    BuildingDemandInput {
        definition,
        series: vec![hour; 3],
    }
}

fn request(extra_nodes: Vec<Node>) -> EvaluationRequest {
    let mut nodes = vec![
        node("P", NodeKind::Plant, None),
        node("J", NodeKind::Junction, None),
        node("C1", NodeKind::Consumer, Some("B01")),
        node("C2", NodeKind::Consumer, Some("B02")),
    ];
    nodes.extend(extra_nodes);
    EvaluationRequest {
        network: NetworkModel {
            version: None,
            name: Some("candidate-7".into()),
            nodes,
            edges: vec![edge("E1", "P", "J"), edge("E2", "J", "C1"), edge("E3", "C2", "J")],
        },
        catalog: vec![PipeType {
            pipe_type_code: "DN40".into(),
            diameter_m: 0.0431,
            max_flow_kg_s: 2.0,
            resistance_coeff: None,
            insulation_coeff: Some(0.18),
            outer_diameter_m: None,
            insulation_diameter_m: None,
        }],
        demand: None,
        buildings: vec![building("B01"), building("B02")],
        thermal: None,
        solver: None,
    }
}

#[test]
fn building_loads_drive_the_network() {
    let budget = EvaluationBudget::unlimited();
    let report = evaluate(&request(Vec::new()), &AppConfig::default(), &budget).unwrap();
    assert_eq!(report.network, "candidate-7");
    assert_eq!(report.buildings.len(), 2);
    assert!(report.buildings.iter().all(|b| b.heating_kwh > 0.0));
    assert!(!report.fitness.penalised);
    assert!(report.fitness.pumping_energy_kwh > 0.0);
    assert!(report.fitness.thermal_loss_kwh > 0.0);
    assert!(report.fitness.peak_pressure_loss_pa > 0.0);
    assert_eq!(report.fitness.unconverged_steps, 0);
    assert!(report.failed_step.is_none());
}

#[test]
fn unreachable_consumer_is_penalised() {
    let request = request(vec![node("C9", NodeKind::Consumer, None)]);
    let config = AppConfig::default();
    let err = evaluate(&request, &config, &EvaluationBudget::unlimited()).unwrap_err();
    assert!(matches!(err, EvaluationError::Structural { .. }));

    let report = evaluate_or_penalise(&request, &config, &EvaluationBudget::unlimited()).unwrap();
    assert!(report.fitness.penalised);
    assert_eq!(report.fitness.pumping_energy_kwh, config.evaluation.penalty);
    assert!(report.failure.unwrap().contains("C9"));
}

#[test]
fn exhausted_budget_reports_the_failed_step() {
    let budget = EvaluationBudget::unlimited().with_max_time_steps(1);
    let config = AppConfig::default();
    assert!(matches!(
        evaluate(&request(Vec::new()), &config, &budget),
        Err(EvaluationError::BudgetExhausted { time_step: 1, .. })
    ));
    let report = evaluate_or_penalise(&request(Vec::new()), &config, &budget).unwrap();
    assert_eq!(report.failed_step, Some(1));
    assert!(report.fitness.penalised);
}

#[test]
fn mismatched_horizons_are_request_errors() {
    let mut request = request(Vec::new());
    request.buildings[1].series.pop();
    let budget = EvaluationBudget::unlimited();
    let result = evaluate_or_penalise(&request, &AppConfig::default(), &budget);
    assert!(matches!(result, Err(EvaluationError::InvalidRequest(_))));
}

#[test]
fn zero_substation_delta_t_never_reaches_the_fitness() {
    let mut request = request(Vec::new());
    request.thermal = Some(ThermalConfig {
        consumer_delta_t_k: 0.0,
        ..ThermalConfig::default()
    });
    let budget = EvaluationBudget::unlimited();
    let result = evaluate_or_penalise(&request, &AppConfig::default(), &budget);
    assert!(matches!(
        result,
        Err(EvaluationError::InvalidRequest(ref reason)) if reason.contains("thermal")
    ));
}

#[test]
fn fitness_values_are_finite() {
    let report = evaluate(
        &request(Vec::new()),
        &AppConfig::default(),
        &EvaluationBudget::unlimited(),
    )
    .unwrap();
    assert!(report.fitness.objectives().iter().all(|v| v.is_finite()));
}
