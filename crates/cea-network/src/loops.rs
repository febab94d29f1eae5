//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Fundamental loop detection for meshed pipe networks."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use petgraph::{algo::astar, graph::NodeIndex, graph::UnGraph};

use crate::{
    errors::{NetworkError, Result},
    flow_direction::InitialFlow,
    topology::Topology,
};

/// Closed path of edges with orientation relative to the reference incidence.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowLoop {
    pub edges: Vec<(usize, f64)>,
}

/// One loop per chord of the spanning tree.
pub fn fundamental_loops(topology: &Topology, initial: &InitialFlow) -> Result<Vec<FlowLoop>> {
    let mut tree = UnGraph::<usize, usize>::with_capacity(
        topology.node_count(),
        topology.edge_count(),
    );
    let indices: Vec<NodeIndex> = (0..topology.node_count())
        .map(|node| tree.add_node(node))
        .collect();
    for (edge, &in_tree) in initial.spanning_tree.iter().enumerate() {
        if in_tree {
            let (from, to) = endpoints(initial, topology, edge)?;
            tree.add_edge(indices[from], indices[to], edge);
        }
    }

    let mut loops = Vec::new();
    for chord in initial.chords() {
        let (from, to) = endpoints(initial, topology, chord)?;
        // walk the chord from -> to, then back through the tree to -> from
        let (_, path) = astar(
            &tree,
            indices[to],
            |finish| finish == indices[from],
            |_| 1.0,
            |_| 0.0,
        )
        .ok_or_else(|| NetworkError::InvalidTopology {
            element: topology.edge(chord).edge_id.clone(),
            reason: "chord endpoints are not joined by the spanning tree".into(),
        })?;

        let mut edges = vec![(chord, 1.0)];
        for window in path.windows(2) {
            let (a, b) = (window[0], window[1]);
            let Some(tree_edge) = tree.find_edge(a, b) else {
                continue;
            };
            let edge = tree[tree_edge];
            let (edge_from, _) = endpoints(initial, topology, edge)?;
            let orientation = if edge_from == tree[a] { 1.0 } else { -1.0 };
            edges.push((edge, orientation));
        }
        loops.push(FlowLoop { edges });
    }
    Ok(loops)
}

fn endpoints(initial: &InitialFlow, topology: &Topology, edge: usize) -> Result<(usize, usize)> {
    initial
        .incidence
        .endpoints(edge)
        .ok_or_else(|| NetworkError::MalformedIncidence {
            edge: topology.edge(edge).edge_id.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        flow_direction::initialize_flow_directions,
        model::{Edge, NetworkModel, Node, NodeKind},
    };
    use nalgebra::DVector;

    fn ring() -> Topology {
        let nodes = [
            ("P", NodeKind::Plant),
            ("A", NodeKind::Consumer),
            ("B", NodeKind::Consumer),
            ("C", NodeKind::Consumer),
        ];
        let edges = [
            ("PA", "P", "A"),
            ("AB", "A", "B"),
            ("BC", "B", "C"),
            ("CP", "C", "P"),
        ];
        Topology::build(&NetworkModel {
            version: None,
            name: None,
            nodes: nodes
                .iter()
                .map(|(id, kind)| Node {
                    node_id: (*id).into(),
                    kind: *kind,
                    building_id: None,
                })
                .collect(),
            edges: edges
                .iter()
                .map(|(id, s, e)| Edge {
                    edge_id: (*id).into(),
                    start_node: (*s).into(),
                    end_node: (*e).into(),
                    length_m: 40.0,
                    pipe_type_code: "DN65".into(),
                })
                .collect(),
        })
        .unwrap()
    }

    #[test]
    fn ring_has_one_loop_covering_every_edge() {
        let topology = ring();
        let initial = initialize_flow_directions(&topology).unwrap();
        let loops = fundamental_loops(&topology, &initial).unwrap();
        assert_eq!(loops.len(), 1);
        let mut edges: Vec<usize> = loops[0].edges.iter().map(|(e, _)| *e).collect();
        edges.sort_unstable();
        assert_eq!(edges, vec![0, 1, 2, 3]);
    }

    #[test]
    fn circulating_along_a_loop_preserves_continuity() {
        let topology = ring();
        let initial = initialize_flow_directions(&topology).unwrap();
        let loops = fundamental_loops(&topology, &initial).unwrap();
        let mut flows = DVector::zeros(topology.edge_count());
        for (edge, orientation) in &loops[0].edges {
            flows[*edge] += orientation * 0.7;
        }
        let balance = initial.incidence.node_balance(&flows);
        assert!(balance.iter().all(|v| v.abs() < 1e-12));
    }
}
