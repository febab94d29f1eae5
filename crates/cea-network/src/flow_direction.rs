//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Breadth-first flow-direction initializer seeded from plant nodes."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use std::collections::VecDeque;

use tracing::debug;

use crate::{
    errors::{NetworkError, Result},
    incidence::IncidenceMatrix,
    topology::Topology,
};

/// Warm-start orientation produced by [`initialize_flow_directions`].
#[derive(Debug, Clone)]
pub struct InitialFlow {
    pub incidence: IncidenceMatrix,
    /// Edges used by the search; the rest close loops.
    pub spanning_tree: Vec<bool>,
    /// Nodes in the order they were reached.
    pub visit_order: Vec<usize>,
}

impl InitialFlow {
    pub fn chords(&self) -> impl Iterator<Item = usize> + '_ {
        self.spanning_tree
            .iter()
            .enumerate()
            .filter_map(|(edge, &in_tree)| (!in_tree).then_some(edge))
    }
}

/// Orient every edge away from the plants by breadth-first search.
///
/// Plants are visited in node-table order and neighbours in edge-table order,
/// so the result only depends on the input tables. Edges joining two nodes
/// that were already reached keep their declared orientation. Any node left
/// unvisited is a structural error.
pub fn initialize_flow_directions(topology: &Topology) -> Result<InitialFlow> {
    let mut incidence = IncidenceMatrix::from_declared(topology);
    let mut spanning_tree = vec![false; topology.edge_count()];
    let mut visited = vec![false; topology.node_count()];
    let mut visit_order = Vec::with_capacity(topology.node_count());

    for plant in topology.plant_indices() {
        if visited[plant] {
            continue;
        }
        visited[plant] = true;
        visit_order.push(plant);
        let mut queue = VecDeque::from([plant]);
        while let Some(current) = queue.pop_front() {
            for &(next, edge) in topology.neighbours(current) {
                if visited[next] {
                    continue;
                }
                incidence.orient(edge, current, next);
                spanning_tree[edge] = true;
                visited[next] = true;
                visit_order.push(next);
                queue.push_back(next);
            }
        }
    }

    let unreachable: Vec<String> = visited
        .iter()
        .enumerate()
        .filter(|(_, &seen)| !seen)
        .map(|(idx, _)| topology.node(idx).node_id.clone())
        .collect();
    if !unreachable.is_empty() {
        return Err(NetworkError::UnreachableNodes { nodes: unreachable });
    }

    debug!(
        tree_edges = spanning_tree.iter().filter(|&&t| t).count(),
        chords = spanning_tree.iter().filter(|&&t| !t).count(),
        "flow directions initialised"
    );

    Ok(InitialFlow {
        incidence,
        spanning_tree,
        visit_order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, NetworkModel, Node, NodeKind};

    fn build(nodes: &[(&str, NodeKind)], edges: &[(&str, &str, &str)]) -> Topology {
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
                    length_m: 25.0,
                    pipe_type_code: "DN80".into(),
                })
                .collect(),
        })
        .unwrap()
    }

    #[test]
    fn edges_point_away_from_plant() {
        // declared towards the plant on purpose
        let topology = build(
            &[
                ("P", NodeKind::Plant),
                ("J", NodeKind::Junction),
                ("C", NodeKind::Consumer),
            ],
            &[("e0", "J", "P"), ("e1", "C", "J")],
        );
        let flow = initialize_flow_directions(&topology).unwrap();
        assert_eq!(flow.incidence.endpoints(0), Some((0, 1)));
        assert_eq!(flow.incidence.endpoints(1), Some((1, 2)));
        assert_eq!(flow.visit_order, vec![0, 1, 2]);
        assert_eq!(flow.chords().count(), 0);
    }

    #[test]
    fn loop_keeps_one_chord() {
        let topology = build(
            &[
                ("P", NodeKind::Plant),
                ("A", NodeKind::Consumer),
                ("B", NodeKind::Consumer),
            ],
            &[("PA", "P", "A"), ("PB", "P", "B"), ("AB", "A", "B")],
        );
        let flow = initialize_flow_directions(&topology).unwrap();
        assert_eq!(flow.chords().collect::<Vec<_>>(), vec![2]);
        assert!(flow.incidence.is_well_formed());
    }

    #[test]
    fn repeated_runs_agree() {
        let topology = build(
            &[
                ("P", NodeKind::Plant),
                ("A", NodeKind::Junction),
                ("B", NodeKind::Junction),
                ("C", NodeKind::Consumer),
            ],
            &[("PA", "P", "A"), ("PB", "B", "P"), ("AC", "C", "A"), ("BC", "B", "C")],
        );
        let first = initialize_flow_directions(&topology).unwrap();
        let second = initialize_flow_directions(&topology).unwrap();
        assert_eq!(first.incidence, second.incidence);
        assert_eq!(first.spanning_tree, second.spanning_tree);
    }

    #[test]
    fn unreachable_consumer_is_structural() {
        let topology = build(
            &[
                ("P", NodeKind::Plant),
                ("A", NodeKind::Consumer),
                ("Z", NodeKind::Consumer),
            ],
            &[("PA", "P", "A")],
        );
        let err = initialize_flow_directions(&topology).unwrap_err();
        assert!(err.is_structural());
        assert!(matches!(err, NetworkError::UnreachableNodes { ref nodes } if nodes == &["Z"]));
    }
}
