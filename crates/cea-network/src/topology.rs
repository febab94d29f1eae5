//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Adjacency and edge lookup built from the network edge table."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use std::collections::HashMap;

use petgraph::unionfind::UnionFind;
use tracing::debug;

use crate::{
    errors::{NetworkError, Result},
    model::{Edge, NetworkModel, Node, NodeKind, PipeCatalog},
};

/// Arena of nodes and edges indexed by position in the input tables.
#[derive(Debug, Clone)]
pub struct Topology {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_index: HashMap<String, usize>,
    /// node -> (neighbour, edge) in edge-table order
    adjacency: Vec<Vec<(usize, usize)>>,
    /// unordered node pair -> edge
    pair_lookup: HashMap<(usize, usize), usize>,
    /// declared (start, end) per edge
    declared: Vec<(usize, usize)>,
    component: Vec<usize>,
    component_count: usize,
}

fn pair_key(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn invalid(element: &str, reason: impl Into<String>) -> NetworkError {
    NetworkError::InvalidTopology {
        element: element.to_owned(),
        reason: reason.into(),
    }
}

impl Topology {
    /// Build adjacency and pair lookup, rejecting dangling references and duplicate pipes.
    pub fn build(model: &NetworkModel) -> Result<Self> {
        let mut node_index = HashMap::with_capacity(model.nodes.len());
        for (idx, node) in model.nodes.iter().enumerate() {
            if node.node_id.trim().is_empty() {
                return Err(invalid(&format!("node #{idx}"), "empty node id"));
            }
            if node_index.insert(node.node_id.clone(), idx).is_some() {
                return Err(invalid(&node.node_id, "duplicate node id"));
            }
        }

        let mut adjacency = vec![Vec::new(); model.nodes.len()];
        let mut pair_lookup = HashMap::with_capacity(model.edges.len());
        let mut declared = Vec::with_capacity(model.edges.len());
        let mut edge_ids = HashMap::with_capacity(model.edges.len());

        for (idx, edge) in model.edges.iter().enumerate() {
            if edge.edge_id.trim().is_empty() {
                return Err(invalid(&format!("edge #{idx}"), "empty edge id"));
            }
            if let Some(previous) = edge_ids.insert(edge.edge_id.as_str(), idx) {
                return Err(invalid(
                    &edge.edge_id,
                    format!("duplicate edge id (rows {previous} and {idx})"),
                ));
            }
            let start = *node_index.get(&edge.start_node).ok_or_else(|| {
                invalid(
                    &edge.edge_id,
                    format!("unknown start node {}", edge.start_node),
                )
            })?;
            let end = *node_index
                .get(&edge.end_node)
                .ok_or_else(|| invalid(&edge.edge_id, format!("unknown end node {}", edge.end_node)))?;
            if start == end {
                return Err(invalid(&edge.edge_id, "edge connects a node to itself"));
            }
            if !(edge.length_m > 0.0) || !edge.length_m.is_finite() {
                return Err(invalid(&edge.edge_id, "length_m must be positive"));
            }
            if let Some(existing) = pair_lookup.insert(pair_key(start, end), idx) {
                return Err(invalid(
                    &edge.edge_id,
                    format!(
                        "duplicates edge {} between {} and {}",
                        model.edges[existing].edge_id, edge.start_node, edge.end_node
                    ),
                ));
            }
            adjacency[start].push((end, idx));
            adjacency[end].push((start, idx));
            declared.push((start, end));
        }

        let (component, component_count) = label_components(model.nodes.len(), &declared);
        debug!(
            nodes = model.nodes.len(),
            edges = model.edges.len(),
            components = component_count,
            "topology built"
        );

        Ok(Self {
            nodes: model.nodes.clone(),
            edges: model.edges.clone(),
            node_index,
            adjacency,
            pair_lookup,
            declared,
            component,
            component_count,
        })
    }

    /// Confirm every edge's pipe type exists in the catalog.
    pub fn check_catalog(&self, catalog: &PipeCatalog) -> Result<()> {
        for edge in &self.edges {
            if catalog.get(&edge.pipe_type_code).is_none() {
                return Err(NetworkError::MissingPipeType {
                    edge: edge.edge_id.clone(),
                    pipe_type: edge.pipe_type_code.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    pub fn edge(&self, idx: usize) -> &Edge {
        &self.edges[idx]
    }

    pub fn node_kind(&self, idx: usize) -> NodeKind {
        self.nodes[idx].kind
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    pub fn neighbours(&self, idx: usize) -> &[(usize, usize)] {
        &self.adjacency[idx]
    }

    /// Edge joining two nodes regardless of orientation.
    pub fn edge_between(&self, a: usize, b: usize) -> Option<usize> {
        self.pair_lookup.get(&pair_key(a, b)).copied()
    }

    pub fn declared_endpoints(&self, edge: usize) -> (usize, usize) {
        self.declared[edge]
    }

    pub fn component_of(&self, node: usize) -> usize {
        self.component[node]
    }

    pub fn component_count(&self) -> usize {
        self.component_count
    }

    pub fn plant_indices(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&idx| self.nodes[idx].kind == NodeKind::Plant)
            .collect()
    }

    /// Lowest-indexed plant per connected component; errors when a component has none.
    pub fn reference_plants(&self) -> Result<Vec<usize>> {
        let mut reference = vec![None; self.component_count];
        for idx in self.plant_indices() {
            let slot = &mut reference[self.component[idx]];
            if slot.is_none() {
                *slot = Some(idx);
            }
        }
        reference
            .into_iter()
            .enumerate()
            .map(|(component, plant)| {
                plant.ok_or_else(|| {
                    let node = self
                        .component
                        .iter()
                        .position(|&c| c == component)
                        .map(|idx| self.nodes[idx].node_id.clone())
                        .unwrap_or_default();
                    NetworkError::MissingPlant { node }
                })
            })
            .collect()
    }

    /// More pipes than a spanning forest needs.
    pub fn is_meshed(&self) -> bool {
        self.edges.len() + self.component_count > self.nodes.len()
    }
}

/// Component label per node, numbered in order of each component's first node.
fn label_components(node_count: usize, declared: &[(usize, usize)]) -> (Vec<usize>, usize) {
    let mut sets = UnionFind::<usize>::new(node_count);
    for &(start, end) in declared {
        sets.union(start, end);
    }
    let mut labels = HashMap::new();
    let component = (0..node_count)
        .map(|node| {
            let next = labels.len();
            *labels.entry(sets.find(node)).or_insert(next)
        })
        .collect();
    (component, labels.len())
}
