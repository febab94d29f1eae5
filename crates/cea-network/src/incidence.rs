//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Edge-node incidence matrix holding the assumed flow directions."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use nalgebra::{DMatrix, DVector};

use crate::{
    errors::{NetworkError, Result},
    topology::Topology,
};

/// Node x edge matrix: -1 where flow leaves, +1 where it enters.
///
/// This is the only record of edge direction once the initializer has run;
/// start/end node ids for reporting are read back from it.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidenceMatrix {
    matrix: DMatrix<f64>,
}

impl IncidenceMatrix {
    /// Orientation exactly as declared in the edge table.
    pub fn from_declared(topology: &Topology) -> Self {
        let mut incidence = Self {
            matrix: DMatrix::zeros(topology.node_count(), topology.edge_count()),
        };
        for edge in 0..topology.edge_count() {
            let (from, to) = topology.declared_endpoints(edge);
            incidence.orient(edge, from, to);
        }
        incidence
    }

    pub fn node_count(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn edge_count(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn entry(&self, node: usize, edge: usize) -> f64 {
        self.matrix[(node, edge)]
    }

    /// Direct the edge from `from` to `to`, clearing any previous orientation.
    pub fn orient(&mut self, edge: usize, from: usize, to: usize) {
        self.matrix.column_mut(edge).fill(0.0);
        self.matrix[(from, edge)] = -1.0;
        self.matrix[(to, edge)] = 1.0;
    }

    pub fn flip(&mut self, edge: usize) {
        for value in self.matrix.column_mut(edge).iter_mut() {
            *value = -*value;
        }
    }

    /// (from, to) of one column, `None` when the column is malformed.
    pub fn endpoints(&self, edge: usize) -> Option<(usize, usize)> {
        let mut from = None;
        let mut to = None;
        for (node, &value) in self.matrix.column(edge).iter().enumerate() {
            if value == -1.0 {
                if from.replace(node).is_some() {
                    return None;
                }
            } else if value == 1.0 {
                if to.replace(node).is_some() {
                    return None;
                }
            } else if value != 0.0 {
                return None;
            }
        }
        from.zip(to)
    }

    /// (from, to) for every edge in one pass.
    pub fn directed_edges(&self, topology: &Topology) -> Result<Vec<(usize, usize)>> {
        (0..self.edge_count())
            .map(|edge| {
                self.endpoints(edge)
                    .ok_or_else(|| NetworkError::MalformedIncidence {
                        edge: topology.edge(edge).edge_id.clone(),
                    })
            })
            .collect()
    }

    /// Every column holds exactly one -1 and one +1.
    pub fn is_well_formed(&self) -> bool {
        (0..self.edge_count()).all(|edge| self.endpoints(edge).is_some())
    }

    /// A * m: net inflow at every node for the given edge flows.
    pub fn node_balance(&self, flows: &DVector<f64>) -> DVector<f64> {
        &self.matrix * flows
    }

    /// Whether `other` agrees with this matrix on the direction of `edge`.
    pub fn same_direction(&self, other: &IncidenceMatrix, edge: usize) -> bool {
        self.matrix
            .column(edge)
            .iter()
            .eq(other.matrix.column(edge).iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, NetworkModel, Node, NodeKind};

    fn triangle() -> Topology {
        let nodes = ["A", "B", "C"]
            .iter()
            .enumerate()
            .map(|(i, id)| Node {
                node_id: (*id).into(),
                kind: if i == 0 {
                    NodeKind::Plant
                } else {
                    NodeKind::Consumer
                },
                building_id: None,
            })
            .collect();
        let edges = [("AB", "A", "B"), ("BC", "B", "C"), ("CA", "C", "A")]
            .iter()
            .map(|(id, s, e)| Edge {
                edge_id: (*id).into(),
                start_node: (*s).into(),
                end_node: (*e).into(),
                length_m: 10.0,
                pipe_type_code: "DN50".into(),
            })
            .collect();
        Topology::build(&NetworkModel {
            version: None,
            name: None,
            nodes,
            edges,
        })
        .unwrap()
    }

    #[test]
    fn declared_columns_are_well_formed() {
        let incidence = IncidenceMatrix::from_declared(&triangle());
        assert!(incidence.is_well_formed());
        for edge in 0..incidence.edge_count() {
            let sum: f64 = incidence.as_matrix().column(edge).iter().sum();
            assert_eq!(sum, 0.0);
        }
        assert_eq!(incidence.endpoints(2), Some((2, 0)));
    }

    #[test]
    fn flip_swaps_endpoints() {
        let mut incidence = IncidenceMatrix::from_declared(&triangle());
        incidence.flip(0);
        assert_eq!(incidence.endpoints(0), Some((1, 0)));
        assert!(incidence.is_well_formed());
    }

    #[test]
    fn node_balance_is_net_inflow() {
        let incidence = IncidenceMatrix::from_declared(&triangle());
        let balance = incidence.node_balance(&DVector::from_vec(vec![2.0, 1.0, 0.0]));
        assert_eq!(balance.as_slice(), &[-2.0, 1.0, 1.0]);
    }
}
