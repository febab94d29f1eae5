//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Typed node, edge, and pipe catalog records for thermal networks."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{NetworkError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkModel {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl NetworkModel {
    pub fn plants(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind == NodeKind::Plant)
    }

    pub fn consumers(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind == NodeKind::Consumer)
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("network")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub node_id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub building_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeKind {
    Plant,
    Consumer,
    Junction,
}

/// One pipe segment as declared in the edge table.
///
/// `start_node`/`end_node` only seed the initial orientation; the solver's
/// incidence matrix decides the direction reported afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub edge_id: String,
    pub start_node: String,
    pub end_node: String,
    pub length_m: f64,
    pub pipe_type_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipeType {
    pub pipe_type_code: String,
    /// Inner diameter.
    pub diameter_m: f64,
    pub max_flow_kg_s: f64,
    /// Fixed quadratic resistance in Pa per metre per (kg/s)^2.
    #[serde(default)]
    pub resistance_coeff: Option<f64>,
    /// Linear heat-loss coefficient in W per metre per kelvin.
    #[serde(default)]
    pub insulation_coeff: Option<f64>,
    #[serde(default)]
    pub outer_diameter_m: Option<f64>,
    #[serde(default)]
    pub insulation_diameter_m: Option<f64>,
}

impl PipeType {
    pub fn cross_section_m2(&self) -> f64 {
        std::f64::consts::PI * self.diameter_m.powi(2) / 4.0
    }

    fn invalid(&self, reason: impl Into<String>) -> NetworkError {
        NetworkError::InvalidPipe {
            pipe_type: self.pipe_type_code.clone(),
            reason: reason.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipe_type_code.trim().is_empty() {
            return Err(self.invalid("empty pipe type code"));
        }
        if !(self.diameter_m > 0.0) {
            return Err(self.invalid("diameter_m must be positive"));
        }
        if !(self.max_flow_kg_s > 0.0) {
            return Err(self.invalid("max_flow_kg_s must be positive"));
        }
        if let Some(r) = self.resistance_coeff {
            if !(r >= 0.0) {
                return Err(self.invalid("resistance_coeff must not be negative"));
            }
        }
        match (
            self.insulation_coeff,
            self.outer_diameter_m,
            self.insulation_diameter_m,
        ) {
            (Some(u), _, _) if u >= 0.0 => {}
            (Some(_), _, _) => return Err(self.invalid("insulation_coeff must not be negative")),
            (None, Some(outer), Some(insulation)) => {
                if !(outer > self.diameter_m) {
                    return Err(self.invalid("outer_diameter_m must exceed diameter_m"));
                }
                if !(insulation > 0.0) {
                    return Err(self.invalid("insulation_diameter_m must be positive"));
                }
            }
            (None, _, _) => {
                return Err(self.invalid(
                    "either insulation_coeff or outer_diameter_m and insulation_diameter_m is required",
                ))
            }
        }
        Ok(())
    }
}

/// Read-only pipe reference data keyed by pipe type code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipeCatalog {
    entries: BTreeMap<String, PipeType>,
}

impl PipeCatalog {
    pub fn from_entries(entries: impl IntoIterator<Item = PipeType>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for entry in entries {
            entry.validate()?;
            let code = entry.pipe_type_code.clone();
            if map.insert(code.clone(), entry).is_some() {
                return Err(NetworkError::InvalidPipe {
                    pipe_type: code,
                    reason: "duplicate pipe type code".into(),
                });
            }
        }
        Ok(Self { entries: map })
    }

    pub fn get(&self, code: &str) -> Option<&PipeType> {
        self.entries.get(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PipeType> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipe(code: &str) -> PipeType {
        PipeType {
            pipe_type_code: code.into(),
            diameter_m: 0.1,
            max_flow_kg_s: 20.0,
            resistance_coeff: None,
            insulation_coeff: Some(0.3),
            outer_diameter_m: None,
            insulation_diameter_m: None,
        }
    }

    #[test]
    fn catalog_rejects_duplicate_codes() {
        let err = PipeCatalog::from_entries(vec![pipe("DN100"), pipe("DN100")]).unwrap_err();
        assert!(matches!(err, NetworkError::InvalidPipe { .. }));
    }

    #[test]
    fn pipe_needs_a_heat_loss_description() {
        let mut entry = pipe("DN50");
        entry.insulation_coeff = None;
        assert!(entry.validate().is_err());
        entry.outer_diameter_m = Some(0.114);
        entry.insulation_diameter_m = Some(0.2);
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn node_kind_uses_uppercase_codes() {
        let node: Node =
            serde_json::from_str(r#"{"node_id":"N0","type":"PLANT","building_id":null}"#)
                .unwrap();
        assert_eq!(node.kind, NodeKind::Plant);
    }
}
