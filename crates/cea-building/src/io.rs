//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Readers for building definitions and boundary condition series."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use std::{fs, path::Path};

use crate::{
    errors::Result,
    model::{BoundaryConditions, BuildingDefinition},
};

fn is_json(data: &str) -> bool {
    let trimmed = data.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[')
}

pub fn load_building_definition(path: impl AsRef<Path>) -> Result<BuildingDefinition> {
    let data = fs::read_to_string(path)?;
    let definition = if is_json(&data) {
        serde_json::from_str(&data)?
    } else {
        serde_yaml::from_str(&data)?
    };
    Ok(definition)
}

/// Hourly boundary conditions from a CSV table (one row per step) or a JSON array.
pub fn load_boundary_series(path: impl AsRef<Path>) -> Result<Vec<BoundaryConditions>> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        let rows = csv::Reader::from_path(path)?
            .deserialize()
            .collect::<std::result::Result<Vec<BoundaryConditions>, _>>()?;
        return Ok(rows);
    }
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
