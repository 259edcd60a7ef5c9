//! City metadata: central/residential areas used to tag graph nodes.
//!
//! The metadata file is a JSON array of city records; the core only consumes
//! the resolved circle areas (the `osm_filters` string belongs to the map
//! ingestion collaborator and is passed through untouched).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::errors::SimError;
use crate::graph::GraphDescription;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AreaCenter {
    pub x: f64,
    pub y: f64,
}

/// Circular area in the projected plane.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Area {
    pub center: AreaCenter,
    pub radius: f64,
}

impl Area {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (dx, dy) = (x - self.center.x, y - self.center.y);
        dx * dx + dy * dy <= self.radius * self.radius
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CityRecord {
    pub city: String,
    #[serde(default)]
    pub central_areas: Vec<Area>,
    #[serde(default)]
    pub residential_areas: Vec<Area>,
    #[serde(default)]
    pub osm_filters: String,
}

/// Resolved area lists for one city.
#[derive(Debug, Clone, Default)]
pub struct CityAreas {
    pub central: Vec<Area>,
    pub residential: Vec<Area>,
    pub osm_filters: String,
}

/// Load the record for `city_name` from a metadata file.
pub fn load_city_areas(path: &Path, city_name: &str) -> Result<CityAreas, SimError> {
    let file = File::open(path)
        .map_err(|e| SimError::CityMetadata(format!("{}: {e}", path.display())))?;
    let records: Vec<CityRecord> = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| SimError::CityMetadata(format!("{}: {e}", path.display())))?;
    records
        .into_iter()
        .find(|record| record.city == city_name)
        .map(|record| CityAreas {
            central: record.central_areas,
            residential: record.residential_areas,
            osm_filters: record.osm_filters,
        })
        .ok_or_else(|| {
            SimError::CityMetadata(format!(
                "city {city_name:?} not defined in {}",
                path.display()
            ))
        })
}

/// Tag every node of a graph description with the areas that contain it.
pub fn tag_nodes(description: &mut GraphDescription, areas: &CityAreas) {
    for node in &mut description.nodes {
        node.is_center = areas.central.iter().any(|a| a.contains(node.x, node.y));
        node.is_residential = areas
            .residential
            .iter()
            .any(|a| a.contains(node.x, node.y));
    }
}
