//! City marker selection and GeoJSON output.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// The 48 contiguous US states, in the order per-state picks are made
pub const CONUS_STATES: [&str; 48] = [
    "Alabama",
    "Arizona",
    "Arkansas",
    "California",
    "Colorado",
    "Connecticut",
    "Delaware",
    "Florida",
    "Georgia",
    "Idaho",
    "Illinois",
    "Indiana",
    "Iowa",
    "Kansas",
    "Kentucky",
    "Louisiana",
    "Maine",
    "Maryland",
    "Massachusetts",
    "Michigan",
    "Minnesota",
    "Mississippi",
    "Missouri",
    "Montana",
    "Nebraska",
    "Nevada",
    "New Hampshire",
    "New Jersey",
    "New Mexico",
    "New York",
    "North Carolina",
    "North Dakota",
    "Ohio",
    "Oklahoma",
    "Oregon",
    "Pennsylvania",
    "Rhode Island",
    "South Carolina",
    "South Dakota",
    "Tennessee",
    "Texas",
    "Utah",
    "Vermont",
    "Virginia",
    "Washington",
    "West Virginia",
    "Wisconsin",
    "Wyoming",
];

static CONUS_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| CONUS_STATES.into_iter().collect());

/// Default size of the national top-N list
pub const DEFAULT_NATIONAL_TOP: usize = 150;
/// Default number of cities kept per state
pub const DEFAULT_PER_STATE_TOP: usize = 3;

/// Coordinate reference of the source table (NAD83)
pub const CITIES_CRS: &str = "urn:ogc:def:crs:EPSG::4269";

/// One row of the city table. Extra columns are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CityRecord {
    pub city: String,
    pub state_name: String,
    pub population: f64,
    pub lat: f64,
    pub lng: f64,
}

/// A selected city marker
#[derive(Debug, Clone, PartialEq)]
pub struct CityPoint {
    pub city: String,
    pub state: String,
    pub lon: f64,
    pub lat: f64,
}

/// Read every record from a CSV city table
pub fn read_city_table(path: &Path) -> Result<Vec<CityRecord>> {
    let mut reader = csv::ReaderBuilder::new().from_path(path)?;
    let records = reader
        .deserialize()
        .collect::<std::result::Result<Vec<CityRecord>, csv::Error>>()?;
    debug!(path = %path.display(), records = records.len(), "Read city table");
    Ok(records)
}

/// Pick the national top `national_top` by population plus the top
/// `per_state_top` of every contiguous state.
///
/// Duplicates on `(city, state)` keep their first occurrence, national picks
/// first. Cities outside the contiguous states are dropped.
pub fn select_cities(
    records: &[CityRecord],
    national_top: usize,
    per_state_top: usize,
) -> Vec<CityPoint> {
    let mut ranked: Vec<&CityRecord> = records.iter().collect();
    // stable, so ties keep table order
    ranked.sort_by(|a, b| b.population.total_cmp(&a.population));

    let national = ranked.iter().take(national_top).copied();
    let per_state = CONUS_STATES.iter().flat_map(|state| {
        ranked
            .iter()
            .filter(move |r| r.state_name == *state)
            .take(per_state_top)
            .copied()
    });

    let mut seen = HashSet::new();
    national
        .chain(per_state)
        .filter(|r| seen.insert((r.city.as_str(), r.state_name.as_str())))
        .filter(|r| CONUS_SET.contains(r.state_name.as_str()))
        .map(|r| CityPoint {
            city: r.city.clone(),
            state: r.state_name.clone(),
            lon: r.lng,
            lat: r.lat,
        })
        .collect()
}

/// GeoJSON FeatureCollection of city points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityCollection {
    #[serde(rename = "type")]
    pub type_: String,
    pub crs: NamedCrs,
    pub features: Vec<CityFeature>,
}

/// Legacy named CRS member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCrs {
    #[serde(rename = "type")]
    pub type_: String,
    pub properties: CrsProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrsProperties {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityFeature {
    #[serde(rename = "type")]
    pub type_: String,
    pub properties: CityProperties,
    pub geometry: PointGeometry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityProperties {
    pub city: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub type_: String,
    pub coordinates: [f64; 2],
}

impl CityCollection {
    pub fn from_points(points: &[CityPoint]) -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            crs: NamedCrs {
                type_: "name".to_string(),
                properties: CrsProperties {
                    name: CITIES_CRS.to_string(),
                },
            },
            features: points
                .iter()
                .map(|p| CityFeature {
                    type_: "Feature".to_string(),
                    properties: CityProperties {
                        city: p.city.clone(),
                        state: p.state.clone(),
                    },
                    geometry: PointGeometry {
                        type_: "Point".to_string(),
                        coordinates: [p.lon, p.lat],
                    },
                })
                .collect(),
        }
    }
}

/// Write selected cities as GeoJSON
pub fn write_cities_geojson(path: &Path, points: &[CityPoint]) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut file, &CityCollection::from_points(points))?;
    file.flush()?;
    Ok(())
}
