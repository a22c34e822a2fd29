//! State boundary extraction.
//!
//! Polygons are flattened into a single 2 x N polyline bundle. A NaN pair
//! separates consecutive rings so a line-drawing consumer lifts the pen
//! between them. Only exterior rings are kept; holes are dropped.

use ndarray::Array2;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{ClimapError, Result};

/// A closed ring of `[x, y]` positions
pub type Ring = Vec<[f64; 2]>;

/// Exterior geometry of one administrative region
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Polygon(Ring),
    MultiPolygon(Vec<Ring>),
}

impl Geometry {
    /// Exterior rings, one per constituent polygon
    pub fn exterior_rings(&self) -> &[Ring] {
        match self {
            Geometry::Polygon(ring) => std::slice::from_ref(ring),
            Geometry::MultiPolygon(rings) => rings,
        }
    }

    /// Build from a list of exterior rings
    fn from_rings(mut rings: Vec<Ring>) -> Option<Self> {
        match rings.len() {
            0 => None,
            1 => rings.pop().map(Geometry::Polygon),
            _ => Some(Geometry::MultiPolygon(rings)),
        }
    }
}

/// Concatenate every exterior ring into a 2 x N array with NaN separators
pub fn flatten_rings(geometries: &[Geometry]) -> Array2<f32> {
    let rings: Vec<&Ring> = geometries
        .iter()
        .flat_map(|g| g.exterior_rings())
        .filter(|r| !r.is_empty())
        .collect();
    let width = rings.iter().map(|r| r.len()).sum::<usize>() + rings.len().saturating_sub(1);

    let mut out = Array2::from_elem((2, width), f32::NAN);
    let mut col = 0;
    for (i, ring) in rings.iter().enumerate() {
        if i > 0 {
            // separator is already NaN
            col += 1;
        }
        for &[x, y] in ring.iter() {
            out[[0, col]] = x as f32;
            out[[1, col]] = y as f32;
            col += 1;
        }
    }
    out
}

/// Number of rings in a bundle built by [`flatten_rings`]
pub fn ring_count(bundle: &Array2<f32>) -> usize {
    if bundle.ncols() == 0 {
        return 0;
    }
    bundle.row(0).iter().filter(|v| v.is_nan()).count() + 1
}

/// Read region geometries from a shapefile (`.shp`) or GeoJSON file
pub fn read_geometries(path: &Path) -> Result<Vec<Geometry>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    let geometries = match extension.as_deref() {
        Some("shp") => read_shapefile(path)?,
        Some("geojson") | Some("json") => read_geojson(path)?,
        _ => {
            return Err(ClimapError::InvalidParameter {
                param: "input".to_string(),
                message: format!(
                    "Unsupported boundary file {}: expected .shp, .geojson or .json",
                    path.display()
                ),
            })
        }
    };
    debug!(
        path = %path.display(),
        geometries = geometries.len(),
        "Read boundary geometries"
    );
    Ok(geometries)
}

fn read_shapefile(path: &Path) -> Result<Vec<Geometry>> {
    let polygons = shapefile::read_shapes_as::<_, shapefile::Polygon>(path)?;
    Ok(polygons
        .iter()
        .filter_map(|polygon| {
            let rings = polygon
                .rings()
                .iter()
                .filter_map(|ring| match ring {
                    shapefile::PolygonRing::Outer(points) => {
                        Some(points.iter().map(|p| [p.x, p.y]).collect::<Ring>())
                    }
                    shapefile::PolygonRing::Inner(_) => None,
                })
                .collect();
            Geometry::from_rings(rings)
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: serde_json::Value,
}

fn read_geojson(path: &Path) -> Result<Vec<Geometry>> {
    let collection: FeatureCollection = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    let mut geometries = Vec::new();
    for feature in collection.features {
        let Some(value) = feature.geometry else {
            continue;
        };
        if let Some(geometry) = parse_geojson_geometry(value)? {
            geometries.push(geometry);
        }
    }
    Ok(geometries)
}

fn parse_geojson_geometry(value: serde_json::Value) -> Result<Option<Geometry>> {
    let raw: RawGeometry = serde_json::from_value(value)?;
    let rings = match raw.kind.as_str() {
        "Polygon" => {
            let polygon: Vec<Vec<Vec<f64>>> = serde_json::from_value(raw.coordinates)?;
            polygon.into_iter().take(1).map(to_ring).collect()
        }
        "MultiPolygon" => {
            let polygons: Vec<Vec<Vec<Vec<f64>>>> = serde_json::from_value(raw.coordinates)?;
            polygons
                .into_iter()
                .filter_map(|polygon| polygon.into_iter().next())
                .map(to_ring)
                .collect()
        }
        other => {
            warn!(kind = other, "Skipping non-polygon geometry");
            return Ok(None);
        }
    };
    Ok(Geometry::from_rings(rings))
}

fn to_ring(positions: Vec<Vec<f64>>) -> Ring {
    positions
        .into_iter()
        .filter(|p| p.len() >= 2)
        .map(|p| [p[0], p[1]])
        .collect()
}
