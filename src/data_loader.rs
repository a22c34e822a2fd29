//! Store loading functionality.
//!
//! This module reads a preprocessed store directory into memory and builds
//! the application state. The boundary bundle and city markers are optional
//! companions: a store without them still serves the climate fields.

use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::cities::CityCollection;
use crate::config::Config;
use crate::error::{ClimapError, Result};
use crate::logging::log_store_load_stats;
use crate::state::AppState;
use crate::store::{read_boundaries, read_store, BOUNDARIES_FILE, CITIES_FILE, MANIFEST_FILE};

/// Load a store directory into memory and create the application state
pub fn load_store(dir: &Path, config: Config) -> Result<AppState> {
    // Check the store exists before touching any Arrow file
    if !dir.join(MANIFEST_FILE).exists() {
        return Err(ClimapError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("No store manifest found in {}", dir.display()),
        )));
    }

    let (manifest, normals) = read_store(dir)?;
    info!(
        variant = %manifest.variant,
        created_at = %manifest.created_at,
        "Opened store: {}",
        dir.display()
    );

    let boundaries = load_optional(dir, BOUNDARIES_FILE, read_boundaries)?;
    let cities = load_optional(dir, CITIES_FILE, |path| {
        let text = fs::read_to_string(path)?;
        // served verbatim, parsed only to reject malformed files
        let collection: CityCollection = serde_json::from_str(&text)?;
        debug!(cities = collection.features.len(), "Parsed city markers");
        Ok(text)
    })?;

    let field_keys: Vec<&str> = manifest.fields.iter().map(|f| f.field.key()).collect();
    log_store_load_stats(
        &dir.display().to_string(),
        &field_keys,
        normals.grid.shape(),
        boundaries.as_ref().map_or(0, |b| b.ncols()),
        normals.memory_bytes(),
    );

    let app_state = AppState::new(config, manifest, normals, boundaries, cities)?;
    app_state.validate()?;
    Ok(app_state)
}

/// Read `dir/name` with `read`, or `None` with a warning if it is absent
fn load_optional<T, F>(dir: &Path, name: &str, read: F) -> Result<Option<T>>
where
    F: FnOnce(&Path) -> Result<T>,
{
    let path = dir.join(name);
    if !path.exists() {
        warn!("{} not found in store, serving without it", name);
        return Ok(None);
    }
    read(&path).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cities::{write_cities_geojson, CityPoint};
    use crate::field::{ClimateField, MONTHS};
    use crate::grid::GridSpec;
    use crate::store::{write_boundaries, write_store, ClimateNormals};
    use crate::variant::PipelineVariant;
    use ndarray::{array, Array2, Array3};
    use std::collections::BTreeMap;

    fn write_sample_store(dir: &Path) {
        let grid = GridSpec {
            nrow: 2,
            ncol: 2,
            step: 0.5,
            xmin: -110.0,
            ymax: 40.0,
        };
        let mut monthly = BTreeMap::new();
        for field in PipelineVariant::Compact.monthly_fields() {
            monthly.insert(
                *field,
                Array3::from_shape_fn((MONTHS, 2, 2), |(m, r, c)| (m + r + c) as f32),
            );
        }
        let normals = ClimateNormals {
            variant: PipelineVariant::Compact,
            grid,
            monthly,
            elevation: Array2::from_elem((2, 2), 1000.0),
            lon: grid.lon_centers(),
            lat: grid.lat_centers(),
        };
        write_store(dir, &normals, None).unwrap();
    }

    #[test]
    fn test_store_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_store(&dir.path().join("missing"), Config::default());
        assert!(matches!(result, Err(ClimapError::Io(_))));
    }

    #[test]
    fn test_load_without_overlays() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_store(dir.path());

        let state = load_store(dir.path(), Config::default()).unwrap();
        assert!(state.boundaries.is_none());
        assert!(state.cities.is_none());
        assert!(state.has_field(ClimateField::Sunshine));
        assert_eq!(state.range(ClimateField::Precipitation).unwrap().max, 13.0);
    }

    #[test]
    fn test_load_with_overlays() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_store(dir.path());
        write_boundaries(
            &dir.path().join(BOUNDARIES_FILE),
            &array![[0.0f32, 1.0, f32::NAN, 3.0], [0.0, 1.0, f32::NAN, 3.0]],
        )
        .unwrap();
        write_cities_geojson(
            &dir.path().join(CITIES_FILE),
            &[CityPoint {
                city: "Boise".to_string(),
                state: "Idaho".to_string(),
                lon: -116.2,
                lat: 43.6,
            }],
        )
        .unwrap();

        let state = load_store(dir.path(), Config::default()).unwrap();
        assert_eq!(state.boundaries.as_ref().unwrap().ncols(), 4);
        assert!(state.cities.as_ref().unwrap().contains("Boise"));
    }

    #[test]
    fn test_malformed_cities_fail_fast() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_store(dir.path());
        fs::write(dir.path().join(CITIES_FILE), "{not json").unwrap();
        assert!(matches!(
            load_store(dir.path(), Config::default()),
            Err(ClimapError::Json(_))
        ));
    }
}
