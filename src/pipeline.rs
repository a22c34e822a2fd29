//! Offline batch commands.
//!
//! Each command reads its inputs completely before writing anything, so a
//! bad input aborts the run without partial output.

use ndarray::{Array2, Array3, Axis};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::boundary::{flatten_rings, read_geometries};
use crate::cities::{read_city_table, select_cities as select_city_points, write_cities_geojson};
use crate::config::{require, CityConfig, PipelineConfig};
use crate::error::{ClimapError, Result};
use crate::field::{ClimateField, MONTHS};
use crate::grid::GridSpec;
use crate::interpolation::{regrid, EdgePolicy};
use crate::logging::{log_error, log_operation_end, log_operation_start};
use crate::raster::{read_bil, RasterType};
use crate::store::{
    write_boundaries, write_store, ClimateNormals, Manifest, RegridInfo, BOUNDARIES_FILE,
    CITIES_FILE,
};
use crate::units::clamp_ceiling;
use crate::variant::PipelineVariant;

/// First path in `candidates` that exists
fn first_existing(candidates: Vec<PathBuf>) -> Result<PathBuf> {
    let listed = candidates
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    candidates
        .into_iter()
        .find(|p| p.exists())
        .ok_or_else(|| {
            ClimapError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Raster not found, tried: {}", listed),
            ))
        })
}

/// Read, convert and clip the twelve monthly rasters of one field
pub fn read_monthly_field(
    input_dir: &Path,
    variant: PipelineVariant,
    field: ClimateField,
    grid: &GridSpec,
) -> Result<Array3<f32>> {
    let conversion = variant.conversion(field);
    let mut data = Array3::from_elem((MONTHS, grid.nrow, grid.ncol), f32::NAN);
    for month in 1..=MONTHS {
        let path = first_existing(variant.monthly_raster_paths(input_dir, field, month))?;
        let mut slice = read_bil(&path, grid, RasterType::Float32)?;
        conversion.apply_inplace(&mut slice);
        data.index_axis_mut(Axis(0), month - 1).assign(&slice);
    }
    if field == ClimateField::Precipitation {
        clamp_ceiling(&mut data, variant.precip_ceiling());
    }
    debug!(field = %field, variant = %variant, "Converted monthly field");
    Ok(data)
}

/// Read and convert the elevation raster
pub fn read_elevation(
    input_dir: &Path,
    variant: PipelineVariant,
    grid: &GridSpec,
) -> Result<Array2<f32>> {
    let path = first_existing(vec![variant.elevation_raster_path(input_dir)])?;
    let mut dem = read_bil(&path, grid, RasterType::Int32)?;
    variant
        .conversion(ClimateField::Elevation)
        .apply_inplace(&mut dem);
    Ok(dem)
}

/// Read every raster a variant needs into converted normals
pub fn load_raw_normals(
    input_dir: &Path,
    variant: PipelineVariant,
    grid: &GridSpec,
) -> Result<ClimateNormals> {
    let mut monthly = BTreeMap::new();
    for &field in variant.monthly_fields() {
        monthly.insert(field, read_monthly_field(input_dir, variant, field, grid)?);
    }
    Ok(ClimateNormals {
        variant,
        grid: *grid,
        monthly,
        elevation: read_elevation(input_dir, variant, grid)?,
        lon: grid.lon_centers(),
        lat: grid.lat_centers(),
    })
}

/// Interpolate every field onto `target`
pub fn regrid_normals(
    normals: &ClimateNormals,
    target: GridSpec,
    policy: EdgePolicy,
) -> Result<ClimateNormals> {
    let dst_lon = target.lon_centers();
    let dst_lat = target.lat_centers();
    let resample = |field: ndarray::ArrayView2<f32>| {
        regrid(&normals.lat, &normals.lon, field, &dst_lat, &dst_lon, policy)
    };

    let mut monthly = BTreeMap::new();
    for (field, data) in &normals.monthly {
        let mut out = Array3::from_elem((MONTHS, target.nrow, target.ncol), f32::NAN);
        for (month, slice) in data.outer_iter().enumerate() {
            out.index_axis_mut(Axis(0), month).assign(&resample(slice)?);
        }
        monthly.insert(*field, out);
    }

    Ok(ClimateNormals {
        variant: normals.variant,
        grid: target,
        monthly,
        elevation: resample(normals.elevation.view())?,
        lon: dst_lon,
        lat: dst_lat,
    })
}

/// `preprocess-rasters`: raw PRISM rasters to a store
pub fn preprocess_rasters(config: &PipelineConfig) -> Result<Manifest> {
    let input_dir = require(&config.input_dir, "pipeline.input_dir")?;
    let output_dir = require(&config.output_dir, "pipeline.output_dir")?;
    let details = format!(
        "variant={} input={} output={}",
        config.variant,
        input_dir.display(),
        output_dir.display()
    );
    log_operation_start("preprocess_rasters", Some(&details));
    let start = Instant::now();

    let result = (|| -> Result<Manifest> {
        let normals = load_raw_normals(input_dir, config.variant, &config.grid)?;
        match config.target_step {
            Some(step) => {
                let target = config.grid.with_step(step)?;
                info!(
                    rows = target.nrow,
                    cols = target.ncol,
                    step = step,
                    edge_policy = %config.edge_policy,
                    "Regridding"
                );
                let regridded = regrid_normals(&normals, target, config.edge_policy)?;
                let info = RegridInfo {
                    source_grid: config.grid,
                    edge_policy: config.edge_policy,
                };
                write_store(output_dir, &regridded, Some(info))
            }
            None => write_store(output_dir, &normals, None),
        }
    })();

    finish("preprocess_rasters", start, result)
}

/// `extract-boundaries`: state polygons to a polyline bundle. Returns the bundle width.
pub fn extract_boundaries(input: &Path, output_dir: &Path) -> Result<usize> {
    let details = format!("input={} output={}", input.display(), output_dir.display());
    log_operation_start("extract_boundaries", Some(&details));
    let start = Instant::now();

    let result = (|| -> Result<usize> {
        let geometries = read_geometries(input)?;
        let bundle = flatten_rings(&geometries);
        fs::create_dir_all(output_dir)?;
        write_boundaries(&output_dir.join(BOUNDARIES_FILE), &bundle)?;
        info!(
            geometries = geometries.len(),
            points = bundle.ncols(),
            "Boundary bundle written"
        );
        Ok(bundle.ncols())
    })();

    finish("extract_boundaries", start, result)
}

/// `select-cities`: city table to GeoJSON markers. Returns the number selected.
pub fn select_cities(input: &Path, output_dir: &Path, config: &CityConfig) -> Result<usize> {
    let details = format!(
        "input={} national_top={} per_state_top={}",
        input.display(),
        config.national_top,
        config.per_state_top
    );
    log_operation_start("select_cities", Some(&details));
    let start = Instant::now();

    let result = (|| -> Result<usize> {
        let records = read_city_table(input)?;
        let points = select_city_points(&records, config.national_top, config.per_state_top);
        fs::create_dir_all(output_dir)?;
        write_cities_geojson(&output_dir.join(CITIES_FILE), &points)?;
        info!(
            records = records.len(),
            selected = points.len(),
            "City markers written"
        );
        Ok(points.len())
    })();

    finish("select_cities", start, result)
}

fn finish<T>(operation: &str, start: Instant, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        log_error(e, operation);
    }
    log_operation_end(operation, start, result.is_ok());
    result
}
