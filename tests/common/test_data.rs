//! Test data generation utilities.
//!
//! Writes a small synthetic PRISM-style input tree with known values, plus a
//! states GeoJSON and a city table, so the full pipeline can run in a tempdir.
//!
//! Raw values (Celsius and millimetres) on a 6 x 8 grid:
//!
//! - `tmin = month - 2 * row`, `tmean = tmin + 5`, `tmax = tmin + 10`
//! - `ppt = 25.4 * (col + 1)` every month, so `col + 1` inches
//! - `dem = 100 * (row + 1)` metres
//! - cell `[5, 7]` is the fill value in every monthly raster

use climap::field::{ClimateField, MONTHS};
use climap::raster::{write_bil, write_bil_i32};
use climap::{GridSpec, PipelineVariant, Result};
use ndarray::Array2;
use std::fs;
use std::path::Path;

/// Fill value used by raw rasters
pub const FILL: f32 = -9999.0;

/// The synthetic grid
pub fn test_grid() -> GridSpec {
    GridSpec {
        nrow: 6,
        ncol: 8,
        step: 0.5,
        xmin: -105.0,
        ymax: 42.0,
    }
}

/// Raw value of `field` for a 1-based `month` at `(row, col)`
pub fn raw_value(field: ClimateField, month: usize, row: usize, col: usize) -> f32 {
    let tmin = month as f32 - 2.0 * row as f32;
    match field {
        ClimateField::MinTemperature => tmin,
        ClimateField::MeanTemperature => tmin + 5.0,
        ClimateField::MaxTemperature => tmin + 10.0,
        ClimateField::Precipitation => 25.4 * (col + 1) as f32,
        ClimateField::Sunshine => 50.0,
        ClimateField::Elevation => 100.0 * (row + 1) as f32,
    }
}

/// Write the raw raster tree for `variant` under `dir`
pub fn write_raw_rasters(dir: &Path, variant: PipelineVariant) -> Result<()> {
    let grid = test_grid();
    for &field in variant.monthly_fields() {
        let field_dir = dir.join(field.key());
        fs::create_dir_all(&field_dir)?;
        for month in 1..=MONTHS {
            let mut data =
                Array2::from_shape_fn(grid.shape(), |(r, c)| raw_value(field, month, r, c));
            data[[5, 7]] = FILL;
            let name = format!(
                "PRISM_{}_30yr_normal_4kmM3_{:02}_bil.bil",
                field.key(),
                month
            );
            write_bil(&field_dir.join(name), &data)?;
        }
    }

    let dem_dir = dir.join("dem");
    fs::create_dir_all(&dem_dir)?;
    let dem = Array2::from_shape_fn(grid.shape(), |(r, c)| {
        raw_value(ClimateField::Elevation, 1, r, c) as i32
    });
    write_bil_i32(&dem_dir.join("PRISM_us_dem_4km_bil.bil"), &dem)?;
    Ok(())
}

/// Two states: a square and a two-part multipolygon with a hole
pub fn write_states_geojson(path: &Path) -> Result<()> {
    fs::write(
        path,
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"NAME": "Squareland"},
             "geometry": {"type": "Polygon",
              "coordinates": [[[-105,40],[-103,40],[-103,42],[-105,42],[-105,40]]]}},
            {"type": "Feature", "properties": {"NAME": "Twinlands"},
             "geometry": {"type": "MultiPolygon",
              "coordinates": [
                [[[-103,39],[-101,39],[-101,41],[-103,39]],
                 [[-102.5,39.5],[-102,39.5],[-102,40],[-102.5,39.5]]],
                [[[-102,40],[-101.5,40],[-101.5,40.5],[-102,40]]]
              ]}}
        ]}"#,
    )?;
    Ok(())
}

/// Bundle width for [`write_states_geojson`]: three exterior rings and
/// the two separators between them
pub const STATES_BUNDLE_POINTS: usize = 5 + 4 + 4 + 2;

/// Cities kept from [`write_city_csv`] with default selection settings
pub const SELECTED_CITIES: usize = 5;

/// A city table with duplicates and a non-contiguous state
pub fn write_city_csv(path: &Path) -> Result<()> {
    fs::write(
        path,
        "city,state_name,population,lat,lng,county_name\n\
         Denver,Colorado,2691349,39.7621,-104.8759,Denver\n\
         Aurora,Colorado,390201,39.7087,-104.7273,Arapahoe\n\
         Boulder,Colorado,106598,40.0249,-105.2523,Boulder\n\
         Pueblo,Colorado,111876,38.2705,-104.6112,Pueblo\n\
         Cheyenne,Wyoming,64165,41.1350,-104.7902,Laramie\n\
         Denver,Colorado,100,39.0,-104.0,Duplicate\n\
         Anchorage,Alaska,291247,61.1508,-149.1091,Anchorage\n",
    )?;
    Ok(())
}
