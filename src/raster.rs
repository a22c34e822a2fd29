//! Flat binary (`.bil`) raster reading.
//!
//! PRISM rasters are headerless, row-major, little-endian grids of 4-byte
//! values. The shape comes from the accompanying `.hdr` file and is passed in
//! as a [`GridSpec`].

use ndarray::Array2;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{ClimapError, Result};
use crate::grid::GridSpec;

/// Fill value marking "no data" in source rasters
pub const FILL_VALUE: f32 = -9999.0;

// relative/absolute tolerance; the sentinel may be stored imprecisely
const FILL_RTOL: f32 = 1e-5;
const FILL_ATOL: f32 = 1e-8;

/// Element type of a raster file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterType {
    Float32,
    Int32,
}

/// Whether a raw value is the fill sentinel
pub fn is_fill(value: f32) -> bool {
    (value - FILL_VALUE).abs() <= FILL_ATOL + FILL_RTOL * FILL_VALUE.abs()
}

/// Read a raster into a 2D array, replacing fill values with NaN
pub fn read_bil(path: &Path, grid: &GridSpec, dtype: RasterType) -> Result<Array2<f32>> {
    let bytes = fs::read(path)?;
    let expected = grid.len();

    if bytes.len() % 4 != 0 || bytes.len() / 4 != expected {
        return Err(ClimapError::ShapeMismatch {
            path: path.to_path_buf(),
            expected,
            actual: bytes.len() / 4,
        });
    }

    let values: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|chunk| {
            let raw = [chunk[0], chunk[1], chunk[2], chunk[3]];
            let value = match dtype {
                RasterType::Float32 => f32::from_le_bytes(raw),
                RasterType::Int32 => i32::from_le_bytes(raw) as f32,
            };
            if is_fill(value) {
                f32::NAN
            } else {
                value
            }
        })
        .collect();

    let missing = values.iter().filter(|v| v.is_nan()).count();
    debug!(
        path = %path.display(),
        rows = grid.nrow,
        cols = grid.ncol,
        missing = missing,
        "Read raster"
    );

    Ok(Array2::from_shape_vec(grid.shape(), values)?)
}

/// Write a float raster in the same layout `read_bil` expects
pub fn write_bil(path: &Path, data: &Array2<f32>) -> Result<()> {
    let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
    fs::write(path, bytes)?;
    Ok(())
}

/// Write an integer raster, as used for elevation
pub fn write_bil_i32(path: &Path, data: &Array2<i32>) -> Result<()> {
    let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
    fs::write(path, bytes)?;
    Ok(())
}
