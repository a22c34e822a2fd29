//! Regridding a field onto a different coordinate mesh.
//!
//! Each target `(lat, lon)` pair is located on the source axes as fractional
//! indices and sampled with [`BilinearInterpolator`].

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::bilinear::BilinearInterpolator;
use super::common::{clamp_coord, coord_to_index};
use super::Interpolator;
use crate::error::{ClimapError, Result};

/// What to do with target points outside the source coordinate envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgePolicy {
    /// Fill with NaN
    #[default]
    Nan,
    /// Use the nearest edge of the source envelope
    Clamp,
    /// Fail the regrid
    Error,
}

impl EdgePolicy {
    pub fn name(&self) -> &'static str {
        match self {
            EdgePolicy::Nan => "nan",
            EdgePolicy::Clamp => "clamp",
            EdgePolicy::Error => "error",
        }
    }
}

impl fmt::Display for EdgePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EdgePolicy {
    type Err = ClimapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "nan" => Ok(EdgePolicy::Nan),
            "clamp" => Ok(EdgePolicy::Clamp),
            "error" => Ok(EdgePolicy::Error),
            _ => Err(ClimapError::Config {
                message: format!("Invalid edge policy: {}. Must be one of: nan, clamp, error", s),
            }),
        }
    }
}

/// Locate `coord` on `axis` under the given edge policy.
/// `Ok(None)` means the point should be filled with NaN.
fn locate(coord: f64, axis: &[f64], policy: EdgePolicy, axis_name: &str) -> Result<Option<f64>> {
    if let Some(index) = coord_to_index(coord, axis) {
        return Ok(Some(index));
    }
    match policy {
        EdgePolicy::Nan => Ok(None),
        EdgePolicy::Clamp => Ok(coord_to_index(clamp_coord(coord, axis), axis)),
        EdgePolicy::Error => Err(ClimapError::Interpolation {
            message: format!(
                "Target {} {} is outside the source range ({} to {})",
                axis_name,
                coord,
                axis.first().copied().unwrap_or(f64::NAN),
                axis.last().copied().unwrap_or(f64::NAN)
            ),
        }),
    }
}

/// Interpolate `field` (indexed `[lat, lon]`) onto the target axes
pub fn regrid(
    src_lat: &[f64],
    src_lon: &[f64],
    field: ArrayView2<f32>,
    dst_lat: &[f64],
    dst_lon: &[f64],
    policy: EdgePolicy,
) -> Result<Array2<f32>> {
    let (rows, cols) = field.dim();
    if rows != src_lat.len() || cols != src_lon.len() {
        return Err(ClimapError::Interpolation {
            message: format!(
                "Field shape ({}, {}) does not match source axes ({}, {})",
                rows,
                cols,
                src_lat.len(),
                src_lon.len()
            ),
        });
    }

    let flat: Vec<f32> = field.iter().copied().collect();
    let shape = [rows, cols];
    let interpolator = BilinearInterpolator;

    // axis lookups are shared by every cell in a row/column
    let lat_idx = dst_lat
        .iter()
        .map(|&lat| locate(lat, src_lat, policy, "latitude"))
        .collect::<Result<Vec<_>>>()?;
    let lon_idx = dst_lon
        .iter()
        .map(|&lon| locate(lon, src_lon, policy, "longitude"))
        .collect::<Result<Vec<_>>>()?;

    let mut out = Array2::from_elem((dst_lat.len(), dst_lon.len()), f32::NAN);
    for (i, y) in lat_idx.iter().enumerate() {
        let Some(y) = *y else { continue };
        for (j, x) in lon_idx.iter().enumerate() {
            let Some(x) = *x else { continue };
            out[[i, j]] = interpolator.interpolate(&flat, &shape, &[y, x])?;
        }
    }
    Ok(out)
}
