//! Regular latitude/longitude grid definitions.
//!
//! Grids are stored north-to-south: latitude decreases with row index and
//! longitude increases with column index. Cell centers are derived from the
//! origin corner, the step and the shape.

use serde::{Deserialize, Serialize};

use crate::error::{ClimapError, Result};

/// Rows in the PRISM 4km CONUS grid (from the `.hdr` files)
pub const PRISM_NROW: usize = 621;
/// Columns in the PRISM 4km CONUS grid
pub const PRISM_NCOL: usize = 1405;
/// Cell size in degrees
pub const PRISM_STEP: f64 = 0.04166666666667;
/// Western edge of the grid
pub const PRISM_XMIN: f64 = -125.016666666667;
/// Northern edge of the grid
pub const PRISM_YMAX: f64 = 49.9333333333323;

/// A regular grid anchored at its north-west corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of rows (latitude)
    pub nrow: usize,
    /// Number of columns (longitude)
    pub ncol: usize,
    /// Cell size in degrees, same along both axes
    pub step: f64,
    /// Longitude of the western edge
    pub xmin: f64,
    /// Latitude of the northern edge
    pub ymax: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::prism()
    }
}

impl GridSpec {
    /// The PRISM 4km grid
    pub fn prism() -> Self {
        Self {
            nrow: PRISM_NROW,
            ncol: PRISM_NCOL,
            step: PRISM_STEP,
            xmin: PRISM_XMIN,
            ymax: PRISM_YMAX,
        }
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.nrow * self.ncol
    }

    /// Whether the grid has no cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(nrow, ncol)` in ndarray order
    pub fn shape(&self) -> (usize, usize) {
        (self.nrow, self.ncol)
    }

    /// Outer extent as `(min_lon, min_lat, max_lon, max_lat)`
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (
            self.xmin,
            self.ymax - self.step * self.nrow as f64,
            self.xmin + self.step * self.ncol as f64,
            self.ymax,
        )
    }

    /// `ncol + 1` longitude edges, west to east
    pub fn lon_edges(&self) -> Vec<f64> {
        linspace(self.xmin, self.xmin + self.step * self.ncol as f64, self.ncol + 1)
    }

    /// `nrow + 1` latitude edges, north to south
    pub fn lat_edges(&self) -> Vec<f64> {
        linspace(self.ymax, self.ymax - self.step * self.nrow as f64, self.nrow + 1)
    }

    /// Cell-center longitudes
    pub fn lon_centers(&self) -> Vec<f64> {
        midpoints(&self.lon_edges())
    }

    /// Cell-center latitudes
    pub fn lat_centers(&self) -> Vec<f64> {
        midpoints(&self.lat_edges())
    }

    /// A grid covering the same extent at a different step.
    ///
    /// Partial cells at the south/east edges are dropped.
    pub fn with_step(&self, step: f64) -> Result<Self> {
        if !(step.is_finite() && step > 0.0) {
            return Err(ClimapError::Config {
                message: format!("Target step must be a positive number, got {}", step),
            });
        }
        let width = self.step * self.ncol as f64;
        let height = self.step * self.nrow as f64;
        // tolerate float noise when the step divides the extent exactly
        let ncol = (width / step + 1e-9).floor() as usize;
        let nrow = (height / step + 1e-9).floor() as usize;
        if nrow == 0 || ncol == 0 {
            return Err(ClimapError::Config {
                message: format!(
                    "Target step {} is larger than the grid extent ({} x {} degrees)",
                    step, width, height
                ),
            });
        }
        Ok(Self {
            nrow,
            ncol,
            step,
            xmin: self.xmin,
            ymax: self.ymax,
        })
    }

    /// Check the grid is usable
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(ClimapError::Config {
                message: format!("Grid must have at least one cell, got {}x{}", self.nrow, self.ncol),
            });
        }
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(ClimapError::Config {
                message: format!("Grid step must be positive, got {}", self.step),
            });
        }
        Ok(())
    }
}

/// `n` evenly spaced values from `start` to `stop` inclusive
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let delta = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + delta * i as f64).collect()
        }
    }
}

fn midpoints(edges: &[f64]) -> Vec<f64> {
    edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
}
