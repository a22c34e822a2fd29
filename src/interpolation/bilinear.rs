//! Bilinear interpolation.
//!
//! This method performs linear interpolation in two dimensions using
//! the four nearest grid points. Neighbours with zero weight are skipped,
//! so sampling exactly on a node never picks up a NaN from its neighbours.

use super::Interpolator;
use crate::error::{ClimapError, Result};
use crate::interpolation::common;

/// Bilinear interpolator
pub struct BilinearInterpolator;

impl Interpolator for BilinearInterpolator {
    fn interpolate(&self, data: &[f32], shape: &[usize], indices: &[f64]) -> Result<f32> {
        if shape.len() != 2 || indices.len() != 2 {
            return Err(ClimapError::Interpolation {
                message: format!(
                    "Bilinear interpolation needs 2 dimensions, got shape {:?} and {} indices",
                    shape,
                    indices.len()
                ),
            });
        }
        let (rows, cols) = (shape[0], shape[1]);
        if rows == 0 || cols == 0 || data.len() < rows * cols {
            return Err(ClimapError::Interpolation {
                message: format!(
                    "Data length {} does not cover shape {:?}",
                    data.len(),
                    shape
                ),
            });
        }

        let y = common::clamp_index(indices[0], rows);
        let x = common::clamp_index(indices[1], cols);
        let y0 = y.floor() as usize;
        let x0 = x.floor() as usize;
        let y1 = (y0 + 1).min(rows - 1);
        let x1 = (x0 + 1).min(cols - 1);
        let (wy0, wy1) = common::linear_weight(y - y0 as f64);
        let (wx0, wx1) = common::linear_weight(x - x0 as f64);

        let corners = [
            (y0, x0, wy0 * wx0),
            (y0, x1, wy0 * wx1),
            (y1, x0, wy1 * wx0),
            (y1, x1, wy1 * wx1),
        ];

        let mut value = 0.0f64;
        for (row, col, weight) in corners {
            if weight <= 0.0 {
                continue;
            }
            let sample = data[row * cols + col];
            if sample.is_nan() {
                return Ok(f32::NAN);
            }
            value += sample as f64 * weight;
        }
        Ok(value as f32)
    }

    fn name(&self) -> &str {
        "bilinear"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bilinear_interpolation() {
        let data = vec![
            0.0, 10.0, //
            20.0, 30.0,
        ];
        let shape = vec![2, 2];
        let interpolator = BilinearInterpolator;

        assert_eq!(interpolator.interpolate(&data, &shape, &[0.0, 0.0]).unwrap(), 0.0);
        assert_eq!(interpolator.interpolate(&data, &shape, &[1.0, 1.0]).unwrap(), 30.0);
        assert!((interpolator.interpolate(&data, &shape, &[0.5, 0.5]).unwrap() - 15.0).abs() < 1e-6);
        assert!((interpolator.interpolate(&data, &shape, &[0.0, 0.25]).unwrap() - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_nan_handling() {
        let data = vec![
            1.0, f32::NAN, //
            3.0, 4.0,
        ];
        let shape = vec![2, 2];
        let interpolator = BilinearInterpolator;

        // on a node the NaN neighbour has zero weight
        assert_eq!(interpolator.interpolate(&data, &shape, &[1.0, 0.0]).unwrap(), 3.0);
        // between nodes it contaminates the result
        assert!(interpolator.interpolate(&data, &shape, &[0.5, 0.5]).unwrap().is_nan());
    }

    #[test]
    fn test_dimension_mismatch() {
        let interpolator = BilinearInterpolator;
        assert!(interpolator.interpolate(&[1.0, 2.0], &[2], &[0.5]).is_err());
    }
}
