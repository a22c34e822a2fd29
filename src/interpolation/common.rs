//! Common utilities for interpolation algorithms.
//!
//! This module provides shared functionality used by various interpolation methods.

use crate::error::{ClimapError, Result};

/// Map a coordinate value to a fractional index along a monotonic axis.
///
/// Works for increasing and decreasing axes. Returns `None` when the value
/// lies outside the axis envelope.
pub fn coord_to_index(coord: f64, coord_values: &[f64]) -> Option<f64> {
    let n = coord_values.len();
    if n == 0 || !coord.is_finite() {
        return None;
    }
    if n == 1 {
        return (coord == coord_values[0]).then_some(0.0);
    }

    let first = coord_values[0];
    let last = coord_values[n - 1];
    let (lo, hi) = if first <= last { (first, last) } else { (last, first) };
    if coord < lo || coord > hi {
        return None;
    }

    let descending = first > last;
    // first index whose coordinate lies past `coord`
    let upper = coord_values.partition_point(|&c| if descending { c > coord } else { c < coord });
    if upper == 0 {
        return Some(0.0);
    }
    if upper >= n {
        return Some((n - 1) as f64);
    }
    let c0 = coord_values[upper - 1];
    let c1 = coord_values[upper];
    let fraction = if c1 == c0 { 0.0 } else { (coord - c0) / (c1 - c0) };
    Some((upper - 1) as f64 + fraction)
}

/// Clamp a coordinate into the envelope of an axis
pub fn clamp_coord(coord: f64, coord_values: &[f64]) -> f64 {
    let (Some(&first), Some(&last)) = (coord_values.first(), coord_values.last()) else {
        return coord;
    };
    coord.clamp(first.min(last), first.max(last))
}

/// Clamp an index to valid bounds
pub fn clamp_index(index: f64, size: usize) -> f64 {
    index.max(0.0).min((size - 1) as f64)
}

/// Get the weight for linear interpolation
pub fn linear_weight(fraction: f64) -> (f64, f64) {
    (1.0 - fraction, fraction)
}

/// Row-major flat index of a multi-dimensional index
pub fn flat_index(indices: &[usize], shape: &[usize]) -> Result<usize> {
    if indices.len() != shape.len() {
        return Err(ClimapError::Interpolation {
            message: format!(
                "Dimension mismatch: indices has {} dimensions but shape has {} dimensions",
                indices.len(),
                shape.len()
            ),
        });
    }
    let mut flat = 0;
    for (&index, &size) in indices.iter().zip(shape) {
        if index >= size {
            return Err(ClimapError::Interpolation {
                message: format!("Index {} out of bounds for dimension of size {}", index, size),
            });
        }
        flat = flat * size + index;
    }
    Ok(flat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_index() {
        assert_eq!(clamp_index(-1.0, 10), 0.0);
        assert_eq!(clamp_index(5.5, 10), 5.5);
        assert_eq!(clamp_index(15.0, 10), 9.0);
    }

    #[test]
    fn test_linear_weight() {
        let (w0, w1) = linear_weight(0.3);
        assert!((w0 - 0.7).abs() < 1e-10);
        assert!((w1 - 0.3).abs() < 1e-10);
        assert!((w0 + w1 - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_coord_to_index_increasing() {
        let axis = [0.0, 1.0, 2.0, 4.0];
        assert_eq!(coord_to_index(0.0, &axis), Some(0.0));
        assert_eq!(coord_to_index(1.5, &axis), Some(1.5));
        assert_eq!(coord_to_index(3.0, &axis), Some(2.5));
        assert_eq!(coord_to_index(4.0, &axis), Some(3.0));
        assert_eq!(coord_to_index(4.1, &axis), None);
        assert_eq!(coord_to_index(-0.1, &axis), None);
    }

    #[test]
    fn test_coord_to_index_decreasing() {
        let axis = [40.0, 39.0, 38.0];
        assert_eq!(coord_to_index(40.0, &axis), Some(0.0));
        assert_eq!(coord_to_index(38.5, &axis), Some(1.5));
        assert_eq!(coord_to_index(38.0, &axis), Some(2.0));
        assert_eq!(coord_to_index(41.0, &axis), None);
    }

    #[test]
    fn test_clamp_coord() {
        let axis = [40.0, 39.0, 38.0];
        assert_eq!(clamp_coord(41.0, &axis), 40.0);
        assert_eq!(clamp_coord(30.0, &axis), 38.0);
        assert_eq!(clamp_coord(39.5, &axis), 39.5);
    }

    #[test]
    fn test_flat_index() {
        assert_eq!(flat_index(&[1, 2], &[3, 4]).unwrap(), 6);
        assert!(flat_index(&[3, 0], &[3, 4]).is_err());
        assert!(flat_index(&[0], &[3, 4]).is_err());
    }
}
