//! Colormap trait and utilities.
//!
//! This module defines the common interface for all colormaps.

use crate::error::{ClimapError, Result};

use super::palettes::{build_gradient, PALETTE_NAMES};

/// Entries in a sampled lookup table
pub const LUT_SIZE: usize = 256;

/// Trait for color mapping implementations
pub trait Colormap: Send + Sync {
    /// Map a normalized value (0.0 to 1.0) to an RGBA color
    fn map_normalized(&self, value: f32) -> [u8; 4];

    /// Map a value to an RGBA color given the data range
    fn map(&self, value: f32, min: f32, max: f32) -> [u8; 4] {
        let normalized = if max > min {
            ((value - min) / (max - min)).clamp(0.0, 1.0)
        } else {
            0.5
        };
        self.map_normalized(normalized)
    }

    /// Get the name of this colormap
    fn name(&self) -> &str;
}

/// A gradient sampled at [`LUT_SIZE`] evenly spaced points
pub struct LutColormap {
    name: String,
    lut: Vec<[u8; 4]>,
}

impl LutColormap {
    pub fn new(name: &str, gradient: &colorgrad::Gradient) -> Self {
        let lut = (0..LUT_SIZE)
            .map(|i| gradient.at(i as f64 / (LUT_SIZE - 1) as f64).to_rgba8())
            .collect();
        Self {
            name: name.to_string(),
            lut,
        }
    }
}

impl Colormap for LutColormap {
    fn map_normalized(&self, value: f32) -> [u8; 4] {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        let index = (value * (LUT_SIZE - 1) as f32).round() as usize;
        self.lut[index.min(LUT_SIZE - 1)]
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Get a colormap by name
pub fn get_colormap(name: &str) -> Result<Box<dyn Colormap>> {
    let key = name.to_lowercase();
    match build_gradient(&key)? {
        Some(gradient) => Ok(Box::new(LutColormap::new(&key, &gradient))),
        None => Err(ClimapError::InvalidParameter {
            param: "palette".to_string(),
            message: format!(
                "Unknown palette: {}. Must be one of: {}",
                name,
                PALETTE_NAMES.join(", ")
            ),
        }),
    }
}
