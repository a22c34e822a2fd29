//! Unit conversions applied to raw PRISM values.

use ndarray::{ArrayBase, DataMut, Dimension};
use serde::{Deserialize, Serialize};

/// Millimeters to inches
pub const MM_TO_INCHES: f32 = 0.0393701;
/// Meters to feet, rounded
pub const M_TO_FT_ROUNDED: f32 = 3.28;
/// Meters to feet
pub const M_TO_FT: f32 = 3.28084;

/// A linear transform applied to every element of a field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conversion {
    /// `x * scale + offset`
    Affine { scale: f32, offset: f32 },
    /// `x * factor`
    Scale { factor: f32 },
    /// Leave values unchanged
    PassThrough,
}

impl Conversion {
    pub const CELSIUS_TO_FAHRENHEIT: Conversion = Conversion::Affine {
        scale: 1.8,
        offset: 32.0,
    };
    pub const MM_TO_INCHES: Conversion = Conversion::Scale {
        factor: MM_TO_INCHES,
    };
    pub const FRACTION_TO_PERCENT: Conversion = Conversion::Scale { factor: 100.0 };

    /// Convert a single value. NaN stays NaN.
    pub fn apply(&self, value: f32) -> f32 {
        match *self {
            Conversion::Affine { scale, offset } => value * scale + offset,
            Conversion::Scale { factor } => value * factor,
            Conversion::PassThrough => value,
        }
    }

    /// Convert an array in place
    pub fn apply_inplace<S, D>(&self, data: &mut ArrayBase<S, D>)
    where
        S: DataMut<Elem = f32>,
        D: Dimension,
    {
        if matches!(self, Conversion::PassThrough) {
            return;
        }
        data.mapv_inplace(|v| self.apply(v));
    }
}

/// Clip values above `ceiling` to the ceiling. NaN is left alone.
pub fn clamp_ceiling<S, D>(data: &mut ArrayBase<S, D>, ceiling: f32)
where
    S: DataMut<Elem = f32>,
    D: Dimension,
{
    data.mapv_inplace(|v| if v > ceiling { ceiling } else { v });
}
