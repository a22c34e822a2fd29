//! Fixed-point storage of climate values.
//!
//! Values are scaled by 100 and rounded (half to even) into an `i16`, with
//! [`SENTINEL`] standing in for missing data.

use ndarray::{Array, ArrayBase, Data, Dimension};

/// Multiplier applied before rounding
pub const SCALE: f32 = 100.0;
/// Stored in place of NaN
pub const SENTINEL: i16 = -9999;

/// Values at or below this would collide with [`SENTINEL`]
pub const MIN_VALUE: f32 = SENTINEL as f32 / SCALE;
/// Largest storable value
pub const MAX_VALUE: f32 = i16::MAX as f32 / SCALE;

/// Whether a value survives quantization. NaN is always storable.
pub fn is_representable(value: f32) -> bool {
    if value.is_nan() {
        return true;
    }
    let scaled = (value * SCALE).round_ties_even();
    scaled > SENTINEL as f32 && scaled <= i16::MAX as f32
}

/// Quantize one value
pub fn quantize(value: f32) -> i16 {
    if value.is_nan() {
        return SENTINEL;
    }
    // float-to-int `as` saturates at the i16 bounds
    (value * SCALE).round_ties_even() as i16
}

/// Recover a value from its quantized form
pub fn dequantize(stored: i16) -> f32 {
    if stored == SENTINEL {
        f32::NAN
    } else {
        stored as f32 / SCALE
    }
}

pub fn quantize_array<S, D>(data: &ArrayBase<S, D>) -> Array<i16, D>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    data.mapv(quantize)
}

pub fn dequantize_array<S, D>(data: &ArrayBase<S, D>) -> Array<f32, D>
where
    S: Data<Elem = i16>,
    D: Dimension,
{
    data.mapv(dequantize)
}
