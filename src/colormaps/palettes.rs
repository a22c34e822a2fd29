//! Named palettes.
//!
//! `blues`, `turbo`, `cividis`, `ylgnbu` and `viridis` are colorgrad presets.
//! `iridescent` is Paul Tol's 23-step scheme and `electric` follows the
//! Plotly scale of that name.

use colorgrad::{CustomGradient, Gradient};

use crate::error::{ClimapError, Result};

/// Every palette name accepted by [`super::get_colormap`]
pub const PALETTE_NAMES: [&str; 7] = [
    "blues",
    "turbo",
    "cividis",
    "iridescent",
    "ylgnbu",
    "electric",
    "viridis",
];

const IRIDESCENT: [&str; 23] = [
    "#fefbe9", "#fcf7d5", "#f5f3c1", "#eaf0b5", "#ddecbf", "#d0e7ca", "#c2e3d2", "#b5ddd8",
    "#a8d8dc", "#9bd2e1", "#8dcbe4", "#81c4e7", "#7bbce7", "#7eb2e4", "#88a5dd", "#9398d2",
    "#9b8ac4", "#9d7db2", "#9a709e", "#906388", "#805770", "#684957", "#46353a",
];

const ELECTRIC: [&str; 6] = [
    "#000000", "#1e0064", "#780064", "#a05a00", "#e6c800", "#fffadc",
];
const ELECTRIC_STOPS: [f64; 6] = [0.0, 0.15, 0.4, 0.6, 0.8, 1.0];

/// Build the gradient for a lowercase palette name, `None` if unknown
pub(crate) fn build_gradient(name: &str) -> Result<Option<Gradient>> {
    let gradient = match name {
        "blues" => colorgrad::blues(),
        "turbo" => colorgrad::turbo(),
        "cividis" => colorgrad::cividis(),
        "ylgnbu" => colorgrad::yl_gn_bu(),
        "viridis" => colorgrad::viridis(),
        "iridescent" => custom(&IRIDESCENT, None)?,
        "electric" => custom(&ELECTRIC, Some(&ELECTRIC_STOPS))?,
        _ => return Ok(None),
    };
    Ok(Some(gradient))
}

fn custom(colors: &[&str], stops: Option<&[f64]>) -> Result<Gradient> {
    let mut builder = CustomGradient::new();
    builder.html_colors(colors);
    if let Some(stops) = stops {
        builder.domain(stops);
    }
    builder.build().map_err(|e| ClimapError::ImageGeneration {
        message: format!("Failed to build palette: {}", e),
    })
}
