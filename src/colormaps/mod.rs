//! Colormap implementations for image generation.
//!
//! Palettes are built from `colorgrad` gradients and sampled into lookup
//! tables once per request.

pub mod colormap;
pub mod palettes;

pub use colormap::{get_colormap, Colormap, LutColormap};
pub use palettes::PALETTE_NAMES;
