//! Error types for the climap application.
//!
//! A single error enum covers the offline pipeline and the map-data server.
//! Offline commands propagate these with `?` and abort on the first failure.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for climap operations.
#[derive(Error, Debug)]
pub enum ClimapError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A raster file does not hold exactly `expected` values
    #[error("Shape mismatch in {}: expected {expected} values, found {actual}", path.display())]
    ShapeMismatch {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    /// ndarray reshape errors
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// A field/period/range selection that does not name known data
    #[error("Invalid selection: {param} - {message}")]
    InvalidSelection { param: String, message: String },

    /// Invalid parameter errors
    #[error("Invalid parameter: {param} - {message}")]
    InvalidParameter { param: String, message: String },

    /// A value that does not fit the fixed-point storage range
    #[error("Value {value} of {field} cannot be stored: outside ({min}, {max}]")]
    ValueOutOfRange {
        field: String,
        value: f32,
        min: f32,
        max: f32,
    },

    /// Data not found errors
    #[error("Data not found: {message}")]
    DataNotFound { message: String },

    /// Interpolation errors
    #[error("Interpolation error: {message}")]
    Interpolation { message: String },

    /// Image generation errors
    #[error("Image generation error: {message}")]
    ImageGeneration { message: String },

    /// Arrow IPC read/write errors
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// Shapefile reading errors
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// CSV reading errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server errors
    #[error("Server error: {message}")]
    Server { message: String },
}

impl ClimapError {
    /// Whether the error was caused by the caller's request rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ClimapError::InvalidSelection { .. } | ClimapError::InvalidParameter { .. }
        )
    }
}

/// Convenience type alias for Results with ClimapError
pub type Result<T> = std::result::Result<T, ClimapError>;
