//! # climap
//!
//! Preprocessing pipeline and map-data server for 30-year US climate normals.
//!
//! The offline side turns raw PRISM rasters, state boundary shapefiles and a
//! city table into a compact store. The server side loads that store into
//! memory and answers map queries: a field for a month or the annual mean,
//! optionally masked by temperature and precipitation ranges.
//!
//! ## Architecture
//!
//! - **Pipeline**: raster decoding, unit conversion, quantization and
//!   optional regridding, written out as Arrow IPC files
//! - **State**: the loaded normals plus per-field ranges and monthly extremes
//! - **Selection**: turns a field/period/filter request into a colored view
//! - **API Layer**: JSON, Arrow and image endpoints over the view

pub mod boundary;
pub mod cities;
pub mod colormaps;
pub mod config;
pub mod data_loader;
pub mod error;
pub mod field;
pub mod grid;
pub mod handlers;
pub mod interpolation;
pub mod logging;
pub mod pipeline;
pub mod quantize;
pub mod raster;
pub mod selection;
pub mod server;
pub mod state;
pub mod store;
pub mod units;
pub mod variant;

pub use config::{Command, Config};
pub use error::{ClimapError, Result};
pub use field::ClimateField;
pub use grid::GridSpec;
pub use logging::{
    create_http_trace_layer, generate_request_id, init_tracing, log_error, log_operation_end,
    log_operation_start, log_request_error, log_store_load_stats, log_timed_operation,
};
pub use selection::{compute_view, FieldView, Period, RangeFilter, Selection};
pub use state::AppState;
pub use variant::PipelineVariant;
