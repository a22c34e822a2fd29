//! Metadata endpoint handler.
//!
//! Returns JSON describing the store: grid, fields with their ranges, the
//! valid periods and filters, and the available palettes. Clients build
//! their widgets from these lists.

use axum::{extract::State, Json};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::colormaps::PALETTE_NAMES;
use crate::logging::generate_request_id;
use crate::selection::{default_palette, Period};
use crate::state::{AppState, FILTER_FIELDS};

/// Build the metadata document
pub fn build_metadata(state: &AppState) -> serde_json::Value {
    let grid = &state.manifest.grid;
    let (west, south, east, north) = grid.bounds();

    let fields: Vec<serde_json::Value> = state
        .fields()
        .into_iter()
        .map(|field| {
            serde_json::json!({
                "key": field.key(),
                "label": field.label(),
                "units": field.units(),
                "monthly": field.is_monthly(),
                "palette": default_palette(field),
                "range": state.range(field),
                "color_range": state.color_range(field),
                "slider_range": state.slider_range(field),
            })
        })
        .collect();

    let periods: Vec<serde_json::Value> = Period::all()
        .into_iter()
        .map(|p| serde_json::json!({ "key": p.key(), "name": p.name() }))
        .collect();

    let filters: Vec<&str> = FILTER_FIELDS
        .iter()
        .filter(|f| state.extremes.contains_key(f))
        .map(|f| f.key())
        .collect();

    serde_json::json!({
        "variant": state.manifest.variant,
        "created_at": state.manifest.created_at,
        "grid": grid,
        "bounds": { "west": west, "south": south, "east": east, "north": north },
        "regrid": state.manifest.regrid,
        "fields": fields,
        "periods": periods,
        "filters": filters,
        "palettes": PALETTE_NAMES,
        "display": { "precip_cap": state.config.display.precip_cap },
        "overlays": {
            "boundaries": state.boundaries.is_some(),
            "cities": state.cities.is_some(),
        },
    })
}

/// Handle GET /metadata requests
pub async fn metadata_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let request_id = generate_request_id();
    let start_time = Instant::now();

    // Log request
    debug!(
        endpoint = "/metadata",
        request_id = %request_id,
        "Processing metadata request"
    );

    let response = build_metadata(&state);

    // Log successful request
    let duration = start_time.elapsed();
    info!(
        endpoint = "/metadata",
        request_id = %request_id,
        duration_us = duration.as_micros() as u64,
        field_count = state.fields().len(),
        "Metadata request successful"
    );

    Json(response)
}
