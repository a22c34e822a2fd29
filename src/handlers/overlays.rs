//! Overlay endpoint handlers.
//!
//! `/boundaries` returns the state outline bundle as two coordinate arrays
//! with `null` separators between rings. `/cities` returns the stored city
//! markers GeoJSON unchanged.

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use ndarray::Array2;
use std::sync::Arc;
use tracing::{debug, info};

use super::error_response;
use crate::error::{ClimapError, Result};
use crate::logging::generate_request_id;
use crate::state::AppState;

/// JSON body for a boundary bundle: `{x: [...], y: [...]}`
pub fn boundaries_to_json(bundle: &Array2<f32>) -> serde_json::Value {
    let axis = |row: usize| -> Vec<Option<f32>> {
        bundle
            .row(row)
            .iter()
            .map(|&v| (!v.is_nan()).then_some(v))
            .collect()
    };
    serde_json::json!({ "x": axis(0), "y": axis(1) })
}

fn boundaries_response(state: &AppState) -> Result<Response> {
    let bundle = state
        .boundaries
        .as_ref()
        .ok_or_else(|| ClimapError::DataNotFound {
            message: "Store has no boundary bundle".to_string(),
        })?;
    Ok(Json(boundaries_to_json(bundle)).into_response())
}

fn cities_response(state: &AppState) -> Result<Response> {
    let cities = state
        .cities
        .as_ref()
        .ok_or_else(|| ClimapError::DataNotFound {
            message: "Store has no city markers".to_string(),
        })?;
    Ok((
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/geo+json"),
        )],
        cities.clone(),
    )
        .into_response())
}

/// Handle GET /boundaries requests
pub async fn boundaries_handler(State(state): State<Arc<AppState>>) -> Response {
    let request_id = generate_request_id();
    debug!(endpoint = "/boundaries", request_id = %request_id, "Processing boundaries request");

    match boundaries_response(&state) {
        Ok(response) => {
            info!(
                endpoint = "/boundaries",
                request_id = %request_id,
                points = state.boundaries.as_ref().map_or(0, |b| b.ncols()),
                "Boundaries request successful"
            );
            response
        }
        Err(error) => error_response(&error, "/boundaries", &request_id, None),
    }
}

/// Handle GET /cities requests
pub async fn cities_handler(State(state): State<Arc<AppState>>) -> Response {
    let request_id = generate_request_id();
    debug!(endpoint = "/cities", request_id = %request_id, "Processing cities request");

    match cities_response(&state) {
        Ok(response) => {
            info!(endpoint = "/cities", request_id = %request_id, "Cities request successful");
            response
        }
        Err(error) => error_response(&error, "/cities", &request_id, None),
    }
}
