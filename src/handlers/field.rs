//! Field view endpoint handler.
//!
//! Returns the computed 2D view for a selection, either as JSON or as an
//! Arrow IPC stream with a single `value` column in row-major order.

use arrow::array::{ArrayRef, Float32Array};
use arrow::record_batch::RecordBatch;
use arrow_ipc::writer::StreamWriter;
use arrow_schema::{DataType, Field, Schema};
use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::{error_response, parse_selection};
use crate::error::{ClimapError, Result};
use crate::logging::{generate_request_id, log_timed_operation};
use crate::selection::{compute_view, FieldView, Selection};
use crate::state::AppState;

/// Query parameters for the field endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct FieldQuery {
    /// Field key (ppt, tmin, tmean, tmax, soltrans, dem)
    pub field: String,
    /// `annual`, a month number or a month name
    pub period: Option<String>,
    /// Low temperature range filter as `low,high`
    pub tmin: Option<String>,
    /// High temperature range filter as `low,high`
    pub tmax: Option<String>,
    /// Precipitation range filter as `low,high`
    pub ppt: Option<String>,
    /// Output format (json or arrow)
    pub format: Option<String>,
}

impl FieldQuery {
    fn selection(&self) -> Result<Selection> {
        parse_selection(
            &self.field,
            self.period.as_deref(),
            self.tmin.as_deref(),
            self.tmax.as_deref(),
            self.ppt.as_deref(),
        )
    }
}

/// Handle GET /field requests
pub async fn field_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FieldQuery>,
) -> Response {
    let request_id = generate_request_id();
    let start_time = Instant::now();

    debug!(
        endpoint = "/field",
        request_id = %request_id,
        field = %params.field,
        period = ?params.period,
        format = ?params.format,
        "Processing field request"
    );

    let format = params.format.as_deref().unwrap_or("json").to_lowercase();
    let result = params.selection().and_then(|selection| {
        let view = log_timed_operation("compute_view", || compute_view(&state, &selection))?;
        match format.as_str() {
            "json" => Ok(Json(view_to_json(&state, &selection, &view)).into_response()),
            "arrow" => {
                let bytes = view_to_arrow(&selection, &view)?;
                Ok((
                    StatusCode::OK,
                    [(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static("application/vnd.apache.arrow.stream"),
                    )],
                    bytes,
                )
                    .into_response())
            }
            other => Err(ClimapError::InvalidParameter {
                param: "format".to_string(),
                message: format!("Unsupported format: {}. Must be 'json' or 'arrow'", other),
            }),
        }
    });

    match result {
        Ok(response) => {
            let duration = start_time.elapsed();
            info!(
                endpoint = "/field",
                request_id = %request_id,
                field = %params.field,
                format = %format,
                duration_us = duration.as_micros() as u64,
                "Field request successful"
            );
            response
        }
        Err(error) => error_response(
            &error,
            "/field",
            &request_id,
            Some(&format!("field={}, period={:?}", params.field, params.period)),
        ),
    }
}

/// JSON body for a view. NaN cells become `null`.
pub fn view_to_json(state: &AppState, selection: &Selection, view: &FieldView) -> serde_json::Value {
    let values: Vec<Vec<Option<f32>>> = view
        .values
        .outer_iter()
        .map(|row| row.iter().map(|&v| (!v.is_nan()).then_some(v)).collect())
        .collect();

    serde_json::json!({
        "field": selection.field.key(),
        "period": selection.period.key(),
        "title": view.title,
        "palette": view.scale.palette,
        "low": view.scale.low,
        "high": view.scale.high,
        "rows": view.values.nrows(),
        "cols": view.values.ncols(),
        "lon": state.normals.lon,
        "lat": state.normals.lat,
        "values": values,
    })
}

/// Serialize a view as an Arrow IPC stream
pub fn view_to_arrow(selection: &Selection, view: &FieldView) -> Result<Vec<u8>> {
    let mut metadata = HashMap::new();
    metadata.insert(
        "shape".to_string(),
        serde_json::to_string(&[view.values.nrows(), view.values.ncols()])?,
    );
    metadata.insert("field".to_string(), selection.field.key().to_string());
    metadata.insert("period".to_string(), selection.period.key());
    metadata.insert("title".to_string(), view.title.clone());
    metadata.insert("palette".to_string(), view.scale.palette.clone());
    metadata.insert("low".to_string(), view.scale.low.to_string());
    metadata.insert("high".to_string(), view.scale.high.to_string());

    let schema = Arc::new(Schema::new(vec![
        Field::new("value", DataType::Float32, false).with_metadata(metadata)
    ]));
    let column = Float32Array::from(view.values.iter().copied().collect::<Vec<_>>());
    let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(column) as ArrayRef])?;

    let mut writer = StreamWriter::try_new(Vec::new(), &schema)?;
    writer.write(&batch)?;
    writer.finish()?;
    Ok(writer.into_inner()?)
}
