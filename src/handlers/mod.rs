//! HTTP request handlers for the climap API.
//!
//! This module contains all the endpoint handlers for the web server, plus
//! the query parsing and error responses they share.

pub mod field;
pub mod heartbeat;
pub mod image;
pub mod metadata;
pub mod overlays;

pub use field::field_handler;
pub use heartbeat::heartbeat_handler;
pub use image::image_handler;
pub use metadata::metadata_handler;
pub use overlays::{boundaries_handler, cities_handler};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{ClimapError, Result};
use crate::field::ClimateField;
use crate::logging::log_request_error;
use crate::selection::{Period, RangeFilter, Selection};

/// Build a [`Selection`] from raw query values
pub(crate) fn parse_selection(
    field: &str,
    period: Option<&str>,
    tmin: Option<&str>,
    tmax: Option<&str>,
    ppt: Option<&str>,
) -> Result<Selection> {
    let field = ClimateField::from_key(field)?;
    let period = match period {
        Some(p) => p.parse::<Period>()?,
        None => Period::Annual,
    };
    let mut selection = Selection::new(field, period);
    let filters = [
        (ClimateField::MinTemperature, tmin),
        (ClimateField::MaxTemperature, tmax),
        (ClimateField::Precipitation, ppt),
    ];
    for (filter_field, raw) in filters {
        if let Some(raw) = raw.filter(|s| !s.trim().is_empty()) {
            selection = selection.with_filter(RangeFilter::parse(filter_field, raw)?);
        }
    }
    Ok(selection)
}

/// HTTP status for an error
pub(crate) fn status_for(error: &ClimapError) -> StatusCode {
    if error.is_client_error() {
        StatusCode::BAD_REQUEST
    } else if matches!(error, ClimapError::DataNotFound { .. }) {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Log a failed request and turn it into a JSON error response
pub(crate) fn error_response(
    error: &ClimapError,
    endpoint: &str,
    request_id: &str,
    params: Option<&str>,
) -> Response {
    log_request_error(error, endpoint, request_id, params);
    (
        status_for(error),
        Json(serde_json::json!({
            "error": error.to_string(),
            "request_id": request_id
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection_defaults() {
        let selection = parse_selection("tmean", None, None, None, None).unwrap();
        assert_eq!(selection.field, ClimateField::MeanTemperature);
        assert_eq!(selection.period, Period::Annual);
        assert!(selection.filters.is_empty());
    }

    #[test]
    fn test_parse_selection_with_filters() {
        let selection =
            parse_selection("ppt", Some("july"), Some("10,60"), Some(""), Some("0,5")).unwrap();
        assert_eq!(selection.period, Period::Month(7));
        assert_eq!(selection.filters.len(), 2);
        assert_eq!(selection.filters[0].field, ClimateField::MinTemperature);
        assert_eq!(selection.filters[1].high, 5.0);
    }

    #[test]
    fn test_parse_selection_errors_are_client_errors() {
        for result in [
            parse_selection("humidity", None, None, None, None),
            parse_selection("ppt", Some("13"), None, None, None),
            parse_selection("ppt", None, Some("60,10"), None, None),
        ] {
            let error = result.unwrap_err();
            assert_eq!(status_for(&error), StatusCode::BAD_REQUEST);
        }
        let missing = ClimapError::DataNotFound {
            message: "no boundaries".to_string(),
        };
        assert_eq!(status_for(&missing), StatusCode::NOT_FOUND);
        let io = ClimapError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(status_for(&io), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
