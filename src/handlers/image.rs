//! Image generation endpoint handler.
//!
//! Renders the view for a selection as a PNG or JPEG, colored with the
//! view's palette and value bounds. Row 0 of the grid is north, so it maps
//! to the top of the image.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use image::{ImageBuffer, Rgb, RgbImage, RgbaImage};
use ndarray::ArrayView2;
use serde::Deserialize;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::{error_response, parse_selection};
use crate::colormaps::{self, Colormap};
use crate::error::{ClimapError, Result};
use crate::interpolation::{get_interpolator, Interpolator};
use crate::logging::{generate_request_id, log_timed_operation};
use crate::selection::{compute_view, ColorScale, Selection};
use crate::state::AppState;

/// Default image width; the height follows the grid aspect ratio
const DEFAULT_WIDTH: u32 = 1200;

/// Largest accepted width or height
const MAX_DIMENSION: u32 = 4096;

/// Default resampling method
const DEFAULT_RESAMPLING: &str = "nearest";

/// Default output format
const DEFAULT_FORMAT: &str = "png";

/// Query parameters for image endpoint
#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    /// Field key to render
    pub field: String,
    /// `annual`, a month number or a month name
    pub period: Option<String>,
    /// Low temperature range filter as `low,high`
    pub tmin: Option<String>,
    /// High temperature range filter as `low,high`
    pub tmax: Option<String>,
    /// Precipitation range filter as `low,high`
    pub ppt: Option<String>,
    /// Image width in pixels
    pub width: Option<u32>,
    /// Image height in pixels
    pub height: Option<u32>,
    /// Palette name, overriding the field's default
    pub palette: Option<String>,
    /// Resampling method (nearest or bilinear)
    pub resampling: Option<String>,
    /// Output format (png or jpeg)
    pub format: Option<String>,
}

impl ImageQuery {
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

/// Resolve the requested image size against the grid shape
fn image_size(
    width: Option<u32>,
    height: Option<u32>,
    (nrow, ncol): (usize, usize),
) -> Result<(u32, u32)> {
    let aspect = nrow as f64 / ncol.max(1) as f64;
    let (width, height) = match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, (w as f64 * aspect).round().max(1.0) as u32),
        (None, Some(h)) => ((h as f64 / aspect).round().max(1.0) as u32, h),
        (None, None) => (
            DEFAULT_WIDTH,
            (DEFAULT_WIDTH as f64 * aspect).round().max(1.0) as u32,
        ),
    };

    for (param, value) in [("width", width), ("height", height)] {
        if value == 0 || value > MAX_DIMENSION {
            return Err(ClimapError::InvalidParameter {
                param: param.to_string(),
                message: format!("Must be between 1 and {}, got {}", MAX_DIMENSION, value),
            });
        }
    }
    Ok((width, height))
}

/// Color a 2D view into an RGBA image. NaN cells are transparent.
pub fn generate_image(
    data: ArrayView2<f32>,
    width: u32,
    height: u32,
    colormap: &dyn Colormap,
    scale: &ColorScale,
    resampling: &str,
) -> Result<RgbaImage> {
    let interpolator = get_interpolator(resampling)?;
    render(data, width, height, interpolator.as_ref(), colormap, scale)
}

fn render(
    data: ArrayView2<f32>,
    width: u32,
    height: u32,
    interpolator: &dyn Interpolator,
    colormap: &dyn Colormap,
    scale: &ColorScale,
) -> Result<RgbaImage> {
    let data_height = data.nrows();
    let data_width = data.ncols();
    if data_height == 0 || data_width == 0 {
        return Err(ClimapError::ImageGeneration {
            message: "Cannot render an empty view".to_string(),
        });
    }

    let flat_data: Vec<f32> = data.iter().copied().collect();
    let shape = [data_height, data_width];
    let x_ratio = data_width as f64 / width as f64;
    let y_ratio = data_height as f64 / height as f64;

    let mut img = ImageBuffer::new(width, height);
    for y in 0..height {
        // pixel centers onto cell centers
        let data_y = ((y as f64 + 0.5) * y_ratio - 0.5).clamp(0.0, (data_height - 1) as f64);
        for x in 0..width {
            let data_x = ((x as f64 + 0.5) * x_ratio - 0.5).clamp(0.0, (data_width - 1) as f64);

            let value = interpolator.interpolate(&flat_data, &shape, &[data_y, data_x])?;

            let color = if value.is_finite() {
                colormap.map(value, scale.low, scale.high)
            } else {
                [0, 0, 0, 0]
            };
            img.put_pixel(x, y, image::Rgba(color));
        }
    }

    Ok(img)
}

/// Flatten transparency onto white for formats without alpha
fn flatten_on_white(img: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b, a] = img.get_pixel(x, y).0;
        let alpha = a as f32 / 255.0;
        let blend = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Encode an image as `png` or `jpeg`
pub fn encode_image(img: &RgbaImage, format: &str) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    match format {
        "png" => img
            .write_to(&mut buffer, image::ImageFormat::Png)
            .map_err(|e| ClimapError::ImageGeneration {
                message: format!("Failed to encode PNG: {}", e),
            })?,
        "jpeg" => flatten_on_white(img)
            .write_to(&mut buffer, image::ImageFormat::Jpeg)
            .map_err(|e| ClimapError::ImageGeneration {
                message: format!("Failed to encode JPEG: {}", e),
            })?,
        other => {
            return Err(ClimapError::InvalidParameter {
                param: "format".to_string(),
                message: format!("Unsupported format: {}. Must be 'png' or 'jpeg'", other),
            })
        }
    }
    Ok(buffer.into_inner())
}

/// Handle GET /image requests
pub async fn image_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ImageQuery>,
) -> Response {
    let request_id = generate_request_id();
    let start_time = Instant::now();

    debug!(
        endpoint = "/image",
        request_id = %request_id,
        field = %params.field,
        period = ?params.period,
        width = ?params.width,
        height = ?params.height,
        palette = ?params.palette,
        format = ?params.format,
        "Processing image request"
    );

    match generate_image_response(&state, &params) {
        Ok(response) => {
            let duration = start_time.elapsed();
            info!(
                endpoint = "/image",
                request_id = %request_id,
                field = %params.field,
                period = ?params.period,
                duration_ms = duration.as_millis() as u64,
                "Image generation successful"
            );
            response
        }
        Err(error) => error_response(
            &error,
            "/image",
            &request_id,
            Some(&format!("field={}, period={:?}", params.field, params.period)),
        ),
    }
}

/// Helper function to generate image response
fn generate_image_response(state: &AppState, params: &ImageQuery) -> Result<Response> {
    let selection = params.selection()?;

    let format = params
        .format
        .as_deref()
        .unwrap_or(DEFAULT_FORMAT)
        .to_lowercase();
    let content_type = match format.as_str() {
        "png" => "image/png",
        "jpeg" | "jpg" => "image/jpeg",
        _ => {
            return Err(ClimapError::InvalidParameter {
                param: "format".to_string(),
                message: "Format must be 'png' or 'jpeg'".to_string(),
            })
        }
    };
    let (width, height) = image_size(params.width, params.height, state.normals.grid.shape())?;
    let resampling = params.resampling.as_deref().unwrap_or(DEFAULT_RESAMPLING);

    let view = log_timed_operation("compute_view", || compute_view(state, &selection))?;
    let palette = params.palette.as_deref().unwrap_or(&view.scale.palette);
    let colormap = colormaps::get_colormap(palette)?;

    debug!(
        width = width,
        height = height,
        data_shape = ?view.values.shape(),
        palette = %colormap.name(),
        resampling = %resampling,
        "Generating image from view"
    );

    let img = log_timed_operation("generate_image", || {
        generate_image(
            view.values.view(),
            width,
            height,
            colormap.as_ref(),
            &view.scale,
            resampling,
        )
    })?;
    let encoding = if content_type == "image/png" { "png" } else { "jpeg" };
    let bytes = encode_image(&img, encoding)?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));

    Ok((StatusCode::OK, headers, bytes).into_response())
}
