//! Turning a user selection into a displayable 2D view.
//!
//! A [`Selection`] names a field, a period and up to three range filters.
//! [`compute_view`] picks the slice, masks out cells whose monthly extremes
//! fall outside any filter, and attaches a color scale and title.

use ndarray::{Array2, Axis, Zip};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ClimapError, Result};
use crate::field::{ClimateField, MONTHS, MONTH_NAMES};
use crate::state::{AppState, ValueRange};

/// Which slice of a monthly field to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    /// Mean over the twelve months
    #[default]
    Annual,
    /// A single month, 1 = January
    Month(u8),
}

impl Period {
    /// Build a month period, checking the range
    pub fn month(month: u8) -> Result<Self> {
        if (1..=MONTHS as u8).contains(&month) {
            Ok(Period::Month(month))
        } else {
            Err(ClimapError::InvalidSelection {
                param: "period".to_string(),
                message: format!("Month must be between 1 and {}, got {}", MONTHS, month),
            })
        }
    }

    /// Every period in display order
    pub fn all() -> Vec<Period> {
        std::iter::once(Period::Annual)
            .chain((1..=MONTHS as u8).map(Period::Month))
            .collect()
    }

    /// Query-string key: `annual` or the month number
    pub fn key(&self) -> String {
        match self {
            Period::Annual => "annual".to_string(),
            Period::Month(m) => m.to_string(),
        }
    }

    /// Human-readable name used in titles
    pub fn name(&self) -> &'static str {
        match self {
            Period::Annual => "Annual Mean",
            Period::Month(m) => usize::from(*m)
                .checked_sub(1)
                .and_then(|i| MONTH_NAMES.get(i))
                .copied()
                .unwrap_or("Unknown Month"),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Period {
    type Err = ClimapError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let lower = s.to_lowercase();
        if lower == "annual" || lower == "annual mean" {
            return Ok(Period::Annual);
        }
        if let Ok(month) = s.parse::<u8>() {
            return Period::month(month);
        }
        MONTH_NAMES
            .iter()
            .position(|name| name.to_lowercase() == lower)
            .map(|i| Period::Month(i as u8 + 1))
            .ok_or_else(|| ClimapError::InvalidSelection {
                param: "period".to_string(),
                message: format!(
                    "Unknown period '{}'. Use 'annual', a month number 1-12 or a month name",
                    s
                ),
            })
    }
}

/// Keep only cells whose monthly values all fall inside `[low, high]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeFilter {
    pub field: ClimateField,
    pub low: f32,
    pub high: f32,
}

impl RangeFilter {
    pub fn new(field: ClimateField, low: f32, high: f32) -> Result<Self> {
        if low.is_nan() || high.is_nan() || low > high {
            return Err(ClimapError::InvalidSelection {
                param: field.key().to_string(),
                message: format!("Range must satisfy low <= high, got [{}, {}]", low, high),
            });
        }
        Ok(Self { field, low, high })
    }

    /// Parse a `low,high` pair
    pub fn parse(field: ClimateField, s: &str) -> Result<Self> {
        let invalid = || ClimapError::InvalidSelection {
            param: field.key().to_string(),
            message: format!("Expected 'low,high', got '{}'", s),
        };
        let (low, high) = s.split_once(',').ok_or_else(invalid)?;
        let low: f32 = low.trim().parse().map_err(|_| invalid())?;
        let high: f32 = high.trim().parse().map_err(|_| invalid())?;
        Self::new(field, low, high)
    }
}

/// A field, period and set of range filters
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub field: ClimateField,
    pub period: Period,
    pub filters: Vec<RangeFilter>,
}

impl Selection {
    pub fn new(field: ClimateField, period: Period) -> Self {
        Self {
            field,
            period,
            filters: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: RangeFilter) -> Self {
        self.filters.push(filter);
        self
    }
}

/// Palette name and value bounds for coloring a view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorScale {
    pub palette: String,
    pub low: f32,
    pub high: f32,
}

/// A computed 2D view, indexed `[row, col]` north to south
#[derive(Debug, Clone)]
pub struct FieldView {
    pub values: Array2<f32>,
    pub scale: ColorScale,
    pub title: String,
}

/// Default palette per field
pub fn default_palette(field: ClimateField) -> &'static str {
    match field {
        ClimateField::Precipitation => "blues",
        ClimateField::MinTemperature
        | ClimateField::MeanTemperature
        | ClimateField::MaxTemperature => "turbo",
        ClimateField::Sunshine => "cividis",
        ClimateField::Elevation => "iridescent",
    }
}

/// Colorbar title for a field and period
pub fn title(field: ClimateField, period: Period) -> String {
    if field.is_monthly() {
        format!("{} {}", period.name(), field.label()).replace("Mean Mean", "Mean")
    } else {
        field.label().to_string()
    }
}

/// Cells excluded by any filter, or `None` when no filter is active
pub fn range_mask(state: &AppState, filters: &[RangeFilter]) -> Result<Option<Array2<bool>>> {
    let mut mask: Option<Array2<bool>> = None;
    for filter in filters {
        let extremes = state.extremes_checked(filter.field)?;
        let excluded = Zip::from(&extremes.min)
            .and(&extremes.max)
            .map_collect(|&lo, &hi| lo < filter.low || hi > filter.high);
        mask = Some(match mask {
            None => excluded,
            Some(mut acc) => {
                Zip::from(&mut acc)
                    .and(&excluded)
                    .for_each(|a, &e| *a = *a || e);
                acc
            }
        });
    }
    Ok(mask)
}

/// Compute the displayed array, color scale and title for a selection
pub fn compute_view(state: &AppState, selection: &Selection) -> Result<FieldView> {
    let field = selection.field;
    if let Period::Month(m) = selection.period {
        Period::month(m)?;
    }

    let mut values = if field.is_monthly() {
        let data = state.monthly_checked(field)?;
        match selection.period {
            // plain mean, so a single missing month blanks the cell
            Period::Annual => data
                .mean_axis(Axis(0))
                .ok_or_else(|| ClimapError::DataNotFound {
                    message: format!("Field {} has no monthly slices", field),
                })?,
            Period::Month(m) => data.index_axis(Axis(0), usize::from(m) - 1).to_owned(),
        }
    } else {
        state.normals.elevation.clone()
    };

    if let Some(mask) = range_mask(state, &selection.filters)? {
        Zip::from(&mut values).and(&mask).for_each(|v, &masked| {
            if masked {
                *v = f32::NAN;
            }
        });
    }

    let mut range = state
        .color_range(field)
        .unwrap_or(ValueRange { min: 0.0, max: 0.0 });
    if field == ClimateField::Precipitation {
        if let Some(cap) = state.config.display.precip_cap {
            values.mapv_inplace(|v| if v > cap { cap } else { v });
            range.max = range.max.min(cap);
            range.min = range.min.min(range.max);
        }
    }

    Ok(FieldView {
        values,
        scale: ColorScale {
            palette: default_palette(field).to_string(),
            low: range.min,
            high: range.max,
        },
        title: title(field, selection.period),
    })
}
