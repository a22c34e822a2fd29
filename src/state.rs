//! Application state management for climap.
//!
//! This module defines the shared state that is passed to all handlers,
//! containing the loaded store and the statistics derived from it once at
//! startup. Nothing here is mutated after construction.

use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{ClimapError, Result};
use crate::field::ClimateField;
use crate::store::{ClimateNormals, Manifest};

/// Fields that can restrict the displayed area by their monthly extremes
pub const FILTER_FIELDS: [ClimateField; 3] = [
    ClimateField::MinTemperature,
    ClimateField::MaxTemperature,
    ClimateField::Precipitation,
];

/// Inclusive value range ignoring NaN
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    /// NaN-skipping min/max, or `None` if no finite value exists
    pub fn of<'a, I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a f32>,
    {
        values
            .into_iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some(Self { min: v, max: v }),
                Some(r) => Some(Self {
                    min: r.min.min(v),
                    max: r.max.max(v),
                }),
            })
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Widened to multiples of 10, for range sliders
    pub fn slider(self) -> Self {
        Self {
            min: 10.0 * (self.min / 10.0).floor(),
            max: 10.0 * (self.max / 10.0).ceil(),
        }
    }
}

/// Per-cell NaN-skipping extremes across the twelve months
#[derive(Debug, Clone)]
pub struct MonthlyExtremes {
    pub min: Array2<f32>,
    pub max: Array2<f32>,
}

impl MonthlyExtremes {
    /// Reduce a `(month, row, col)` array over its month axis
    pub fn of(data: &Array3<f32>) -> Self {
        let min = data.fold_axis(Axis(0), f32::NAN, |&acc, &v| nan_fold(acc, v, f32::min));
        let max = data.fold_axis(Axis(0), f32::NAN, |&acc, &v| nan_fold(acc, v, f32::max));
        Self { min, max }
    }
}

fn nan_fold(acc: f32, v: f32, pick: fn(f32, f32) -> f32) -> f32 {
    match (acc.is_nan(), v.is_nan()) {
        (_, true) => acc,
        (true, false) => v,
        (false, false) => pick(acc, v),
    }
}

/// The main application state shared across all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    /// Configuration
    pub config: Config,
    /// Store manifest
    pub manifest: Manifest,
    /// Converted climate normals
    pub normals: ClimateNormals,
    /// Full-period value range per field
    pub ranges: BTreeMap<ClimateField, ValueRange>,
    /// Monthly extremes for the filter fields present in the store
    pub extremes: BTreeMap<ClimateField, MonthlyExtremes>,
    /// State boundary polyline bundle, if extracted
    pub boundaries: Option<Array2<f32>>,
    /// City markers as a GeoJSON document, if selected
    pub cities: Option<String>,
}

impl AppState {
    /// Create a new AppState, computing ranges and extremes
    pub fn new(
        config: Config,
        manifest: Manifest,
        normals: ClimateNormals,
        boundaries: Option<Array2<f32>>,
        cities: Option<String>,
    ) -> Result<Self> {
        normals.validate()?;

        let mut ranges = BTreeMap::new();
        for (field, data) in &normals.monthly {
            if let Some(range) = ValueRange::of(data.iter()) {
                ranges.insert(*field, range);
            }
        }
        if let Some(range) = ValueRange::of(normals.elevation.iter()) {
            ranges.insert(ClimateField::Elevation, range);
        }

        let extremes = FILTER_FIELDS
            .iter()
            .filter_map(|field| {
                normals
                    .monthly
                    .get(field)
                    .map(|data| (*field, MonthlyExtremes::of(data)))
            })
            .collect();

        Ok(Self {
            config,
            manifest,
            normals,
            ranges,
            extremes,
            boundaries,
            cities,
        })
    }

    /// Create a new AppState wrapped in an Arc for shared ownership
    pub fn new_shared(
        config: Config,
        manifest: Manifest,
        normals: ClimateNormals,
        boundaries: Option<Array2<f32>>,
        cities: Option<String>,
    ) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::new(
            config, manifest, normals, boundaries, cities,
        )?))
    }

    /// Fields present in the store, monthly first, elevation last
    pub fn fields(&self) -> Vec<ClimateField> {
        ClimateField::ALL
            .iter()
            .copied()
            .filter(|f| self.has_field(*f))
            .collect()
    }

    /// Check if a field exists
    pub fn has_field(&self, field: ClimateField) -> bool {
        field == ClimateField::Elevation || self.normals.monthly.contains_key(&field)
    }

    /// Get a monthly field with error handling
    pub fn monthly_checked(&self, field: ClimateField) -> Result<&Array3<f32>> {
        self.normals
            .monthly
            .get(&field)
            .ok_or_else(|| ClimapError::InvalidSelection {
                param: "field".to_string(),
                message: format!(
                    "Field '{}' is not in this store (variant {})",
                    field, self.manifest.variant
                ),
            })
    }

    /// Get the monthly extremes of a filter field with error handling
    pub fn extremes_checked(&self, field: ClimateField) -> Result<&MonthlyExtremes> {
        self.extremes
            .get(&field)
            .ok_or_else(|| ClimapError::InvalidSelection {
                param: field.key().to_string(),
                message: format!("Field '{}' cannot be used as a range filter here", field),
            })
    }

    /// Value range of a field
    pub fn range(&self, field: ClimateField) -> Option<ValueRange> {
        self.ranges.get(&field).copied()
    }

    /// Color range of a field. Temperatures share one range.
    pub fn color_range(&self, field: ClimateField) -> Option<ValueRange> {
        if field.is_temperature() {
            ClimateField::TEMPERATURES
                .iter()
                .filter_map(|f| self.range(*f))
                .reduce(ValueRange::union)
        } else {
            self.range(field)
        }
    }

    /// Slider range of a field
    pub fn slider_range(&self, field: ClimateField) -> Option<ValueRange> {
        self.range(field).map(ValueRange::slider)
    }

    /// Validate that the application state is consistent and ready for use
    pub fn validate(&self) -> Result<()> {
        if self.normals.monthly.is_empty() {
            return Err(ClimapError::DataNotFound {
                message: "No monthly fields found in the store".to_string(),
            });
        }
        for field in self.manifest.monthly_fields() {
            if !self.normals.monthly.contains_key(&field) {
                return Err(ClimapError::DataNotFound {
                    message: format!("Manifest lists field {} but no data was loaded", field),
                });
            }
        }
        if let Some(bundle) = &self.boundaries {
            if bundle.nrows() != 2 {
                return Err(ClimapError::DataNotFound {
                    message: format!(
                        "Boundary bundle has {} rows, expected 2",
                        bundle.nrows()
                    ),
                });
            }
        }
        self.normals.validate()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::field::MONTHS;
    use crate::grid::GridSpec;
    use crate::quantize::{SCALE, SENTINEL};
    use crate::variant::PipelineVariant;
    use chrono::Utc;
    use ndarray::array;

    /// A 2 x 2 store with simple monthly cycles
    pub(crate) fn sample_state() -> AppState {
        let grid = GridSpec {
            nrow: 2,
            ncol: 2,
            step: 1.0,
            xmin: -100.0,
            ymax: 42.0,
        };
        let variant = PipelineVariant::Consolidated;
        let mut monthly = BTreeMap::new();
        // cell (r, c) low temperature cycles over base +/- 10
        let base = array![[20.0f32, 40.0], [60.0, 80.0]];
        let cycle = |offset: f32| {
            Array3::from_shape_fn((MONTHS, 2, 2), |(m, r, c)| {
                base[[r, c]] + offset + if m < 6 { -10.0 } else { 10.0 }
            })
        };
        monthly.insert(ClimateField::MinTemperature, cycle(0.0));
        monthly.insert(ClimateField::MeanTemperature, cycle(10.0));
        monthly.insert(ClimateField::MaxTemperature, cycle(20.0));
        let mut ppt = Array3::from_shape_fn((MONTHS, 2, 2), |(m, r, c)| {
            1.0 + m as f32 * 0.5 + r as f32 + c as f32
        });
        ppt[[0, 1, 1]] = f32::NAN;
        monthly.insert(ClimateField::Precipitation, ppt);

        let normals = ClimateNormals {
            variant,
            grid,
            monthly,
            elevation: array![[100.0, f32::NAN], [5000.0, 12000.0]],
            lon: grid.lon_centers(),
            lat: grid.lat_centers(),
        };
        let manifest = Manifest {
            format_version: crate::store::FORMAT_VERSION,
            variant,
            grid,
            fields: variant
                .monthly_fields()
                .iter()
                .copied()
                .chain(std::iter::once(ClimateField::Elevation))
                .map(Into::into)
                .collect(),
            months: MONTHS,
            scale: SCALE,
            sentinel: SENTINEL,
            regrid: None,
            created_at: Utc::now(),
        };
        AppState::new(Config::default(), manifest, normals, None, None).unwrap()
    }

    #[test]
    fn test_value_range_skips_nan() {
        let r = ValueRange::of([f32::NAN, 3.0, -2.5, f32::NAN].iter()).unwrap();
        assert_eq!(r, ValueRange { min: -2.5, max: 3.0 });
        assert!(ValueRange::of([f32::NAN].iter()).is_none());
    }

    #[test]
    fn test_slider_range() {
        let r = ValueRange { min: -3.2, max: 101.0 }.slider();
        assert_eq!(r, ValueRange { min: -10.0, max: 110.0 });
        let exact = ValueRange { min: 10.0, max: 20.0 }.slider();
        assert_eq!(exact, ValueRange { min: 10.0, max: 20.0 });
    }

    #[test]
    fn test_monthly_extremes_skip_nan() {
        let mut data = Array3::from_elem((3, 1, 2), f32::NAN);
        data[[0, 0, 0]] = 5.0;
        data[[2, 0, 0]] = -1.0;
        let ext = MonthlyExtremes::of(&data);
        assert_eq!(ext.min[[0, 0]], -1.0);
        assert_eq!(ext.max[[0, 0]], 5.0);
        assert!(ext.min[[0, 1]].is_nan());
    }

    #[test]
    fn test_state_statistics() {
        let state = sample_state();
        assert!(state.validate().is_ok());
        assert_eq!(
            state.fields(),
            vec![
                ClimateField::Precipitation,
                ClimateField::MinTemperature,
                ClimateField::MeanTemperature,
                ClimateField::MaxTemperature,
                ClimateField::Elevation
            ]
        );
        assert!(!state.has_field(ClimateField::Sunshine));

        // shared temperature range: tmin low 10, tmax high 110
        let color = state.color_range(ClimateField::MeanTemperature).unwrap();
        assert_eq!(color, ValueRange { min: 10.0, max: 110.0 });
        assert_eq!(state.color_range(ClimateField::MinTemperature), Some(color));

        let dem = state.range(ClimateField::Elevation).unwrap();
        assert_eq!(dem, ValueRange { min: 100.0, max: 12000.0 });

        let tmin = state.extremes_checked(ClimateField::MinTemperature).unwrap();
        assert_eq!(tmin.min[[1, 1]], 70.0);
        assert_eq!(tmin.max[[1, 1]], 90.0);
        assert!(state.extremes_checked(ClimateField::MeanTemperature).is_err());
    }

    #[test]
    fn test_missing_field_is_selection_error() {
        let state = sample_state();
        let err = state.monthly_checked(ClimateField::Sunshine).unwrap_err();
        assert!(err.is_client_error());
    }
}
