//! Pipeline variants.
//!
//! Two preprocessing variants exist and are kept distinct: they disagree on
//! the meters-to-feet factor, the precipitation ceiling and the field set.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ClimapError, Result};
use crate::field::ClimateField;
use crate::units::{Conversion, M_TO_FT, M_TO_FT_ROUNDED};

/// Which set of preprocessing constants to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineVariant {
    /// Five monthly fields including sunshine, feet = m * 3.28, precip capped at 18in
    #[default]
    Compact,
    /// Four monthly fields, feet = m * 3.28084, precip capped at 16in
    Consolidated,
}

impl PipelineVariant {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineVariant::Compact => "compact",
            PipelineVariant::Consolidated => "consolidated",
        }
    }

    /// Monthly fields read by this variant, in store order
    pub fn monthly_fields(&self) -> &'static [ClimateField] {
        match self {
            PipelineVariant::Compact => &[
                ClimateField::Precipitation,
                ClimateField::MinTemperature,
                ClimateField::MeanTemperature,
                ClimateField::MaxTemperature,
                ClimateField::Sunshine,
            ],
            PipelineVariant::Consolidated => &[
                ClimateField::Precipitation,
                ClimateField::MinTemperature,
                ClimateField::MeanTemperature,
                ClimateField::MaxTemperature,
            ],
        }
    }

    /// Conversion from raw PRISM units to display units
    pub fn conversion(&self, field: ClimateField) -> Conversion {
        match field {
            ClimateField::Precipitation => Conversion::MM_TO_INCHES,
            ClimateField::MinTemperature
            | ClimateField::MeanTemperature
            | ClimateField::MaxTemperature => Conversion::CELSIUS_TO_FAHRENHEIT,
            ClimateField::Sunshine => Conversion::FRACTION_TO_PERCENT,
            ClimateField::Elevation => Conversion::Scale {
                factor: self.meters_to_feet(),
            },
        }
    }

    pub fn meters_to_feet(&self) -> f32 {
        match self {
            PipelineVariant::Compact => M_TO_FT_ROUNDED,
            PipelineVariant::Consolidated => M_TO_FT,
        }
    }

    /// Upper bound for monthly precipitation in inches
    pub fn precip_ceiling(&self) -> f32 {
        match self {
            PipelineVariant::Compact => 18.0,
            PipelineVariant::Consolidated => 16.0,
        }
    }

    /// Candidate raster paths for one month of a field, in lookup order
    pub fn monthly_raster_paths(
        &self,
        input_dir: &Path,
        field: ClimateField,
        month: usize,
    ) -> Vec<PathBuf> {
        let dir = input_dir.join(field.key());
        let name = |model: &str| {
            dir.join(format!(
                "PRISM_{}_30yr_normal_4km{}_{:02}_bil.bil",
                field.key(),
                model,
                month
            ))
        };
        match self {
            PipelineVariant::Compact => vec![name("M4"), name("M3")],
            PipelineVariant::Consolidated => vec![name("M3")],
        }
    }

    /// Path of the elevation raster
    pub fn elevation_raster_path(&self, input_dir: &Path) -> PathBuf {
        input_dir.join("dem").join("PRISM_us_dem_4km_bil.bil")
    }
}

impl fmt::Display for PipelineVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PipelineVariant {
    type Err = ClimapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(PipelineVariant::Compact),
            "consolidated" => Ok(PipelineVariant::Consolidated),
            _ => Err(ClimapError::Config {
                message: format!(
                    "Invalid pipeline variant: {}. Must be one of: compact, consolidated",
                    s
                ),
            }),
        }
    }
}
