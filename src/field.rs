//! Climate fields held in the preprocessed store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ClimapError, Result};

/// Number of monthly slices in a monthly field
pub const MONTHS: usize = 12;

/// English month names, January first
pub const MONTH_NAMES: [&str; MONTHS] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A climate variable. The key doubles as the PRISM directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClimateField {
    #[serde(rename = "ppt")]
    Precipitation,
    #[serde(rename = "tmin")]
    MinTemperature,
    #[serde(rename = "tmean")]
    MeanTemperature,
    #[serde(rename = "tmax")]
    MaxTemperature,
    #[serde(rename = "soltrans")]
    Sunshine,
    #[serde(rename = "dem")]
    Elevation,
}

impl ClimateField {
    /// Every field, monthly ones first
    pub const ALL: [ClimateField; 6] = [
        ClimateField::Precipitation,
        ClimateField::MinTemperature,
        ClimateField::MeanTemperature,
        ClimateField::MaxTemperature,
        ClimateField::Sunshine,
        ClimateField::Elevation,
    ];

    /// The three temperature fields, which share a color range
    pub const TEMPERATURES: [ClimateField; 3] = [
        ClimateField::MinTemperature,
        ClimateField::MeanTemperature,
        ClimateField::MaxTemperature,
    ];

    /// Short key used in file names, store columns and query strings
    pub fn key(&self) -> &'static str {
        match self {
            ClimateField::Precipitation => "ppt",
            ClimateField::MinTemperature => "tmin",
            ClimateField::MeanTemperature => "tmean",
            ClimateField::MaxTemperature => "tmax",
            ClimateField::Sunshine => "soltrans",
            ClimateField::Elevation => "dem",
        }
    }

    /// Display label including units
    pub fn label(&self) -> &'static str {
        match self {
            ClimateField::Precipitation => "Precipitation (inches/month)",
            ClimateField::MinTemperature => "Low Temperature (°F)",
            ClimateField::MeanTemperature => "Mean Temperature (°F)",
            ClimateField::MaxTemperature => "High Temperature (°F)",
            ClimateField::Sunshine => "Sunshine Index (%)",
            ClimateField::Elevation => "Elevation (ft)",
        }
    }

    /// Units after conversion
    pub fn units(&self) -> &'static str {
        match self {
            ClimateField::Precipitation => "in",
            ClimateField::MinTemperature
            | ClimateField::MeanTemperature
            | ClimateField::MaxTemperature => "degF",
            ClimateField::Sunshine => "%",
            ClimateField::Elevation => "ft",
        }
    }

    /// Whether the field has one slice per month
    pub fn is_monthly(&self) -> bool {
        !matches!(self, ClimateField::Elevation)
    }

    pub fn is_temperature(&self) -> bool {
        Self::TEMPERATURES.contains(self)
    }

    /// Look a field up by key
    pub fn from_key(key: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.key() == key.to_lowercase())
            .ok_or_else(|| ClimapError::InvalidSelection {
                param: "field".to_string(),
                message: format!(
                    "Unknown field '{}'. Valid fields: {}",
                    key,
                    Self::ALL.map(|f| f.key()).join(", ")
                ),
            })
    }
}

impl fmt::Display for ClimateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ClimateField {
    type Err = ClimapError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ClimateField::from_key(s)
    }
}
