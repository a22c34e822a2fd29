//! The preprocessed store.
//!
//! A store is a directory of Arrow IPC files plus a JSON manifest:
//!
//! - `normals.arrow`: one `Int16` column per monthly field, one record batch
//!   per month (quantized, see [`crate::quantize`])
//! - `dem.arrow`: elevation as `Float32`
//! - `lon.arrow`, `lat.arrow`: cell-center coordinates as `Float64`
//! - `manifest.json`: grid, variant and field descriptions, written last
//!
//! Boundary bundles are written next to the store as `boundaries.arrow`.

use arrow_array::{Array, ArrayRef, Float32Array, Float64Array, Int16Array, RecordBatch};
use arrow_ipc::reader::FileReader;
use arrow_ipc::writer::FileWriter;
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use chrono::{DateTime, Utc};
use ndarray::{s, Array2, Array3, Axis};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ClimapError, Result};
use crate::field::{ClimateField, MONTHS};
use crate::grid::GridSpec;
use crate::interpolation::EdgePolicy;
use crate::quantize::{
    dequantize, is_representable, quantize, MAX_VALUE, MIN_VALUE, SCALE, SENTINEL,
};
use crate::variant::PipelineVariant;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const NORMALS_FILE: &str = "normals.arrow";
pub const DEM_FILE: &str = "dem.arrow";
pub const LON_FILE: &str = "lon.arrow";
pub const LAT_FILE: &str = "lat.arrow";
pub const BOUNDARIES_FILE: &str = "boundaries.arrow";
pub const CITIES_FILE: &str = "cities.geojson";

/// Current layout version
pub const FORMAT_VERSION: u32 = 1;

/// Description of one stored field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub field: ClimateField,
    pub label: String,
    pub units: String,
    pub monthly: bool,
}

impl From<ClimateField> for FieldInfo {
    fn from(field: ClimateField) -> Self {
        Self {
            field,
            label: field.label().to_string(),
            units: field.units().to_string(),
            monthly: field.is_monthly(),
        }
    }
}

/// Regridding applied during preprocessing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegridInfo {
    pub source_grid: GridSpec,
    pub edge_policy: EdgePolicy,
}

/// Store manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub variant: PipelineVariant,
    /// Grid of the stored arrays
    pub grid: GridSpec,
    pub fields: Vec<FieldInfo>,
    pub months: usize,
    pub scale: f32,
    pub sentinel: i16,
    #[serde(default)]
    pub regrid: Option<RegridInfo>,
    pub created_at: DateTime<Utc>,
}

impl Manifest {
    /// Monthly fields in store order
    pub fn monthly_fields(&self) -> Vec<ClimateField> {
        self.fields
            .iter()
            .filter(|f| f.monthly)
            .map(|f| f.field)
            .collect()
    }
}

/// Converted climate normals held in memory as floats
#[derive(Debug, Clone)]
pub struct ClimateNormals {
    pub variant: PipelineVariant,
    pub grid: GridSpec,
    /// `(month, row, col)` per monthly field
    pub monthly: BTreeMap<ClimateField, Array3<f32>>,
    pub elevation: Array2<f32>,
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
}

impl ClimateNormals {
    /// Check every array agrees with the grid
    pub fn validate(&self) -> Result<()> {
        let (nrow, ncol) = self.grid.shape();
        for (field, data) in &self.monthly {
            if data.dim() != (MONTHS, nrow, ncol) {
                return Err(ClimapError::DataNotFound {
                    message: format!(
                        "Field {} has shape {:?}, expected ({}, {}, {})",
                        field,
                        data.shape(),
                        MONTHS,
                        nrow,
                        ncol
                    ),
                });
            }
        }
        if self.elevation.dim() != (nrow, ncol) {
            return Err(ClimapError::DataNotFound {
                message: format!(
                    "Elevation has shape {:?}, expected ({}, {})",
                    self.elevation.shape(),
                    nrow,
                    ncol
                ),
            });
        }
        if self.lon.len() != ncol || self.lat.len() != nrow {
            return Err(ClimapError::DataNotFound {
                message: format!(
                    "Coordinate lengths (lat {}, lon {}) do not match grid ({}, {})",
                    self.lat.len(),
                    self.lon.len(),
                    nrow,
                    ncol
                ),
            });
        }
        Ok(())
    }

    /// Approximate in-memory size in bytes
    pub fn memory_bytes(&self) -> usize {
        let monthly: usize = self.monthly.values().map(|a| a.len() * 4).sum();
        monthly + self.elevation.len() * 4 + (self.lon.len() + self.lat.len()) * 8
    }
}

/// Write `normals` as a store in `dir`
pub fn write_store(
    dir: &Path,
    normals: &ClimateNormals,
    regrid: Option<RegridInfo>,
) -> Result<Manifest> {
    normals.validate()?;
    check_quantizable(normals)?;
    fs::create_dir_all(dir)?;

    let (nrow, ncol) = normals.grid.shape();
    let fields: Vec<ClimateField> = normals.monthly.keys().copied().collect();

    // normals.arrow: one batch per month
    let mut metadata = HashMap::new();
    metadata.insert(
        "shape".to_string(),
        serde_json::to_string(&[MONTHS, nrow, ncol])?,
    );
    metadata.insert("scale".to_string(), SCALE.to_string());
    metadata.insert("sentinel".to_string(), SENTINEL.to_string());
    let schema = Arc::new(
        Schema::new(
            fields
                .iter()
                .map(|f| Field::new(f.key(), DataType::Int16, false))
                .collect::<Vec<_>>(),
        )
        .with_metadata(metadata),
    );
    let mut batches = Vec::with_capacity(MONTHS);
    for month in 0..MONTHS {
        let columns = normals
            .monthly
            .values()
            .map(|data| {
                let values: Vec<i16> = data.slice(s![month, .., ..]).iter().map(|&v| quantize(v)).collect();
                Arc::new(Int16Array::from(values)) as ArrayRef
            })
            .collect();
        batches.push(RecordBatch::try_new(schema.clone(), columns)?);
    }
    write_ipc(&dir.join(NORMALS_FILE), &schema, &batches)?;

    write_single_column(
        &dir.join(DEM_FILE),
        ClimateField::Elevation.key(),
        Arc::new(Float32Array::from(normals.elevation.iter().copied().collect::<Vec<_>>())),
        DataType::Float32,
    )?;
    write_single_column(
        &dir.join(LON_FILE),
        "lon",
        Arc::new(Float64Array::from(normals.lon.clone())),
        DataType::Float64,
    )?;
    write_single_column(
        &dir.join(LAT_FILE),
        "lat",
        Arc::new(Float64Array::from(normals.lat.clone())),
        DataType::Float64,
    )?;

    let mut infos: Vec<FieldInfo> = fields.iter().copied().map(FieldInfo::from).collect();
    infos.push(FieldInfo::from(ClimateField::Elevation));
    let manifest = Manifest {
        format_version: FORMAT_VERSION,
        variant: normals.variant,
        grid: normals.grid,
        fields: infos,
        months: MONTHS,
        scale: SCALE,
        sentinel: SENTINEL,
        regrid,
        created_at: Utc::now(),
    };
    let mut file = BufWriter::new(File::create(dir.join(MANIFEST_FILE))?);
    serde_json::to_writer_pretty(&mut file, &manifest)?;
    file.flush()?;

    info!(
        operation = "write_store",
        dir = %dir.display(),
        fields = fields.len(),
        rows = nrow,
        cols = ncol,
        "Store written"
    );
    Ok(manifest)
}

/// Read a store written by [`write_store`]
pub fn read_store(dir: &Path) -> Result<(Manifest, ClimateNormals)> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let manifest: Manifest = serde_json::from_reader(BufReader::new(File::open(&manifest_path)?))?;
    if manifest.format_version != FORMAT_VERSION {
        return Err(ClimapError::DataNotFound {
            message: format!(
                "Unsupported store format version {} in {}",
                manifest.format_version,
                manifest_path.display()
            ),
        });
    }

    let grid = manifest.grid;
    let (nrow, ncol) = grid.shape();
    let cells = grid.len();

    let normals_path = dir.join(NORMALS_FILE);
    let (_, batches) = read_ipc(&normals_path)?;
    if batches.len() != manifest.months {
        return Err(ClimapError::DataNotFound {
            message: format!(
                "{} holds {} monthly chunks, expected {}",
                normals_path.display(),
                batches.len(),
                manifest.months
            ),
        });
    }

    let mut monthly = BTreeMap::new();
    for field in manifest.monthly_fields() {
        let mut data = Array3::from_elem((manifest.months, nrow, ncol), f32::NAN);
        for (month, batch) in batches.iter().enumerate() {
            let column = typed_column::<Int16Array>(batch, field.key(), &normals_path)?;
            if column.len() != cells {
                return Err(ClimapError::ShapeMismatch {
                    path: normals_path.clone(),
                    expected: cells,
                    actual: column.len(),
                });
            }
            let values: Vec<f32> = column.values().iter().map(|&q| dequantize(q)).collect();
            data.index_axis_mut(Axis(0), month)
                .assign(&Array2::from_shape_vec((nrow, ncol), values)?);
        }
        monthly.insert(field, data);
    }

    let elevation = read_single_column::<Float32Array>(&dir.join(DEM_FILE), ClimateField::Elevation.key())?;
    let elevation = Array2::from_shape_vec((nrow, ncol), elevation.values().to_vec())?;
    let lon = read_single_column::<Float64Array>(&dir.join(LON_FILE), "lon")?
        .values()
        .to_vec();
    let lat = read_single_column::<Float64Array>(&dir.join(LAT_FILE), "lat")?
        .values()
        .to_vec();

    let normals = ClimateNormals {
        variant: manifest.variant,
        grid,
        monthly,
        elevation,
        lon,
        lat,
    };
    normals.validate()?;
    debug!(dir = %dir.display(), "Store read");
    Ok((manifest, normals))
}

/// Fail on the first monthly value that would not survive quantization
fn check_quantizable(normals: &ClimateNormals) -> Result<()> {
    for (field, data) in &normals.monthly {
        if let Some(&value) = data.iter().find(|&&v| !is_representable(v)) {
            return Err(ClimapError::ValueOutOfRange {
                field: field.key().to_string(),
                value,
                min: MIN_VALUE,
                max: MAX_VALUE,
            });
        }
    }
    Ok(())
}

/// Write a 2 x N boundary bundle as `x`/`y` columns
pub fn write_boundaries(path: &Path, bundle: &Array2<f32>) -> Result<()> {
    if bundle.nrows() != 2 {
        return Err(ClimapError::InvalidParameter {
            param: "boundaries".to_string(),
            message: format!("Boundary bundle must have 2 rows, got {}", bundle.nrows()),
        });
    }
    let schema = Arc::new(Schema::new(vec![
        Field::new("x", DataType::Float32, false),
        Field::new("y", DataType::Float32, false),
    ]));
    let columns: Vec<ArrayRef> = bundle
        .outer_iter()
        .map(|row| Arc::new(Float32Array::from(row.to_vec())) as ArrayRef)
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), columns)?;
    write_ipc(path, &schema, &[batch])
}

/// Read a boundary bundle written by [`write_boundaries`]
pub fn read_boundaries(path: &Path) -> Result<Array2<f32>> {
    let (_, batches) = read_ipc(path)?;
    let mut x = Vec::new();
    let mut y = Vec::new();
    for batch in &batches {
        x.extend_from_slice(typed_column::<Float32Array>(batch, "x", path)?.values());
        y.extend_from_slice(typed_column::<Float32Array>(batch, "y", path)?.values());
    }
    let n = x.len();
    x.extend(y);
    Ok(Array2::from_shape_vec((2, n), x)?)
}

fn write_ipc(path: &Path, schema: &SchemaRef, batches: &[RecordBatch]) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    let mut writer = FileWriter::try_new(file, schema)?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.finish()?;
    writer.into_inner()?.flush()?;
    debug!(path = %path.display(), batches = batches.len(), "Wrote Arrow file");
    Ok(())
}

fn read_ipc(path: &Path) -> Result<(SchemaRef, Vec<RecordBatch>)> {
    let reader = FileReader::try_new(BufReader::new(File::open(path)?), None)?;
    let schema = reader.schema();
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok((schema, batches))
}

fn write_single_column(path: &Path, name: &str, column: ArrayRef, dtype: DataType) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![Field::new(name, dtype, false)]));
    let batch = RecordBatch::try_new(schema.clone(), vec![column])?;
    write_ipc(path, &schema, &[batch])
}

fn read_single_column<T>(path: &Path, name: &str) -> Result<T>
where
    T: Array + Clone + 'static,
{
    let (_, batches) = read_ipc(path)?;
    match batches.as_slice() {
        [batch] => Ok(typed_column::<T>(batch, name, path)?.clone()),
        _ => Err(ClimapError::DataNotFound {
            message: format!(
                "{} should hold exactly one record batch, found {}",
                path.display(),
                batches.len()
            ),
        }),
    }
}

fn typed_column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    name: &str,
    path: &Path,
) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|column| column.as_any().downcast_ref::<T>())
        .ok_or_else(|| ClimapError::DataNotFound {
            message: format!("Column {} missing or mistyped in {}", name, path.display()),
        })
}
