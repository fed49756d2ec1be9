use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use arrow::array::{Array, ArrayRef, AsArray, StringArray};
use arrow::compute;
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{
    Dataset, Record, COL_BASE_MSRP, COL_CITY, COL_ELECTRIC_RANGE, COL_MAKE, COL_MODEL_YEAR,
    COL_STATE, COL_VEHICLE_TYPE, COL_VIN,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything that can go wrong while turning a file into a [`Dataset`].
/// Any of these is fatal for the session: there is nothing to chart.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed Parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("malformed Arrow batch: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected JSON layout: {0}")]
    JsonLayout(&'static str),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("{} contains no rows with a valid 'Model Year'", .path.display())]
    NoValidRows { path: PathBuf },
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a registration dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – the public "Electric Vehicle Population Data" export
/// * `.parquet` – same columns, string or numeric typed
/// * `.json`    – `[{ "Model Year": 2020, "City": "Seattle", ... }, ...]`
///
/// Numeric columns are coerced: cells that do not parse become missing.
/// Rows without a model year are dropped.
pub fn load_file(path: &Path) -> Result<Dataset, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let (records, dropped) = match ext.as_str() {
        "csv" => load_csv(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        "json" => load_json(path)?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    };

    if dropped > 0 {
        log::debug!("Dropped {dropped} rows without a model year from {}", path.display());
    }

    let dataset = Dataset::from_records(records).ok_or_else(|| LoadError::NoValidRows {
        path: path.to_path_buf(),
    })?;

    log::info!(
        "Loaded {} registrations ({} dropped) from {}, model years {:?}",
        dataset.len(),
        dropped,
        path.display(),
        dataset.year_bounds()
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Shared row assembly
// ---------------------------------------------------------------------------

/// One row after format-specific decoding, before validation.
#[derive(Debug, Default)]
struct RawRow {
    vin: Option<String>,
    model_year: Option<f64>,
    vehicle_type: Option<String>,
    city: Option<String>,
    state: Option<String>,
    make: Option<String>,
    base_msrp: Option<f64>,
    electric_range: Option<f64>,
}

impl RawRow {
    /// `None` when the row has no usable model year.
    fn into_record(self) -> Option<Record> {
        let model_year = self.model_year.and_then(year_from_number)?;
        Some(Record {
            vin: self.vin,
            model_year,
            vehicle_type: self.vehicle_type,
            city: self.city,
            state: self.state,
            make: self.make,
            base_msrp: self.base_msrp,
            electric_range: self.electric_range,
        })
    }
}

/// Position of every known column in a tabular source.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    vin: Option<usize>,
    state: Option<usize>,
    model_year: usize,
    vehicle_type: usize,
    city: usize,
    make: usize,
    base_msrp: usize,
    electric_range: usize,
}

impl ColumnIndex {
    fn resolve(position: impl Fn(&str) -> Option<usize>) -> Result<Self, LoadError> {
        let required = |name: &'static str| position(name).ok_or(LoadError::MissingColumn(name));
        Ok(ColumnIndex {
            vin: position(COL_VIN),
            state: position(COL_STATE),
            model_year: required(COL_MODEL_YEAR)?,
            vehicle_type: required(COL_VEHICLE_TYPE)?,
            city: required(COL_CITY)?,
            make: required(COL_MAKE)?,
            base_msrp: required(COL_BASE_MSRP)?,
            electric_range: required(COL_ELECTRIC_RANGE)?,
        })
    }
}

/// Lenient numeric coercion: anything that is not a finite number is missing.
fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A model year must be a whole number; `2020.0` is accepted, `2020.5` is not.
fn year_from_number(v: f64) -> Option<i32> {
    if v.is_finite() && v.fract() == 0.0 && v >= i32::MIN as f64 && v <= i32::MAX as f64 {
        Some(v as i32)
    } else {
        None
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn collect_rows(rows: impl IntoIterator<Item = RawRow>) -> (Vec<Record>, usize) {
    let mut records = Vec::new();
    let mut dropped = 0;
    for raw in rows {
        match raw.into_record() {
            Some(r) => records.push(r),
            None => dropped += 1,
        }
    }
    (records, dropped)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with the column names listed in [`super::model`].
/// Extra columns are ignored; short rows leave the trailing cells missing.
fn load_csv(path: &Path) -> Result<(Vec<Record>, usize), LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);

    let headers = reader.headers()?.clone();
    let cols = ColumnIndex::resolve(|name| headers.iter().position(|h| h.trim() == name))?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let text = |idx: usize| record.get(idx).and_then(non_empty);
        let number = |idx: usize| record.get(idx).and_then(parse_number);

        rows.push(RawRow {
            vin: cols.vin.and_then(text),
            model_year: number(cols.model_year),
            vehicle_type: text(cols.vehicle_type),
            city: text(cols.city),
            state: cols.state.and_then(text),
            make: text(cols.make),
            base_msrp: number(cols.base_msrp),
            electric_range: number(cols.electric_range),
        });
    }

    Ok(collect_rows(rows))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Model Year": 2020, "Electric Vehicle Type": "BEV", "City": "Seattle",
///     "Make": "TESLA", "Base MSRP": 0, "Electric Range": 291 },
///   ...
/// ]
/// ```
///
/// Numbers may also be given as strings; `null` and absent keys are missing.
fn load_json(path: &Path) -> Result<(Vec<Record>, usize), LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root: JsonValue = serde_json::from_str(&text)?;

    let rows = root
        .as_array()
        .ok_or(LoadError::JsonLayout("expected a top-level array"))?;

    let mut keys: BTreeSet<&str> = BTreeSet::new();
    for row in rows {
        let obj = row
            .as_object()
            .ok_or(LoadError::JsonLayout("every row must be an object"))?;
        keys.extend(obj.keys().map(String::as_str));
    }
    // Column check is only meaningful once there is at least one row.
    if !rows.is_empty() {
        let key_list: Vec<&str> = keys.into_iter().collect();
        ColumnIndex::resolve(|name| key_list.iter().position(|k| *k == name))?;
    }

    let raw = rows.iter().filter_map(|row| row.as_object()).map(|obj| {
        let text = |name: &str| obj.get(name).and_then(json_text);
        let number = |name: &str| obj.get(name).and_then(json_number);
        RawRow {
            vin: text(COL_VIN),
            model_year: number(COL_MODEL_YEAR),
            vehicle_type: text(COL_VEHICLE_TYPE),
            city: text(COL_CITY),
            state: text(COL_STATE),
            make: text(COL_MAKE),
            base_msrp: number(COL_BASE_MSRP),
            electric_range: number(COL_ELECTRIC_RANGE),
        }
    });

    Ok(collect_rows(raw))
}

fn json_text(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::String(s) => non_empty(s),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_number(val: &JsonValue) -> Option<f64> {
    match val {
        JsonValue::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        JsonValue::String(s) => parse_number(s),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with the same column names as the CSV export.
///
/// Every column used is cast to text once per batch, so integer, float,
/// string and dictionary-encoded columns all go through the same coercion as
/// CSV cells. A column type arrow cannot render as text is an error.
fn load_parquet(path: &Path) -> Result<(Vec<Record>, usize), LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let cols = {
        let schema = builder.schema();
        ColumnIndex::resolve(|name| schema.index_of(name).ok())?
    };
    let reader = builder.build()?;

    let mut records = Vec::new();
    let mut dropped = 0;

    for batch_result in reader {
        let batch = batch_result?;
        let text = |idx: usize| text_column(batch.column(idx));
        let optional = |idx: Option<usize>| idx.map(text).transpose();

        let vin = optional(cols.vin)?;
        let state = optional(cols.state)?;
        let model_year = text(cols.model_year)?;
        let vehicle_type = text(cols.vehicle_type)?;
        let city = text(cols.city)?;
        let make = text(cols.make)?;
        let base_msrp = text(cols.base_msrp)?;
        let electric_range = text(cols.electric_range)?;

        let raw = (0..batch.num_rows()).map(|row| RawRow {
            vin: vin.as_ref().and_then(|c| cell_text(c, row)),
            model_year: cell_number(&model_year, row),
            vehicle_type: cell_text(&vehicle_type, row),
            city: cell_text(&city, row),
            state: state.as_ref().and_then(|c| cell_text(c, row)),
            make: cell_text(&make, row),
            base_msrp: cell_number(&base_msrp, row),
            electric_range: cell_number(&electric_range, row),
        });

        let (mut batch_records, batch_dropped) = collect_rows(raw);
        records.append(&mut batch_records);
        dropped += batch_dropped;
    }

    Ok((records, dropped))
}

// -- Arrow column helpers --

fn text_column(col: &ArrayRef) -> Result<StringArray, LoadError> {
    let cast = compute::cast(col, &DataType::Utf8)?;
    Ok(cast.as_string::<i32>().clone())
}

fn cell_text(col: &StringArray, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    non_empty(col.value(row))
}

fn cell_number(col: &StringArray, row: usize) -> Option<f64> {
    if col.is_null(row) {
        return None;
    }
    parse_number(col.value(row))
}
