use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Column names of the source table
// ---------------------------------------------------------------------------

pub const COL_VIN: &str = "VIN (1-10)";
pub const COL_STATE: &str = "State";
pub const COL_CITY: &str = "City";
pub const COL_MODEL_YEAR: &str = "Model Year";
pub const COL_MAKE: &str = "Make";
pub const COL_VEHICLE_TYPE: &str = "Electric Vehicle Type";
pub const COL_ELECTRIC_RANGE: &str = "Electric Range";
pub const COL_BASE_MSRP: &str = "Base MSRP";

// ---------------------------------------------------------------------------
// Record – one row of the registration table
// ---------------------------------------------------------------------------

/// A single vehicle registration (one row of the source table).
///
/// Only `model_year` is guaranteed; every other cell may be missing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub vin: Option<String>,
    pub model_year: i32,
    /// "Battery Electric Vehicle (BEV)", "Plug-in Hybrid Electric Vehicle (PHEV)", ...
    pub vehicle_type: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub make: Option<String>,
    pub base_msrp: Option<f64>,
    pub electric_range: Option<f64>,
}

// ---------------------------------------------------------------------------
// Field selectors used by the aggregations
// ---------------------------------------------------------------------------

/// A categorical column that can be counted or grouped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryField {
    VehicleType,
    City,
    State,
    Make,
}

impl CategoryField {
    pub fn value<'a>(&self, record: &'a Record) -> Option<&'a str> {
        match self {
            CategoryField::VehicleType => record.vehicle_type.as_deref(),
            CategoryField::City => record.city.as_deref(),
            CategoryField::State => record.state.as_deref(),
            CategoryField::Make => record.make.as_deref(),
        }
    }

    pub fn column_name(&self) -> &'static str {
        match self {
            CategoryField::VehicleType => COL_VEHICLE_TYPE,
            CategoryField::City => COL_CITY,
            CategoryField::State => COL_STATE,
            CategoryField::Make => COL_MAKE,
        }
    }
}

impl fmt::Display for CategoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// An optional numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericField {
    BaseMsrp,
    ElectricRange,
}

impl NumericField {
    pub fn value(&self, record: &Record) -> Option<f64> {
        match self {
            NumericField::BaseMsrp => record.base_msrp,
            NumericField::ElectricRange => record.electric_range,
        }
    }

    pub fn column_name(&self) -> &'static str {
        match self {
            NumericField::BaseMsrp => COL_BASE_MSRP,
            NumericField::ElectricRange => COL_ELECTRIC_RANGE,
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed dataset with pre-computed widget options.
///
/// Built once per load and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<Record>,
    /// Observed `[min, max]` model year.
    year_bounds: (i32, i32),
    /// Sorted distinct values, used to populate the filter widgets.
    vehicle_types: BTreeSet<String>,
    cities: BTreeSet<String>,
    makes: BTreeSet<String>,
}

impl Dataset {
    /// Build the dataset and its indices. Returns `None` for an empty input,
    /// since a dashboard without rows has no year range to offer.
    pub fn from_records(records: Vec<Record>) -> Option<Self> {
        let first_year = records.first()?.model_year;
        let mut year_bounds = (first_year, first_year);
        let mut vehicle_types = BTreeSet::new();
        let mut cities = BTreeSet::new();
        let mut makes = BTreeSet::new();

        for r in &records {
            year_bounds.0 = year_bounds.0.min(r.model_year);
            year_bounds.1 = year_bounds.1.max(r.model_year);
            if let Some(t) = &r.vehicle_type {
                vehicle_types.insert(t.clone());
            }
            if let Some(c) = &r.city {
                cities.insert(c.clone());
            }
            if let Some(m) = &r.make {
                makes.insert(m.clone());
            }
        }

        Some(Dataset {
            records,
            year_bounds,
            vehicle_types,
            cities,
            makes,
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false: `from_records` rejects an empty table.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn year_bounds(&self) -> (i32, i32) {
        self.year_bounds
    }

    pub fn vehicle_types(&self) -> &BTreeSet<String> {
        &self.vehicle_types
    }

    pub fn cities(&self) -> &BTreeSet<String> {
        &self.cities
    }

    pub fn makes(&self) -> &BTreeSet<String> {
        &self.makes
    }
}
