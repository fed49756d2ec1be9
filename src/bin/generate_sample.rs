//! Writes a synthetic registration table for trying out the dashboard.
//!
//! `generate_sample [OUTPUT] [ROWS]`; the output format follows the extension
//! (`.csv` or `.parquet`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Index drawn proportionally to `weights`.
    fn weighted(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        let mut pick = self.next_f64() * total;
        for (i, w) in weights.iter().enumerate() {
            if pick < *w {
                return i;
            }
            pick -= w;
        }
        weights.len() - 1
    }
}

/// (city, relative weight)
const CITIES: &[(&str, f64)] = &[
    ("Seattle", 30.0),
    ("Bellevue", 10.0),
    ("Redmond", 7.0),
    ("Vancouver", 7.0),
    ("Bothell", 5.0),
    ("Kirkland", 5.0),
    ("Sammamish", 4.0),
    ("Renton", 4.0),
    ("Olympia", 4.0),
    ("Tacoma", 4.0),
    ("Kent", 3.0),
    ("Spokane", 3.0),
    ("Yakima", 1.0),
];

/// (make, vehicle type, base MSRP when known, electric range, weight)
const MODELS: &[(&str, &str, Option<f64>, f64, f64)] = &[
    ("TESLA", "Battery Electric Vehicle (BEV)", Some(69900.0), 291.0, 40.0),
    ("NISSAN", "Battery Electric Vehicle (BEV)", Some(31950.0), 150.0, 8.0),
    ("CHEVROLET", "Battery Electric Vehicle (BEV)", Some(36620.0), 238.0, 7.0),
    ("KIA", "Battery Electric Vehicle (BEV)", None, 239.0, 5.0),
    ("FORD", "Plug-in Hybrid Electric Vehicle (PHEV)", Some(32995.0), 21.0, 5.0),
    ("BMW", "Plug-in Hybrid Electric Vehicle (PHEV)", Some(43700.0), 14.0, 4.0),
    ("TOYOTA", "Plug-in Hybrid Electric Vehicle (PHEV)", None, 42.0, 4.0),
    ("JEEP", "Plug-in Hybrid Electric Vehicle (PHEV)", None, 21.0, 3.0),
    ("VOLVO", "Plug-in Hybrid Electric Vehicle (PHEV)", Some(52900.0), 19.0, 2.0),
    ("PORSCHE", "Battery Electric Vehicle (BEV)", Some(184400.0), 203.0, 1.0),
];

#[derive(Parser)]
#[command(about = "Write a synthetic electric vehicle registration table")]
struct Args {
    /// Output file, `.csv` or `.parquet`
    #[arg(default_value = "sample_ev_data.csv")]
    output: PathBuf,
    /// Number of registrations
    #[arg(default_value_t = 5000)]
    rows: usize,
}

const FIRST_YEAR: i64 = 2011;
const LAST_YEAR: i64 = 2024;

struct Row {
    vin: String,
    city: String,
    year: i64,
    make: String,
    vehicle_type: String,
    range: Option<f64>,
    msrp: Option<f64>,
}

fn generate(rows: usize, rng: &mut SimpleRng) -> Vec<Row> {
    let city_weights: Vec<f64> = CITIES.iter().map(|c| c.1).collect();
    let model_weights: Vec<f64> = MODELS.iter().map(|m| m.4).collect();
    // Registrations grow roughly quadratically with the model year.
    let year_weights: Vec<f64> = (FIRST_YEAR..=LAST_YEAR)
        .map(|y| ((y - FIRST_YEAR + 1) as f64).powi(2))
        .collect();

    (0..rows)
        .map(|i| {
            let (make, vehicle_type, msrp, range, _) = MODELS[rng.weighted(&model_weights)];
            let year = FIRST_YEAR + rng.weighted(&year_weights) as i64;
            // Newer cars are mostly registered without a MSRP in the source data.
            let msrp = msrp.filter(|_| year < 2021 || rng.next_f64() < 0.1);
            let range = Some(range).filter(|_| rng.next_f64() > 0.05);
            Row {
                vin: format!("{:010X}", (i as u64).wrapping_mul(2654435761) & 0xFF_FFFF_FFFF),
                city: CITIES[rng.weighted(&city_weights)].0.to_string(),
                year,
                make: make.to_string(),
                vehicle_type: vehicle_type.to_string(),
                range,
                msrp,
            }
        })
        .collect()
}

fn write_csv(path: &Path, rows: &[Row]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    writer.write_record([
        "VIN (1-10)",
        "City",
        "State",
        "Model Year",
        "Make",
        "Electric Vehicle Type",
        "Electric Range",
        "Base MSRP",
    ])?;
    let number = |v: Option<f64>| v.map(|n| format!("{n:.0}")).unwrap_or_default();
    for r in rows {
        writer.write_record([
            r.vin.clone(),
            r.city.clone(),
            "WA".to_string(),
            r.year.to_string(),
            r.make.clone(),
            r.vehicle_type.clone(),
            number(r.range),
            number(r.msrp),
        ])?;
    }
    writer.flush().context("flushing CSV file")?;
    Ok(())
}

fn string_column<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    Arc::new(StringArray::from(values.collect::<Vec<_>>()))
}

fn write_parquet(path: &Path, rows: &[Row]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("VIN (1-10)", DataType::Utf8, false),
        Field::new("City", DataType::Utf8, false),
        Field::new("State", DataType::Utf8, false),
        Field::new("Model Year", DataType::Int64, false),
        Field::new("Make", DataType::Utf8, false),
        Field::new("Electric Vehicle Type", DataType::Utf8, false),
        Field::new("Electric Range", DataType::Float64, true),
        Field::new("Base MSRP", DataType::Float64, true),
    ]));

    let years: ArrayRef = Arc::new(Int64Array::from(
        rows.iter().map(|r| r.year).collect::<Vec<_>>(),
    ));
    let ranges: ArrayRef = Arc::new(Float64Array::from(
        rows.iter().map(|r| r.range).collect::<Vec<_>>(),
    ));
    let msrps: ArrayRef = Arc::new(Float64Array::from(
        rows.iter().map(|r| r.msrp).collect::<Vec<_>>(),
    ));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            string_column(rows.iter().map(|r| r.vin.as_str())),
            string_column(rows.iter().map(|r| r.city.as_str())),
            string_column(rows.iter().map(|_| "WA")),
            years,
            string_column(rows.iter().map(|r| r.make.as_str())),
            string_column(rows.iter().map(|r| r.vehicle_type.as_str())),
            ranges,
            msrps,
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating Parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut rng = SimpleRng::new(42);
    let data = generate(args.rows, &mut rng);
    let path = args.output.as_path();

    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => write_csv(path, &data)?,
        Some("parquet") | Some("pq") => write_parquet(path, &data)?,
        _ => bail!("output must end in .csv or .parquet: {}", path.display()),
    }

    println!("Wrote {} registrations to {}", data.len(), path.display());
    Ok(())
}
