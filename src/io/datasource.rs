//! File-based fake sensor reader
//!
//! Emulates the accelerometer, GPS, and parking sensors from three CSV
//! files. Rows are replayed in order and the reader cycles back to the
//! first row when a file is exhausted. Each sample is stamped with the
//! current time.
//!
//! Expected columns (with a header row):
//! - accelerometer: x, y, z
//! - gps: longitude, latitude
//! - parking: empty_count

use crate::domain::types::{AccelerometerData, GpsData, InputData, ParkingData};
use anyhow::{bail, Context};
use chrono::Utc;
use std::path::Path;
use tracing::info;

/// One CSV file loaded up front, replayed cyclically.
struct CsvCycle {
    rows: Vec<Vec<String>>,
    pos: usize,
}

impl CsvCycle {
    fn load(path: &Path) -> anyhow::Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("Failed to open data file {}", path.display()))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.with_context(|| format!("Failed to read row in {}", path.display()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        if rows.is_empty() {
            bail!("data file {} has no rows", path.display());
        }

        Ok(Self { rows, pos: 0 })
    }

    fn next_row(&mut self) -> &[String] {
        let row = &self.rows[self.pos];
        self.pos = (self.pos + 1) % self.rows.len();
        row
    }
}

fn field(row: &[String], idx: usize, name: &str) -> anyhow::Result<f64> {
    row.get(idx)
        .with_context(|| format!("missing {} column", name))?
        .parse::<f64>()
        .with_context(|| format!("invalid {} value", name))
}

pub struct FileDatasource {
    accelerometer: CsvCycle,
    gps: CsvCycle,
    parking: CsvCycle,
}

impl FileDatasource {
    pub fn new<P: AsRef<Path>>(
        accelerometer_path: P,
        gps_path: P,
        parking_path: P,
    ) -> anyhow::Result<Self> {
        let datasource = Self {
            accelerometer: CsvCycle::load(accelerometer_path.as_ref())?,
            gps: CsvCycle::load(gps_path.as_ref())?,
            parking: CsvCycle::load(parking_path.as_ref())?,
        };
        info!(
            accelerometer_rows = %datasource.accelerometer.rows.len(),
            gps_rows = %datasource.gps.rows.len(),
            parking_rows = %datasource.parking.rows.len(),
            "datasource_loaded"
        );
        Ok(datasource)
    }

    /// Read the next sampled instant, one row from each file.
    ///
    /// The parking reading shares the GPS fix taken at the same instant.
    pub fn read(&mut self) -> anyhow::Result<InputData> {
        let acc_row = self.accelerometer.next_row();
        let accelerometer = AccelerometerData {
            x: field(acc_row, 0, "x")?,
            y: field(acc_row, 1, "y")?,
            z: field(acc_row, 2, "z")?,
        };

        let gps_row = self.gps.next_row();
        let gps = GpsData {
            longitude: field(gps_row, 0, "longitude")?,
            latitude: field(gps_row, 1, "latitude")?,
        };

        let parking_row = self.parking.next_row();
        let parking = ParkingData { empty_count: field(parking_row, 0, "empty_count")?, gps };

        Ok(InputData { accelerometer, gps, parking, timestamp: Utc::now() })
    }
}
