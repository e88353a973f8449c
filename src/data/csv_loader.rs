//! Spreadsheet (CSV export) importer for stock items

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::data::record::Record;
use crate::error::{GridError, GridResult};

/// Number of positional fields in an export row
const FIELD_COUNT: usize = 8;

pub struct CsvImporter;

impl CsvImporter {
    /// Load a header-less CSV file.
    ///
    /// Fields are positional: code, name, brand, car type, price, price code,
    /// date, quantity. Identifiers are assigned in file order starting at 0.
    /// A single bad row fails the whole import.
    pub fn load_file<P: AsRef<Path>>(path: P) -> GridResult<Vec<Record>> {
        let path = path.as_ref();
        info!(target: "import", "Loading spreadsheet {}", path.display());

        let file = File::open(path)
            .map_err(|e| GridError::ImportFailed(format!("{}: {}", path.display(), e)))?;
        Self::load_reader(file)
    }

    pub fn load_reader<R: Read>(reader: R) -> GridResult<Vec<Record>> {
        let start = Instant::now();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for (line, result) in reader.records().enumerate() {
            let record = result.map_err(|e| GridError::ImportFailed(e.to_string()))?;
            let row_number = line + 1;

            if record.len() < FIELD_COUNT {
                return Err(GridError::ImportFailed(format!(
                    "row {}: expected {} fields, found {}",
                    row_number,
                    FIELD_COUNT,
                    record.len()
                )));
            }

            rows.push(Record {
                id: rows.len() as i64,
                code: record[0].to_string(),
                name: record[1].to_string(),
                brand: record[2].to_string(),
                car_type: record[3].to_string(),
                price: parse_amount(&record[4], row_number, "price")?,
                price_code: record[5].to_string(),
                date: record[6].to_string(),
                quantity: parse_amount(&record[7], row_number, "quantity")?,
            });
        }

        debug!(target: "import", "Parsed {} rows in {:?}", rows.len(), start.elapsed());
        Ok(rows)
    }
}

/// Parse an integer that may carry thousands separators ("1,250,000")
fn parse_amount(field: &str, row_number: usize, column: &str) -> GridResult<i64> {
    field.trim().replace(',', "").parse().map_err(|e| {
        GridError::ImportFailed(format!(
            "row {}: invalid {} {:?}: {}",
            row_number, column, field, e
        ))
    })
}
