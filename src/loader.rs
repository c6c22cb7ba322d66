use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{DemandError, Result};
use crate::model::{Observation, DEFAULT_CATALOG, DEFAULT_DATE_COLUMN};

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M"];

/// Column layout of the wide sales table.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLayout {
    pub date_column: String,
    pub medicines: Vec<String>,
}

impl Default for SourceLayout {
    fn default() -> Self {
        SourceLayout {
            date_column: DEFAULT_DATE_COLUMN.to_string(),
            medicines: DEFAULT_CATALOG.iter().map(|m| m.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Csv(PathBuf),
    Sqlite { path: PathBuf, table: String },
}

/// Raw daily sales in long form, one date-sorted series per medicine.
#[derive(Debug, Clone)]
pub struct TimeSeriesStore {
    series: BTreeMap<String, Vec<Observation>>,
}

impl TimeSeriesStore {
    pub fn load(source: &DataSource, layout: &SourceLayout) -> Result<Self> {
        let store = match source {
            DataSource::Csv(path) => Self::from_csv_path(path, layout)?,
            DataSource::Sqlite { path, table } => Self::from_sqlite_path(path, table, layout)?,
        };

        info!(
            medicines = store.series.len(),
            observations = store.observation_count(),
            "loaded sales history"
        );
        Ok(store)
    }

    pub fn from_csv_path(path: impl AsRef<Path>, layout: &SourceLayout) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            DemandError::DataLoad(format!("cannot open {}: {}", path.display(), e))
        })?;
        Self::from_csv_reader(file, layout)
    }

    pub fn from_csv_reader<R: Read>(reader: R, layout: &SourceLayout) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(String::from).collect();
        let mut reshaper = Reshaper::new(layout, &headers)?;

        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            let cells: Vec<Cell> = record.iter().map(Cell::Text).collect();
            // +2: header line, 1-based
            reshaper.push_row(i + 2, &cells)?;
        }

        reshaper.finish()
    }

    pub fn from_sqlite_path(
        path: impl AsRef<Path>,
        table: &str,
        layout: &SourceLayout,
    ) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_sqlite(&conn, table, layout)
    }

    pub fn from_sqlite(conn: &Connection, table: &str, layout: &SourceLayout) -> Result<Self> {
        if !is_identifier(table) {
            return Err(DemandError::DataLoad(format!(
                "invalid table name '{}'",
                table
            )));
        }

        let mut stmt = conn.prepare(&format!("SELECT * FROM \"{}\"", table))?;
        let headers: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = headers.len();
        let mut reshaper = Reshaper::new(layout, &headers)?;

        let mut rows = stmt.query([])?;
        let mut row_number = 0;
        while let Some(row) = rows.next()? {
            row_number += 1;
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                cells.push(Cell::from_sql(row.get_ref(i)?)?);
            }
            reshaper.push_row(row_number, &cells)?;
        }

        reshaper.finish()
    }

    pub fn series_for(&self, medicine_id: &str) -> Result<&[Observation]> {
        self.series
            .get(medicine_id)
            .map(|s| s.as_slice())
            .ok_or_else(|| DemandError::UnknownMedicine(medicine_id.to_string()))
    }

    /// Catalog, sorted ascending.
    pub fn all_medicine_ids(&self) -> Vec<String> {
        self.series.keys().cloned().collect()
    }

    pub fn series(&self) -> &BTreeMap<String, Vec<Observation>> {
        &self.series
    }

    pub fn observation_count(&self) -> usize {
        self.series.values().map(|s| s.len()).sum()
    }
}

enum Cell<'a> {
    Missing,
    Number(f64),
    Text(&'a str),
}

impl<'a> Cell<'a> {
    fn from_sql(value: ValueRef<'a>) -> Result<Self> {
        Ok(match value {
            ValueRef::Null => Cell::Missing,
            ValueRef::Integer(i) => Cell::Number(i as f64),
            ValueRef::Real(f) => Cell::Number(f),
            ValueRef::Text(bytes) => Cell::Text(std::str::from_utf8(bytes).map_err(|e| {
                DemandError::DataLoad(format!("non utf-8 text cell: {}", e))
            })?),
            ValueRef::Blob(_) => {
                return Err(DemandError::DataLoad("unexpected blob cell".to_string()))
            }
        })
    }
}

/// Turns wide rows (date + one column per medicine) into per-medicine series.
struct Reshaper {
    date_idx: usize,
    columns: Vec<(String, usize)>,
    series: BTreeMap<String, Vec<Observation>>,
    rows: usize,
}

impl Reshaper {
    fn new(layout: &SourceLayout, headers: &[String]) -> Result<Self> {
        let date_idx = column_index(headers, &layout.date_column)?;

        let mut columns = Vec::with_capacity(layout.medicines.len());
        for medicine in &layout.medicines {
            columns.push((medicine.clone(), column_index(headers, medicine)?));
        }

        Ok(Reshaper {
            date_idx,
            columns,
            series: BTreeMap::new(),
            rows: 0,
        })
    }

    fn push_row(&mut self, row_number: usize, cells: &[Cell]) -> Result<()> {
        let date = match cells.get(self.date_idx) {
            Some(Cell::Text(raw)) => parse_date(raw).ok_or_else(|| {
                DemandError::DataLoad(format!("row {}: invalid date '{}'", row_number, raw))
            })?,
            _ => {
                return Err(DemandError::DataLoad(format!(
                    "row {}: missing or non-text date",
                    row_number
                )))
            }
        };

        for (medicine, idx) in &self.columns {
            let sales = match cells.get(*idx) {
                None | Some(Cell::Missing) => f64::NAN,
                Some(Cell::Number(n)) => *n,
                Some(Cell::Text(raw)) if raw.is_empty() => f64::NAN,
                Some(Cell::Text(raw)) => raw.parse::<f64>().map_err(|_| {
                    DemandError::DataLoad(format!(
                        "row {}: column {}: invalid sales value '{}'",
                        row_number, medicine, raw
                    ))
                })?,
            };

            self.series
                .entry(medicine.clone())
                .or_default()
                .push(Observation {
                    medicine_id: medicine.clone(),
                    date,
                    sales,
                });
        }

        self.rows += 1;
        Ok(())
    }

    fn finish(mut self) -> Result<TimeSeriesStore> {
        if self.rows == 0 {
            return Err(DemandError::DataLoad("source contains no rows".to_string()));
        }

        for (medicine, series) in self.series.iter_mut() {
            series.sort_by_key(|o| o.date);
            debug!(medicine = %medicine, rows = series.len(), "reshaped series");
        }

        Ok(TimeSeriesStore {
            series: self.series,
        })
    }
}

fn column_index(headers: &[String], name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| DemandError::DataLoad(format!("missing column '{}'", name)))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
                .map(|dt| dt.date())
        })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
