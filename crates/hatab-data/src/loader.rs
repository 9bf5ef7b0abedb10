//! The raw loader: CSV → [`RawTable`].
//!
//! Every non-empty cell is read as [`Scalar::Text`]; typing is left to the
//! quality pass. Ragged rows are tolerated.

use std::{fs::File, io::Read, path::Path};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike as _};
use hatab_core::table::{RawTable, Scalar};

use crate::{Error, Result};

const TIMESTAMP: &str = "timestamp";
const DATE: &str = "date";
const HOUR: &str = "hour";

/// Read a headed CSV document into a table called `name`.
pub fn read_csv<R: Read>(name: &str, reader: R) -> Result<RawTable> {
  let csv_err = |source| Error::Csv { table: name.to_owned(), source };

  let mut rdr = csv::ReaderBuilder::new()
    .has_headers(true)
    .flexible(true)
    .trim(csv::Trim::All)
    .from_reader(reader);

  let columns: Vec<String> = rdr
    .headers()
    .map_err(csv_err)?
    .iter()
    .map(str::to_owned)
    .collect();

  let mut table = RawTable::new(name, columns);
  for record in rdr.records() {
    let record = record.map_err(csv_err)?;
    table.push_row(
      record
        .iter()
        .map(|cell| {
          if cell.is_empty() {
            Scalar::Missing
          } else {
            Scalar::Text(cell.to_owned())
          }
        })
        .collect(),
    );
  }

  derive_calendar(&mut table);
  Ok(table)
}

/// Open `path` and read it with [`read_csv`].
pub fn load_csv(name: &str, path: &Path) -> Result<RawTable> {
  let file = File::open(path).map_err(|source| Error::Io { path: path.to_owned(), source })?;
  let table = read_csv(name, file)?;
  tracing::info!(
    table = name,
    path = %path.display(),
    rows = table.len(),
    columns = table.columns.len(),
    "loaded source table"
  );
  Ok(table)
}

/// Parse a timestamp into its calendar date and hour of day.
fn parse_timestamp(s: &str) -> Option<(NaiveDate, u32)> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    let naive = dt.naive_local();
    return Some((naive.date(), naive.hour()));
  }
  for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
      return Some((dt.date(), dt.hour()));
    }
  }
  NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(|d| (d, 0))
}

/// Add whichever of `date` and `hour` the table lacks from `timestamp`.
fn derive_calendar(table: &mut RawTable) {
  let Some(ts) = table.column_index(TIMESTAMP) else {
    return;
  };
  let date = !table.has_column(DATE);
  let hour = !table.has_column(HOUR);
  if !date && !hour {
    return;
  }

  if date {
    table.columns.push(DATE.to_owned());
  }
  if hour {
    table.columns.push(HOUR.to_owned());
  }
  let mut unparsed = 0usize;
  for row in &mut table.rows {
    let parsed = match &row[ts] {
      Scalar::Text(s) => parse_timestamp(s),
      _ => None,
    };
    if parsed.is_none() {
      unparsed += 1;
    }
    if date {
      row.push(
        parsed
          .map(|(d, _)| Scalar::Text(d.format("%Y-%m-%d").to_string()))
          .unwrap_or(Scalar::Missing),
      );
    }
    if hour {
      row.push(
        parsed
          .map(|(_, h)| Scalar::Text(h.to_string()))
          .unwrap_or(Scalar::Missing),
      );
    }
  }
  if unparsed > 0 {
    tracing::warn!(table = %table.name, unparsed, "timestamps without a calendar date");
  }
}
