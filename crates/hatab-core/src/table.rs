//! Raw tabular data as loaded from a source file.
//!
//! A [`RawTable`] is deliberately untyped: the loader produces only
//! [`Scalar::Text`] and [`Scalar::Missing`] cells, and the data quality layer
//! coerces rule-covered columns into their declared types.

use serde::{Deserialize, Serialize};

// ─── Scalar ──────────────────────────────────────────────────────────────────

/// A single dynamically-typed cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
  Text(String),
  Number(f64),
  Missing,
}

impl Scalar {
  pub fn is_missing(&self) -> bool { matches!(self, Self::Missing) }

  /// Numeric view of the cell. Text is parsed on demand so untyped columns
  /// can still feed expressions.
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Self::Number(n) if n.is_finite() => Some(*n),
      Self::Number(_) | Self::Missing => None,
      Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
    }
  }

  /// Canonical key form used for grouping and filtering.
  ///
  /// Integral numbers are rendered without a fractional part so that an
  /// `hour` of `3.0` and a filter value of `"3"` compare equal.
  pub fn key_string(&self) -> Option<String> {
    match self {
      Self::Missing => None,
      Self::Text(s) => Some(s.clone()),
      Self::Number(n) => Some(format_number(*n)),
    }
  }
}

pub(crate) fn format_number(n: f64) -> String {
  if n.fract() == 0.0 && n.abs() < 1e15 {
    format!("{}", n as i64)
  } else {
    n.to_string()
  }
}

// ─── Table ───────────────────────────────────────────────────────────────────

/// An ordered sequence of rows sharing one header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
  pub name:    String,
  pub columns: Vec<String>,
  pub rows:    Vec<Vec<Scalar>>,
}

impl RawTable {
  pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
    Self {
      name: name.into(),
      columns,
      rows: Vec::new(),
    }
  }

  /// Append a row, padding short rows with [`Scalar::Missing`] and dropping
  /// cells beyond the header width.
  pub fn push_row(&mut self, mut row: Vec<Scalar>) {
    row.resize(self.columns.len(), Scalar::Missing);
    self.rows.push(row);
  }

  pub fn column_index(&self, column: &str) -> Option<usize> {
    self.columns.iter().position(|c| c == column)
  }

  pub fn has_column(&self, column: &str) -> bool {
    self.column_index(column).is_some()
  }

  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  /// Iterate over a single column's cells.
  pub fn column(&self, column: &str) -> Option<impl Iterator<Item = &Scalar>> {
    let idx = self.column_index(column)?;
    Some(self.rows.iter().map(move |r| &r[idx]))
  }
}
