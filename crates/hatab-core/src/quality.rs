//! The data quality layer.
//!
//! [`clean`] is a pure transformation: it never mutates its input and never
//! fails on data content. Content problems are corrected per rule and tallied
//! in the [`QualityReport`]; only structural problems (a required column
//! absent from the source) are errors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  rules::{BelowMinimum, ColumnRule, OnMissing},
  table::{RawTable, Scalar},
};

/// Per-table record of what cleaning found and changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
  pub table:          String,
  pub original_rows:  usize,
  pub final_rows:     usize,
  pub rows_dropped:   usize,
  /// Missing cells in non-nullable columns. Zero counts are omitted.
  pub missing_values: BTreeMap<String, usize>,
  /// Cells that failed coercion or fell below the column minimum.
  pub invalid_values: BTreeMap<String, usize>,
  /// `1 − (missing + invalid) / (rows × checked columns)`, within `[0, 1]`.
  pub quality_score:  f64,
}

impl QualityReport {
  pub fn total_missing(&self) -> usize { self.missing_values.values().sum() }

  pub fn total_invalid(&self) -> usize { self.invalid_values.values().sum() }
}

/// Validate and clean `table` against `rules`.
///
/// Columns without a rule pass through untouched. Returns
/// [`Error::MissingColumn`] if a required rule column is absent.
pub fn clean(
  table: &RawTable,
  rules: &[ColumnRule],
) -> Result<(RawTable, QualityReport)> {
  let mut checked: Vec<(usize, &ColumnRule)> = Vec::with_capacity(rules.len());
  for rule in rules {
    match table.column_index(&rule.column) {
      Some(idx) => checked.push((idx, rule)),
      None if rule.required => {
        return Err(Error::MissingColumn {
          table:  table.name.clone(),
          column: rule.column.clone(),
        });
      }
      None => {}
    }
  }

  let mut missing: BTreeMap<String, usize> = BTreeMap::new();
  let mut invalid: BTreeMap<String, usize> = BTreeMap::new();
  let mut clipped: BTreeMap<&str, usize> = BTreeMap::new();
  let mut cleaned = RawTable::new(table.name.clone(), table.columns.clone());
  let mut rows_dropped = 0;

  for source_row in &table.rows {
    let mut row = source_row.clone();
    let mut drop_row = false;

    for &(idx, rule) in &checked {
      let cell = &mut row[idx];

      if cell.is_missing() {
        if !rule.nullable {
          *missing.entry(rule.column.clone()).or_default() += 1;
        }
      } else {
        match rule.kind.coerce(cell) {
          Some(value) => *cell = value,
          None => {
            *invalid.entry(rule.column.clone()).or_default() += 1;
            *cell = Scalar::Missing;
          }
        }

        if let (Some(minimum), Some(value)) = (rule.minimum, cell.as_f64())
          && value < minimum
        {
          *invalid.entry(rule.column.clone()).or_default() += 1;
          *clipped.entry(rule.column.as_str()).or_default() += 1;
          *cell = match rule.below_minimum {
            BelowMinimum::Clip => Scalar::Number(minimum),
            BelowMinimum::Null => Scalar::Missing,
          };
        }
      }

      if cell.is_missing() && rule.on_missing == OnMissing::DropRow {
        drop_row = true;
      }
    }

    if drop_row {
      rows_dropped += 1;
    } else {
      cleaned.rows.push(row);
    }
  }

  for (column, count) in &clipped {
    tracing::warn!(table = %table.name, column, count, "replaced values below minimum");
  }
  if rows_dropped > 0 {
    tracing::warn!(table = %table.name, rows_dropped, "dropped rows missing key values");
  }

  let original_rows = table.rows.len();
  let checked_cells = original_rows * checked.len();
  let defects: usize = missing.values().sum::<usize>() + invalid.values().sum::<usize>();
  let quality_score = if checked_cells == 0 {
    1.0
  } else {
    (1.0 - defects as f64 / checked_cells as f64).clamp(0.0, 1.0)
  };

  let report = QualityReport {
    table: table.name.clone(),
    original_rows,
    final_rows: cleaned.rows.len(),
    rows_dropped,
    missing_values: missing,
    invalid_values: invalid,
    quality_score,
  };

  Ok((cleaned, report))
}
