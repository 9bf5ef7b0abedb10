//! Declarative per-column validation rules.
//!
//! Rules are plain data so they can be declared in code by the domain catalog
//! or replaced wholesale from configuration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::table::{Scalar, format_number};

/// The type a column's cells are coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
  Text,
  Number,
  Integer,
  /// A calendar date, normalised to `YYYY-MM-DD`.
  Date,
}

impl ColumnKind {
  /// Coerce a present cell. Returns `None` on a coercion failure.
  pub fn coerce(self, cell: &Scalar) -> Option<Scalar> {
    match (self, cell) {
      (_, Scalar::Missing) => Some(Scalar::Missing),
      (Self::Text, Scalar::Text(_)) => Some(cell.clone()),
      (Self::Text, Scalar::Number(n)) => Some(Scalar::Text(format_number(*n))),
      (Self::Number, _) => cell.as_f64().map(Scalar::Number),
      (Self::Integer, _) => cell
        .as_f64()
        .filter(|n| n.fract() == 0.0)
        .map(Scalar::Number),
      (Self::Date, Scalar::Text(s)) => parse_date(s)
        .map(|d| Scalar::Text(d.format("%Y-%m-%d").to_string())),
      (Self::Date, Scalar::Number(_)) => None,
    }
  }
}

/// Accepts a bare date or any timestamp whose first ten characters are one.
fn parse_date(s: &str) -> Option<NaiveDate> {
  let s = s.trim();
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .ok()
    .or_else(|| s.get(..10).and_then(|p| NaiveDate::parse_from_str(p, "%Y-%m-%d").ok()))
}

/// What to do with a value below the column minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BelowMinimum {
  /// Replace with the minimum.
  #[default]
  Clip,
  /// Replace with a missing value.
  Null,
}

/// What to do with a row whose cell in this column is missing after
/// coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnMissing {
  #[default]
  Keep,
  DropRow,
}

fn default_true() -> bool { true }

/// Validation rule for a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRule {
  pub column:        String,
  pub kind:          ColumnKind,
  #[serde(default = "default_true")]
  pub nullable:      bool,
  #[serde(default)]
  pub minimum:       Option<f64>,
  #[serde(default)]
  pub below_minimum: BelowMinimum,
  #[serde(default)]
  pub on_missing:    OnMissing,
  /// If `true`, the column must be present in the source table.
  #[serde(default = "default_true")]
  pub required:      bool,
}

impl ColumnRule {
  pub fn new(column: impl Into<String>, kind: ColumnKind) -> Self {
    Self {
      column: column.into(),
      kind,
      nullable: true,
      minimum: None,
      below_minimum: BelowMinimum::Clip,
      on_missing: OnMissing::Keep,
      required: true,
    }
  }

  pub fn text(column: impl Into<String>) -> Self { Self::new(column, ColumnKind::Text) }

  pub fn number(column: impl Into<String>) -> Self { Self::new(column, ColumnKind::Number) }

  pub fn integer(column: impl Into<String>) -> Self { Self::new(column, ColumnKind::Integer) }

  pub fn date(column: impl Into<String>) -> Self { Self::new(column, ColumnKind::Date) }

  /// Values below `minimum` are clipped up to it.
  pub fn min(mut self, minimum: f64) -> Self {
    self.minimum = Some(minimum);
    self
  }

  pub fn below_minimum(mut self, policy: BelowMinimum) -> Self {
    self.below_minimum = policy;
    self
  }

  pub fn not_null(mut self) -> Self {
    self.nullable = false;
    self
  }

  /// Non-nullable, and rows missing this value are dropped.
  pub fn key(mut self) -> Self {
    self.nullable = false;
    self.on_missing = OnMissing::DropRow;
    self
  }

  pub fn optional(mut self) -> Self {
    self.required = false;
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn date_accepts_timestamp_prefix() {
    let cell = Scalar::Text("2025-01-01 13:00:00".into());
    assert_eq!(
      ColumnKind::Date.coerce(&cell),
      Some(Scalar::Text("2025-01-01".into()))
    );
    assert_eq!(ColumnKind::Date.coerce(&Scalar::Text("soon".into())), None);
  }

  #[test]
  fn integer_rejects_fractions() {
    assert_eq!(
      ColumnKind::Integer.coerce(&Scalar::Text("4".into())),
      Some(Scalar::Number(4.0))
    );
    assert_eq!(ColumnKind::Integer.coerce(&Scalar::Text("4.5".into())), None);
  }

  #[test]
  fn rule_deserialises_with_defaults() {
    let rule: ColumnRule =
      serde_json::from_str(r#"{"column":"scrap_qty","kind":"number","minimum":0}"#)
        .unwrap();
    assert!(rule.nullable);
    assert!(rule.required);
    assert_eq!(rule.minimum, Some(0.0));
    assert_eq!(rule.below_minimum, BelowMinimum::Clip);
    assert_eq!(rule.on_missing, OnMissing::Keep);
  }
}
