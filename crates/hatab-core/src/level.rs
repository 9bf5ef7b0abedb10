//! Domains, dimensions, aggregation levels and dimension filters.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  table::{Scalar, format_number},
};

// ─── Domain ──────────────────────────────────────────────────────────────────

/// A source domain; one input table and one family of aggregation levels.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
  Factory,
  Dc,
  Store,
}

impl Domain {
  pub const ALL: [Domain; 3] = [Domain::Factory, Domain::Dc, Domain::Store];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Factory => "factory",
      Self::Dc => "dc",
      Self::Store => "store",
    }
  }

  /// Levels of this domain from most to least granular.
  pub fn levels(self) -> &'static [Level] {
    match self {
      Self::Factory => &[
        Level::FactoryLineDateHour,
        Level::FactoryLineDate,
        Level::FactoryLine,
        Level::Factory,
      ],
      Self::Dc => &[Level::DcSkuDateHour, Level::DcSku, Level::Dc],
      Self::Store => &[Level::StoreSkuDateHour, Level::StoreSku, Level::Store],
    }
  }
}

impl fmt::Display for Domain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Domain {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Domain::ALL
      .into_iter()
      .find(|d| d.as_str() == s)
      .ok_or_else(|| Error::UnknownDomain(s.to_owned()))
  }
}

// ─── Dimension ───────────────────────────────────────────────────────────────

/// A grouping column shared by the aggregation levels.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
  FactoryId,
  LineId,
  DcId,
  StoreId,
  SkuId,
  Date,
  Hour,
}

impl Dimension {
  pub const ALL: [Dimension; 7] = [
    Dimension::FactoryId,
    Dimension::LineId,
    Dimension::DcId,
    Dimension::StoreId,
    Dimension::SkuId,
    Dimension::Date,
    Dimension::Hour,
  ];

  /// The source column carrying this dimension.
  pub fn column(self) -> &'static str {
    match self {
      Self::FactoryId => "factory_id",
      Self::LineId => "line_id",
      Self::DcId => "dc_id",
      Self::StoreId => "store_id",
      Self::SkuId => "sku_id",
      Self::Date => "date",
      Self::Hour => "hour",
    }
  }
}

impl fmt::Display for Dimension {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.column()) }
}

impl FromStr for Dimension {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Dimension::ALL
      .into_iter()
      .find(|d| d.column() == s)
      .ok_or_else(|| Error::UnknownDimension(s.to_owned()))
  }
}

// ─── Level ───────────────────────────────────────────────────────────────────

/// One granularity of roll-up: a domain plus a fixed tuple of dimensions.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Level {
  FactoryLineDateHour,
  FactoryLineDate,
  FactoryLine,
  Factory,
  DcSkuDateHour,
  DcSku,
  Dc,
  StoreSkuDateHour,
  StoreSku,
  Store,
}

impl Level {
  pub const ALL: [Level; 10] = [
    Level::FactoryLineDateHour,
    Level::FactoryLineDate,
    Level::FactoryLine,
    Level::Factory,
    Level::DcSkuDateHour,
    Level::DcSku,
    Level::Dc,
    Level::StoreSkuDateHour,
    Level::StoreSku,
    Level::Store,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::FactoryLineDateHour => "factory_line_date_hour",
      Self::FactoryLineDate => "factory_line_date",
      Self::FactoryLine => "factory_line",
      Self::Factory => "factory",
      Self::DcSkuDateHour => "dc_sku_date_hour",
      Self::DcSku => "dc_sku",
      Self::Dc => "dc",
      Self::StoreSkuDateHour => "store_sku_date_hour",
      Self::StoreSku => "store_sku",
      Self::Store => "store",
    }
  }

  pub fn domain(self) -> Domain {
    match self {
      Self::FactoryLineDateHour | Self::FactoryLineDate | Self::FactoryLine | Self::Factory => {
        Domain::Factory
      }
      Self::DcSkuDateHour | Self::DcSku | Self::Dc => Domain::Dc,
      Self::StoreSkuDateHour | Self::StoreSku | Self::Store => Domain::Store,
    }
  }

  /// The key tuple of this level, in key order.
  pub fn dimensions(self) -> &'static [Dimension] {
    use Dimension::*;
    match self {
      Self::FactoryLineDateHour => &[FactoryId, LineId, Date, Hour],
      Self::FactoryLineDate => &[FactoryId, LineId, Date],
      Self::FactoryLine => &[FactoryId, LineId],
      Self::Factory => &[FactoryId],
      Self::DcSkuDateHour => &[DcId, SkuId, Date, Hour],
      Self::DcSku => &[DcId, SkuId],
      Self::Dc => &[DcId],
      Self::StoreSkuDateHour => &[StoreId, SkuId, Date, Hour],
      Self::StoreSku => &[StoreId, SkuId],
      Self::Store => &[StoreId],
    }
  }

  pub fn position(self, dimension: Dimension) -> Option<usize> {
    self.dimensions().iter().position(|d| *d == dimension)
  }
}

impl fmt::Display for Level {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Level {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Level::ALL
      .into_iter()
      .find(|l| l.as_str() == s)
      .ok_or_else(|| Error::UnknownLevel(s.to_owned()))
  }
}

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Exact-match restrictions on dimension values. An absent dimension means
/// no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
  terms: Vec<(Dimension, String)>,
}

impl Filter {
  pub fn new() -> Self { Self::default() }

  /// Add an exact-match term, replacing any earlier term on `dimension`.
  ///
  /// Numeric hour values are stored in key form, so `"03"` and `"3.0"` both
  /// match an hour of `3`.
  pub fn with(mut self, dimension: Dimension, value: impl Into<String>) -> Self {
    let mut value = value.into();
    if dimension == Dimension::Hour {
      if let Some(n) = Scalar::Text(value.clone()).as_f64() {
        value = format_number(n);
      }
    }
    self.terms.retain(|(d, _)| *d != dimension);
    self.terms.push((dimension, value));
    self
  }

  /// Add a term only if `value` is present.
  pub fn with_opt(self, dimension: Dimension, value: Option<&str>) -> Self {
    match value {
      Some(v) => self.with(dimension, v),
      None => self,
    }
  }

  /// Resolve the filter against `level` into `(key position, value)` pairs.
  ///
  /// Returns `None` if the filter restricts a dimension `level` does not
  /// carry; such a filter can match no row of that level.
  pub fn resolve(&self, level: Level) -> Option<Vec<(usize, &str)>> {
    self
      .terms
      .iter()
      .map(|(d, v)| level.position(*d).map(|pos| (pos, v.as_str())))
      .collect()
  }
}
