//! The aggregation builder.
//!
//! [`build`] turns one cleaned table into one [`AggregationTable`] per
//! declared [`Level`]. Every level is recomputed from the raw rows at its own
//! granularity; nothing is derived from a finer table. Measures are
//! aggregated per group and KPI formulas are then evaluated over the group's
//! measures, so ratio KPIs are ratios of sums at every level and a finer
//! table re-aggregated by a coarser key reproduces the coarser table.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::{
  Error, Result,
  expr::{Expr, lit},
  level::{Dimension, Filter, Level},
  table::RawTable,
};

// ─── Specification ───────────────────────────────────────────────────────────

/// How a measure's per-row values are combined within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agg {
  Sum,
  /// Simple average over the rows that have a value.
  Mean,
  Max,
  /// Number of rows that have a value.
  Count,
}

impl Agg {
  /// Whether group values can be added across groups to reproduce the value
  /// of their union.
  pub fn is_additive(self) -> bool { matches!(self, Self::Sum | Self::Count) }
}

/// A per-group aggregate of a row-level expression over source columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
  pub name: String,
  pub expr: Expr,
  pub agg:  Agg,
}

impl Measure {
  pub fn sum(name: impl Into<String>, expr: Expr) -> Self {
    Self { name: name.into(), expr, agg: Agg::Sum }
  }

  pub fn mean(name: impl Into<String>, expr: Expr) -> Self {
    Self { name: name.into(), expr, agg: Agg::Mean }
  }

  pub fn max(name: impl Into<String>, expr: Expr) -> Self {
    Self { name: name.into(), expr, agg: Agg::Max }
  }

  /// Row count of each group.
  pub fn count(name: impl Into<String>) -> Self {
    Self { name: name.into(), expr: lit(1.0), agg: Agg::Count }
  }
}

/// A formula over measure names (and earlier KPIs), evaluated per group.
#[derive(Debug, Clone, PartialEq)]
pub struct Kpi {
  pub name: String,
  pub expr: Expr,
}

impl Kpi {
  pub fn new(name: impl Into<String>, expr: Expr) -> Self {
    Self { name: name.into(), expr }
  }
}

/// Everything needed to build a domain's aggregation tables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregationSpec {
  /// From most to least granular.
  pub levels:   Vec<Level>,
  /// Rows for which this evaluates to `0` or to no value are excluded.
  pub filter:   Option<Expr>,
  pub measures: Vec<Measure>,
  pub kpis:     Vec<Kpi>,
}

impl AggregationSpec {
  /// Check every column reference against `table` before any work is done.
  pub fn validate(&self, table: &RawTable) -> Result<()> {
    let mut names: HashSet<&str> = HashSet::new();
    for name in self
      .measures
      .iter()
      .map(|m| m.name.as_str())
      .chain(self.kpis.iter().map(|k| k.name.as_str()))
    {
      if !names.insert(name) {
        return Err(Error::DuplicateColumn(name.to_owned()));
      }
    }

    let unknown = |context: String, column: &str| Error::UnknownColumn {
      context,
      column: column.to_owned(),
    };

    for level in &self.levels {
      for dim in level.dimensions() {
        if !table.has_column(dim.column()) {
          return Err(unknown(format!("level {level}"), dim.column()));
        }
      }
    }
    if let Some(filter) = &self.filter
      && let Some(column) = filter.columns().into_iter().find(|c| !table.has_column(c))
    {
      return Err(unknown(format!("filter on {}", table.name), column));
    }
    for measure in &self.measures {
      if let Some(column) = measure.expr.columns().into_iter().find(|c| !table.has_column(c)) {
        return Err(unknown(format!("measure {}", measure.name), column));
      }
    }

    let mut visible: HashSet<&str> = self.measures.iter().map(|m| m.name.as_str()).collect();
    for kpi in &self.kpis {
      if let Some(column) = kpi.expr.columns().into_iter().find(|c| !visible.contains(c)) {
        return Err(unknown(format!("kpi {}", kpi.name), column));
      }
      visible.insert(&kpi.name);
    }
    Ok(())
  }
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// One group of an aggregation level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationRow {
  /// One value per level dimension, in [`Level::dimensions`] order.
  pub key:    Vec<String>,
  /// One value per table column, in [`AggregationTable::columns`] order.
  pub values: Vec<f64>,
}

/// All groups of one level: measure columns first, then KPI columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationTable {
  pub level:   Level,
  pub columns: Vec<String>,
  pub rows:    Vec<AggregationRow>,
  #[serde(skip)]
  aggs:        Vec<Agg>,
  #[serde(skip)]
  kpis:        Vec<Kpi>,
}

impl AggregationTable {
  /// A table with the given shape and no rows.
  pub fn empty(level: Level, spec: &AggregationSpec) -> Self {
    Self {
      level,
      columns: spec
        .measures
        .iter()
        .map(|m| m.name.clone())
        .chain(spec.kpis.iter().map(|k| k.name.clone()))
        .collect(),
      rows: Vec::new(),
      aggs: spec.measures.iter().map(|m| m.agg).collect(),
      kpis: spec.kpis.clone(),
    }
  }

  pub fn column_index(&self, column: &str) -> Option<usize> {
    self.columns.iter().position(|c| c == column)
  }

  /// Names of the measure columns whose values add up across groups.
  pub fn additive_columns(&self) -> impl Iterator<Item = &str> {
    self
      .columns
      .iter()
      .zip(&self.aggs)
      .filter(|(_, agg)| agg.is_additive())
      .map(|(c, _)| c.as_str())
  }

  pub fn value(&self, row: &AggregationRow, column: &str) -> Option<f64> {
    self.column_index(column).map(|i| row.values[i])
  }

  pub fn dimension<'a>(&self, row: &'a AggregationRow, dimension: Dimension) -> Option<&'a str> {
    self
      .level
      .position(dimension)
      .and_then(|i| row.key.get(i))
      .map(String::as_str)
  }

  /// Rows matching every term of `filter`; empty if nothing matches.
  pub fn filter(&self, filter: &Filter) -> Vec<&AggregationRow> {
    let Some(terms) = filter.resolve(self.level) else {
      return Vec::new();
    };
    self
      .rows
      .iter()
      .filter(|row| terms.iter().all(|(pos, value)| row.key[*pos] == *value))
      .collect()
  }

  /// Combine `rows` of this table into one row with an empty key.
  ///
  /// Sums and counts are added, maxima are maxed, and KPI formulas are
  /// re-evaluated over the combined measures. Means are averaged across the
  /// rows without weighting. Returns `None` for no rows.
  pub fn rollup(&self, rows: &[&AggregationRow]) -> Option<AggregationRow> {
    let (first, rest) = rows.split_first()?;
    let mut measures: Vec<f64> = first.values[..self.aggs.len()].to_vec();
    for row in rest {
      for (i, agg) in self.aggs.iter().enumerate() {
        let v = row.values[i];
        match agg {
          Agg::Sum | Agg::Count | Agg::Mean => measures[i] += v,
          Agg::Max => measures[i] = measures[i].max(v),
        }
      }
    }
    for (i, agg) in self.aggs.iter().enumerate() {
      if *agg == Agg::Mean {
        measures[i] /= rows.len() as f64;
      }
    }
    let values = self.with_kpis(measures);
    Some(AggregationRow { key: Vec::new(), values })
  }

  /// Append KPI values computed from `measures`.
  fn with_kpis(&self, mut values: Vec<f64>) -> Vec<f64> {
    for kpi in &self.kpis {
      let computed = kpi.expr.eval(&|name: &str| {
        self
          .column_index(name)
          .filter(|i| *i < values.len())
          .map(|i| values[i])
      });
      values.push(computed.unwrap_or(0.0));
    }
    values
  }
}

// ─── Builder ─────────────────────────────────────────────────────────────────

#[derive(Default, Clone)]
struct Acc {
  sum:   f64,
  count: usize,
  max:   Option<f64>,
}

impl Acc {
  fn push(&mut self, v: f64) {
    self.sum += v;
    self.count += 1;
    self.max = Some(self.max.map_or(v, |m| m.max(v)));
  }

  fn finish(&self, agg: Agg) -> f64 {
    match agg {
      Agg::Sum => self.sum,
      Agg::Count => self.count as f64,
      Agg::Mean if self.count == 0 => 0.0,
      Agg::Mean => self.sum / self.count as f64,
      Agg::Max => self.max.unwrap_or(0.0),
    }
  }
}

/// Build one [`AggregationTable`] per level of `spec` from `table`.
///
/// Rows excluded by the filter, or lacking a value for any dimension used by
/// any level, are left out of every level. Row order within each table is the
/// order in which each key first occurs.
pub fn build(table: &RawTable, spec: &AggregationSpec) -> Result<Vec<AggregationTable>> {
  spec.validate(table)?;

  let index: HashMap<&str, usize> = table
    .columns
    .iter()
    .enumerate()
    .map(|(i, c)| (c.as_str(), i))
    .collect();

  let mut dims: Vec<Dimension> = Vec::new();
  for level in &spec.levels {
    for dim in level.dimensions() {
      if !dims.contains(dim) {
        dims.push(*dim);
      }
    }
  }

  // Row-level work shared by all levels: filter, keys, measure inputs.
  struct Prepared {
    keys:   HashMap<Dimension, String>,
    inputs: Vec<Option<f64>>,
  }

  let mut prepared: Vec<Prepared> = Vec::with_capacity(table.len());
  let mut excluded = 0usize;
  for row in &table.rows {
    let lookup = |name: &str| index.get(name).and_then(|i| row[*i].as_f64());

    if let Some(filter) = &spec.filter
      && filter.eval(&lookup).is_none_or(|v| v == 0.0)
    {
      excluded += 1;
      continue;
    }

    let keys: Option<HashMap<Dimension, String>> = dims
      .iter()
      .map(|d| row[index[d.column()]].key_string().map(|k| (*d, k)))
      .collect();
    let Some(keys) = keys else {
      excluded += 1;
      continue;
    };

    let inputs = spec.measures.iter().map(|m| m.expr.eval(&lookup)).collect();
    prepared.push(Prepared { keys, inputs });
  }
  if excluded > 0 {
    tracing::debug!(table = %table.name, excluded, "rows excluded from aggregation");
  }

  let mut tables = Vec::with_capacity(spec.levels.len());
  for &level in &spec.levels {
    let mut positions: HashMap<Vec<String>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<String>, Vec<Acc>)> = Vec::new();

    for row in &prepared {
      let key: Vec<String> = level.dimensions().iter().map(|d| row.keys[d].clone()).collect();
      let slot = match positions.get(&key) {
        Some(&slot) => slot,
        None => {
          positions.insert(key.clone(), groups.len());
          groups.push((key, vec![Acc::default(); spec.measures.len()]));
          groups.len() - 1
        }
      };
      for (acc, input) in groups[slot].1.iter_mut().zip(&row.inputs) {
        if let Some(v) = input {
          acc.push(*v);
        }
      }
    }

    let mut out = AggregationTable::empty(level, spec);
    let rows: Vec<AggregationRow> = groups
      .into_iter()
      .map(|(key, accs)| {
        let measures = accs
          .iter()
          .zip(&spec.measures)
          .map(|(acc, m)| acc.finish(m.agg))
          .collect();
        AggregationRow { key, values: out.with_kpis(measures) }
      })
      .collect();
    out.rows = rows;

    tracing::info!(table = %table.name, level = %level, rows = out.rows.len(), "built aggregation level");
    tables.push(out);
  }

  Ok(tables)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{expr::col, table::Scalar};

  fn dc_table(rows: &[(&str, &str, &str, &str, f64, f64)]) -> RawTable {
    let mut t = RawTable::new(
      "dc",
      ["dc_id", "sku_id", "date", "hour", "opening_stock_units", "predicted_demand"]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    );
    for (dc, sku, date, hour, stock, demand) in rows {
      t.push_row(vec![
        Scalar::Text(dc.to_string()),
        Scalar::Text(sku.to_string()),
        Scalar::Text(date.to_string()),
        Scalar::Text(hour.to_string()),
        Scalar::Number(*stock),
        Scalar::Number(*demand),
      ]);
    }
    t
  }

  fn dc_spec() -> AggregationSpec {
    AggregationSpec {
      levels:   vec![Level::DcSkuDateHour, Level::DcSku, Level::Dc],
      filter:   None,
      measures: vec![
        Measure::sum("opening_stock_units", col("opening_stock_units")),
        Measure::sum("predicted_demand", col("predicted_demand")),
        Measure::count("records"),
      ],
      kpis:     vec![Kpi::new(
        "days_cover",
        col("opening_stock_units").safe_div(col("predicted_demand")),
      )],
    }
  }

  #[test]
  fn groups_in_first_occurrence_order() {
    let t = dc_table(&[
      ("DC_B", "S1", "2025-01-01", "0", 1.0, 1.0),
      ("DC_A", "S1", "2025-01-01", "0", 1.0, 1.0),
      ("DC_B", "S2", "2025-01-01", "1", 1.0, 1.0),
    ]);
    let tables = build(&t, &dc_spec()).unwrap();
    let dc = &tables[2];
    assert_eq!(dc.level, Level::Dc);
    let keys: Vec<&str> = dc.rows.iter().map(|r| r.key[0].as_str()).collect();
    assert_eq!(keys, ["DC_B", "DC_A"]);
    assert_eq!(dc.value(&dc.rows[0], "records"), Some(2.0));
  }

  #[test]
  fn ratios_are_ratios_of_sums() {
    let t = dc_table(&[
      ("DC_A", "S1", "2025-01-01", "0", 10.0, 5.0),
      ("DC_A", "S1", "2025-01-01", "1", 0.0, 15.0),
    ]);
    let tables = build(&t, &dc_spec()).unwrap();
    let sku = &tables[1];
    // (10 + 0) / (5 + 15), not the mean of 2.0 and 0.0.
    assert_eq!(sku.value(&sku.rows[0], "days_cover"), Some(0.5));
  }

  #[test]
  fn zero_demand_gives_zero_days_cover() {
    let t = dc_table(&[("DC_A", "S1", "2025-01-01", "0", 100.0, 0.0)]);
    let tables = build(&t, &dc_spec()).unwrap();
    let v = tables[0].value(&tables[0].rows[0], "days_cover").unwrap();
    assert!(v.is_finite());
    assert_eq!(v, 0.0);
  }

  #[test]
  fn filter_excludes_rows() {
    let t = dc_table(&[
      ("DC_A", "S1", "2025-01-01", "0", 10.0, 5.0),
      ("DC_A", "S1", "2025-01-01", "1", 20.0, 5.0),
    ]);
    let mut spec = dc_spec();
    spec.filter = Some(col("hour").equals(lit(1.0)));
    let tables = build(&t, &spec).unwrap();
    assert_eq!(tables[2].value(&tables[2].rows[0], "opening_stock_units"), Some(20.0));
  }

  #[test]
  fn rows_missing_a_dimension_are_excluded_everywhere() {
    let mut t = dc_table(&[("DC_A", "S1", "2025-01-01", "0", 10.0, 5.0)]);
    t.push_row(vec![
      Scalar::Text("DC_A".into()),
      Scalar::Text("S1".into()),
      Scalar::Text("2025-01-01".into()),
      Scalar::Missing,
      Scalar::Number(99.0),
      Scalar::Number(1.0),
    ]);
    let tables = build(&t, &dc_spec()).unwrap();
    for table in &tables {
      assert_eq!(table.value(&table.rows[0], "opening_stock_units"), Some(10.0));
    }
  }

  #[test]
  fn unknown_measure_column_is_rejected() {
    let t = dc_table(&[]);
    let mut spec = dc_spec();
    spec.measures.push(Measure::sum("spoilage", col("spoilage_units")));
    let err = build(&t, &spec).unwrap_err();
    assert!(matches!(err, Error::UnknownColumn { ref column, .. } if column == "spoilage_units"));
  }

  #[test]
  fn kpi_may_only_reference_measures() {
    let t = dc_table(&[]);
    let mut spec = dc_spec();
    spec.kpis.push(Kpi::new("hourly", col("hour")));
    assert!(matches!(build(&t, &spec), Err(Error::UnknownColumn { .. })));
  }

  #[test]
  fn duplicate_names_are_rejected() {
    let t = dc_table(&[]);
    let mut spec = dc_spec();
    spec.kpis.push(Kpi::new("records", lit(1.0)));
    assert!(matches!(build(&t, &spec), Err(Error::DuplicateColumn(_))));
  }

  #[test]
  fn level_dimension_must_exist() {
    let t = dc_table(&[]);
    let mut spec = dc_spec();
    spec.levels.push(Level::Store);
    assert!(matches!(build(&t, &spec), Err(Error::UnknownColumn { .. })));
  }

  #[test]
  fn mean_and_max_measures() {
    let t = dc_table(&[
      ("DC_A", "S1", "2025-01-01", "0", 10.0, 4.0),
      ("DC_A", "S2", "2025-01-01", "0", 20.0, 8.0),
    ]);
    let spec = AggregationSpec {
      levels:   vec![Level::Dc],
      filter:   None,
      measures: vec![
        Measure::mean("avg_stock", col("opening_stock_units")),
        Measure::max("peak_demand", col("predicted_demand")),
      ],
      kpis:     vec![],
    };
    let tables = build(&t, &spec).unwrap();
    let row = &tables[0].rows[0];
    assert_eq!(tables[0].value(row, "avg_stock"), Some(15.0));
    assert_eq!(tables[0].value(row, "peak_demand"), Some(8.0));
  }

  #[test]
  fn rollup_matches_coarser_level() {
    let t = dc_table(&[
      ("DC_A", "S1", "2025-01-01", "0", 10.0, 5.0),
      ("DC_A", "S2", "2025-01-01", "0", 0.0, 15.0),
      ("DC_B", "S1", "2025-01-01", "0", 4.0, 4.0),
    ]);
    let tables = build(&t, &dc_spec()).unwrap();
    let sku = &tables[1];
    let rows = sku.filter(&Filter::new().with(Dimension::DcId, "DC_A"));
    let rolled = sku.rollup(&rows).unwrap();
    let dc = &tables[2];
    assert_eq!(rolled.values, dc.rows[0].values);
    assert!(sku.rollup(&[]).is_none());
  }
}
