//! Read-only KPI services over a [`KpiSource`].
//!
//! Every domain uses the same level selection for an optional node id and an
//! optional line/SKU id:
//!
//! | node id | line/SKU id | level                     | filter     |
//! |---------|-------------|---------------------------|------------|
//! | yes     | yes         | middle (`*_line`/`*_sku`) | both       |
//! | yes     | no          | node                      | node id    |
//! | no      | yes         | middle                    | line/SKU   |
//! | no      | no          | node                      | none       |
//!
//! Summaries roll the selected rows up with [`AggregationTable::rollup`], so
//! ratios are always ratios of sums.

use crate::{
  aggregate::{AggregationRow, AggregationTable},
  kpi::{
    DaysCover, DcKpiRow, DcKpis, DcMetrics, FactoryKpiRow, FactoryKpis, FactoryMetrics,
    GlobalKpis, HealthStatus, NodeHealth, NodeType, ShelfPerformance, StoreKpiRow, StoreKpis,
    StoreMetrics, round_to,
  },
  level::{Dimension, Domain, Filter, Level},
  quality::QualityReport,
  source::KpiSource,
};

/// Pick the level and filter for an optional node id and line/SKU id.
fn select(
  node: (Level, Dimension, Option<&str>),
  middle: (Level, Dimension, Option<&str>),
) -> (Level, Filter) {
  let (node_level, node_dim, node_id) = node;
  let (middle_level, middle_dim, middle_id) = middle;
  let filter = Filter::new()
    .with_opt(node_dim, node_id)
    .with_opt(middle_dim, middle_id);
  let level = if middle_id.is_some() { middle_level } else { node_level };
  (level, filter)
}

fn selected<'a, S>(
  src: &'a S,
  (level, filter): (Level, Filter),
) -> Option<(&'a AggregationTable, Vec<&'a AggregationRow>)>
where
  S: KpiSource + ?Sized,
{
  let table = src.table(level)?;
  Some((table, src.get(level, &filter)))
}

/// Roll every row of `level` into one network-wide row.
fn network<S>(src: &S, level: Level) -> Option<(&AggregationTable, AggregationRow)>
where
  S: KpiSource + ?Sized,
{
  let table = src.table(level)?;
  let rows: Vec<&AggregationRow> = table.rows.iter().collect();
  table.rollup(&rows).map(|row| (table, row))
}

fn pct(numerator: f64, denominator: f64) -> f64 {
  if denominator == 0.0 { 0.0 } else { numerator / denominator * 100.0 }
}

// ─── Factory ─────────────────────────────────────────────────────────────────

fn factory_selection(factory_id: Option<&str>, line_id: Option<&str>) -> (Level, Filter) {
  select(
    (Level::Factory, Dimension::FactoryId, factory_id),
    (Level::FactoryLine, Dimension::LineId, line_id),
  )
}

pub fn factory_kpi_rows<S>(
  src: &S,
  factory_id: Option<&str>,
  line_id: Option<&str>,
) -> Vec<FactoryKpiRow>
where
  S: KpiSource + ?Sized,
{
  selected(src, factory_selection(factory_id, line_id))
    .map(|(table, rows)| rows.into_iter().map(|r| FactoryKpiRow::from_row(table, r)).collect())
    .unwrap_or_default()
}

pub fn factory_kpis<S>(src: &S, factory_id: Option<&str>, line_id: Option<&str>) -> FactoryKpis
where
  S: KpiSource + ?Sized,
{
  selected(src, factory_selection(factory_id, line_id))
    .and_then(|(table, rows)| table.rollup(&rows).map(|r| FactoryMetrics::from_row(table, &r)))
    .map(|m| FactoryKpis::from(&m))
    .unwrap_or_default()
}

// ─── DC ──────────────────────────────────────────────────────────────────────

fn dc_selection(dc_id: Option<&str>, sku_id: Option<&str>) -> (Level, Filter) {
  select(
    (Level::Dc, Dimension::DcId, dc_id),
    (Level::DcSku, Dimension::SkuId, sku_id),
  )
}

pub fn dc_kpi_rows<S>(src: &S, dc_id: Option<&str>, sku_id: Option<&str>) -> Vec<DcKpiRow>
where
  S: KpiSource + ?Sized,
{
  selected(src, dc_selection(dc_id, sku_id))
    .map(|(table, rows)| rows.into_iter().map(|r| DcKpiRow::from_row(table, r)).collect())
    .unwrap_or_default()
}

pub fn dc_kpis<S>(src: &S, dc_id: Option<&str>, sku_id: Option<&str>) -> DcKpis
where
  S: KpiSource + ?Sized,
{
  selected(src, dc_selection(dc_id, sku_id))
    .and_then(|(table, rows)| table.rollup(&rows).map(|r| DcMetrics::from_row(table, &r)))
    .map(|m| DcKpis::from(&m))
    .unwrap_or_default()
}

/// Days of cover per DC/SKU pair, always at SKU granularity.
pub fn dc_days_cover<S>(src: &S, dc_id: Option<&str>, sku_id: Option<&str>) -> Vec<DaysCover>
where
  S: KpiSource + ?Sized,
{
  let Some(table) = src.table(Level::DcSku) else {
    return Vec::new();
  };
  let filter = Filter::new()
    .with_opt(Dimension::DcId, dc_id)
    .with_opt(Dimension::SkuId, sku_id);
  src
    .get(Level::DcSku, &filter)
    .into_iter()
    .map(|row| {
      let row = DcKpiRow::from_row(table, row);
      DaysCover {
        dc_id:      row.dc_id,
        sku_id:     row.sku_id.unwrap_or_default(),
        days_cover: round_to(row.metrics.days_cover, 2),
      }
    })
    .collect()
}

// ─── Store ───────────────────────────────────────────────────────────────────

fn store_selection(store_id: Option<&str>, sku_id: Option<&str>) -> (Level, Filter) {
  select(
    (Level::Store, Dimension::StoreId, store_id),
    (Level::StoreSku, Dimension::SkuId, sku_id),
  )
}

pub fn store_kpi_rows<S>(src: &S, store_id: Option<&str>, sku_id: Option<&str>) -> Vec<StoreKpiRow>
where
  S: KpiSource + ?Sized,
{
  selected(src, store_selection(store_id, sku_id))
    .map(|(table, rows)| rows.into_iter().map(|r| StoreKpiRow::from_row(table, r)).collect())
    .unwrap_or_default()
}

pub fn store_kpis<S>(src: &S, store_id: Option<&str>, sku_id: Option<&str>) -> StoreKpis
where
  S: KpiSource + ?Sized,
{
  selected(src, store_selection(store_id, sku_id))
    .and_then(|(table, rows)| table.rollup(&rows).map(|r| StoreMetrics::from_row(table, &r)))
    .map(|m| StoreKpis::from(&m))
    .unwrap_or_default()
}

/// SKU-level shelf figures, optionally for one store.
pub fn store_shelf_performance<S>(src: &S, store_id: Option<&str>) -> Vec<ShelfPerformance>
where
  S: KpiSource + ?Sized,
{
  let Some(table) = src.table(Level::StoreSku) else {
    return Vec::new();
  };
  table
    .filter(&Filter::new().with_opt(Dimension::StoreId, store_id))
    .into_iter()
    .map(|row| {
      let row = StoreKpiRow::from_row(table, row);
      let kpis = StoreKpis::from(&row.metrics);
      ShelfPerformance {
        store_id:              row.store_id,
        sku_id:                row.sku_id.unwrap_or_default(),
        on_shelf_availability: kpis.on_shelf_availability,
        stockout_incidents:    kpis.stockout_incidents,
        waste_units:           kpis.waste_units,
      }
    })
    .collect()
}

// ─── Quality ─────────────────────────────────────────────────────────────────

pub fn quality_report<S>(src: &S, domain: Domain) -> Option<QualityReport>
where
  S: KpiSource + ?Sized,
{
  src.quality_report(domain).cloned()
}

// ─── Node health ─────────────────────────────────────────────────────────────

fn status(service_level: f64, waste_pct: f64, mape: f64) -> HealthStatus {
  if service_level >= 95.0 && waste_pct <= 2.0 && mape <= 5.0 {
    HealthStatus::Good
  } else if service_level >= 90.0 && waste_pct <= 4.0 && mape <= 7.0 {
    HealthStatus::Warning
  } else {
    HealthStatus::Danger
  }
}

/// `F_RIYADH_NORTH` → `Riyadh North Factory`.
fn display_name(node_id: &str, node_type: NodeType) -> String {
  let (prefix, suffix) = match node_type {
    NodeType::Factory => ("F_", "Factory"),
    NodeType::Dc => ("DC_", "DC"),
    NodeType::Store => ("ST_", "Store"),
  };
  let base = node_id.strip_prefix(prefix).unwrap_or(node_id);
  let words: Vec<String> = base
    .split('_')
    .filter(|w| !w.is_empty())
    .map(|w| {
      let mut chars = w.chars();
      match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
      }
    })
    .collect();
  format!("{} {suffix}", words.join(" "))
}

fn node(
  node_id: String,
  node_type: NodeType,
  service_level: f64,
  waste_pct: f64,
  mape: f64,
  extra_alerts: u32,
) -> NodeHealth {
  let mut alerts = extra_alerts;
  if service_level < 90.0 {
    alerts += 1;
  }
  if waste_pct > 5.0 {
    alerts += 1;
  }
  if node_type != NodeType::Store && mape > 10.0 {
    alerts += 1;
  }
  NodeHealth {
    name: display_name(&node_id, node_type),
    node_id,
    node_type,
    service_level: round_to(service_level, 1),
    waste_pct: round_to(waste_pct, 1),
    mape: round_to(mape, 1),
    alerts,
    status: status(service_level, waste_pct, mape),
  }
}

/// One health summary per factory, DC and store, in that order.
pub fn node_health<S>(src: &S) -> Vec<NodeHealth>
where
  S: KpiSource + ?Sized,
{
  let mut out = Vec::new();

  if let Some(table) = src.table(Level::Factory) {
    for row in &table.rows {
      let r = FactoryKpiRow::from_row(table, row);
      let m = &r.metrics;
      out.push(node(
        r.factory_id,
        NodeType::Factory,
        m.production_adherence_pct,
        pct(m.waste_units, m.prod_actual_qty),
        pct((m.prod_actual_qty - m.prod_plan_qty).abs(), m.prod_plan_qty),
        0,
      ));
    }
  }

  if let Some(table) = src.table(Level::Dc) {
    for row in &table.rows {
      let r = DcKpiRow::from_row(table, row);
      let m = &r.metrics;
      out.push(node(
        r.dc_id,
        NodeType::Dc,
        m.service_level_pct,
        m.waste_pct,
        pct((m.opening_stock_units - m.predicted_demand).abs(), m.predicted_demand),
        0,
      ));
    }
  }

  if let Some(table) = src.table(Level::Store) {
    for row in &table.rows {
      let r = StoreKpiRow::from_row(table, row);
      let m = &r.metrics;
      let stockouts = StoreKpis::from(m).stockout_incidents;
      out.push(node(
        r.store_id,
        NodeType::Store,
        m.on_shelf_availability_pct,
        pct(m.waste_units, m.planogram_capacity_units),
        pct((m.on_shelf_units - m.predicted_demand).abs(), m.predicted_demand),
        u32::try_from(stockouts).unwrap_or(u32::MAX),
      ));
    }
  }

  out
}

// ─── Global ──────────────────────────────────────────────────────────────────

/// Network-wide figures for the command centre.
pub fn global_kpis<S>(src: &S, unit_cost_sar: f64) -> GlobalKpis
where
  S: KpiSource + ?Sized,
{
  let factory = network(src, Level::Factory).map(|(t, r)| FactoryMetrics::from_row(t, &r));
  let dc = network(src, Level::Dc).map(|(t, r)| DcMetrics::from_row(t, &r));
  let store = network(src, Level::Store).map(|(t, r)| StoreMetrics::from_row(t, &r));

  let forecast_accuracy = factory
    .as_ref()
    .filter(|m| m.prod_plan_qty > 0.0)
    .map(|m| {
      let error = pct((m.prod_actual_qty - m.prod_plan_qty).abs(), m.prod_plan_qty);
      (100.0 - error).max(0.0)
    })
    .unwrap_or(0.0);

  let waste_units = factory.as_ref().map_or(0.0, |m| m.waste_units)
    + dc.as_ref().map_or(0.0, |m| m.excess_units)
    + store.as_ref().map_or(0.0, |m| m.waste_units);

  let service: Vec<f64> = dc
    .as_ref()
    .map(|m| m.service_level_pct)
    .into_iter()
    .chain(store.as_ref().map(|m| m.on_shelf_availability_pct))
    .collect();
  let service_level = if service.is_empty() {
    0.0
  } else {
    service.iter().sum::<f64>() / service.len() as f64
  };

  GlobalKpis {
    forecast_accuracy:     round_to(forecast_accuracy, 1),
    waste_cost:            round_to(waste_units * unit_cost_sar, 2),
    service_level:         round_to(service_level, 1),
    on_shelf_availability: round_to(
      store.as_ref().map_or(0.0, |m| m.on_shelf_availability_pct),
      1,
    ),
  }
}
