//! Typed KPI records and response shapes.
//!
//! Aggregation tables are generic; this module projects their rows into
//! fixed-shape records per domain, and those records into the flat mappings
//! served to the dashboard.

use serde::Serialize;

use crate::{
  aggregate::{AggregationRow, AggregationTable},
  level::{Dimension, Level},
};

/// Column names shared by the domain catalog and the projections below.
pub mod columns {
  pub const RECORDS: &str = "records";

  pub mod factory {
    pub const PROD_ACTUAL_QTY: &str = "prod_actual_qty";
    pub const PROD_PLAN_QTY: &str = "prod_plan_qty";
    pub const DEFECT_QTY: &str = "defect_qty";
    pub const SCRAP_QTY: &str = "scrap_qty";
    pub const BATCH_SIZE_UNITS: &str = "batch_size_units";
    pub const LINE_UTILIZATION_PCT: &str = "line_utilization_pct";
    pub const PRODUCTION_ADHERENCE_PCT: &str = "production_adherence_pct";
    pub const DEFECT_RATE_PCT: &str = "defect_rate_pct";
    pub const WASTE_UNITS: &str = "waste_units";
    pub const WASTE_SAR: &str = "waste_sar";
  }

  pub mod dc {
    pub const OPENING_STOCK_UNITS: &str = "opening_stock_units";
    pub const PREDICTED_DEMAND: &str = "predicted_demand";
    pub const SERVICED_UNITS: &str = "serviced_units";
    pub const EXCESS_UNITS: &str = "excess_units";
    pub const BACKORDER_UNITS: &str = "backorder_units";
    pub const SERVICE_LEVEL_PCT: &str = "service_level_pct";
    pub const WASTE_PCT: &str = "waste_pct";
    pub const DAYS_COVER: &str = "days_cover";
  }

  pub mod store {
    pub const ON_SHELF_UNITS: &str = "on_shelf_units";
    pub const PLANOGRAM_CAPACITY_UNITS: &str = "planogram_capacity_units";
    pub const PREDICTED_DEMAND: &str = "predicted_demand";
    pub const STOCKOUT_INCIDENTS: &str = "stockout_incidents";
    pub const WASTE_UNITS: &str = "waste_units";
    pub const ON_SHELF_AVAILABILITY_PCT: &str = "on_shelf_availability_pct";
    pub const WASTE_SAR: &str = "waste_sar";
  }

  /// Present when the source carries a forecast horizon.
  pub const FORECAST_HOUR_OFFSET: &str = "forecast_hour_offset";
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
  let factor = 10f64.powi(decimals);
  (value * factor).round() / factor
}

fn units(value: f64) -> u64 { value.max(0.0).round() as u64 }

/// Dimension values shared by every typed row.
struct Keys {
  date: Option<String>,
  hour: Option<u32>,
}

fn key(table: &AggregationTable, row: &AggregationRow, dim: Dimension) -> Option<String> {
  table.dimension(row, dim).map(str::to_owned)
}

fn calendar(table: &AggregationTable, row: &AggregationRow) -> Keys {
  Keys {
    date: key(table, row, Dimension::Date),
    hour: table.dimension(row, Dimension::Hour).and_then(|h| h.parse().ok()),
  }
}

// ─── Factory ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FactoryMetrics {
  pub prod_actual_qty:          f64,
  pub prod_plan_qty:            f64,
  pub defect_qty:               f64,
  pub scrap_qty:                f64,
  pub batch_size_units:         f64,
  pub line_utilization_pct:     f64,
  pub production_adherence_pct: f64,
  pub defect_rate_pct:          f64,
  pub waste_units:              f64,
  pub waste_sar:                f64,
}

impl FactoryMetrics {
  pub fn from_row(table: &AggregationTable, row: &AggregationRow) -> Self {
    use columns::factory::*;
    let v = |c: &str| table.value(row, c).unwrap_or(0.0);
    Self {
      prod_actual_qty:          v(PROD_ACTUAL_QTY),
      prod_plan_qty:            v(PROD_PLAN_QTY),
      defect_qty:               v(DEFECT_QTY),
      scrap_qty:                v(SCRAP_QTY),
      batch_size_units:         v(BATCH_SIZE_UNITS),
      line_utilization_pct:     v(LINE_UTILIZATION_PCT),
      production_adherence_pct: v(PRODUCTION_ADHERENCE_PCT),
      defect_rate_pct:          v(DEFECT_RATE_PCT),
      waste_units:              v(WASTE_UNITS),
      waste_sar:                v(WASTE_SAR),
    }
  }
}

/// One row of a factory aggregation level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactoryKpiRow {
  pub level:      Level,
  pub factory_id: String,
  pub line_id:    Option<String>,
  pub date:       Option<String>,
  pub hour:       Option<u32>,
  #[serde(flatten)]
  pub metrics:    FactoryMetrics,
}

impl FactoryKpiRow {
  pub fn from_row(table: &AggregationTable, row: &AggregationRow) -> Self {
    let Keys { date, hour } = calendar(table, row);
    Self {
      level: table.level,
      factory_id: key(table, row, Dimension::FactoryId).unwrap_or_default(),
      line_id: key(table, row, Dimension::LineId),
      date,
      hour,
      metrics: FactoryMetrics::from_row(table, row),
    }
  }
}

/// Factory KPI mapping served to the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryKpis {
  pub line_utilization:     f64,
  pub production_adherence: f64,
  pub defect_rate:          f64,
  pub waste_units:          u64,
  #[serde(rename = "wasteSAR")]
  pub waste_sar:            f64,
}

impl From<&FactoryMetrics> for FactoryKpis {
  fn from(m: &FactoryMetrics) -> Self {
    Self {
      line_utilization:     round_to(m.line_utilization_pct, 1),
      production_adherence: round_to(m.production_adherence_pct, 1),
      defect_rate:          round_to(m.defect_rate_pct, 2),
      waste_units:          units(m.waste_units),
      waste_sar:            round_to(m.waste_sar, 2),
    }
  }
}

// ─── DC ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DcMetrics {
  pub opening_stock_units: f64,
  pub predicted_demand:    f64,
  pub serviced_units:      f64,
  pub excess_units:        f64,
  pub backorder_units:     f64,
  pub service_level_pct:   f64,
  pub waste_pct:           f64,
  pub days_cover:          f64,
}

impl DcMetrics {
  pub fn from_row(table: &AggregationTable, row: &AggregationRow) -> Self {
    use columns::dc::*;
    let v = |c: &str| table.value(row, c).unwrap_or(0.0);
    Self {
      opening_stock_units: v(OPENING_STOCK_UNITS),
      predicted_demand:    v(PREDICTED_DEMAND),
      serviced_units:      v(SERVICED_UNITS),
      excess_units:        v(EXCESS_UNITS),
      backorder_units:     v(BACKORDER_UNITS),
      service_level_pct:   v(SERVICE_LEVEL_PCT),
      waste_pct:           v(WASTE_PCT),
      days_cover:          v(DAYS_COVER),
    }
  }
}

/// One row of a DC aggregation level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DcKpiRow {
  pub level:   Level,
  pub dc_id:   String,
  pub sku_id:  Option<String>,
  pub date:    Option<String>,
  pub hour:    Option<u32>,
  #[serde(flatten)]
  pub metrics: DcMetrics,
}

impl DcKpiRow {
  pub fn from_row(table: &AggregationTable, row: &AggregationRow) -> Self {
    let Keys { date, hour } = calendar(table, row);
    Self {
      level: table.level,
      dc_id: key(table, row, Dimension::DcId).unwrap_or_default(),
      sku_id: key(table, row, Dimension::SkuId),
      date,
      hour,
      metrics: DcMetrics::from_row(table, row),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DcKpis {
  pub service_level:   f64,
  pub waste_pct:       f64,
  pub backorder_units: u64,
  pub days_cover:      f64,
}

impl From<&DcMetrics> for DcKpis {
  fn from(m: &DcMetrics) -> Self {
    Self {
      service_level:   round_to(m.service_level_pct, 1),
      waste_pct:       round_to(m.waste_pct, 1),
      backorder_units: units(m.backorder_units),
      days_cover:      round_to(m.days_cover, 2),
    }
  }
}

/// Days of cover for one DC/SKU pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaysCover {
  pub dc_id:      String,
  pub sku_id:     String,
  pub days_cover: f64,
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreMetrics {
  pub on_shelf_units:            f64,
  pub planogram_capacity_units:  f64,
  pub predicted_demand:          f64,
  pub stockout_incidents:        f64,
  pub waste_units:               f64,
  pub on_shelf_availability_pct: f64,
  pub waste_sar:                 f64,
}

impl StoreMetrics {
  pub fn from_row(table: &AggregationTable, row: &AggregationRow) -> Self {
    use columns::store::*;
    let v = |c: &str| table.value(row, c).unwrap_or(0.0);
    Self {
      on_shelf_units:            v(ON_SHELF_UNITS),
      planogram_capacity_units:  v(PLANOGRAM_CAPACITY_UNITS),
      predicted_demand:          v(PREDICTED_DEMAND),
      stockout_incidents:        v(STOCKOUT_INCIDENTS),
      waste_units:               v(WASTE_UNITS),
      on_shelf_availability_pct: v(ON_SHELF_AVAILABILITY_PCT),
      waste_sar:                 v(WASTE_SAR),
    }
  }
}

/// One row of a store aggregation level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreKpiRow {
  pub level:    Level,
  pub store_id: String,
  pub sku_id:   Option<String>,
  pub date:     Option<String>,
  pub hour:     Option<u32>,
  #[serde(flatten)]
  pub metrics:  StoreMetrics,
}

impl StoreKpiRow {
  pub fn from_row(table: &AggregationTable, row: &AggregationRow) -> Self {
    let Keys { date, hour } = calendar(table, row);
    Self {
      level: table.level,
      store_id: key(table, row, Dimension::StoreId).unwrap_or_default(),
      sku_id: key(table, row, Dimension::SkuId),
      date,
      hour,
      metrics: StoreMetrics::from_row(table, row),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreKpis {
  pub on_shelf_availability: f64,
  pub stockout_incidents:    u64,
  pub waste_units:           u64,
  #[serde(rename = "wasteSAR")]
  pub waste_sar:             f64,
}

impl From<&StoreMetrics> for StoreKpis {
  fn from(m: &StoreMetrics) -> Self {
    Self {
      on_shelf_availability: round_to(m.on_shelf_availability_pct, 1),
      stockout_incidents:    units(m.stockout_incidents),
      waste_units:           units(m.waste_units),
      waste_sar:             round_to(m.waste_sar, 2),
    }
  }
}

/// SKU-level shelf performance of one store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfPerformance {
  pub store_id:              String,
  pub sku_id:                String,
  pub on_shelf_availability: f64,
  pub stockout_incidents:    u64,
  pub waste_units:           u64,
}

// ─── Network views ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeType {
  Factory,
  #[serde(rename = "DC")]
  Dc,
  Store,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
  Good,
  Warning,
  Danger,
}

/// Health summary of one factory, DC or store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeHealth {
  pub node_id:       String,
  pub name:          String,
  #[serde(rename = "type")]
  pub node_type:     NodeType,
  pub service_level: f64,
  pub waste_pct:     f64,
  pub mape:          f64,
  pub alerts:        u32,
  pub status:        HealthStatus,
}

/// Network-wide command-centre figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalKpis {
  pub forecast_accuracy:     f64,
  pub waste_cost:            f64,
  pub service_level:         f64,
  pub on_shelf_availability: f64,
}
