//! Handlers for the per-domain KPI endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/factory-kpis` | `?factory_id&line_id`, flat summary |
//! | `GET`  | `/factory-kpis/rows` | same filters, one row per group |
//! | `GET`  | `/dc-kpis` | `?dc_id&sku_id` |
//! | `GET`  | `/dc-kpis/rows` | |
//! | `GET`  | `/dc-days-cover` | `?dc_id&sku_id`, SKU level |
//! | `GET`  | `/store-kpis` | `?store_id&sku_id` |
//! | `GET`  | `/store-kpis/rows` | |
//! | `GET`  | `/store-shelf-performance` | `?store_id`, SKU level |
//! | `GET`  | `/node-health` | every factory, DC and store |
//! | `GET`  | `/global-kpis` | network totals |
//!
//! Unknown ids are not errors: rows come back empty and summaries zeroed.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use hatab_core::{
  kpi::{
    DaysCover, DcKpiRow, DcKpis, FactoryKpiRow, FactoryKpis, GlobalKpis, NodeHealth,
    ShelfPerformance, StoreKpiRow, StoreKpis,
  },
  service,
  source::{KpiSource, SourceCell},
};
use serde::Deserialize;

use crate::error::ApiError;

/// Empty query values count as absent.
fn id(value: &Option<String>) -> Option<&str> { value.as_deref().filter(|s| !s.is_empty()) }

// ─── Factory ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct FactoryParams {
  pub factory_id: Option<String>,
  pub line_id:    Option<String>,
}

/// `GET /factory-kpis[?factory_id=...][&line_id=...]`
pub async fn factory<S: KpiSource>(
  State(cell): State<Arc<SourceCell<S>>>,
  Query(params): Query<FactoryParams>,
) -> Result<Json<FactoryKpis>, ApiError> {
  let src = cell.get()?;
  Ok(Json(service::factory_kpis(src, id(&params.factory_id), id(&params.line_id))))
}

/// `GET /factory-kpis/rows[?factory_id=...][&line_id=...]`
pub async fn factory_rows<S: KpiSource>(
  State(cell): State<Arc<SourceCell<S>>>,
  Query(params): Query<FactoryParams>,
) -> Result<Json<Vec<FactoryKpiRow>>, ApiError> {
  let src = cell.get()?;
  Ok(Json(service::factory_kpi_rows(src, id(&params.factory_id), id(&params.line_id))))
}

// ─── DC ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct DcParams {
  pub dc_id:  Option<String>,
  pub sku_id: Option<String>,
}

/// `GET /dc-kpis[?dc_id=...][&sku_id=...]`
pub async fn dc<S: KpiSource>(
  State(cell): State<Arc<SourceCell<S>>>,
  Query(params): Query<DcParams>,
) -> Result<Json<DcKpis>, ApiError> {
  let src = cell.get()?;
  Ok(Json(service::dc_kpis(src, id(&params.dc_id), id(&params.sku_id))))
}

/// `GET /dc-kpis/rows[?dc_id=...][&sku_id=...]`
pub async fn dc_rows<S: KpiSource>(
  State(cell): State<Arc<SourceCell<S>>>,
  Query(params): Query<DcParams>,
) -> Result<Json<Vec<DcKpiRow>>, ApiError> {
  let src = cell.get()?;
  Ok(Json(service::dc_kpi_rows(src, id(&params.dc_id), id(&params.sku_id))))
}

/// `GET /dc-days-cover[?dc_id=...][&sku_id=...]`
pub async fn days_cover<S: KpiSource>(
  State(cell): State<Arc<SourceCell<S>>>,
  Query(params): Query<DcParams>,
) -> Result<Json<Vec<DaysCover>>, ApiError> {
  let src = cell.get()?;
  Ok(Json(service::dc_days_cover(src, id(&params.dc_id), id(&params.sku_id))))
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct StoreParams {
  pub store_id: Option<String>,
  pub sku_id:   Option<String>,
}

/// `GET /store-kpis[?store_id=...][&sku_id=...]`
pub async fn store<S: KpiSource>(
  State(cell): State<Arc<SourceCell<S>>>,
  Query(params): Query<StoreParams>,
) -> Result<Json<StoreKpis>, ApiError> {
  let src = cell.get()?;
  Ok(Json(service::store_kpis(src, id(&params.store_id), id(&params.sku_id))))
}

/// `GET /store-kpis/rows[?store_id=...][&sku_id=...]`
pub async fn store_rows<S: KpiSource>(
  State(cell): State<Arc<SourceCell<S>>>,
  Query(params): Query<StoreParams>,
) -> Result<Json<Vec<StoreKpiRow>>, ApiError> {
  let src = cell.get()?;
  Ok(Json(service::store_kpi_rows(src, id(&params.store_id), id(&params.sku_id))))
}

/// `GET /store-shelf-performance[?store_id=...]`
pub async fn shelf_performance<S: KpiSource>(
  State(cell): State<Arc<SourceCell<S>>>,
  Query(params): Query<StoreParams>,
) -> Result<Json<Vec<ShelfPerformance>>, ApiError> {
  let src = cell.get()?;
  Ok(Json(service::store_shelf_performance(src, id(&params.store_id))))
}

// ─── Network ─────────────────────────────────────────────────────────────────

/// `GET /node-health`
pub async fn node_health<S: KpiSource>(
  State(cell): State<Arc<SourceCell<S>>>,
) -> Result<Json<Vec<NodeHealth>>, ApiError> {
  Ok(Json(service::node_health(cell.get()?)))
}

/// `GET /global-kpis`
pub async fn global<S: KpiSource>(
  State(cell): State<Arc<SourceCell<S>>>,
) -> Result<Json<GlobalKpis>, ApiError> {
  let src = cell.get()?;
  Ok(Json(service::global_kpis(src, src.unit_cost_sar())))
}
