//! JSON REST API for Hatab.
//!
//! Exposes an axum [`Router`] over a [`SourceCell`] holding any
//! [`KpiSource`]. Until the cell is published every data endpoint answers
//! `503`; `/health` always answers.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let cell = Arc::new(SourceCell::<DataLayer>::new());
//! let app = hatab_api::api_router(cell.clone());
//! ```

pub mod aggregations;
pub mod error;
pub mod health;
pub mod kpis;
pub mod reports;

use std::sync::Arc;

use axum::{Router, routing::get};
use hatab_core::source::{KpiSource, SourceCell};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Build the API router for `cell`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(cell: Arc<SourceCell<S>>) -> Router<()>
where
  S: KpiSource + 'static,
{
  Router::new()
    .route("/health", get(health::handler::<S>))
    // Factory
    .route("/factory-kpis", get(kpis::factory::<S>))
    .route("/factory-kpis/rows", get(kpis::factory_rows::<S>))
    // DC
    .route("/dc-kpis", get(kpis::dc::<S>))
    .route("/dc-kpis/rows", get(kpis::dc_rows::<S>))
    .route("/dc-days-cover", get(kpis::days_cover::<S>))
    // Store
    .route("/store-kpis", get(kpis::store::<S>))
    .route("/store-kpis/rows", get(kpis::store_rows::<S>))
    .route("/store-shelf-performance", get(kpis::shelf_performance::<S>))
    // Network
    .route("/node-health", get(kpis::node_health::<S>))
    .route("/global-kpis", get(kpis::global::<S>))
    // Quality and raw tables
    .route("/quality-reports", get(reports::list::<S>))
    .route("/quality-reports/{domain}", get(reports::get_one::<S>))
    .route("/aggregations/{level}", get(aggregations::handler::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(cell)
}
