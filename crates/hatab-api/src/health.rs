//! Handler for `GET /health`.

use std::sync::Arc;

use axum::{Json, extract::State};
use hatab_core::source::{KpiSource, SourceCell};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Health {
  pub status:  &'static str,
  pub service: &'static str,
  pub version: &'static str,
  /// Whether the data layer has been published.
  pub ready:   bool,
}

/// `GET /health`. Always `200`, even while the data layer is loading.
pub async fn handler<S: KpiSource>(State(cell): State<Arc<SourceCell<S>>>) -> Json<Health> {
  Json(Health {
    status:  "ok",
    service: "hatab",
    version: env!("CARGO_PKG_VERSION"),
    ready:   cell.is_ready(),
  })
}
