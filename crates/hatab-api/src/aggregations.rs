//! Handler for `GET /aggregations/{level}`.
//!
//! Every query parameter names a dimension and gives the exact value to
//! match, e.g. `/aggregations/dc_sku?dc_id=DC_JEDDAH`. A dimension the level
//! does not carry matches nothing.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
  Json,
  extract::{Path, Query, State},
};
use hatab_core::{
  level::{Dimension, Filter, Level},
  source::{KpiSource, SourceCell},
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct AggregationResponse {
  pub level:      Level,
  pub dimensions: Vec<Dimension>,
  pub columns:    Vec<String>,
  /// One object per group: dimension values, then column values.
  pub rows:       Vec<Map<String, Value>>,
}

/// `GET /aggregations/{level}[?<dimension>=<value>...]`
pub async fn handler<S: KpiSource>(
  State(cell): State<Arc<SourceCell<S>>>,
  Path(level): Path<String>,
  Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<AggregationResponse>, ApiError> {
  let src = cell.get()?;
  let level: Level = level.parse()?;

  let mut filter = Filter::new();
  for (name, value) in params {
    let dimension: Dimension = name.parse()?;
    filter = filter.with(dimension, value);
  }

  let table = src
    .table(level)
    .ok_or_else(|| ApiError::NotFound(format!("level {level} was not built")))?;

  let rows = src
    .get(level, &filter)
    .into_iter()
    .map(|row| {
      let mut obj = Map::new();
      for (dim, key) in level.dimensions().iter().zip(&row.key) {
        obj.insert(dim.column().to_owned(), Value::String(key.clone()));
      }
      for (column, value) in table.columns.iter().zip(&row.values) {
        obj.insert(column.clone(), Value::from(*value));
      }
      obj
    })
    .collect();

  Ok(Json(AggregationResponse {
    level,
    dimensions: level.dimensions().to_vec(),
    columns: table.columns.clone(),
    rows,
  }))
}
