//! Handlers for `/quality-reports` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/quality-reports` | every report, keyed by domain |
//! | `GET`  | `/quality-reports/{domain}` | `factory`, `dc` or `store`; 404 if not built |

use std::{collections::BTreeMap, sync::Arc};

use axum::{
  Json,
  extract::{Path, State},
};
use hatab_core::{
  level::Domain,
  quality::QualityReport,
  service,
  source::{KpiSource, SourceCell},
};

use crate::error::ApiError;

/// `GET /quality-reports`
pub async fn list<S: KpiSource>(
  State(cell): State<Arc<SourceCell<S>>>,
) -> Result<Json<BTreeMap<Domain, QualityReport>>, ApiError> {
  let reports = cell
    .get()?
    .quality_reports()
    .into_iter()
    .map(|(domain, report)| (domain, report.clone()))
    .collect();
  Ok(Json(reports))
}

/// `GET /quality-reports/{domain}`
pub async fn get_one<S: KpiSource>(
  State(cell): State<Arc<SourceCell<S>>>,
  Path(domain): Path<String>,
) -> Result<Json<QualityReport>, ApiError> {
  let src = cell.get()?;
  let domain: Domain = domain.parse()?;
  service::quality_report(src, domain)
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("no quality report for {domain}")))
}
