//! The `KpiSource` trait and the publish-once [`SourceCell`].
//!
//! The trait is implemented by the data layer (`hatab-data`). Services and
//! the HTTP API depend on this abstraction, not on the concrete layer.

use std::{collections::BTreeMap, sync::OnceLock};

use crate::{
  Error, Result,
  aggregate::{AggregationRow, AggregationTable},
  level::{Domain, Filter, Level},
  quality::QualityReport,
};

pub const DEFAULT_UNIT_COST_SAR: f64 = 10.0;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Read-only access to precomputed aggregation tables.
///
/// Implementations are immutable once constructed, so every method is a
/// plain lock-free read.
pub trait KpiSource: Send + Sync {
  /// The table for `level`, or `None` if its domain was not built.
  fn table(&self, level: Level) -> Option<&AggregationTable>;

  /// The cleaning report of `domain`'s source table.
  fn quality_report(&self, domain: Domain) -> Option<&QualityReport>;

  /// Every available quality report, keyed by domain.
  fn quality_reports(&self) -> BTreeMap<Domain, &QualityReport> {
    Domain::ALL
      .into_iter()
      .filter_map(|d| self.quality_report(d).map(|r| (d, r)))
      .collect()
  }

  /// Cost of one wasted unit, in SAR.
  fn unit_cost_sar(&self) -> f64 { DEFAULT_UNIT_COST_SAR }

  /// Rows of `level` matching `filter`. No match is an empty result.
  fn get(&self, level: Level, filter: &Filter) -> Vec<&AggregationRow> {
    self
      .table(level)
      .map(|t| t.filter(filter))
      .unwrap_or_default()
  }
}

// ─── Publication ─────────────────────────────────────────────────────────────

/// Holds a [`KpiSource`] that is published exactly once.
///
/// Readers either see nothing ([`Error::NotInitialized`]) or the complete
/// source; there is no intermediate state and no way to replace it.
#[derive(Debug)]
pub struct SourceCell<S> {
  inner: OnceLock<S>,
}

impl<S> Default for SourceCell<S> {
  fn default() -> Self { Self { inner: OnceLock::new() } }
}

impl<S> SourceCell<S> {
  pub fn new() -> Self { Self::default() }

  /// A cell that is already published.
  pub fn ready(source: S) -> Self {
    let inner = OnceLock::new();
    let _ = inner.set(source);
    Self { inner }
  }

  /// Publish `source`. Fails if something was already published.
  pub fn init(&self, source: S) -> Result<()> {
    self.inner.set(source).map_err(|_| Error::AlreadyInitialized)
  }

  /// The published source, failing fast if [`init`](Self::init) has not
  /// completed.
  pub fn get(&self) -> Result<&S> { self.inner.get().ok_or(Error::NotInitialized) }

  /// Block the calling thread until the source is published.
  pub fn wait(&self) -> &S { self.inner.wait() }

  pub fn is_ready(&self) -> bool { self.inner.get().is_some() }
}
