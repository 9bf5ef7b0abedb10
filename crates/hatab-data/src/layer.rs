//! [`DataLayer`], the immutable set of every aggregation table and quality
//! report.

use std::collections::BTreeMap;

use hatab_core::{
  aggregate::{self, AggregationTable},
  level::{Domain, Level},
  quality::{self, QualityReport},
  source::KpiSource,
  table::RawTable,
};

use crate::{Result, catalog, config::DataConfig, loader};

/// Every level of every loaded domain, plus one quality report per domain.
///
/// Built in one go by [`DataLayer::build`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DataLayer {
  tables:        BTreeMap<Level, AggregationTable>,
  reports:       BTreeMap<Domain, QualityReport>,
  unit_cost_sar: f64,
}

impl DataLayer {
  /// Load, clean and aggregate all three source files named by `config`.
  ///
  /// Any unreadable file, missing required column or bad formula aborts the
  /// whole build.
  pub fn build(config: &DataConfig) -> Result<Self> {
    config.validate()?;
    let mut raw = Vec::with_capacity(Domain::ALL.len());
    for domain in Domain::ALL {
      raw.push((domain, loader::load_csv(domain.as_str(), &config.path(domain))?));
    }
    Self::from_raw_tables(raw, config)
  }

  /// Clean and aggregate tables that are already in memory. Domains not
  /// given have no tables and no report.
  pub fn from_raw_tables(
    tables: impl IntoIterator<Item = (Domain, RawTable)>,
    config: &DataConfig,
  ) -> Result<Self> {
    config.validate()?;
    let params = config.params();
    let mut layer = Self {
      tables:        BTreeMap::new(),
      reports:       BTreeMap::new(),
      unit_cost_sar: params.unit_cost_sar,
    };

    for (domain, raw) in tables {
      let (cleaned, report) = quality::clean(&raw, &config.rules(domain))?;
      tracing::info!(
        domain = %domain,
        original_rows = report.original_rows,
        final_rows = report.final_rows,
        quality_score = report.quality_score,
        "cleaned source table"
      );

      let spec = catalog::aggregation_spec(domain, &cleaned, &params);
      for table in aggregate::build(&cleaned, &spec)? {
        layer.tables.insert(table.level, table);
      }
      layer.reports.insert(domain, report);
    }

    tracing::info!(tables = layer.tables.len(), "data layer ready");
    Ok(layer)
  }

  pub fn levels(&self) -> impl Iterator<Item = Level> + '_ { self.tables.keys().copied() }
}

impl KpiSource for DataLayer {
  fn table(&self, level: Level) -> Option<&AggregationTable> { self.tables.get(&level) }

  fn quality_report(&self, domain: Domain) -> Option<&QualityReport> { self.reports.get(&domain) }

  fn unit_cost_sar(&self) -> f64 { self.unit_cost_sar }
}
