//! Where the source tables live and how they are interpreted.
//!
//! Every field has a default, so an empty configuration is valid:
//!
//! ```toml
//! [data]
//! data_dir = "datasets"
//! unit_cost_sar = 10.0
//!
//! [data.dc]
//! file = "dc_168h_forecasts.csv"
//! ```

use std::path::{Path, PathBuf};

use hatab_core::{level::Domain, rules::ColumnRule, source::DEFAULT_UNIT_COST_SAR};
use serde::Deserialize;

use crate::{
  Error, Result,
  catalog::{self, Params},
};

/// One domain's source file and optional rule-set override.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceConfig {
  /// Relative paths are resolved against [`DataConfig::data_dir`].
  pub file:  PathBuf,
  /// Replaces the catalog's default rules for this domain when set.
  #[serde(default)]
  pub rules: Option<Vec<ColumnRule>>,
}

impl SourceConfig {
  pub fn new(file: impl Into<PathBuf>) -> Self { Self { file: file.into(), rules: None } }
}

fn default_data_dir() -> PathBuf { PathBuf::from("datasets") }

fn default_factory() -> SourceConfig { SourceConfig::new("predictions.csv") }

fn default_dc() -> SourceConfig { SourceConfig::new("dc_168h_forecasts.csv") }

fn default_store() -> SourceConfig { SourceConfig::new("store_168h_forecasts.csv") }

fn default_unit_cost() -> f64 { DEFAULT_UNIT_COST_SAR }

fn default_offset() -> Option<i64> { Some(1) }

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataConfig {
  #[serde(default = "default_data_dir")]
  pub data_dir:             PathBuf,
  #[serde(default = "default_factory")]
  pub factory:              SourceConfig,
  #[serde(default = "default_dc")]
  pub dc:                   SourceConfig,
  #[serde(default = "default_store")]
  pub store:                SourceConfig,
  #[serde(default = "default_unit_cost")]
  pub unit_cost_sar:        f64,
  /// Horizon kept for DC and store forecasts; `None` keeps every horizon.
  #[serde(default = "default_offset")]
  pub forecast_hour_offset: Option<i64>,
}

impl Default for DataConfig {
  fn default() -> Self {
    Self {
      data_dir:             default_data_dir(),
      factory:              default_factory(),
      dc:                   default_dc(),
      store:                default_store(),
      unit_cost_sar:        default_unit_cost(),
      forecast_hour_offset: default_offset(),
    }
  }
}

impl DataConfig {
  pub fn source(&self, domain: Domain) -> &SourceConfig {
    match domain {
      Domain::Factory => &self.factory,
      Domain::Dc => &self.dc,
      Domain::Store => &self.store,
    }
  }

  /// Resolved path of `domain`'s source file.
  pub fn path(&self, domain: Domain) -> PathBuf {
    let file = &self.source(domain).file;
    if file.is_absolute() { file.clone() } else { self.data_dir.join(file) }
  }

  /// The configured rules for `domain`, or the catalog defaults.
  pub fn rules(&self, domain: Domain) -> Vec<ColumnRule> {
    self
      .source(domain)
      .rules
      .clone()
      .unwrap_or_else(|| catalog::default_rules(domain))
  }

  pub fn params(&self) -> Params {
    Params {
      unit_cost_sar:        self.unit_cost_sar,
      forecast_hour_offset: self.forecast_hour_offset,
    }
  }

  pub fn validate(&self) -> Result<()> {
    if !self.unit_cost_sar.is_finite() || self.unit_cost_sar < 0.0 {
      return Err(Error::Config(format!(
        "unit_cost_sar must be a non-negative number, got {}",
        self.unit_cost_sar
      )));
    }
    for domain in Domain::ALL {
      if self.source(domain).file.as_os_str().is_empty() {
        return Err(Error::Config(format!("no source file configured for {domain}")));
      }
    }
    Ok(())
  }

  /// Point every source at `dir`, keeping the file names.
  pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
    self.data_dir = dir.as_ref().to_owned();
    self
  }
}
