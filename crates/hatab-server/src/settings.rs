//! Runtime server configuration, deserialised from `config.toml` and
//! `HATAB_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use hatab_data::DataConfig;
use serde::Deserialize;

fn default_host() -> String { "0.0.0.0".to_owned() }

fn default_port() -> u16 { 5000 }

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host: String,
  #[serde(default = "default_port")]
  pub port: u16,
  #[serde(default)]
  pub data: DataConfig,
}

impl ServerConfig {
  /// Layer `HATAB_*` variables (`__` between nested keys, e.g.
  /// `HATAB_DATA__UNIT_COST_SAR`) over the optional TOML file at `path`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("HATAB")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .with_context(|| format!("failed to read config from {}", path.display()))?;

    let mut cfg: ServerConfig = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    cfg.data.data_dir = expand_tilde(&cfg.data.data_dir);
    Ok(cfg)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
