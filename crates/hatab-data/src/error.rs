//! Error type for `hatab-data`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A schema or formula error raised while cleaning or aggregating.
  #[error(transparent)]
  Core(#[from] hatab_core::Error),

  #[error("cannot read {path}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed csv in {table:?}: {source}")]
  Csv {
    table:  String,
    #[source]
    source: csv::Error,
  },

  #[error("invalid data configuration: {0}")]
  Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
