//! Error types for `hatab-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A required input column is absent from a source table.
  #[error("table {table:?} is missing required column {column:?}")]
  MissingColumn { table: String, column: String },

  /// A formula, filter or level references a column that does not exist.
  #[error("{context} references unknown column {column:?}")]
  UnknownColumn { context: String, column: String },

  #[error("column {0:?} is declared more than once")]
  DuplicateColumn(String),

  #[error("unknown domain: {0:?}")]
  UnknownDomain(String),

  #[error("unknown aggregation level: {0:?}")]
  UnknownLevel(String),

  #[error("unknown dimension: {0:?}")]
  UnknownDimension(String),

  #[error("data layer has not been initialised")]
  NotInitialized,

  #[error("data layer is already initialised")]
  AlreadyInitialized,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
