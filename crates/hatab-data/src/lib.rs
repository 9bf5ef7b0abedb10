//! Loading and publishing of the Hatab data layer.
//!
//! Reads the factory, DC and store CSV extracts, cleans them against the
//! catalog's column rules and aggregates them into every level. The result
//! is a [`DataLayer`], which implements [`hatab_core::source::KpiSource`].

pub mod catalog;
pub mod config;
pub mod error;
pub mod layer;
pub mod loader;

pub use config::{DataConfig, SourceConfig};
pub use error::{Error, Result};
pub use layer::DataLayer;

#[cfg(test)]
mod tests;
