//! Core types for the Hatab supply-chain KPI backend.
//!
//! Tables, column rules and the quality pass, the aggregation builder and
//! its expression language, the `KpiSource` abstraction and the KPI
//! services built on it. This crate does no I/O; loading and configuration
//! live in `hatab-data`, HTTP in `hatab-api`.

pub mod aggregate;
pub mod error;
pub mod expr;
pub mod kpi;
pub mod level;
pub mod quality;
pub mod rules;
pub mod service;
pub mod source;
pub mod table;

pub use error::{Error, Result};
