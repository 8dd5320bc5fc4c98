//! # Fisheries Monitoring Core
//!
//! Domain engines and use-cases of the monitoring backend:
//! - `logbook`: reconciliation of logbook operations into a per-trip timeline
//! - `beacon`: beacon malfunction tracking, audit trail and retention
//! - `alerts`: pending alert lifecycle (validate, silence, ingestion)
//! - `reporting`: reporting archive/delete/update and history queries
//! - `risk`: vessel risk factor aggregation
//! - `vessel`: composite vessel read with concurrent fan-out
//!
//! Persistence is reached only through the traits in [`repositories`];
//! [`db::SqliteStore`] implements them on SQLite and [`cache`] adds
//! per-entity TTL caching in front of reference lookups.

#[macro_use]
mod macros;

pub mod alerts;
pub mod beacon;
pub mod cache;
pub mod db;
pub mod error;
pub mod logbook;
pub mod reporting;
pub mod repositories;
pub mod risk;
pub mod vessel;

pub use error::{Error, Result};
