//! # Fisheries Monitoring Common Library
//!
//! Shared code for the fisheries monitoring workspace including:
//! - Vessel identity resolution across identifier schemes
//! - Database initialization, schema and migrations
//! - Configuration loading
//! - Timestamp utilities

pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod vessel;

pub use error::{Error, Result};
pub use vessel::{VesselIdentifier, VesselIdentity};
