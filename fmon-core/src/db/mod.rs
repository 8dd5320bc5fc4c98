//! SQLite implementation of the repository traits
//!
//! One [`SqliteStore`] wraps the pool; each file in this module implements
//! the traits of one aggregate.

mod alerts;
mod beacon;
mod logbook;
mod reference;
mod reportings;
mod vessels;

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use fmon_common::time::{parse_optional_timestamp, parse_timestamp};
use fmon_common::{VesselIdentifier, VesselIdentity};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Column holding the value selected by an identifier discriminant
pub(crate) fn identity_column(identifier: VesselIdentifier) -> &'static str {
    match identifier {
        VesselIdentifier::InternalReferenceNumber => "internal_reference_number",
        VesselIdentifier::ExternalReferenceNumber => "external_reference_number",
        VesselIdentifier::Ircs => "ircs",
    }
}

/// Read the four vessel identity columns
pub(crate) fn identity_from_row(row: &SqliteRow) -> Result<VesselIdentity> {
    let vessel_identifier: String = row.try_get("vessel_identifier")?;
    Ok(VesselIdentity {
        internal_reference_number: row.try_get("internal_reference_number")?,
        external_reference_number: row.try_get("external_reference_number")?,
        ircs: row.try_get("ircs")?,
        vessel_identifier: VesselIdentifier::from_str(&vessel_identifier)?,
    })
}

pub(crate) fn timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let value: String = row.try_get(column)?;
    Ok(parse_timestamp(&value)?)
}

pub(crate) fn optional_timestamp(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.try_get(column)?;
    Ok(parse_optional_timestamp(value)?)
}

/// Parse a text enum column
pub(crate) fn text_enum<T>(row: &SqliteRow, column: &str) -> Result<T>
where
    T: FromStr<Err = Error>,
{
    let value: String = row.try_get(column)?;
    T::from_str(&value)
}

pub(crate) fn optional_text_enum<T>(row: &SqliteRow, column: &str) -> Result<Option<T>>
where
    T: FromStr<Err = Error>,
{
    let value: Option<String> = row.try_get(column)?;
    value.as_deref().map(T::from_str).transpose()
}
