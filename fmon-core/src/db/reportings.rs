//! Reporting operations

use super::{identity_column, identity_from_row, optional_timestamp, text_enum, timestamp, SqliteStore};
use crate::reporting::model::{NewReporting, Reporting, ReportingType, ReportingValue};
use crate::repositories::ReportingRepository;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fmon_common::time::format_timestamp;
use fmon_common::VesselIdentifier;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

fn reporting_from_row(row: &SqliteRow) -> Result<Reporting> {
    let reporting_type: ReportingType = text_enum(row, "type")?;
    let value: String = row.try_get("value")?;

    Ok(Reporting {
        id: row.try_get("id")?,
        vessel: identity_from_row(row)?,
        vessel_name: row.try_get("vessel_name")?,
        vessel_id: row.try_get("vessel_id")?,
        flag_state: row.try_get("flag_state")?,
        reporting_type,
        creation_date: timestamp(row, "creation_date")?,
        validation_date: optional_timestamp(row, "validation_date")?,
        value: ReportingValue::decode(reporting_type, &value)?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        is_archived: row.try_get("is_archived")?,
        is_deleted: row.try_get("is_deleted")?,
        under_charter: None,
    })
}

pub(super) async fn insert_reporting(tx: &mut Transaction<'_, Sqlite>, reporting: &NewReporting) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO reportings (
            internal_reference_number, external_reference_number, ircs, vessel_identifier,
            vessel_name, vessel_id, flag_state, type, creation_date, validation_date,
            value, latitude, longitude
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&reporting.vessel.internal_reference_number)
    .bind(&reporting.vessel.external_reference_number)
    .bind(&reporting.vessel.ircs)
    .bind(reporting.vessel.vessel_identifier.as_str())
    .bind(&reporting.vessel_name)
    .bind(reporting.vessel_id)
    .bind(&reporting.flag_state)
    .bind(reporting.value.reporting_type().as_str())
    .bind(format_timestamp(&reporting.creation_date))
    .bind(reporting.validation_date.as_ref().map(format_timestamp))
    .bind(reporting.value.encode()?)
    .bind(reporting.latitude)
    .bind(reporting.longitude)
    .execute(&mut **tx)
    .await?;

    Ok(result.last_insert_rowid())
}

#[async_trait]
impl ReportingRepository for SqliteStore {
    async fn save(&self, reporting: &NewReporting) -> Result<Reporting> {
        let mut tx = self.pool.begin().await?;
        let id = insert_reporting(&mut tx, reporting).await?;
        tx.commit().await?;

        self.find_by_id(id).await?.ok_or(Error::ReportingNotFound { id })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Reporting>> {
        let row = sqlx::query("SELECT * FROM reportings WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(reporting_from_row).transpose()
    }

    async fn find_all_current(&self) -> Result<Vec<Reporting>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM reportings
            WHERE is_archived = 0 AND is_deleted = 0
            ORDER BY creation_date DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(reporting_from_row).collect()
    }

    async fn find_current_and_archived_by_vessel(
        &self,
        identifier: VesselIdentifier,
        value: &str,
        from: DateTime<Utc>,
    ) -> Result<Vec<Reporting>> {
        let sql = format!(
            r#"
            SELECT * FROM reportings
            WHERE {} = ? AND creation_date >= ? AND is_deleted = 0
            ORDER BY creation_date DESC, id DESC
            "#,
            identity_column(identifier)
        );
        let rows = sqlx::query(&sql)
            .bind(value)
            .bind(format_timestamp(&from))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(reporting_from_row).collect()
    }

    async fn archive(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE reportings SET is_archived = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE reportings SET is_deleted = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_value(&self, id: i64, value: &ReportingValue) -> Result<()> {
        let result = sqlx::query("UPDATE reportings SET type = ?, value = ? WHERE id = ?")
            .bind(value.reporting_type().as_str())
            .bind(value.encode()?)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::ReportingNotFound { id });
        }
        Ok(())
    }
}
