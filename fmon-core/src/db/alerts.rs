//! Pending and silenced alert operations

use super::reportings::insert_reporting;
use super::{identity_column, identity_from_row, optional_timestamp, timestamp, SqliteStore};
use crate::alerts::model::{PendingAlert, SilencedAlert};
use crate::alerts::silence::SilenceWindow;
use crate::reporting::model::Reporting;
use crate::repositories::{PendingAlertRepository, ReportingRepository, SilencedAlertRepository};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fmon_common::time::format_timestamp;
use fmon_common::VesselIdentity;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

fn pending_alert_from_row(row: &SqliteRow) -> Result<PendingAlert> {
    let value: String = row.try_get("value")?;
    Ok(PendingAlert {
        id: row.try_get("id")?,
        vessel: identity_from_row(row)?,
        vessel_name: row.try_get("vessel_name")?,
        vessel_id: row.try_get("vessel_id")?,
        flag_state: row.try_get("flag_state")?,
        trip_number: row.try_get("trip_number")?,
        creation_date: timestamp(row, "creation_date")?,
        value: serde_json::from_str(&value)?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        alert_config_name: row.try_get("alert_config_name")?,
    })
}

fn silenced_alert_from_row(row: &SqliteRow) -> Result<SilencedAlert> {
    let value: String = row.try_get("value")?;
    Ok(SilencedAlert {
        id: row.try_get("id")?,
        vessel: identity_from_row(row)?,
        vessel_name: row.try_get("vessel_name")?,
        flag_state: row.try_get("flag_state")?,
        value: serde_json::from_str(&value)?,
        silenced_after_date: optional_timestamp(row, "silenced_after_date")?,
        silenced_before_date: timestamp(row, "silenced_before_date")?,
        is_reactivated: row.try_get("is_reactivated")?,
    })
}

async fn insert_pending_alert(tx: &mut Transaction<'_, Sqlite>, alert: &PendingAlert) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO pending_alerts (
            internal_reference_number, external_reference_number, ircs, vessel_identifier,
            vessel_name, vessel_id, flag_state, trip_number, creation_date, value,
            latitude, longitude, alert_config_name
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&alert.vessel.internal_reference_number)
    .bind(&alert.vessel.external_reference_number)
    .bind(&alert.vessel.ircs)
    .bind(alert.vessel.vessel_identifier.as_str())
    .bind(&alert.vessel_name)
    .bind(alert.vessel_id)
    .bind(&alert.flag_state)
    .bind(&alert.trip_number)
    .bind(format_timestamp(&alert.creation_date))
    .bind(serde_json::to_string(&alert.value)?)
    .bind(alert.latitude)
    .bind(alert.longitude)
    .bind(&alert.alert_config_name)
    .execute(&mut **tx)
    .await?;

    Ok(result.last_insert_rowid())
}

#[async_trait]
impl PendingAlertRepository for SqliteStore {
    async fn save(&self, alert: &PendingAlert) -> Result<i64> {
        let mut tx = self.pool.begin().await?;
        let id = insert_pending_alert(&mut tx, alert).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn find(&self, id: i64) -> Result<Option<PendingAlert>> {
        let row = sqlx::query("SELECT * FROM pending_alerts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(pending_alert_from_row).transpose()
    }

    async fn find_all(&self) -> Result<Vec<PendingAlert>> {
        let rows = sqlx::query("SELECT * FROM pending_alerts ORDER BY creation_date DESC, id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(pending_alert_from_row).collect()
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM pending_alerts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn validate(&self, id: i64, validation_date: DateTime<Utc>) -> Result<Option<Reporting>> {
        let mut tx = self.pool.begin().await?;
        let Some(alert) = take_pending_alert(&mut tx, id).await? else {
            return Ok(None);
        };
        let reporting_id = insert_reporting(&mut tx, &alert.into_reporting(validation_date)).await?;
        tx.commit().await?;

        self.find_by_id(reporting_id)
            .await?
            .ok_or(Error::ReportingNotFound { id: reporting_id })
            .map(Some)
    }

    async fn silence(&self, id: i64, window: &SilenceWindow) -> Result<Option<SilencedAlert>> {
        let mut tx = self.pool.begin().await?;
        let Some(alert) = take_pending_alert(&mut tx, id).await? else {
            return Ok(None);
        };
        let silenced_id = insert_silenced_alert(&mut tx, &alert.into_silenced(window)).await?;
        tx.commit().await?;

        self.find_silenced_alert(silenced_id).await.map(Some)
    }

    async fn replace_for_config(&self, alert_config_name: &str, alerts: &[PendingAlert]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM pending_alerts WHERE alert_config_name = ?")
            .bind(alert_config_name)
            .execute(&mut *tx)
            .await?;

        for alert in alerts {
            insert_pending_alert(&mut tx, alert).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn exists_for_vessel(&self, identity: &VesselIdentity) -> Result<bool> {
        let (identifier, value) = identity.lookup_key()?;
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM pending_alerts WHERE {} = ?)",
            identity_column(identifier)
        );
        let exists: bool = sqlx::query_scalar(&sql).bind(value).fetch_one(&self.pool).await?;

        Ok(exists)
    }
}

async fn insert_silenced_alert(tx: &mut Transaction<'_, Sqlite>, alert: &SilencedAlert) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO silenced_alerts (
            internal_reference_number, external_reference_number, ircs, vessel_identifier,
            vessel_name, flag_state, value, silenced_after_date, silenced_before_date, is_reactivated
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&alert.vessel.internal_reference_number)
    .bind(&alert.vessel.external_reference_number)
    .bind(&alert.vessel.ircs)
    .bind(alert.vessel.vessel_identifier.as_str())
    .bind(&alert.vessel_name)
    .bind(&alert.flag_state)
    .bind(serde_json::to_string(&alert.value)?)
    .bind(alert.silenced_after_date.as_ref().map(format_timestamp))
    .bind(format_timestamp(&alert.silenced_before_date))
    .bind(alert.is_reactivated)
    .execute(&mut **tx)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Remove a pending alert inside `tx`, returning it when it was still pending
async fn take_pending_alert(tx: &mut Transaction<'_, Sqlite>, id: i64) -> Result<Option<PendingAlert>> {
    let row = sqlx::query("DELETE FROM pending_alerts WHERE id = ? RETURNING *")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

    row.as_ref().map(pending_alert_from_row).transpose()
}

impl SqliteStore {
    async fn find_silenced_alert(&self, id: i64) -> Result<SilencedAlert> {
        let row = sqlx::query("SELECT * FROM silenced_alerts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::SilencedAlertNotFound { id })?;

        silenced_alert_from_row(&row)
    }
}

#[async_trait]
impl SilencedAlertRepository for SqliteStore {
    async fn save(&self, alert: &SilencedAlert) -> Result<SilencedAlert> {
        let mut tx = self.pool.begin().await?;
        let id = insert_silenced_alert(&mut tx, alert).await?;
        tx.commit().await?;

        self.find_silenced_alert(id).await
    }

    async fn find_all_active(&self, now: DateTime<Utc>) -> Result<Vec<SilencedAlert>> {
        let now = format_timestamp(&now);
        let rows = sqlx::query(
            r#"
            SELECT * FROM silenced_alerts
            WHERE is_reactivated = 0
              AND silenced_before_date > ?
              AND (silenced_after_date IS NULL OR silenced_after_date <= ?)
            ORDER BY silenced_before_date, id
            "#,
        )
        .bind(&now)
        .bind(&now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(silenced_alert_from_row).collect()
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM silenced_alerts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reactivate(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE silenced_alerts SET is_reactivated = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
