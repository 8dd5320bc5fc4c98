//! Beacon malfunction operations

use super::{identity_column, identity_from_row, optional_text_enum, optional_timestamp, text_enum, timestamp, SqliteStore};
use crate::beacon::model::{
    BeaconMalfunction, BeaconMalfunctionAction, BeaconMalfunctionComment, BeaconMalfunctionNotification,
    BeaconMalfunctionNotificationType, NewBeaconMalfunction, Stage,
};
use crate::repositories::BeaconMalfunctionRepository;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fmon_common::time::format_timestamp;
use fmon_common::VesselIdentifier;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

fn beacon_malfunction_from_row(row: &SqliteRow) -> Result<BeaconMalfunction> {
    Ok(BeaconMalfunction {
        id: row.try_get("id")?,
        vessel: identity_from_row(row)?,
        vessel_name: row.try_get("vessel_name")?,
        flag_state: row.try_get("flag_state")?,
        vessel_id: row.try_get("vessel_id")?,
        vessel_status: text_enum(row, "vessel_status")?,
        stage: text_enum(row, "stage")?,
        malfunction_start_date_time: timestamp(row, "malfunction_start_date_utc")?,
        malfunction_end_date_time: optional_timestamp(row, "malfunction_end_date_utc")?,
        vessel_status_last_modification_date_time: timestamp(row, "vessel_status_last_modification_date_utc")?,
        end_of_beacon_malfunction_reason: optional_text_enum(row, "end_of_malfunction_reason")?,
        beacon_number: row.try_get("beacon_number")?,
        beacon_status_at_malfunction_creation: text_enum(row, "beacon_status_at_malfunction_creation")?,
        notification_requested: optional_text_enum(row, "notification_requested")?,
    })
}

fn action_from_row(row: &SqliteRow) -> Result<BeaconMalfunctionAction> {
    Ok(BeaconMalfunctionAction {
        beacon_malfunction_id: row.try_get("beacon_malfunction_id")?,
        property_name: text_enum(row, "property_name")?,
        previous_value: row.try_get("previous_value")?,
        next_value: row.try_get("next_value")?,
        date_time: timestamp(row, "date_time_utc")?,
    })
}

fn comment_from_row(row: &SqliteRow) -> Result<BeaconMalfunctionComment> {
    Ok(BeaconMalfunctionComment {
        beacon_malfunction_id: row.try_get("beacon_malfunction_id")?,
        comment: row.try_get("comment")?,
        user_type: text_enum(row, "user_type")?,
        date_time: timestamp(row, "date_time_utc")?,
    })
}

fn notification_from_row(row: &SqliteRow) -> Result<BeaconMalfunctionNotification> {
    Ok(BeaconMalfunctionNotification {
        id: row.try_get("id")?,
        beacon_malfunction_id: row.try_get("beacon_malfunction_id")?,
        date_time_utc: timestamp(row, "date_time_utc")?,
        notification_type: text_enum(row, "notification_type")?,
        communication_means: text_enum(row, "communication_means")?,
        recipient_function: text_enum(row, "recipient_function")?,
        recipient_name: row.try_get("recipient_name")?,
        recipient_address_or_number: row.try_get("recipient_address_or_number")?,
        success: row.try_get("success")?,
        error_message: row.try_get("error_message")?,
    })
}

#[async_trait]
impl BeaconMalfunctionRepository for SqliteStore {
    async fn find(&self, id: i64) -> Result<Option<BeaconMalfunction>> {
        let row = sqlx::query("SELECT * FROM beacon_malfunctions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(beacon_malfunction_from_row).transpose()
    }

    async fn find_all_except_end_of_follow_up(&self) -> Result<Vec<BeaconMalfunction>> {
        let rows = sqlx::query("SELECT * FROM beacon_malfunctions WHERE stage != ? ORDER BY id")
            .bind(Stage::Archived.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(beacon_malfunction_from_row).collect()
    }

    async fn find_last_thirty_end_of_follow_up(&self) -> Result<Vec<BeaconMalfunction>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM beacon_malfunctions
            WHERE stage = ?
            ORDER BY malfunction_end_date_utc DESC
            LIMIT 30
            "#,
        )
        .bind(Stage::Archived.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(beacon_malfunction_from_row).collect()
    }

    async fn find_all_by_vessel(
        &self,
        identifier: VesselIdentifier,
        value: &str,
        after: DateTime<Utc>,
    ) -> Result<Vec<BeaconMalfunction>> {
        let sql = format!(
            r#"
            SELECT * FROM beacon_malfunctions
            WHERE {} = ? AND malfunction_start_date_utc >= ?
            ORDER BY malfunction_start_date_utc DESC
            "#,
            identity_column(identifier)
        );
        let rows = sqlx::query(&sql)
            .bind(value)
            .bind(format_timestamp(&after))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(beacon_malfunction_from_row).collect()
    }

    async fn create(&self, new: &NewBeaconMalfunction) -> Result<BeaconMalfunction> {
        let start = format_timestamp(&new.malfunction_start_date_time);
        let result = sqlx::query(
            r#"
            INSERT INTO beacon_malfunctions (
                internal_reference_number, external_reference_number, ircs, vessel_identifier,
                vessel_name, flag_state, vessel_id, vessel_status, stage,
                malfunction_start_date_utc, vessel_status_last_modification_date_utc,
                beacon_number, beacon_status_at_malfunction_creation
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.vessel.internal_reference_number)
        .bind(&new.vessel.external_reference_number)
        .bind(&new.vessel.ircs)
        .bind(new.vessel.vessel_identifier.as_str())
        .bind(&new.vessel_name)
        .bind(&new.flag_state)
        .bind(new.vessel_id)
        .bind(new.vessel_status.as_str())
        .bind(Stage::InitialEncounter.as_str())
        .bind(&start)
        .bind(&start)
        .bind(&new.beacon_number)
        .bind(new.beacon_status_at_malfunction_creation.as_str())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(id, vessel_name = %new.vessel_name, "Created beacon malfunction");

        self.find(id)
            .await?
            .ok_or(Error::BeaconMalfunctionNotFound { id })
    }

    async fn apply_update(
        &self,
        previous: &BeaconMalfunction,
        updated: &BeaconMalfunction,
        actions: &[BeaconMalfunctionAction],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Only overwrite the row the update was planned from
        let result = sqlx::query(
            r#"
            UPDATE beacon_malfunctions
            SET vessel_status = ?,
                stage = ?,
                malfunction_end_date_utc = ?,
                vessel_status_last_modification_date_utc = ?,
                end_of_malfunction_reason = ?
            WHERE id = ?
              AND vessel_status = ?
              AND stage = ?
              AND malfunction_end_date_utc IS ?
              AND vessel_status_last_modification_date_utc = ?
              AND end_of_malfunction_reason IS ?
            "#,
        )
        .bind(updated.vessel_status.as_str())
        .bind(updated.stage.as_str())
        .bind(updated.malfunction_end_date_time.as_ref().map(format_timestamp))
        .bind(format_timestamp(&updated.vessel_status_last_modification_date_time))
        .bind(updated.end_of_beacon_malfunction_reason.map(|r| r.as_str()))
        .bind(previous.id)
        .bind(previous.vessel_status.as_str())
        .bind(previous.stage.as_str())
        .bind(previous.malfunction_end_date_time.as_ref().map(format_timestamp))
        .bind(format_timestamp(&previous.vessel_status_last_modification_date_time))
        .bind(previous.end_of_beacon_malfunction_reason.map(|r| r.as_str()))
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM beacon_malfunctions WHERE id = ?)")
                .bind(previous.id)
                .fetch_one(&mut *tx)
                .await?;
            if !exists {
                return Err(Error::BeaconMalfunctionNotFound { id: previous.id });
            }
            return Err(Error::CouldNotUpdateBeaconMalfunction(format!(
                "beacon malfunction {} was modified since it was read",
                previous.id
            )));
        }

        for action in actions {
            sqlx::query(
                r#"
                INSERT INTO beacon_malfunction_actions (
                    beacon_malfunction_id, property_name, previous_value, next_value, date_time_utc
                ) VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(action.beacon_malfunction_id)
            .bind(action.property_name.as_str())
            .bind(&action.previous_value)
            .bind(&action.next_value)
            .bind(format_timestamp(&action.date_time))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn request_notification(
        &self,
        id: i64,
        notification_type: BeaconMalfunctionNotificationType,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE beacon_malfunctions SET notification_requested = ? WHERE id = ?")
            .bind(notification_type.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::BeaconMalfunctionNotFound { id });
        }
        Ok(())
    }

    async fn find_actions(&self, id: i64) -> Result<Vec<BeaconMalfunctionAction>> {
        let rows = sqlx::query(
            "SELECT * FROM beacon_malfunction_actions WHERE beacon_malfunction_id = ? ORDER BY date_time_utc, id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(action_from_row).collect()
    }

    async fn find_comments(&self, id: i64) -> Result<Vec<BeaconMalfunctionComment>> {
        let rows = sqlx::query(
            "SELECT * FROM beacon_malfunction_comments WHERE beacon_malfunction_id = ? ORDER BY date_time_utc, id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(comment_from_row).collect()
    }

    async fn save_comment(&self, comment: &BeaconMalfunctionComment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO beacon_malfunction_comments (beacon_malfunction_id, comment, user_type, date_time_utc)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(comment.beacon_malfunction_id)
        .bind(&comment.comment)
        .bind(comment.user_type.as_str())
        .bind(format_timestamp(&comment.date_time))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_notifications(&self, id: i64) -> Result<Vec<BeaconMalfunctionNotification>> {
        let rows = sqlx::query(
            "SELECT * FROM beacon_malfunction_notifications WHERE beacon_malfunction_id = ? ORDER BY date_time_utc, id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(notification_from_row).collect()
    }
}
