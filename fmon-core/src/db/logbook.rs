//! Logbook operations

use super::{optional_timestamp, text_enum, timestamp, SqliteStore};
use crate::logbook::model::{LogbookMessage, LogbookMessageValue, LogbookOperationType, VoyageDatesAndTripNumber};
use crate::repositories::{LogbookRawMessageRepository, LogbookReportRepository};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fmon_common::time::format_timestamp;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::HashSet;

const TRIPS_QUERY: &str = r#"
    SELECT trip_number,
           MIN(operation_datetime) AS start_date,
           MAX(operation_datetime) AS end_date
    FROM logbook_reports
    WHERE cfr = ? AND trip_number IS NOT NULL
    GROUP BY trip_number
"#;

fn trip_from_row(row: &SqliteRow) -> Result<VoyageDatesAndTripNumber> {
    Ok(VoyageDatesAndTripNumber {
        trip_number: row.try_get("trip_number")?,
        start_date: timestamp(row, "start_date")?,
        end_date: timestamp(row, "end_date")?,
    })
}

fn message_from_row(row: &SqliteRow) -> Result<LogbookMessage> {
    let operation_type: LogbookOperationType = text_enum(row, "operation_type")?;
    let message_type: Option<String> = row.try_get("message_type")?;
    let value: Option<String> = row.try_get("value")?;
    let analyzed_by_rules: String = row.try_get("analyzed_by_rules")?;

    let message = match value {
        Some(json) => Some(LogbookMessageValue::decode(
            operation_type,
            message_type.as_deref(),
            serde_json::from_str(&json)?,
        )?),
        None => None,
    };

    let mut logbook_message = LogbookMessage::new(
        row.try_get::<String, _>("operation_number")?,
        operation_type,
        timestamp(row, "operation_datetime")?,
        text_enum(row, "transmission_format")?,
    );
    logbook_message.id = row.try_get("id")?;
    logbook_message.trip_number = row.try_get("trip_number")?;
    logbook_message.report_id = row.try_get("report_id")?;
    logbook_message.referenced_report_id = row.try_get("referenced_report_id")?;
    logbook_message.report_date_time = optional_timestamp(row, "report_datetime")?;
    logbook_message.internal_reference_number = row.try_get("cfr")?;
    logbook_message.external_reference_number = row.try_get("external_identification")?;
    logbook_message.ircs = row.try_get("ircs")?;
    logbook_message.vessel_name = row.try_get("vessel_name")?;
    logbook_message.flag_state = row.try_get("flag_state")?;
    logbook_message.message_type = message_type;
    logbook_message.message = message;
    logbook_message.analyzed_by_rules = serde_json::from_str(&analyzed_by_rules)?;
    logbook_message.software = row.try_get("software")?;
    Ok(logbook_message)
}

#[async_trait]
impl LogbookReportRepository for SqliteStore {
    async fn find_last_trip_before(
        &self,
        cfr: &str,
        before: DateTime<Utc>,
    ) -> Result<Option<VoyageDatesAndTripNumber>> {
        let sql = format!(
            "SELECT * FROM ({}) WHERE start_date <= ? ORDER BY start_date DESC LIMIT 1",
            TRIPS_QUERY
        );
        let row = sqlx::query(&sql)
            .bind(cfr)
            .bind(format_timestamp(&before))
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(trip_from_row).transpose()
    }

    async fn find_trip_before(&self, cfr: &str, trip_number: &str) -> Result<Option<VoyageDatesAndTripNumber>> {
        let sql = format!(
            r#"
            WITH trips AS ({})
            SELECT * FROM trips
            WHERE start_date < (SELECT start_date FROM trips WHERE trip_number = ?)
            ORDER BY start_date DESC LIMIT 1
            "#,
            TRIPS_QUERY
        );
        let row = sqlx::query(&sql)
            .bind(cfr)
            .bind(trip_number)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(trip_from_row).transpose()
    }

    async fn find_trip_after(&self, cfr: &str, trip_number: &str) -> Result<Option<VoyageDatesAndTripNumber>> {
        let sql = format!(
            r#"
            WITH trips AS ({})
            SELECT * FROM trips
            WHERE start_date > (SELECT start_date FROM trips WHERE trip_number = ?)
            ORDER BY start_date ASC LIMIT 1
            "#,
            TRIPS_QUERY
        );
        let row = sqlx::query(&sql)
            .bind(cfr)
            .bind(trip_number)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(trip_from_row).transpose()
    }

    async fn find_all_messages_by_trip_number_between_dates(
        &self,
        cfr: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        trip_number: &str,
    ) -> Result<Vec<LogbookMessage>> {
        let trip_rows = sqlx::query(
            r#"
            SELECT * FROM logbook_reports
            WHERE cfr = ? AND trip_number = ?
              AND operation_datetime >= ? AND operation_datetime <= ?
            "#,
        )
        .bind(cfr)
        .bind(trip_number)
        .bind(format_timestamp(&from))
        .bind(format_timestamp(&to))
        .fetch_all(&self.pool)
        .await?;

        let mut messages = trip_rows.iter().map(message_from_row).collect::<Result<Vec<_>>>()?;

        // RET/DEL/COR operations are not always tagged with the trip number.
        // Corrections extend the set of report ids, so acknowledgments of an
        // untagged COR are fetched too.
        let referencing_rows = sqlx::query(
            r#"
            WITH RECURSIVE trip_reports(report_id) AS (
                SELECT report_id FROM logbook_reports
                WHERE cfr = ? AND trip_number = ? AND report_id IS NOT NULL
                UNION
                SELECT r.report_id FROM logbook_reports r
                JOIN trip_reports t ON r.referenced_report_id = t.report_id
                WHERE r.operation_type = 'COR' AND r.report_id IS NOT NULL
            )
            SELECT r.* FROM logbook_reports r
            WHERE r.operation_type IN ('RET', 'DEL', 'COR')
              AND r.referenced_report_id IN (SELECT report_id FROM trip_reports)
            "#,
        )
        .bind(cfr)
        .bind(trip_number)
        .fetch_all(&self.pool)
        .await?;

        let mut seen: HashSet<String> = messages.iter().map(|m| m.operation_number.clone()).collect();
        for row in &referencing_rows {
            let message = message_from_row(row)?;
            if seen.insert(message.operation_number.clone()) {
                messages.push(message);
            }
        }

        Ok(messages)
    }

    async fn find_by_report_id(&self, report_id: &str) -> Result<Option<LogbookMessage>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM logbook_reports
            WHERE report_id = ?
            ORDER BY operation_datetime, operation_number
            LIMIT 1
            "#,
        )
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(message_from_row).transpose()
    }

    async fn save(&self, message: &LogbookMessage) -> Result<()> {
        let value = match &message.message {
            Some(value) => Some(serde_json::to_string(value)?),
            None => None,
        };
        let analyzed_by_rules = serde_json::to_string(&message.analyzed_by_rules)?;

        sqlx::query(
            r#"
            INSERT INTO logbook_reports (
                operation_number, trip_number, operation_type, report_id,
                referenced_report_id, operation_datetime, report_datetime,
                cfr, ircs, external_identification, vessel_name, flag_state,
                message_type, value, analyzed_by_rules, transmission_format, software
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.operation_number)
        .bind(&message.trip_number)
        .bind(message.operation_type.as_str())
        .bind(&message.report_id)
        .bind(&message.referenced_report_id)
        .bind(format_timestamp(&message.operation_date_time))
        .bind(message.report_date_time.as_ref().map(format_timestamp))
        .bind(&message.internal_reference_number)
        .bind(&message.ircs)
        .bind(&message.external_reference_number)
        .bind(&message.vessel_name)
        .bind(&message.flag_state)
        .bind(&message.message_type)
        .bind(value)
        .bind(analyzed_by_rules)
        .bind(message.transmission_format.as_str())
        .bind(&message.software)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl LogbookRawMessageRepository for SqliteStore {
    async fn find_raw_message(&self, operation_number: &str) -> Result<Option<String>> {
        let raw = sqlx::query_scalar::<_, String>("SELECT xml_message FROM logbook_raw_messages WHERE operation_number = ?")
            .bind(operation_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(raw)
    }
}
