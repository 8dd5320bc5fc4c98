//! Vessel, position, fleet segment and control lookups

use super::{identity_column, timestamp, SqliteStore};
use crate::repositories::{
    ControlRepository, FleetSegmentRepository, LastPositionRepository, PositionRepository, VesselRepository,
};
use crate::risk::{Control, FleetSegment};
use crate::vessel::model::{Position, Vessel};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fmon_common::time::format_timestamp;
use fmon_common::{VesselIdentifier, VesselIdentity};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

fn vessel_from_row(row: &SqliteRow) -> Result<Vessel> {
    Ok(Vessel {
        id: row.try_get("id")?,
        internal_reference_number: row.try_get("internal_reference_number")?,
        external_reference_number: row.try_get("external_reference_number")?,
        ircs: row.try_get("ircs")?,
        mmsi: row.try_get("mmsi")?,
        vessel_name: row.try_get("vessel_name")?,
        flag_state: row.try_get("flag_state")?,
        district: row.try_get("district")?,
        length: row.try_get("length")?,
        gauge: row.try_get("gauge")?,
        power: row.try_get("power")?,
        under_charter: row.try_get("under_charter")?,
    })
}

fn position_from_row(row: &SqliteRow) -> Result<Position> {
    Ok(Position {
        id: row.try_get("id")?,
        internal_reference_number: row.try_get("internal_reference_number")?,
        external_reference_number: row.try_get("external_reference_number")?,
        ircs: row.try_get("ircs")?,
        vessel_name: row.try_get("vessel_name")?,
        flag_state: row.try_get("flag_state")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        speed: row.try_get("speed")?,
        course: row.try_get("course")?,
        date_time: timestamp(row, "date_time")?,
        is_manual: row.try_get("is_manual")?,
    })
}

fn segment_from_row(row: &SqliteRow) -> Result<FleetSegment> {
    Ok(FleetSegment {
        segment: row.try_get("segment")?,
        segment_name: row.try_get("segment_name")?,
        impact_risk_factor: row.try_get("impact_risk_factor")?,
    })
}

fn control_from_row(row: &SqliteRow) -> Result<Control> {
    Ok(Control {
        internal_reference_number: row.try_get("internal_reference_number")?,
        control_date_time: timestamp(row, "control_datetime")?,
        number_of_infractions: row.try_get("number_of_infractions")?,
    })
}

#[async_trait]
impl VesselRepository for SqliteStore {
    async fn find_vessel(&self, identity: &VesselIdentity) -> Result<Option<Vessel>> {
        let (identifier, value) = identity.lookup_key()?;
        let sql = format!(
            "SELECT * FROM vessels WHERE {} = ? ORDER BY id LIMIT 1",
            identity_column(identifier)
        );
        let row = sqlx::query(&sql).bind(value).fetch_optional(&self.pool).await?;

        row.as_ref().map(vessel_from_row).transpose()
    }
}

#[async_trait]
impl PositionRepository for SqliteStore {
    async fn find_vessel_positions(
        &self,
        identity: &VesselIdentity,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Position>> {
        let (identifier, value) = identity.lookup_key()?;
        let sql = format!(
            r#"
            SELECT * FROM positions
            WHERE {} = ? AND date_time >= ? AND date_time <= ?
            ORDER BY date_time
            "#,
            identity_column(identifier)
        );
        let rows = sqlx::query(&sql)
            .bind(value)
            .bind(format_timestamp(&from))
            .bind(format_timestamp(&to))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(position_from_row).collect()
    }
}

#[async_trait]
impl LastPositionRepository for SqliteStore {
    async fn find_under_charter_for_vessel(
        &self,
        identifier: VesselIdentifier,
        value: &str,
    ) -> Result<Option<bool>> {
        let sql = format!(
            "SELECT under_charter FROM last_positions WHERE {} = ? ORDER BY date_time DESC LIMIT 1",
            identity_column(identifier)
        );
        let under_charter = sqlx::query_scalar::<_, bool>(&sql).bind(value).fetch_optional(&self.pool).await?;

        Ok(under_charter)
    }
}

#[async_trait]
impl FleetSegmentRepository for SqliteStore {
    async fn find_current_segments(&self, cfr: &str) -> Result<Vec<FleetSegment>> {
        let rows = sqlx::query(
            r#"
            SELECT f.segment, f.segment_name, f.impact_risk_factor
            FROM vessel_segments v
            JOIN fleet_segments f ON f.segment = v.segment
            WHERE v.internal_reference_number = ?
            ORDER BY f.segment
            "#,
        )
        .bind(cfr)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(segment_from_row).collect()
    }
}

#[async_trait]
impl ControlRepository for SqliteStore {
    async fn find_controls_since(&self, cfr: &str, since: DateTime<Utc>) -> Result<Vec<Control>> {
        let rows = sqlx::query(
            r#"
            SELECT internal_reference_number, control_datetime, number_of_infractions
            FROM controls
            WHERE internal_reference_number = ? AND control_datetime >= ?
            ORDER BY control_datetime DESC
            "#,
        )
        .bind(cfr)
        .bind(format_timestamp(&since))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(control_from_row).collect()
    }
}
