//! Test Helper Utilities
//!
//! In-memory store with the production schema plus fixtures shared by the
//! integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use fmon_common::db::init::create_schema;
use fmon_common::VesselIdentity;
use fmon_core::alerts::model::{AlertType, PendingAlert, ZoneAlert};
use fmon_core::beacon::model::{BeaconStatus, NewBeaconMalfunction, VesselStatus};
use fmon_core::db::SqliteStore;
use fmon_core::logbook::model::{LogbookMessage, LogbookMessageValue, LogbookOperationType, LogbookTransmissionFormat};
use fmon_core::reporting::model::{NewReporting, Observation, ReportingActor, ReportingValue};
use sqlx::sqlite::SqlitePoolOptions;

pub const CFR: &str = "FR224226850";
pub const EXTERNAL_REFERENCE: &str = "DONTSINK";
pub const IRCS: &str = "FQ7058";

/// Store on a single-connection in-memory database
pub async fn memory_store() -> SqliteStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();
    SqliteStore::new(pool)
}

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

/// Identity carrying all three references, resolved by CFR
pub fn vessel_identity() -> VesselIdentity {
    VesselIdentity {
        internal_reference_number: Some(CFR.to_string()),
        external_reference_number: Some(EXTERNAL_REFERENCE.to_string()),
        ircs: Some(IRCS.to_string()),
        ..VesselIdentity::by_internal_reference_number(CFR)
    }
}

pub fn three_miles_trawling(sea_front: &str) -> AlertType {
    AlertType::ThreeMilesTrawlingAlert(ZoneAlert {
        sea_front: Some(sea_front.to_string()),
        flag_state: Some("FR".to_string()),
        risk_factor: Some(2.5),
    })
}

pub fn pending_alert(vessel: VesselIdentity, value: AlertType, creation_date: DateTime<Utc>) -> PendingAlert {
    PendingAlert {
        id: None,
        vessel,
        vessel_name: Some("PLACE SPECTACLE SUBIR".to_string()),
        vessel_id: Some(123),
        flag_state: Some("FR".to_string()),
        trip_number: Some("123456".to_string()),
        creation_date,
        value,
        latitude: Some(47.5),
        longitude: Some(-3.2),
        alert_config_name: None,
    }
}

pub fn observation(vessel: VesselIdentity, creation_date: DateTime<Utc>) -> NewReporting {
    NewReporting {
        vessel,
        vessel_name: Some("PLACE SPECTACLE SUBIR".to_string()),
        vessel_id: Some(123),
        flag_state: Some("FR".to_string()),
        creation_date,
        validation_date: None,
        value: ReportingValue::Observation(Observation {
            reporting_actor: ReportingActor::Ops,
            unit: None,
            author_trigram: Some("LTH".to_string()),
            author_contact: None,
            title: "Navire en pêche dans la zone".to_string(),
            description: None,
            sea_front: Some("NAMO".to_string()),
            flag_state: Some("FR".to_string()),
            dml: None,
        }),
        latitude: None,
        longitude: None,
    }
}

pub fn new_beacon_malfunction(vessel: VesselIdentity, start: DateTime<Utc>) -> NewBeaconMalfunction {
    NewBeaconMalfunction {
        vessel,
        vessel_name: "PLACE SPECTACLE SUBIR".to_string(),
        flag_state: Some("FR".to_string()),
        vessel_id: Some(123),
        vessel_status: VesselStatus::AtSea,
        malfunction_start_date_time: start,
        beacon_number: "FGEDX85".to_string(),
        beacon_status_at_malfunction_creation: BeaconStatus::Activated,
    }
}

/// Logbook operation of the test vessel
pub fn operation(
    operation_number: &str,
    operation_type: LogbookOperationType,
    operation_date_time: DateTime<Utc>,
    transmission_format: LogbookTransmissionFormat,
) -> LogbookMessage {
    let mut message = LogbookMessage::new(operation_number, operation_type, operation_date_time, transmission_format);
    message.internal_reference_number = Some(CFR.to_string());
    message.external_reference_number = Some(EXTERNAL_REFERENCE.to_string());
    message.ircs = Some(IRCS.to_string());
    message.vessel_name = Some("PHENOMENE".to_string());
    message.flag_state = Some("FRA".to_string());
    message
}

pub fn declaration(
    operation_number: &str,
    trip_number: &str,
    report_id: &str,
    operation_date_time: DateTime<Utc>,
    message_type: &str,
    value: LogbookMessageValue,
) -> LogbookMessage {
    let mut message = operation(
        operation_number,
        LogbookOperationType::Dat,
        operation_date_time,
        LogbookTransmissionFormat::Ers,
    );
    message.trip_number = Some(trip_number.to_string());
    message.report_id = Some(report_id.to_string());
    message.message_type = Some(message_type.to_string());
    message.message = Some(value);
    message
}

pub async fn seed_species(store: &SqliteStore, code: &str, name: &str) {
    sqlx::query("INSERT INTO species (code, name) VALUES (?, ?)")
        .bind(code)
        .bind(name)
        .execute(store.pool())
        .await
        .unwrap();
}

pub async fn seed_gear(store: &SqliteStore, code: &str, name: &str) {
    sqlx::query("INSERT INTO gears (code, name) VALUES (?, ?)")
        .bind(code)
        .bind(name)
        .execute(store.pool())
        .await
        .unwrap();
}

pub async fn seed_port(store: &SqliteStore, locode: &str, name: &str) {
    sqlx::query("INSERT INTO ports (locode, name) VALUES (?, ?)")
        .bind(locode)
        .bind(name)
        .execute(store.pool())
        .await
        .unwrap();
}

pub async fn seed_infraction(store: &SqliteStore, natinf_code: i32, infraction: &str) {
    sqlx::query("INSERT INTO infractions (natinf_code, infraction_category, infraction) VALUES (?, 'Pêche', ?)")
        .bind(natinf_code)
        .bind(infraction)
        .execute(store.pool())
        .await
        .unwrap();
}

pub async fn seed_last_position(store: &SqliteStore, cfr: &str, date_time: &str, under_charter: bool) {
    sqlx::query(
        r#"
        INSERT INTO last_positions (internal_reference_number, latitude, longitude, date_time, under_charter)
        VALUES (?, 47.5, -3.2, ?, ?)
        "#,
    )
    .bind(cfr)
    .bind(date_time)
    .bind(under_charter)
    .execute(store.pool())
    .await
    .unwrap();
}
