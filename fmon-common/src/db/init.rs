//! Database initialization
//!
//! Creates the database file on first run, applies connection pragmas and
//! creates every table idempotently before running versioned migrations.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table and run pending migrations (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;

    // Reference data
    create_species_table(pool).await?;
    create_gears_table(pool).await?;
    create_ports_table(pool).await?;
    create_infractions_table(pool).await?;

    // Vessels, positions and segments
    create_vessels_table(pool).await?;
    create_positions_table(pool).await?;
    create_last_positions_table(pool).await?;
    create_fleet_segments_tables(pool).await?;
    create_controls_table(pool).await?;

    // Logbook
    create_logbook_tables(pool).await?;

    // Alert and reporting lifecycle
    create_pending_alerts_table(pool).await?;
    create_silenced_alerts_table(pool).await?;
    create_reportings_table(pool).await?;

    // Beacon malfunctions
    create_beacon_malfunctions_tables(pool).await?;

    crate::db::migrations::run_migrations(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_species_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS species (
            code TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_gears_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS gears (
            code TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_ports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ports (
            locode TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            facade TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// NATINF infraction codes
pub async fn create_infractions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS infractions (
            natinf_code INTEGER PRIMARY KEY,
            regulation TEXT,
            infraction_category TEXT,
            infraction TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_vessels_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vessels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            internal_reference_number TEXT,
            external_reference_number TEXT,
            ircs TEXT,
            mmsi TEXT,
            vessel_name TEXT,
            flag_state TEXT,
            district TEXT,
            length REAL,
            gauge REAL,
            power REAL,
            under_charter INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_vessels_cfr ON vessels(internal_reference_number)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn create_positions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS positions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            internal_reference_number TEXT,
            external_reference_number TEXT,
            ircs TEXT,
            vessel_name TEXT,
            flag_state TEXT,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            speed REAL,
            course REAL,
            date_time TEXT NOT NULL,
            is_manual INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_positions_date_time ON positions(date_time)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Last known position per vessel, carrying the under-charter flag
pub async fn create_last_positions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS last_positions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            vessel_id INTEGER,
            internal_reference_number TEXT,
            external_reference_number TEXT,
            ircs TEXT,
            vessel_name TEXT,
            flag_state TEXT,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            date_time TEXT NOT NULL,
            under_charter INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_fleet_segments_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fleet_segments (
            segment TEXT PRIMARY KEY,
            segment_name TEXT,
            impact_risk_factor REAL NOT NULL DEFAULT 1.0
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Current segments of each vessel
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vessel_segments (
            internal_reference_number TEXT NOT NULL,
            segment TEXT NOT NULL REFERENCES fleet_segments(segment),
            PRIMARY KEY (internal_reference_number, segment)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_controls_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS controls (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            internal_reference_number TEXT NOT NULL,
            control_datetime TEXT NOT NULL,
            number_of_infractions INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Logbook operations and the raw documents they were parsed from
pub async fn create_logbook_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS logbook_reports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            operation_number TEXT NOT NULL UNIQUE,
            trip_number TEXT,
            operation_type TEXT NOT NULL,
            report_id TEXT,
            referenced_report_id TEXT,
            operation_datetime TEXT NOT NULL,
            report_datetime TEXT,
            cfr TEXT,
            ircs TEXT,
            external_identification TEXT,
            vessel_name TEXT,
            flag_state TEXT,
            message_type TEXT,
            value TEXT,
            analyzed_by_rules TEXT NOT NULL DEFAULT '[]',
            transmission_format TEXT NOT NULL,
            software TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_logbook_reports_trip ON logbook_reports(cfr, trip_number)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS logbook_raw_messages (
            operation_number TEXT PRIMARY KEY,
            xml_message TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_pending_alerts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pending_alerts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            internal_reference_number TEXT,
            external_reference_number TEXT,
            ircs TEXT,
            vessel_identifier TEXT NOT NULL,
            vessel_name TEXT,
            vessel_id INTEGER,
            flag_state TEXT,
            trip_number TEXT,
            creation_date TEXT NOT NULL,
            value TEXT NOT NULL,
            latitude REAL,
            longitude REAL,
            alert_config_name TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Silenced alerts
///
/// `is_reactivated` is added by migration v1.
pub async fn create_silenced_alerts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS silenced_alerts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            internal_reference_number TEXT,
            external_reference_number TEXT,
            ircs TEXT,
            vessel_identifier TEXT NOT NULL,
            vessel_name TEXT,
            flag_state TEXT,
            value TEXT NOT NULL,
            silenced_after_date TEXT,
            silenced_before_date TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_reportings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reportings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            internal_reference_number TEXT,
            external_reference_number TEXT,
            ircs TEXT,
            vessel_identifier TEXT NOT NULL,
            vessel_name TEXT,
            vessel_id INTEGER,
            flag_state TEXT,
            type TEXT NOT NULL,
            creation_date TEXT NOT NULL,
            validation_date TEXT,
            value TEXT NOT NULL,
            latitude REAL,
            longitude REAL,
            is_archived INTEGER NOT NULL DEFAULT 0,
            is_deleted INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Beacon malfunctions and their owned children (actions, comments,
/// notifications)
pub async fn create_beacon_malfunctions_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS beacon_malfunctions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            internal_reference_number TEXT,
            external_reference_number TEXT,
            ircs TEXT,
            vessel_identifier TEXT NOT NULL,
            vessel_name TEXT NOT NULL,
            flag_state TEXT,
            vessel_id INTEGER,
            vessel_status TEXT NOT NULL,
            stage TEXT NOT NULL,
            malfunction_start_date_utc TEXT NOT NULL,
            malfunction_end_date_utc TEXT,
            vessel_status_last_modification_date_utc TEXT NOT NULL,
            end_of_malfunction_reason TEXT,
            beacon_number TEXT NOT NULL,
            beacon_status_at_malfunction_creation TEXT NOT NULL,
            notification_requested TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS beacon_malfunction_actions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            beacon_malfunction_id INTEGER NOT NULL REFERENCES beacon_malfunctions(id),
            property_name TEXT NOT NULL,
            previous_value TEXT NOT NULL,
            next_value TEXT NOT NULL,
            date_time_utc TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS beacon_malfunction_comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            beacon_malfunction_id INTEGER NOT NULL REFERENCES beacon_malfunctions(id),
            comment TEXT NOT NULL,
            user_type TEXT NOT NULL,
            date_time_utc TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS beacon_malfunction_notifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            beacon_malfunction_id INTEGER NOT NULL REFERENCES beacon_malfunctions(id),
            date_time_utc TEXT NOT NULL,
            notification_type TEXT NOT NULL,
            communication_means TEXT NOT NULL,
            recipient_function TEXT NOT NULL,
            recipient_name TEXT,
            recipient_address_or_number TEXT NOT NULL,
            success INTEGER,
            error_message TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
