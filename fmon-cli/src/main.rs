//! fmon - Fisheries monitoring command-line front end
//!
//! Runs the monitoring use-cases against the local SQLite database and
//! prints their results as JSON on stdout. Logs go to stderr.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use fmon_common::config::{load_config, resolve_root_folder};
use fmon_common::db::init::init_database;
use fmon_common::time;
use fmon_common::{VesselIdentifier, VesselIdentity};
use fmon_core::alerts::model::PendingAlert;
use fmon_core::alerts::silence::SilenceAlertPeriod;
use fmon_core::beacon::model::{
    BeaconMalfunctionNotificationType, BeaconStatus, CommentUserType, EndOfBeaconMalfunctionReason,
    NewBeaconMalfunction, Stage, UpdateBeaconMalfunction, VesselStatus,
};
use fmon_core::db::SqliteStore;
use fmon_core::logbook::model::VoyageRequest;
use fmon_core::reporting::model::{
    InfractionSuspicion, NewReporting, Observation, ReportingActor, ReportingType, ReportingValue,
    UpdatedReportingValues,
};
use fmon_core::vessel::model::VesselTrackDepth;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod services;

use services::Services;

/// Command-line arguments for fmon
#[derive(Parser, Debug)]
#[command(name = "fmon")]
#[command(about = "Fisheries monitoring backend tools")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, env = "FMON_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database
    #[arg(short, long, global = true, env = "FMON_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pending and silenced alerts
    #[command(subcommand)]
    Alerts(AlertsCommand),

    /// Operator reportings
    #[command(subcommand)]
    Reportings(ReportingsCommand),

    /// Beacon malfunction follow-up
    #[command(subcommand)]
    Beacons(BeaconsCommand),

    /// Logbook timelines and voyages
    #[command(subcommand)]
    Logbook(LogbookCommand),

    /// Vessel record, track and risk factor
    Vessel {
        #[command(flatten)]
        vessel: VesselArgs,

        #[arg(long, default_value = "TWELVE_HOURS")]
        depth: VesselTrackDepth,

        /// Track start, for the CUSTOM depth
        #[arg(long)]
        from: Option<DateTime<Utc>>,

        /// Track end, for the CUSTOM depth
        #[arg(long)]
        to: Option<DateTime<Utc>>,
    },

    /// Risk factor of a vessel
    Risk {
        #[command(flatten)]
        vessel: VesselArgs,
    },
}

#[derive(Subcommand, Debug)]
enum AlertsCommand {
    /// Pending alerts with their infraction
    List,

    /// Turn a pending alert into an ALERT reporting
    Validate { id: i64 },

    /// Suppress a pending alert
    Silence {
        id: i64,

        #[arg(long)]
        period: Option<SilenceAlertPeriod>,

        #[arg(long)]
        after: Option<DateTime<Utc>>,

        #[arg(long)]
        before: Option<DateTime<Utc>>,
    },

    /// Silenced alerts currently in force
    Silenced,

    /// Remove a silenced alert
    DeleteSilenced { id: i64 },

    /// End a silenced alert early
    Reactivate { id: i64 },

    /// Replace the pending alerts of a rule with detections from a JSON file
    Ingest {
        #[arg(long)]
        alert_config_name: String,

        /// JSON array of pending alerts
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum ReportingsCommand {
    /// Reportings neither archived nor deleted
    List,

    /// Create an observation or infraction suspicion
    Add {
        #[command(flatten)]
        vessel: VesselArgs,

        #[arg(long)]
        vessel_name: Option<String>,

        #[arg(long)]
        flag_state: Option<String>,

        #[command(flatten)]
        values: ReportingValuesArgs,

        #[arg(long)]
        sea_front: Option<String>,

        #[arg(long)]
        dml: Option<String>,
    },

    /// Replace the editable fields of a reporting
    Update {
        id: i64,

        #[command(flatten)]
        values: ReportingValuesArgs,
    },

    Archive {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Current and archived reportings of a vessel
    Vessel {
        #[command(flatten)]
        vessel: VesselArgs,

        #[arg(long)]
        from: Option<DateTime<Utc>>,
    },
}

#[derive(Subcommand, Debug)]
enum BeaconsCommand {
    /// Working set of beacon malfunctions
    List,

    /// One beacon malfunction with comments, actions and notifications
    Get { id: i64 },

    /// Fleet-wide summary
    Resume,

    /// Open a beacon malfunction
    Create {
        #[command(flatten)]
        vessel: VesselArgs,

        #[arg(long)]
        vessel_name: String,

        #[arg(long)]
        beacon_number: String,

        #[arg(long, default_value = "AT_SEA")]
        vessel_status: VesselStatus,

        #[arg(long, default_value = "ACTIVATED")]
        beacon_status: BeaconStatus,

        /// Defaults to now
        #[arg(long)]
        start: Option<DateTime<Utc>>,
    },

    /// Change stage, vessel status or end reason
    Update {
        id: i64,

        #[arg(long)]
        stage: Option<Stage>,

        #[arg(long)]
        vessel_status: Option<VesselStatus>,

        #[arg(long)]
        reason: Option<EndOfBeaconMalfunctionReason>,
    },

    /// Request a notification to the vessel's contacts
    Notify {
        id: i64,
        notification_type: BeaconMalfunctionNotificationType,
    },

    Comment {
        id: i64,

        #[arg(long, default_value = "OPS")]
        user_type: CommentUserType,

        comment: String,
    },

    /// Malfunctions of a vessel since a date
    Vessel {
        #[command(flatten)]
        vessel: VesselArgs,

        #[arg(long)]
        after: DateTime<Utc>,
    },
}

#[derive(Subcommand, Debug)]
enum LogbookCommand {
    /// Reconciled timeline of a trip
    Messages {
        #[arg(long)]
        cfr: String,

        #[arg(long)]
        from: DateTime<Utc>,

        #[arg(long)]
        to: DateTime<Utc>,

        /// Defaults to the last trip started before `to`
        #[arg(long)]
        trip_number: Option<String>,
    },

    /// Last, previous or next voyage
    Voyage {
        #[arg(long)]
        cfr: String,

        #[arg(long, default_value = "LAST")]
        request: VoyageRequest,

        /// Reference trip for PREVIOUS and NEXT
        #[arg(long)]
        trip_number: Option<String>,
    },
}

/// Vessel references; at least one is required
#[derive(Args, Debug)]
struct VesselArgs {
    /// Internal reference number
    #[arg(long)]
    cfr: Option<String>,

    #[arg(long)]
    external_reference: Option<String>,

    #[arg(long)]
    ircs: Option<String>,

    /// Authoritative reference, defaults to the first one given
    #[arg(long)]
    identifier: Option<VesselIdentifier>,
}

impl VesselArgs {
    fn identity(&self) -> Result<VesselIdentity> {
        let vessel_identifier = match self.identifier {
            Some(identifier) => identifier,
            None if self.cfr.is_some() => VesselIdentifier::InternalReferenceNumber,
            None if self.external_reference.is_some() => VesselIdentifier::ExternalReferenceNumber,
            None if self.ircs.is_some() => VesselIdentifier::Ircs,
            None => bail!("one of --cfr, --external-reference or --ircs is required"),
        };

        Ok(VesselIdentity {
            internal_reference_number: self.cfr.clone(),
            external_reference_number: self.external_reference.clone(),
            ircs: self.ircs.clone(),
            vessel_identifier,
        })
    }
}

/// Editable reporting fields
#[derive(Args, Debug)]
struct ReportingValuesArgs {
    /// OBSERVATION or INFRACTION_SUSPICION
    #[arg(long = "type")]
    reporting_type: ReportingType,

    #[arg(long, default_value = "OPS")]
    actor: ReportingActor,

    #[arg(long)]
    title: String,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    unit: Option<String>,

    #[arg(long)]
    author_trigram: Option<String>,

    #[arg(long)]
    author_contact: Option<String>,

    #[arg(long)]
    natinf_code: Option<i32>,
}

impl ReportingValuesArgs {
    fn updated_values(&self) -> UpdatedReportingValues {
        UpdatedReportingValues {
            reporting_actor: self.actor,
            reporting_type: self.reporting_type,
            unit: self.unit.clone(),
            author_trigram: self.author_trigram.clone(),
            author_contact: self.author_contact.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            natinf_code: self.natinf_code,
        }
    }

    fn value(
        &self,
        sea_front: Option<String>,
        flag_state: Option<String>,
        dml: Option<String>,
    ) -> Result<ReportingValue> {
        match self.reporting_type {
            ReportingType::InfractionSuspicion => Ok(ReportingValue::InfractionSuspicion(InfractionSuspicion {
                reporting_actor: self.actor,
                unit: self.unit.clone(),
                author_trigram: self.author_trigram.clone(),
                author_contact: self.author_contact.clone(),
                title: self.title.clone(),
                description: self.description.clone(),
                natinf_code: self.natinf_code,
                sea_front,
                flag_state,
                dml,
            })),
            ReportingType::Observation => Ok(ReportingValue::Observation(Observation {
                reporting_actor: self.actor,
                unit: self.unit.clone(),
                author_trigram: self.author_trigram.clone(),
                author_contact: self.author_contact.clone(),
                title: self.title.clone(),
                description: self.description.clone(),
                sea_front,
                flag_state,
                dml,
            })),
            ReportingType::Alert => bail!("ALERT reportings are created by validating a pending alert"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("fmon={0},fmon_core={0},fmon_common={0}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting fmon v{}", env!("CARGO_PKG_VERSION"));

    let root_folder = resolve_root_folder(cli.root_folder.as_deref(), &config);
    let db_path = config.database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    let services = Services::new(SqliteStore::new(pool), &config);

    run(cli.command, &services).await
}

async fn run(command: Command, services: &Services) -> Result<()> {
    let now = time::now();

    match command {
        Command::Alerts(command) => run_alerts(command, services, now).await,
        Command::Reportings(command) => run_reportings(command, services, now).await,
        Command::Beacons(command) => run_beacons(command, services, now).await,
        Command::Logbook(command) => run_logbook(command, services, now).await,
        Command::Vessel {
            vessel,
            depth,
            from,
            to,
        } => {
            let information = services
                .vessels
                .get_vessel(&vessel.identity()?, depth, from, to, now)
                .await?;
            print_json(&information)
        }
        Command::Risk { vessel } => {
            let risk_factor = services
                .risk_factors
                .get_vessel_risk_factor(&vessel.identity()?, now)
                .await;
            print_json(&risk_factor)
        }
    }
}

async fn run_alerts(command: AlertsCommand, services: &Services, now: DateTime<Utc>) -> Result<()> {
    let alerts = &services.alerts;

    match command {
        AlertsCommand::List => print_json(&alerts.get_operational_alerts().await?),
        AlertsCommand::Validate { id } => print_json(&alerts.validate_alert(id, now).await?),
        AlertsCommand::Silence {
            id,
            period,
            after,
            before,
        } => print_json(&alerts.silence_alert(id, period, after, before, now).await?),
        AlertsCommand::Silenced => print_json(&alerts.get_silenced_alerts(now).await?),
        AlertsCommand::DeleteSilenced { id } => Ok(alerts.delete_silenced_alert(id).await?),
        AlertsCommand::Reactivate { id } => Ok(alerts.reactivate_silenced_alert(id).await?),
        AlertsCommand::Ingest {
            alert_config_name,
            file,
        } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let detections: Vec<PendingAlert> =
                serde_json::from_str(&content).context("Invalid pending alerts JSON")?;
            let stored = alerts.ingest_detections(&alert_config_name, detections, now).await?;
            print_json(&serde_json::json!({ "stored": stored }))
        }
    }
}

async fn run_reportings(command: ReportingsCommand, services: &Services, now: DateTime<Utc>) -> Result<()> {
    let reportings = &services.reportings;

    match command {
        ReportingsCommand::List => print_json(&reportings.get_all_current_reportings().await?),
        ReportingsCommand::Add {
            vessel,
            vessel_name,
            flag_state,
            values,
            sea_front,
            dml,
        } => {
            let reporting = NewReporting {
                vessel: vessel.identity()?,
                vessel_name,
                vessel_id: None,
                flag_state: flag_state.clone(),
                creation_date: now,
                validation_date: None,
                value: values.value(sea_front, flag_state, dml)?,
                latitude: None,
                longitude: None,
            };
            print_json(&reportings.add_reporting(&reporting).await?)
        }
        ReportingsCommand::Update { id, values } => {
            print_json(&reportings.update_reporting(id, &values.updated_values()).await?)
        }
        ReportingsCommand::Archive { ids } => print_json(&reportings.archive_reportings(&ids).await),
        ReportingsCommand::Delete { ids } => print_json(&reportings.delete_reportings(&ids).await),
        ReportingsCommand::Vessel { vessel, from } => {
            print_json(&reportings.get_vessel_reportings(&vessel.identity()?, from, now).await?)
        }
    }
}

async fn run_beacons(command: BeaconsCommand, services: &Services, now: DateTime<Utc>) -> Result<()> {
    let beacons = &services.beacons;

    match command {
        BeaconsCommand::List => print_json(&beacons.get_all_beacon_malfunctions().await?),
        BeaconsCommand::Get { id } => print_json(&beacons.get_beacon_malfunction(id).await?),
        BeaconsCommand::Resume => print_json(&beacons.get_fleet_resume().await?),
        BeaconsCommand::Create {
            vessel,
            vessel_name,
            beacon_number,
            vessel_status,
            beacon_status,
            start,
        } => {
            let new = NewBeaconMalfunction {
                vessel: vessel.identity()?,
                vessel_name,
                flag_state: None,
                vessel_id: None,
                vessel_status,
                malfunction_start_date_time: start.unwrap_or(now),
                beacon_number,
                beacon_status_at_malfunction_creation: beacon_status,
            };
            print_json(&beacons.create_beacon_malfunction(&new).await?)
        }
        BeaconsCommand::Update {
            id,
            stage,
            vessel_status,
            reason,
        } => {
            let update = UpdateBeaconMalfunction {
                vessel_status,
                stage,
                end_of_beacon_malfunction_reason: reason,
            };
            print_json(&beacons.update_beacon_malfunction(id, &update, now).await?)
        }
        BeaconsCommand::Notify { id, notification_type } => {
            print_json(&beacons.request_notification(id, notification_type).await?)
        }
        BeaconsCommand::Comment {
            id,
            user_type,
            comment,
        } => print_json(&beacons.save_comment(id, &comment, user_type, now).await?),
        BeaconsCommand::Vessel { vessel, after } => {
            print_json(&beacons.get_vessel_beacon_malfunctions(&vessel.identity()?, after).await?)
        }
    }
}

async fn run_logbook(command: LogbookCommand, services: &Services, now: DateTime<Utc>) -> Result<()> {
    let logbook = &services.logbook;

    match command {
        LogbookCommand::Messages {
            cfr,
            from,
            to,
            trip_number,
        } => print_json(
            &logbook
                .get_logbook_messages(&cfr, from, to, trip_number.as_deref())
                .await?,
        ),
        LogbookCommand::Voyage {
            cfr,
            request,
            trip_number,
        } => print_json(
            &logbook
                .get_vessel_voyage(&cfr, request, trip_number.as_deref(), now)
                .await?,
        ),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
