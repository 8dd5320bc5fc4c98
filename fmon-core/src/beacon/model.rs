//! Beacon malfunction entities

use chrono::{DateTime, Utc};
use fmon_common::VesselIdentity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VesselStatus {
    AtPort,
    AtSea,
    NoNews,
    NeverEmitted,
    ActivityDetected,
}

text_enum!(VesselStatus {
    AtPort => "AT_PORT",
    AtSea => "AT_SEA",
    NoNews => "NO_NEWS",
    NeverEmitted => "NEVER_EMITTED",
    ActivityDetected => "ACTIVITY_DETECTED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    InitialEncounter,
    FourHourReport,
    RelaunchRequest,
    TargetingVessel,
    CrossCheck,
    EndOfMalfunction,
    Archived,
    /// Legacy closing stage, read-only
    ResumedTransmission,
}

text_enum!(Stage {
    InitialEncounter => "INITIAL_ENCOUNTER",
    FourHourReport => "FOUR_HOUR_REPORT",
    RelaunchRequest => "RELAUNCH_REQUEST",
    TargetingVessel => "TARGETING_VESSEL",
    CrossCheck => "CROSS_CHECK",
    EndOfMalfunction => "END_OF_MALFUNCTION",
    Archived => "ARCHIVED",
    ResumedTransmission => "RESUMED_TRANSMISSION",
});

impl Stage {
    /// Position in the follow-up progression. TARGETING_VESSEL and
    /// CROSS_CHECK share a rank so operators can move between them.
    pub fn rank(&self) -> u8 {
        match self {
            Stage::InitialEncounter => 0,
            Stage::FourHourReport => 1,
            Stage::RelaunchRequest => 2,
            Stage::TargetingVessel | Stage::CrossCheck => 3,
            Stage::EndOfMalfunction | Stage::ResumedTransmission => 4,
            Stage::Archived => 5,
        }
    }

    pub fn is_end_of_malfunction(&self) -> bool {
        matches!(self, Stage::EndOfMalfunction | Stage::ResumedTransmission)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndOfBeaconMalfunctionReason {
    ResumedTransmission,
    TemporaryInterruptionOfSupervision,
    PermanentInterruptionOfSupervision,
    BeaconDeactivatedOrUnequipped,
}

text_enum!(EndOfBeaconMalfunctionReason {
    ResumedTransmission => "RESUMED_TRANSMISSION",
    TemporaryInterruptionOfSupervision => "TEMPORARY_INTERRUPTION_OF_SUPERVISION",
    PermanentInterruptionOfSupervision => "PERMANENT_INTERRUPTION_OF_SUPERVISION",
    BeaconDeactivatedOrUnequipped => "BEACON_DEACTIVATED_OR_UNEQUIPPED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BeaconStatus {
    Activated,
    Deactivated,
    InTest,
    NonAgreed,
    Unsupervised,
}

text_enum!(BeaconStatus {
    Activated => "ACTIVATED",
    Deactivated => "DEACTIVATED",
    InTest => "IN_TEST",
    NonAgreed => "NON_AGREED",
    Unsupervised => "UNSUPERVISED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BeaconMalfunctionNotificationType {
    MalfunctionAtSeaInitialNotification,
    MalfunctionAtSeaReminder,
    MalfunctionAtPortInitialNotification,
    MalfunctionAtPortReminder,
    EndOfMalfunction,
}

text_enum!(BeaconMalfunctionNotificationType {
    MalfunctionAtSeaInitialNotification => "MALFUNCTION_AT_SEA_INITIAL_NOTIFICATION",
    MalfunctionAtSeaReminder => "MALFUNCTION_AT_SEA_REMINDER",
    MalfunctionAtPortInitialNotification => "MALFUNCTION_AT_PORT_INITIAL_NOTIFICATION",
    MalfunctionAtPortReminder => "MALFUNCTION_AT_PORT_REMINDER",
    EndOfMalfunction => "END_OF_MALFUNCTION",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommunicationMeans {
    Sms,
    Fax,
    Email,
}

text_enum!(CommunicationMeans {
    Sms => "SMS",
    Fax => "FAX",
    Email => "EMAIL",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipientFunction {
    VesselCaptain,
    VesselOperator,
    SatelliteOperator,
    Fmc,
}

text_enum!(RecipientFunction {
    VesselCaptain => "VESSEL_CAPTAIN",
    VesselOperator => "VESSEL_OPERATOR",
    SatelliteOperator => "SATELLITE_OPERATOR",
    Fmc => "FMC",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommentUserType {
    Ops,
    Sip,
}

text_enum!(CommentUserType {
    Ops => "OPS",
    Sip => "SIP",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionPropertyName {
    VesselStatus,
    Stage,
    EndOfMalfunctionReason,
}

text_enum!(ActionPropertyName {
    VesselStatus => "VESSEL_STATUS",
    Stage => "STAGE",
    EndOfMalfunctionReason => "END_OF_MALFUNCTION_REASON",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconMalfunction {
    pub id: i64,
    #[serde(flatten)]
    pub vessel: VesselIdentity,
    pub vessel_name: String,
    pub flag_state: Option<String>,
    pub vessel_id: Option<i64>,
    pub vessel_status: VesselStatus,
    pub stage: Stage,
    pub malfunction_start_date_time: DateTime<Utc>,
    pub malfunction_end_date_time: Option<DateTime<Utc>>,
    pub vessel_status_last_modification_date_time: DateTime<Utc>,
    pub end_of_beacon_malfunction_reason: Option<EndOfBeaconMalfunctionReason>,
    pub beacon_number: String,
    pub beacon_status_at_malfunction_creation: BeaconStatus,
    pub notification_requested: Option<BeaconMalfunctionNotificationType>,
}

/// A newly detected connectivity gap
#[derive(Debug, Clone)]
pub struct NewBeaconMalfunction {
    pub vessel: VesselIdentity,
    pub vessel_name: String,
    pub flag_state: Option<String>,
    pub vessel_id: Option<i64>,
    pub vessel_status: VesselStatus,
    pub malfunction_start_date_time: DateTime<Utc>,
    pub beacon_number: String,
    pub beacon_status_at_malfunction_creation: BeaconStatus,
}

/// Audit row of one property change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconMalfunctionAction {
    pub beacon_malfunction_id: i64,
    pub property_name: ActionPropertyName,
    pub previous_value: String,
    pub next_value: String,
    pub date_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconMalfunctionComment {
    pub beacon_malfunction_id: i64,
    pub comment: String,
    pub user_type: CommentUserType,
    pub date_time: DateTime<Utc>,
}

/// One delivery attempt to one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconMalfunctionNotification {
    pub id: i64,
    pub beacon_malfunction_id: i64,
    pub date_time_utc: DateTime<Utc>,
    pub notification_type: BeaconMalfunctionNotificationType,
    pub communication_means: CommunicationMeans,
    pub recipient_function: RecipientFunction,
    pub recipient_name: Option<String>,
    pub recipient_address_or_number: String,
    pub success: Option<bool>,
    pub error_message: Option<String>,
}

/// Notifications sent together for one notification event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconMalfunctionNotifications {
    pub beacon_malfunction_id: i64,
    pub date_time_utc: DateTime<Utc>,
    pub notification_type: BeaconMalfunctionNotificationType,
    pub notifications: Vec<BeaconMalfunctionNotification>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconMalfunctionResume {
    pub number_of_beacons_at_sea: usize,
    pub number_of_beacons_at_port: usize,
    pub number_of_beacons_with_other_status: usize,
    pub last_beacon_malfunction_date_time: Option<DateTime<Utc>>,
    pub last_beacon_malfunction_vessel_status: Option<VesselStatus>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconMalfunctionWithDetails {
    pub beacon_malfunction: BeaconMalfunction,
    pub resume: BeaconMalfunctionResume,
    pub comments: Vec<BeaconMalfunctionComment>,
    pub actions: Vec<BeaconMalfunctionAction>,
    pub notifications: Vec<BeaconMalfunctionNotifications>,
}

/// Requested changes; unset fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBeaconMalfunction {
    pub vessel_status: Option<VesselStatus>,
    pub stage: Option<Stage>,
    pub end_of_beacon_malfunction_reason: Option<EndOfBeaconMalfunctionReason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationRequestOutcome {
    /// No request was pending
    Requested,
    /// The same notification was already requested and not yet sent
    AlreadyPending,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselBeaconMalfunctions {
    pub resume: BeaconMalfunctionResume,
    pub current: Vec<BeaconMalfunction>,
    pub history: Vec<BeaconMalfunction>,
}
