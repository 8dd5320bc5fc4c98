//! Logbook operations and their typed payloads

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the backup declaration software whose messages are flagged
pub const FAILOVER_SOFTWARE: &str = "e-Sacapt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogbookOperationType {
    /// Original declaration
    Dat,
    /// Correction of a previous declaration
    Cor,
    /// Deletion of a previous declaration
    Del,
    /// Acknowledgment returned for a previous declaration
    Ret,
}

impl LogbookOperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogbookOperationType::Dat => "DAT",
            LogbookOperationType::Cor => "COR",
            LogbookOperationType::Del => "DEL",
            LogbookOperationType::Ret => "RET",
        }
    }

    /// DAT and COR operations carry declarations shown in the timeline
    pub fn is_declaration(&self) -> bool {
        matches!(self, LogbookOperationType::Dat | LogbookOperationType::Cor)
    }
}

impl fmt::Display for LogbookOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogbookOperationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "DAT" => Ok(LogbookOperationType::Dat),
            "COR" => Ok(LogbookOperationType::Cor),
            "DEL" => Ok(LogbookOperationType::Del),
            "RET" => Ok(LogbookOperationType::Ret),
            other => Err(Error::IllegalArgument(format!(
                "Unknown logbook operation type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogbookTransmissionFormat {
    Ers,
    Flux,
    Visiocapture,
}

impl LogbookTransmissionFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogbookTransmissionFormat::Ers => "ERS",
            LogbookTransmissionFormat::Flux => "FLUX",
            LogbookTransmissionFormat::Visiocapture => "VISIOCAPTURE",
        }
    }

    /// Formats that never send explicit acknowledgments
    pub fn has_implicit_acknowledgment(&self) -> bool {
        matches!(
            self,
            LogbookTransmissionFormat::Flux | LogbookTransmissionFormat::Visiocapture
        )
    }
}

impl FromStr for LogbookTransmissionFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ERS" => Ok(LogbookTransmissionFormat::Ers),
            "FLUX" => Ok(LogbookTransmissionFormat::Flux),
            "VISIOCAPTURE" => Ok(LogbookTransmissionFormat::Visiocapture),
            other => Err(Error::IllegalArgument(format!(
                "Unknown transmission format: {}",
                other
            ))),
        }
    }
}

/// Derived acknowledgment status of a declaration (never stored)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledge {
    pub return_status: Option<String>,
    pub rejection_cause: Option<String>,
    pub is_success: bool,
}

impl Acknowledge {
    pub const SUCCESS_STATUS: &'static str = "000";

    pub fn from_return(return_status: Option<String>, rejection_cause: Option<String>) -> Self {
        let is_success = return_status.as_deref() == Some(Self::SUCCESS_STATUS);
        Self {
            return_status,
            rejection_cause,
            is_success,
        }
    }

    /// Success assumed for formats without explicit acknowledgment
    pub fn implicit_success() -> Self {
        Self {
            return_status: None,
            rejection_cause: None,
            is_success: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Catch {
    pub species: Option<String>,
    pub species_name: Option<String>,
    pub weight: Option<f64>,
    pub number_fish: Option<f64>,
    pub fao_zone: Option<String>,
    pub economic_zone: Option<String>,
    pub statistical_rectangle: Option<String>,
    pub presentation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Gear {
    pub gear: Option<String>,
    pub gear_name: Option<String>,
    pub mesh: Option<f64>,
    pub dimensions: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Haul {
    pub gear: Option<String>,
    pub gear_name: Option<String>,
    pub mesh: Option<f64>,
    pub catches: Vec<Catch>,
    pub far_datetime_utc: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// DEP
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Departure {
    pub departure_datetime_utc: Option<DateTime<Utc>>,
    pub departure_port: Option<String>,
    pub departure_port_name: Option<String>,
    pub anticipated_activity: Option<String>,
    pub gear_onboard: Vec<Gear>,
    pub species_onboard: Vec<Catch>,
}

/// FAR
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FishingActivityReport {
    pub hauls: Vec<Haul>,
}

/// COE
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EffortZoneEntry {
    pub latitude_entered: Option<f64>,
    pub longitude_entered: Option<f64>,
    pub effort_zone_entry_datetime_utc: Option<DateTime<Utc>>,
    pub target_species_on_entry: Option<String>,
    pub target_species_name_on_entry: Option<String>,
}

/// COX
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EffortZoneExit {
    pub latitude_exited: Option<f64>,
    pub longitude_exited: Option<f64>,
    pub effort_zone_exit_datetime_utc: Option<DateTime<Utc>>,
    pub target_species_on_exit: Option<String>,
    pub target_species_name_on_exit: Option<String>,
}

/// PNO
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriorNotification {
    pub predicted_arrival_datetime_utc: Option<DateTime<Utc>>,
    pub port: Option<String>,
    pub port_name: Option<String>,
    pub purpose: Option<String>,
    pub trip_start_date: Option<DateTime<Utc>>,
    pub catch_onboard: Vec<Catch>,
}

/// LAN
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Landing {
    pub landing_datetime_utc: Option<DateTime<Utc>>,
    pub port: Option<String>,
    pub port_name: Option<String>,
    pub sender: Option<String>,
    pub catch_landed: Vec<Catch>,
}

/// RTP
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReturnToPort {
    pub return_datetime_utc: Option<DateTime<Utc>>,
    pub port: Option<String>,
    pub port_name: Option<String>,
    pub reason_of_return: Option<String>,
    pub gear_onboard: Vec<Gear>,
}

/// EOF
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndOfFishing {
    pub end_of_fishing_datetime_utc: Option<DateTime<Utc>>,
}

/// Body of a RET operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AcknowledgmentBody {
    pub return_status: Option<String>,
    pub rejection_cause: Option<String>,
}

/// Payload of a logbook operation, typed per message type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LogbookMessageValue {
    Dep(Departure),
    Far(FishingActivityReport),
    Coe(EffortZoneEntry),
    Cox(EffortZoneExit),
    Pno(PriorNotification),
    Lan(Landing),
    Rtp(ReturnToPort),
    Eof(EndOfFishing),
    Ret(AcknowledgmentBody),
    Unknown(serde_json::Value),
}

impl LogbookMessageValue {
    /// Decode a stored payload using the operation's message type
    ///
    /// RET operations always carry an acknowledgment body; unknown message
    /// types keep their raw JSON.
    pub fn decode(
        operation_type: LogbookOperationType,
        message_type: Option<&str>,
        value: serde_json::Value,
    ) -> Result<Self> {
        if operation_type == LogbookOperationType::Ret {
            return Ok(LogbookMessageValue::Ret(serde_json::from_value(value)?));
        }

        let decoded = match message_type {
            Some("DEP") => LogbookMessageValue::Dep(serde_json::from_value(value)?),
            Some("FAR") => LogbookMessageValue::Far(serde_json::from_value(value)?),
            Some("COE") => LogbookMessageValue::Coe(serde_json::from_value(value)?),
            Some("COX") => LogbookMessageValue::Cox(serde_json::from_value(value)?),
            Some("PNO") => LogbookMessageValue::Pno(serde_json::from_value(value)?),
            Some("LAN") => LogbookMessageValue::Lan(serde_json::from_value(value)?),
            Some("RTP") => LogbookMessageValue::Rtp(serde_json::from_value(value)?),
            Some("EOF") => LogbookMessageValue::Eof(serde_json::from_value(value)?),
            _ => LogbookMessageValue::Unknown(value),
        };
        Ok(decoded)
    }
}

/// One logbook operation plus the flags derived at read time
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogbookMessage {
    pub id: i64,
    pub trip_number: Option<String>,
    pub operation_number: String,
    pub operation_type: LogbookOperationType,
    pub report_id: Option<String>,
    pub referenced_report_id: Option<String>,
    pub operation_date_time: DateTime<Utc>,
    pub report_date_time: Option<DateTime<Utc>>,
    pub internal_reference_number: Option<String>,
    pub external_reference_number: Option<String>,
    pub ircs: Option<String>,
    pub vessel_name: Option<String>,
    pub flag_state: Option<String>,
    pub message_type: Option<String>,
    pub message: Option<LogbookMessageValue>,
    pub analyzed_by_rules: Vec<String>,
    pub transmission_format: LogbookTransmissionFormat,
    pub software: Option<String>,

    pub is_corrected: bool,
    pub deleted: bool,
    pub acknowledge: Option<Acknowledge>,
    pub is_sent_by_failover_software: bool,
    pub raw_message: Option<String>,
}

impl LogbookMessage {
    /// Create an operation with no derived flags set
    pub fn new(
        operation_number: impl Into<String>,
        operation_type: LogbookOperationType,
        operation_date_time: DateTime<Utc>,
        transmission_format: LogbookTransmissionFormat,
    ) -> Self {
        Self {
            id: 0,
            trip_number: None,
            operation_number: operation_number.into(),
            operation_type,
            report_id: None,
            referenced_report_id: None,
            operation_date_time,
            report_date_time: None,
            internal_reference_number: None,
            external_reference_number: None,
            ircs: None,
            vessel_name: None,
            flag_state: None,
            message_type: None,
            message: None,
            analyzed_by_rules: Vec::new(),
            transmission_format,
            software: None,
            is_corrected: false,
            deleted: false,
            acknowledge: None,
            is_sent_by_failover_software: false,
            raw_message: None,
        }
    }

    /// Total ordering key used for sorting and "latest wins" choices
    pub fn ordering_key(&self) -> (DateTime<Utc>, &str) {
        (self.operation_date_time, self.operation_number.as_str())
    }
}

/// Trip number and its first/last operation dates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoyageDatesAndTripNumber {
    pub trip_number: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoyageRequest {
    Last,
    Previous,
    Next,
}

text_enum!(VoyageRequest {
    Last => "LAST",
    Previous => "PREVIOUS",
    Next => "NEXT",
});

/// A trip with its reconciled timeline, plus navigation hints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Voyage {
    pub is_last_voyage: bool,
    pub is_first_voyage: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub trip_number: String,
    pub logbook_messages: Vec<LogbookMessage>,
}

/// Reference data entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GearCode {
    pub code: String,
    pub name: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub locode: String,
    pub name: String,
    pub facade: Option<String>,
}
