//! Reporting entities

use crate::alerts::model::AlertType;
use crate::Result;
use chrono::{DateTime, Utc};
use fmon_common::VesselIdentity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportingType {
    InfractionSuspicion,
    Observation,
    Alert,
}

text_enum!(ReportingType {
    InfractionSuspicion => "INFRACTION_SUSPICION",
    Observation => "OBSERVATION",
    Alert => "ALERT",
});

impl ReportingType {
    /// Only operator-authored reportings can be edited
    pub fn is_editable(&self) -> bool {
        !matches!(self, ReportingType::Alert)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportingActor {
    Ops,
    Sip,
    Unit,
    Dml,
    Dirm,
    Other,
}

text_enum!(ReportingActor {
    Ops => "OPS",
    Sip => "SIP",
    Unit => "UNIT",
    Dml => "DML",
    Dirm => "DIRM",
    Other => "OTHER",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfractionSuspicion {
    pub reporting_actor: ReportingActor,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub author_trigram: Option<String>,
    #[serde(default)]
    pub author_contact: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub natinf_code: Option<i32>,
    #[serde(default)]
    pub sea_front: Option<String>,
    #[serde(default)]
    pub flag_state: Option<String>,
    #[serde(default)]
    pub dml: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub reporting_actor: ReportingActor,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub author_trigram: Option<String>,
    #[serde(default)]
    pub author_contact: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sea_front: Option<String>,
    #[serde(default)]
    pub flag_state: Option<String>,
    #[serde(default)]
    pub dml: Option<String>,
}

/// Value of a reporting, discriminated by the reporting type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportingValue {
    InfractionSuspicion(InfractionSuspicion),
    Observation(Observation),
    Alert(AlertType),
}

impl ReportingValue {
    pub fn reporting_type(&self) -> ReportingType {
        match self {
            ReportingValue::InfractionSuspicion(_) => ReportingType::InfractionSuspicion,
            ReportingValue::Observation(_) => ReportingType::Observation,
            ReportingValue::Alert(_) => ReportingType::Alert,
        }
    }

    pub fn decode(reporting_type: ReportingType, json: &str) -> Result<Self> {
        let value = match reporting_type {
            ReportingType::InfractionSuspicion => {
                ReportingValue::InfractionSuspicion(serde_json::from_str(json)?)
            }
            ReportingType::Observation => ReportingValue::Observation(serde_json::from_str(json)?),
            ReportingType::Alert => ReportingValue::Alert(serde_json::from_str(json)?),
        };
        Ok(value)
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn sea_front(&self) -> Option<&str> {
        match self {
            ReportingValue::InfractionSuspicion(v) => v.sea_front.as_deref(),
            ReportingValue::Observation(v) => v.sea_front.as_deref(),
            ReportingValue::Alert(v) => v.sea_front(),
        }
    }

    pub fn flag_state(&self) -> Option<&str> {
        match self {
            ReportingValue::InfractionSuspicion(v) => v.flag_state.as_deref(),
            ReportingValue::Observation(v) => v.flag_state.as_deref(),
            ReportingValue::Alert(v) => v.zone().flag_state.as_deref(),
        }
    }

    pub fn natinf_code(&self) -> Option<i32> {
        match self {
            ReportingValue::InfractionSuspicion(v) => v.natinf_code,
            ReportingValue::Observation(_) => None,
            ReportingValue::Alert(v) => v.natinf_code(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reporting {
    pub id: i64,
    #[serde(flatten)]
    pub vessel: VesselIdentity,
    pub vessel_name: Option<String>,
    pub vessel_id: Option<i64>,
    pub flag_state: Option<String>,
    #[serde(rename = "type")]
    pub reporting_type: ReportingType,
    pub creation_date: DateTime<Utc>,
    pub validation_date: Option<DateTime<Utc>>,
    pub value: ReportingValue,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_archived: bool,
    pub is_deleted: bool,
    /// Derived from the last known position, never persisted
    pub under_charter: Option<bool>,
}

/// A reporting not yet persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewReporting {
    pub vessel: VesselIdentity,
    pub vessel_name: Option<String>,
    pub vessel_id: Option<i64>,
    pub flag_state: Option<String>,
    pub creation_date: DateTime<Utc>,
    pub validation_date: Option<DateTime<Utc>>,
    pub value: ReportingValue,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Editable fields of an operator-authored reporting
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedReportingValues {
    pub reporting_actor: ReportingActor,
    pub reporting_type: ReportingType,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub author_trigram: Option<String>,
    #[serde(default)]
    pub author_contact: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub natinf_code: Option<i32>,
}

/// NATINF infraction reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Infraction {
    pub natinf_code: i32,
    pub regulation: Option<String>,
    pub infraction_category: Option<String>,
    pub infraction: Option<String>,
}

/// Per-id outcome of a batch operation
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub succeeded: Vec<i64>,
    pub failed: Vec<BatchFailure>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub id: i64,
    pub error: String,
}

/// Reporting history of one vessel
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselReportings {
    pub current: Vec<Reporting>,
    pub archived: Vec<Reporting>,
}
