//! Alert taxonomy, pending and silenced alerts

use super::silence::SilenceWindow;
use crate::reporting::model::{NewReporting, ReportingValue};
use chrono::{DateTime, Utc};
use fmon_common::VesselIdentity;
use serde::{Deserialize, Serialize};

/// Zone-based alert payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoneAlert {
    pub sea_front: Option<String>,
    pub flag_state: Option<String>,
    pub risk_factor: Option<f64>,
}

/// Closed set of alert types produced by the rule evaluators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    ThreeMilesTrawlingAlert(ZoneAlert),
    FrenchEezFishingAlert(ZoneAlert),
    TwelveMilesFishingAlert(ZoneAlert),
    MissingFarAlert(ZoneAlert),
    PnoLanWeightToleranceAlert(ZoneAlert),
}

impl AlertType {
    pub fn name(&self) -> &'static str {
        match self {
            AlertType::ThreeMilesTrawlingAlert(_) => "THREE_MILES_TRAWLING_ALERT",
            AlertType::FrenchEezFishingAlert(_) => "FRENCH_EEZ_FISHING_ALERT",
            AlertType::TwelveMilesFishingAlert(_) => "TWELVE_MILES_FISHING_ALERT",
            AlertType::MissingFarAlert(_) => "MISSING_FAR_ALERT",
            AlertType::PnoLanWeightToleranceAlert(_) => "PNO_LAN_WEIGHT_TOLERANCE_ALERT",
        }
    }

    /// NATINF code of the infraction each alert type stands for
    pub fn natinf_code(&self) -> Option<i32> {
        match self {
            AlertType::ThreeMilesTrawlingAlert(_) => Some(7059),
            AlertType::FrenchEezFishingAlert(_) => Some(2608),
            AlertType::TwelveMilesFishingAlert(_) => Some(2610),
            AlertType::MissingFarAlert(_) => Some(27689),
            AlertType::PnoLanWeightToleranceAlert(_) => None,
        }
    }

    pub fn zone(&self) -> &ZoneAlert {
        match self {
            AlertType::ThreeMilesTrawlingAlert(z)
            | AlertType::FrenchEezFishingAlert(z)
            | AlertType::TwelveMilesFishingAlert(z)
            | AlertType::MissingFarAlert(z)
            | AlertType::PnoLanWeightToleranceAlert(z) => z,
        }
    }

    pub fn sea_front(&self) -> Option<&str> {
        self.zone().sea_front.as_deref()
    }
}

/// Unvalidated alert awaiting operator action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAlert {
    pub id: Option<i64>,
    #[serde(flatten)]
    pub vessel: VesselIdentity,
    pub vessel_name: Option<String>,
    pub vessel_id: Option<i64>,
    pub flag_state: Option<String>,
    pub trip_number: Option<String>,
    pub creation_date: DateTime<Utc>,
    pub value: AlertType,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub alert_config_name: Option<String>,
}

impl PendingAlert {
    /// The ALERT reporting this alert becomes once an operator validates it
    pub fn into_reporting(self, validation_date: DateTime<Utc>) -> NewReporting {
        NewReporting {
            vessel: self.vessel,
            vessel_name: self.vessel_name,
            vessel_id: self.vessel_id,
            flag_state: self.flag_state,
            creation_date: self.creation_date,
            validation_date: Some(validation_date),
            value: ReportingValue::Alert(self.value),
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    pub fn into_silenced(self, window: &SilenceWindow) -> SilencedAlert {
        SilencedAlert {
            id: None,
            vessel: self.vessel,
            vessel_name: self.vessel_name,
            flag_state: self.flag_state,
            value: self.value,
            silenced_after_date: window.silenced_after_date,
            silenced_before_date: window.silenced_before_date,
            is_reactivated: false,
        }
    }
}

/// Suppression of an alert type for a vessel and sea front
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SilencedAlert {
    pub id: Option<i64>,
    #[serde(flatten)]
    pub vessel: VesselIdentity,
    pub vessel_name: Option<String>,
    pub flag_state: Option<String>,
    pub value: AlertType,
    pub silenced_after_date: Option<DateTime<Utc>>,
    pub silenced_before_date: DateTime<Utc>,
    pub is_reactivated: bool,
}

impl SilencedAlert {
    /// Whether the suppression is in force at `now`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_reactivated
            && now < self.silenced_before_date
            && self.silenced_after_date.map(|after| now >= after).unwrap_or(true)
    }

    /// Whether this suppression covers a detected alert: same alert type
    /// and sea front, vessel matched on any of its three references
    pub fn matches(&self, alert: &PendingAlert) -> bool {
        self.value.name() == alert.value.name()
            && self.value.sea_front() == alert.value.sea_front()
            && self.vessel.shares_any_reference(&alert.vessel)
    }
}

/// Pending alert annotated with the infraction it stands for
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationalAlert {
    #[serde(flatten)]
    pub alert: PendingAlert,
    pub infraction: Option<crate::reporting::model::Infraction>,
}
