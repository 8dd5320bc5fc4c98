//! Vessel, position and track depth types

use crate::risk::VesselRiskFactor;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vessel {
    pub id: i64,
    pub internal_reference_number: Option<String>,
    pub external_reference_number: Option<String>,
    pub ircs: Option<String>,
    pub mmsi: Option<String>,
    pub vessel_name: Option<String>,
    pub flag_state: Option<String>,
    pub district: Option<String>,
    pub length: Option<f64>,
    pub gauge: Option<f64>,
    pub power: Option<f64>,
    pub under_charter: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: i64,
    pub internal_reference_number: Option<String>,
    pub external_reference_number: Option<String>,
    pub ircs: Option<String>,
    pub vessel_name: Option<String>,
    pub flag_state: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: Option<f64>,
    pub course: Option<f64>,
    pub date_time: DateTime<Utc>,
    pub is_manual: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VesselTrackDepth {
    TwelveHours,
    OneDay,
    TwoDays,
    ThreeDays,
    OneWeek,
    TwoWeek,
    ThreeWeek,
    OneMonth,
    LastDeparture,
    Custom,
}

text_enum!(VesselTrackDepth {
    TwelveHours => "TWELVE_HOURS",
    OneDay => "ONE_DAY",
    TwoDays => "TWO_DAYS",
    ThreeDays => "THREE_DAYS",
    OneWeek => "ONE_WEEK",
    TwoWeek => "TWO_WEEK",
    ThreeWeek => "THREE_WEEK",
    OneMonth => "ONE_MONTH",
    LastDeparture => "LAST_DEPARTURE",
    Custom => "CUSTOM",
});

impl VesselTrackDepth {
    /// Fixed look-back duration; None for depths resolved otherwise
    pub fn duration(&self) -> Option<Duration> {
        match self {
            VesselTrackDepth::TwelveHours => Some(Duration::hours(12)),
            VesselTrackDepth::OneDay => Some(Duration::days(1)),
            VesselTrackDepth::TwoDays => Some(Duration::days(2)),
            VesselTrackDepth::ThreeDays => Some(Duration::days(3)),
            VesselTrackDepth::OneWeek => Some(Duration::weeks(1)),
            VesselTrackDepth::TwoWeek => Some(Duration::weeks(2)),
            VesselTrackDepth::ThreeWeek => Some(Duration::weeks(3)),
            VesselTrackDepth::OneMonth => Some(Duration::days(30)),
            VesselTrackDepth::LastDeparture | VesselTrackDepth::Custom => None,
        }
    }
}

/// Vessel record with its track and risk factor
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselWithData {
    pub vessel: Option<Vessel>,
    pub positions: Vec<Position>,
    pub vessel_risk_factor: VesselRiskFactor,
}

/// Result of the composite vessel read
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselInformation {
    /// True when the requested track depth could not be honored
    pub track_was_modified: bool,
    pub vessel_with_data: VesselWithData,
}
