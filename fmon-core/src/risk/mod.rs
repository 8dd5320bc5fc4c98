//! Vessel risk factor aggregation
//!
//! Every sub-factor lies in `[1.0, 4.0]` and the global risk is the
//! weighted geometric mean `impact^0.2 × probability^0.3 × detectability^0.5`.
//! Missing data never fails the computation: it yields the neutral values
//! of [`VesselRiskFactor::default`].

use crate::cache::{CacheKind, CachePolicy, TtlCache};
use crate::repositories::{ControlRepository, FleetSegmentRepository, PendingAlertRepository};
use chrono::{DateTime, Duration, Utc};
use fmon_common::VesselIdentity;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

const MIN_RISK: f64 = 1.0;
const MAX_RISK: f64 = 4.0;
const DEFAULT_IMPACT: f64 = 1.0;
const DEFAULT_PROBABILITY: f64 = 2.0;
const DEFAULT_DETECTABILITY: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSegment {
    pub segment: String,
    pub segment_name: Option<String>,
    pub impact_risk_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Control {
    pub internal_reference_number: String,
    pub control_date_time: DateTime<Utc>,
    pub number_of_infractions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselRiskFactor {
    pub global_risk: f64,
    pub impact_risk: f64,
    pub probability_risk: f64,
    pub detectability_risk: f64,
    pub number_of_controls_last_five_years: Option<u32>,
    pub number_of_infractions_last_five_years: Option<u32>,
    pub last_control_date: Option<DateTime<Utc>>,
}

impl Default for VesselRiskFactor {
    fn default() -> Self {
        Self {
            global_risk: global_risk(DEFAULT_IMPACT, DEFAULT_PROBABILITY, DEFAULT_DETECTABILITY),
            impact_risk: DEFAULT_IMPACT,
            probability_risk: DEFAULT_PROBABILITY,
            detectability_risk: DEFAULT_DETECTABILITY,
            number_of_controls_last_five_years: None,
            number_of_infractions_last_five_years: None,
            last_control_date: None,
        }
    }
}

/// Data the score is computed from
#[derive(Debug, Clone, Default)]
pub struct RiskInputs {
    pub segments: Vec<FleetSegment>,
    /// Controls of the last five years
    pub controls: Vec<Control>,
    pub has_pending_alert: bool,
}

pub fn global_risk(impact: f64, probability: f64, detectability: f64) -> f64 {
    impact.powf(0.2) * probability.powf(0.3) * detectability.powf(0.5)
}

fn bounded(value: f64) -> f64 {
    value.clamp(MIN_RISK, MAX_RISK)
}

/// Pure risk computation
pub fn compute_risk_factor(inputs: &RiskInputs, now: DateTime<Utc>) -> VesselRiskFactor {
    let impact = inputs
        .segments
        .iter()
        .map(|s| s.impact_risk_factor)
        .fold(None, |max: Option<f64>, v| Some(max.map_or(v, |m| m.max(v))))
        .map(bounded)
        .unwrap_or(DEFAULT_IMPACT);

    let alert_bump = if inputs.has_pending_alert { 1.0 } else { 0.0 };

    if inputs.controls.is_empty() {
        let probability = bounded(DEFAULT_PROBABILITY + alert_bump);
        return VesselRiskFactor {
            global_risk: global_risk(impact, probability, DEFAULT_DETECTABILITY),
            impact_risk: impact,
            probability_risk: probability,
            detectability_risk: DEFAULT_DETECTABILITY,
            ..VesselRiskFactor::default()
        };
    }

    let number_of_controls = inputs.controls.len() as u32;
    let number_of_infractions: i64 = inputs.controls.iter().map(|c| c.number_of_infractions.max(0)).sum();
    let controls_with_infraction = inputs.controls.iter().filter(|c| c.number_of_infractions > 0).count();
    let infraction_rate = controls_with_infraction as f64 / number_of_controls as f64;
    let probability = bounded(1.0 + 3.0 * infraction_rate + alert_bump);

    let last_control_date = inputs.controls.iter().map(|c| c.control_date_time).max();
    let mut detectability = match number_of_controls {
        1..=2 => 3.0,
        3..=5 => 2.0,
        _ => 1.0,
    };
    if last_control_date.is_some_and(|d| now - d < Duration::days(365)) {
        detectability -= 0.5;
    }
    let detectability = bounded(detectability);

    VesselRiskFactor {
        global_risk: global_risk(impact, probability, detectability),
        impact_risk: impact,
        probability_risk: probability,
        detectability_risk: detectability,
        number_of_controls_last_five_years: Some(number_of_controls),
        number_of_infractions_last_five_years: Some(number_of_infractions as u32),
        last_control_date,
    }
}

/// Gathers risk inputs concurrently and computes the score
pub struct RiskFactorAggregator {
    segments: Arc<dyn FleetSegmentRepository>,
    controls: Arc<dyn ControlRepository>,
    pending_alerts: Arc<dyn PendingAlertRepository>,
    cache: Option<TtlCache<String, VesselRiskFactor>>,
}

impl RiskFactorAggregator {
    pub fn new(
        segments: Arc<dyn FleetSegmentRepository>,
        controls: Arc<dyn ControlRepository>,
        pending_alerts: Arc<dyn PendingAlertRepository>,
        policy: &CachePolicy,
    ) -> Self {
        Self {
            segments,
            controls,
            pending_alerts,
            cache: policy.cache_for(CacheKind::RiskFactors),
        }
    }

    /// Risk factor of a vessel; never fails
    ///
    /// Each input is fetched independently and a failed fetch counts as
    /// "no data" for that input only.
    pub async fn get_vessel_risk_factor(&self, identity: &VesselIdentity, now: DateTime<Utc>) -> VesselRiskFactor {
        let Some(cfr) = identity
            .internal_reference_number
            .as_deref()
            .filter(|c| !c.trim().is_empty())
        else {
            debug!("No CFR for vessel, using default risk factor");
            return VesselRiskFactor::default();
        };

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&cfr.to_string()).await {
                return cached;
            }
        }

        let since = now - Duration::days(5 * 365);
        let (segments, controls, has_pending_alert) = tokio::join!(
            self.segments.find_current_segments(cfr),
            self.controls.find_controls_since(cfr, since),
            self.pending_alerts.exists_for_vessel(identity),
        );

        let inputs = RiskInputs {
            segments: segments.unwrap_or_else(|e| {
                warn!(cfr, error = %e, "Could not fetch fleet segments for risk factor");
                Vec::new()
            }),
            controls: controls.unwrap_or_else(|e| {
                warn!(cfr, error = %e, "Could not fetch controls for risk factor");
                Vec::new()
            }),
            has_pending_alert: has_pending_alert.unwrap_or_else(|e| {
                warn!(cfr, error = %e, "Could not fetch pending alerts for risk factor");
                false
            }),
        };

        let risk_factor = compute_risk_factor(&inputs, now);
        if let Some(cache) = &self.cache {
            cache.insert(cfr.to_string(), risk_factor.clone()).await;
        }
        risk_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap()
    }

    fn control(days_ago: i64, infractions: i64) -> Control {
        Control {
            internal_reference_number: "FR224226850".to_string(),
            control_date_time: now() - Duration::days(days_ago),
            number_of_infractions: infractions,
        }
    }

    fn segment(impact: f64) -> FleetSegment {
        FleetSegment {
            segment: "SWW01".to_string(),
            segment_name: None,
            impact_risk_factor: impact,
        }
    }

    #[test]
    fn test_default_risk_factor() {
        let risk = VesselRiskFactor::default();

        assert_eq!(risk.impact_risk, 1.0);
        assert_eq!(risk.probability_risk, 2.0);
        assert_eq!(risk.detectability_risk, 2.0);
        assert!((risk.global_risk - 1.7411).abs() < 1e-3);
    }

    #[test]
    fn test_no_data_yields_default() {
        assert_eq!(compute_risk_factor(&RiskInputs::default(), now()), VesselRiskFactor::default());
    }

    #[test]
    fn test_impact_uses_highest_segment() {
        let inputs = RiskInputs {
            segments: vec![segment(2.1), segment(3.4), segment(1.0)],
            ..Default::default()
        };

        assert_eq!(compute_risk_factor(&inputs, now()).impact_risk, 3.4);
    }

    #[test]
    fn test_impact_is_bounded() {
        let inputs = RiskInputs {
            segments: vec![segment(7.0)],
            ..Default::default()
        };

        assert_eq!(compute_risk_factor(&inputs, now()).impact_risk, MAX_RISK);
    }

    #[test]
    fn test_probability_from_infraction_rate() {
        let inputs = RiskInputs {
            controls: vec![control(400, 2), control(800, 0), control(900, 0), control(1000, 1)],
            ..Default::default()
        };

        let risk = compute_risk_factor(&inputs, now());

        assert_eq!(risk.probability_risk, 2.5);
        assert_eq!(risk.number_of_controls_last_five_years, Some(4));
        assert_eq!(risk.number_of_infractions_last_five_years, Some(3));
        assert_eq!(risk.detectability_risk, 2.0);
    }

    #[test]
    fn test_pending_alert_raises_probability() {
        let inputs = RiskInputs {
            has_pending_alert: true,
            ..Default::default()
        };

        assert_eq!(compute_risk_factor(&inputs, now()).probability_risk, 3.0);
    }

    #[test]
    fn test_recent_control_lowers_detectability() {
        let inputs = RiskInputs {
            controls: vec![control(30, 0)],
            ..Default::default()
        };

        let risk = compute_risk_factor(&inputs, now());

        assert_eq!(risk.detectability_risk, 2.5);
        assert_eq!(risk.probability_risk, 1.0);
        assert_eq!(risk.last_control_date, Some(now() - Duration::days(30)));
    }

    #[test]
    fn test_all_factors_stay_in_range() {
        let inputs = RiskInputs {
            segments: vec![segment(0.2)],
            controls: (0..10).map(|i| control(i, 5)).collect(),
            has_pending_alert: true,
        };

        let risk = compute_risk_factor(&inputs, now());

        for factor in [risk.impact_risk, risk.probability_risk, risk.detectability_risk] {
            assert!((MIN_RISK..=MAX_RISK).contains(&factor));
        }
        assert_eq!(risk.probability_risk, 4.0);
        assert_eq!(risk.detectability_risk, 1.0);
    }
}
