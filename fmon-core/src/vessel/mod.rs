//! Composite vessel read: record, track and risk factor fetched together

pub mod model;

use crate::repositories::{LogbookReportRepository, PositionRepository, VesselRepository};
use crate::risk::RiskFactorAggregator;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use fmon_common::VesselIdentity;
use model::{VesselInformation, VesselTrackDepth, VesselWithData};
use std::sync::Arc;
use tracing::{debug, warn};

/// Track window actually used for a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub track_was_modified: bool,
}

pub struct VesselService {
    vessels: Arc<dyn VesselRepository>,
    positions: Arc<dyn PositionRepository>,
    logbook_reports: Arc<dyn LogbookReportRepository>,
    risk_factors: Arc<RiskFactorAggregator>,
}

impl VesselService {
    pub fn new(
        vessels: Arc<dyn VesselRepository>,
        positions: Arc<dyn PositionRepository>,
        logbook_reports: Arc<dyn LogbookReportRepository>,
        risk_factors: Arc<RiskFactorAggregator>,
    ) -> Self {
        Self {
            vessels,
            positions,
            logbook_reports,
            risk_factors,
        }
    }

    /// Vessel record, track and risk factor
    ///
    /// The three lookups run concurrently and each one falls back to an
    /// empty value on failure without affecting the others.
    pub async fn get_vessel(
        &self,
        identity: &VesselIdentity,
        depth: VesselTrackDepth,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<VesselInformation> {
        identity.resolve()?;
        let window = self.track_window(identity, depth, from, to, now).await?;
        debug!(
            depth = %depth,
            from = %window.from,
            to = %window.to,
            track_was_modified = window.track_was_modified,
            "Fetching vessel"
        );

        let (vessel, positions, vessel_risk_factor) = tokio::join!(
            self.vessels.find_vessel(identity),
            self.positions.find_vessel_positions(identity, window.from, window.to),
            self.risk_factors.get_vessel_risk_factor(identity, now),
        );

        let vessel = vessel.unwrap_or_else(|e| {
            warn!(error = %e, "Could not fetch vessel record");
            None
        });
        let positions = positions.unwrap_or_else(|e| {
            warn!(error = %e, "Could not fetch vessel positions");
            Vec::new()
        });

        Ok(VesselInformation {
            track_was_modified: window.track_was_modified,
            vessel_with_data: VesselWithData {
                vessel,
                positions,
                vessel_risk_factor,
            },
        })
    }

    /// Resolve the requested depth into dates
    ///
    /// LAST_DEPARTURE falls back to the last twelve hours when the vessel
    /// has no known trip.
    pub async fn track_window(
        &self,
        identity: &VesselIdentity,
        depth: VesselTrackDepth,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<TrackWindow> {
        if let Some(duration) = depth.duration() {
            return Ok(TrackWindow {
                from: now - duration,
                to: now,
                track_was_modified: false,
            });
        }

        match depth {
            VesselTrackDepth::Custom => match (from, to) {
                (Some(from), Some(to)) if from <= to => Ok(TrackWindow {
                    from,
                    to,
                    track_was_modified: false,
                }),
                (Some(_), Some(_)) => Err(Error::IllegalArgument(
                    "custom track start must precede its end".to_string(),
                )),
                _ => Err(Error::IllegalArgument(
                    "a custom track depth requires both a start and an end date".to_string(),
                )),
            },
            _ => Ok(self.last_departure_window(identity, now).await),
        }
    }

    async fn last_departure_window(&self, identity: &VesselIdentity, now: DateTime<Utc>) -> TrackWindow {
        let fallback = TrackWindow {
            from: now - chrono::Duration::hours(12),
            to: now,
            track_was_modified: true,
        };

        let Some(cfr) = identity
            .internal_reference_number
            .as_deref()
            .filter(|c| !c.trim().is_empty())
        else {
            return fallback;
        };

        match self.logbook_reports.find_last_trip_before(cfr, now).await {
            Ok(Some(trip)) => TrackWindow {
                from: trip.start_date,
                to: now,
                track_was_modified: false,
            },
            Ok(None) => {
                debug!(cfr, "No trip found, using the last twelve hours");
                fallback
            }
            Err(e) => {
                warn!(cfr, error = %e, "Could not fetch last trip, using the last twelve hours");
                fallback
            }
        }
    }
}
