//! Repository traits
//!
//! Use-cases depend only on these traits. [`crate::db::SqliteStore`]
//! implements all of them; tests substitute fakes where failure injection is
//! needed.

use crate::alerts::model::{PendingAlert, SilencedAlert};
use crate::alerts::silence::SilenceWindow;
use crate::beacon::model::{
    BeaconMalfunction, BeaconMalfunctionAction, BeaconMalfunctionComment, BeaconMalfunctionNotification,
    BeaconMalfunctionNotificationType, NewBeaconMalfunction,
};
use crate::logbook::model::{GearCode, LogbookMessage, Port, Species, VoyageDatesAndTripNumber};
use crate::reporting::model::{Infraction, NewReporting, Reporting, ReportingValue};
use crate::risk::{Control, FleetSegment};
use crate::vessel::model::{Position, Vessel};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fmon_common::{VesselIdentifier, VesselIdentity};

#[async_trait]
pub trait LogbookReportRepository: Send + Sync {
    /// Latest trip started at or before `before`
    async fn find_last_trip_before(
        &self,
        cfr: &str,
        before: DateTime<Utc>,
    ) -> Result<Option<VoyageDatesAndTripNumber>>;

    /// Trip started just before the given one
    async fn find_trip_before(&self, cfr: &str, trip_number: &str) -> Result<Option<VoyageDatesAndTripNumber>>;

    /// Trip started just after the given one
    async fn find_trip_after(&self, cfr: &str, trip_number: &str) -> Result<Option<VoyageDatesAndTripNumber>>;

    /// Operations of a trip between two dates, plus the RET/DEL/COR
    /// operations referencing them
    async fn find_all_messages_by_trip_number_between_dates(
        &self,
        cfr: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        trip_number: &str,
    ) -> Result<Vec<LogbookMessage>>;

    /// First operation stored under a report id
    async fn find_by_report_id(&self, report_id: &str) -> Result<Option<LogbookMessage>>;

    async fn save(&self, message: &LogbookMessage) -> Result<()>;
}

#[async_trait]
pub trait LogbookRawMessageRepository: Send + Sync {
    async fn find_raw_message(&self, operation_number: &str) -> Result<Option<String>>;
}

/// Read-only reference data lookups by code
#[async_trait]
pub trait ReferenceDataRepository: Send + Sync {
    async fn find_species(&self, code: &str) -> Result<Option<Species>>;
    async fn find_gear(&self, code: &str) -> Result<Option<GearCode>>;
    async fn find_port(&self, locode: &str) -> Result<Option<Port>>;
    async fn find_infraction(&self, natinf_code: i32) -> Result<Option<Infraction>>;
}

#[async_trait]
pub trait BeaconMalfunctionRepository: Send + Sync {
    async fn find(&self, id: i64) -> Result<Option<BeaconMalfunction>>;

    /// Every record whose stage is not ARCHIVED
    async fn find_all_except_end_of_follow_up(&self) -> Result<Vec<BeaconMalfunction>>;

    /// At most 30 ARCHIVED records, latest malfunction end first
    async fn find_last_thirty_end_of_follow_up(&self) -> Result<Vec<BeaconMalfunction>>;

    async fn find_all_by_vessel(
        &self,
        identifier: VesselIdentifier,
        value: &str,
        after: DateTime<Utc>,
    ) -> Result<Vec<BeaconMalfunction>>;

    async fn create(&self, new: &NewBeaconMalfunction) -> Result<BeaconMalfunction>;

    /// Persist the updated record and its audit rows in one transaction,
    /// provided the stored record still equals `previous`. Fails with
    /// `CouldNotUpdateBeaconMalfunction` otherwise.
    async fn apply_update(
        &self,
        previous: &BeaconMalfunction,
        updated: &BeaconMalfunction,
        actions: &[BeaconMalfunctionAction],
    ) -> Result<()>;

    async fn request_notification(
        &self,
        id: i64,
        notification_type: BeaconMalfunctionNotificationType,
    ) -> Result<()>;

    async fn find_actions(&self, id: i64) -> Result<Vec<BeaconMalfunctionAction>>;
    async fn find_comments(&self, id: i64) -> Result<Vec<BeaconMalfunctionComment>>;
    async fn save_comment(&self, comment: &BeaconMalfunctionComment) -> Result<()>;
    async fn find_notifications(&self, id: i64) -> Result<Vec<BeaconMalfunctionNotification>>;
}

#[async_trait]
pub trait PendingAlertRepository: Send + Sync {
    async fn save(&self, alert: &PendingAlert) -> Result<i64>;
    async fn find(&self, id: i64) -> Result<Option<PendingAlert>>;
    async fn find_all(&self) -> Result<Vec<PendingAlert>>;
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Remove a pending alert and store the ALERT reporting it becomes, in
    /// one transaction. `None` when the alert is no longer pending.
    async fn validate(&self, id: i64, validation_date: DateTime<Utc>) -> Result<Option<Reporting>>;

    /// Remove a pending alert and store its suppression, in one transaction.
    /// `None` when the alert is no longer pending.
    async fn silence(&self, id: i64, window: &SilenceWindow) -> Result<Option<SilencedAlert>>;

    /// Replace every alert produced by a rule configuration, atomically
    async fn replace_for_config(&self, alert_config_name: &str, alerts: &[PendingAlert]) -> Result<()>;

    async fn exists_for_vessel(&self, identity: &VesselIdentity) -> Result<bool>;
}

#[async_trait]
pub trait SilencedAlertRepository: Send + Sync {
    async fn save(&self, alert: &SilencedAlert) -> Result<SilencedAlert>;

    /// Silenced alerts still suppressing detections at `now`
    async fn find_all_active(&self, now: DateTime<Utc>) -> Result<Vec<SilencedAlert>>;

    async fn delete(&self, id: i64) -> Result<bool>;
    async fn reactivate(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait ReportingRepository: Send + Sync {
    async fn save(&self, reporting: &NewReporting) -> Result<Reporting>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Reporting>>;

    /// Neither archived nor deleted
    async fn find_all_current(&self) -> Result<Vec<Reporting>>;

    /// Non-deleted reportings of a vessel created since `from`, newest first
    async fn find_current_and_archived_by_vessel(
        &self,
        identifier: VesselIdentifier,
        value: &str,
        from: DateTime<Utc>,
    ) -> Result<Vec<Reporting>>;

    /// Returns false when no reporting has this id
    async fn archive(&self, id: i64) -> Result<bool>;

    /// Returns false when no reporting has this id
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn update_value(&self, id: i64, value: &ReportingValue) -> Result<()>;
}

#[async_trait]
pub trait LastPositionRepository: Send + Sync {
    /// Under-charter flag of the vessel's last position, None when the
    /// vessel has no known position
    async fn find_under_charter_for_vessel(
        &self,
        identifier: VesselIdentifier,
        value: &str,
    ) -> Result<Option<bool>>;
}

#[async_trait]
pub trait PositionRepository: Send + Sync {
    async fn find_vessel_positions(
        &self,
        identity: &VesselIdentity,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Position>>;
}

#[async_trait]
pub trait VesselRepository: Send + Sync {
    async fn find_vessel(&self, identity: &VesselIdentity) -> Result<Option<Vessel>>;
}

#[async_trait]
pub trait FleetSegmentRepository: Send + Sync {
    /// Segments the vessel currently belongs to
    async fn find_current_segments(&self, cfr: &str) -> Result<Vec<FleetSegment>>;
}

#[async_trait]
pub trait ControlRepository: Send + Sync {
    async fn find_controls_since(&self, cfr: &str, since: DateTime<Utc>) -> Result<Vec<Control>>;
}
