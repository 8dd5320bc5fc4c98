//! Beacon malfunction follow-up

pub mod model;
pub mod tracker;

use crate::repositories::BeaconMalfunctionRepository;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use fmon_common::VesselIdentity;
use futures::future::join_all;
use model::{
    BeaconMalfunction, BeaconMalfunctionAction, BeaconMalfunctionComment, BeaconMalfunctionNotificationType,
    BeaconMalfunctionResume, BeaconMalfunctionWithDetails, CommentUserType, NewBeaconMalfunction,
    NotificationRequestOutcome, Stage, UpdateBeaconMalfunction, VesselBeaconMalfunctions,
};
use std::sync::Arc;
use tracing::{info, warn};

pub struct BeaconMalfunctionService {
    repository: Arc<dyn BeaconMalfunctionRepository>,
}

impl BeaconMalfunctionService {
    pub fn new(repository: Arc<dyn BeaconMalfunctionRepository>) -> Self {
        Self { repository }
    }

    /// Record a newly detected connectivity gap
    pub async fn create_beacon_malfunction(&self, new: &NewBeaconMalfunction) -> Result<BeaconMalfunction> {
        let beacon_malfunction = self.repository.create(new).await?;
        info!(
            beacon_malfunction_id = beacon_malfunction.id,
            beacon_number = %beacon_malfunction.beacon_number,
            "Beacon malfunction opened"
        );
        Ok(beacon_malfunction)
    }

    /// Apply a status, stage or end reason change with its audit rows
    ///
    /// A rejected update writes nothing, as does one racing another update
    /// of the same record.
    pub async fn update_beacon_malfunction(
        &self,
        id: i64,
        update: &UpdateBeaconMalfunction,
        timestamp: DateTime<Utc>,
    ) -> Result<BeaconMalfunctionWithDetails> {
        let current = self.find(id).await?;
        let planned = tracker::plan_update(&current, update, timestamp)?;

        self.repository
            .apply_update(&current, &planned.beacon_malfunction, &planned.actions)
            .await?;
        info!(
            beacon_malfunction_id = id,
            stage = %planned.beacon_malfunction.stage,
            vessel_status = %planned.beacon_malfunction.vessel_status,
            actions = planned.actions.len(),
            "Beacon malfunction updated"
        );

        self.get_beacon_malfunction(id).await
    }

    /// Store the intent to notify; delivery happens elsewhere
    pub async fn request_notification(
        &self,
        id: i64,
        notification_type: BeaconMalfunctionNotificationType,
    ) -> Result<NotificationRequestOutcome> {
        let current = self.find(id).await?;
        if current.notification_requested == Some(notification_type) {
            info!(beacon_malfunction_id = id, notification_type = %notification_type, "Notification already requested");
            return Ok(NotificationRequestOutcome::AlreadyPending);
        }

        self.repository.request_notification(id, notification_type).await?;
        info!(beacon_malfunction_id = id, notification_type = %notification_type, "Notification requested");
        Ok(NotificationRequestOutcome::Requested)
    }

    pub async fn get_beacon_malfunction(&self, id: i64) -> Result<BeaconMalfunctionWithDetails> {
        let beacon_malfunction = self.find(id).await?;

        let (comments, actions, notifications) = tokio::join!(
            self.repository.find_comments(id),
            self.repository.find_actions(id),
            self.repository.find_notifications(id),
        );

        let resume = self
            .vessel_resume(&beacon_malfunction.vessel, DateTime::UNIX_EPOCH)
            .await
            .unwrap_or_else(|e| {
                warn!(beacon_malfunction_id = id, error = %e, "Could not compute vessel resume");
                BeaconMalfunctionResume::default()
            });

        Ok(BeaconMalfunctionWithDetails {
            beacon_malfunction,
            resume,
            comments: comments?,
            actions: actions?,
            notifications: tracker::group_notifications(notifications?),
        })
    }

    /// Working set: every non-archived record plus the last archived ones
    pub async fn get_all_beacon_malfunctions(&self) -> Result<Vec<BeaconMalfunction>> {
        let (current, archived) = tokio::join!(
            self.repository.find_all_except_end_of_follow_up(),
            self.repository.find_last_thirty_end_of_follow_up(),
        );

        let mut all = current?;
        all.extend(archived?);
        Ok(tracker::select_working_set(all))
    }

    pub async fn get_fleet_resume(&self) -> Result<BeaconMalfunctionResume> {
        let current = self.repository.find_all_except_end_of_follow_up().await?;
        Ok(tracker::fleet_resume(&current))
    }

    /// History of one vessel since `after`: ongoing malfunctions apart from
    /// ended or archived ones
    pub async fn get_vessel_beacon_malfunctions(
        &self,
        identity: &VesselIdentity,
        after: DateTime<Utc>,
    ) -> Result<VesselBeaconMalfunctions> {
        let (identifier, value) = identity.lookup_key()?;
        let beacon_malfunctions = self.repository.find_all_by_vessel(identifier, &value, after).await?;
        let history_with_actions = self.with_actions(beacon_malfunctions).await?;
        let resume = tracker::vessel_resume(&history_with_actions);

        let (history, current): (Vec<_>, Vec<_>) = history_with_actions
            .into_iter()
            .map(|(b, _)| b)
            .partition(|b| b.stage == Stage::Archived || b.stage.is_end_of_malfunction());

        Ok(VesselBeaconMalfunctions {
            resume,
            current,
            history,
        })
    }

    pub async fn save_comment(
        &self,
        id: i64,
        comment: &str,
        user_type: CommentUserType,
        date_time: DateTime<Utc>,
    ) -> Result<Vec<BeaconMalfunctionComment>> {
        self.find(id).await?;
        if comment.trim().is_empty() {
            return Err(Error::IllegalArgument("comment must not be blank".to_string()));
        }

        self.repository
            .save_comment(&BeaconMalfunctionComment {
                beacon_malfunction_id: id,
                comment: comment.to_string(),
                user_type,
                date_time,
            })
            .await?;
        info!(beacon_malfunction_id = id, user_type = %user_type, "Beacon malfunction comment added");

        self.repository.find_comments(id).await
    }

    async fn find(&self, id: i64) -> Result<BeaconMalfunction> {
        self.repository
            .find(id)
            .await?
            .ok_or(Error::BeaconMalfunctionNotFound { id })
    }

    async fn vessel_resume(
        &self,
        identity: &VesselIdentity,
        after: DateTime<Utc>,
    ) -> Result<BeaconMalfunctionResume> {
        let (identifier, value) = identity.lookup_key()?;
        let beacon_malfunctions = self.repository.find_all_by_vessel(identifier, &value, after).await?;
        let history = self.with_actions(beacon_malfunctions).await?;
        Ok(tracker::vessel_resume(&history))
    }

    async fn with_actions(
        &self,
        beacon_malfunctions: Vec<BeaconMalfunction>,
    ) -> Result<Vec<(BeaconMalfunction, Vec<BeaconMalfunctionAction>)>> {
        let actions = join_all(beacon_malfunctions.iter().map(|b| self.repository.find_actions(b.id))).await;

        beacon_malfunctions
            .into_iter()
            .zip(actions)
            .map(|(b, a)| a.map(|a| (b, a)))
            .collect()
    }
}
