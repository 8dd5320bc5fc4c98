//! Beacon malfunction tracker
//!
//! Pure transition planning: validates a requested update against the
//! current record and produces the new record together with its audit rows.
//! Nothing is written unless the whole plan is valid.

use super::model::{
    ActionPropertyName, BeaconMalfunction, BeaconMalfunctionAction, BeaconMalfunctionNotification,
    BeaconMalfunctionNotifications, BeaconMalfunctionResume, Stage, UpdateBeaconMalfunction, VesselStatus,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Maximum number of archived records kept in the default listing
pub const ARCHIVED_RETENTION: usize = 30;

/// Updated record plus the audit rows to write with it
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedUpdate {
    pub beacon_malfunction: BeaconMalfunction,
    pub actions: Vec<BeaconMalfunctionAction>,
}

/// Validate and apply a requested update in memory
pub fn plan_update(
    current: &BeaconMalfunction,
    update: &UpdateBeaconMalfunction,
    timestamp: DateTime<Utc>,
) -> Result<PlannedUpdate> {
    if update.vessel_status.is_none()
        && update.stage.is_none()
        && update.end_of_beacon_malfunction_reason.is_none()
    {
        return Err(Error::CouldNotUpdateBeaconMalfunction(
            "no value to update".to_string(),
        ));
    }

    let mut next = current.clone();
    let mut actions = Vec::new();
    let mut record = |property_name, previous_value: String, next_value: String| {
        actions.push(BeaconMalfunctionAction {
            beacon_malfunction_id: current.id,
            property_name,
            previous_value,
            next_value,
            date_time: timestamp,
        });
    };

    if let Some(reason) = update.end_of_beacon_malfunction_reason {
        if current.end_of_beacon_malfunction_reason != Some(reason) {
            record(
                ActionPropertyName::EndOfMalfunctionReason,
                current
                    .end_of_beacon_malfunction_reason
                    .map(|r| r.to_string())
                    .unwrap_or_default(),
                reason.to_string(),
            );
            next.end_of_beacon_malfunction_reason = Some(reason);
        }
    }

    if let Some(stage) = update.stage.filter(|s| *s != current.stage) {
        check_stage_transition(current.stage, stage)?;

        match stage {
            Stage::EndOfMalfunction => {
                if next.end_of_beacon_malfunction_reason.is_none() {
                    return Err(Error::CouldNotUpdateBeaconMalfunction(format!(
                        "an end of malfunction reason is required to move beacon malfunction {} to {}",
                        current.id, stage
                    )));
                }
                next.malfunction_end_date_time = Some(timestamp);
            }
            Stage::Archived => {
                if next.malfunction_end_date_time.is_none()
                    || next.end_of_beacon_malfunction_reason.is_none()
                {
                    return Err(Error::CouldNotUpdateBeaconMalfunction(format!(
                        "beacon malfunction {} must have an end date and reason to be archived",
                        current.id
                    )));
                }
            }
            _ => {}
        }

        record(ActionPropertyName::Stage, current.stage.to_string(), stage.to_string());
        next.stage = stage;
    }

    if let Some(status) = update.vessel_status.filter(|s| *s != current.vessel_status) {
        record(
            ActionPropertyName::VesselStatus,
            current.vessel_status.to_string(),
            status.to_string(),
        );
        next.vessel_status = status;
    }

    next.vessel_status_last_modification_date_time = timestamp;

    Ok(PlannedUpdate {
        beacon_malfunction: next,
        actions,
    })
}

/// Stages move forward (skipping allowed) or sideways between
/// TARGETING_VESSEL and CROSS_CHECK. ARCHIVED is only reachable from the
/// end of malfunction and is final. The legacy stage cannot be set.
fn check_stage_transition(from: Stage, to: Stage) -> Result<()> {
    let allowed = match (from, to) {
        (_, Stage::ResumedTransmission) => false,
        (Stage::Archived, _) => false,
        (from, Stage::Archived) => from.is_end_of_malfunction(),
        (from, to) => to.rank() >= from.rank(),
    };

    if allowed {
        Ok(())
    } else {
        Err(Error::CouldNotUpdateBeaconMalfunction(format!(
            "cannot move from stage {} to {}",
            from, to
        )))
    }
}

/// Fleet-wide summary of the non-archived working set
pub fn fleet_resume(beacon_malfunctions: &[BeaconMalfunction]) -> BeaconMalfunctionResume {
    let mut resume = BeaconMalfunctionResume::default();
    let mut last: Option<&BeaconMalfunction> = None;

    for beacon_malfunction in beacon_malfunctions.iter().filter(|b| b.stage != Stage::Archived) {
        count_status(&mut resume, beacon_malfunction.vessel_status);
        let is_more_recent = last
            .map(|l| {
                beacon_malfunction.vessel_status_last_modification_date_time
                    > l.vessel_status_last_modification_date_time
            })
            .unwrap_or(true);
        if is_more_recent {
            last = Some(beacon_malfunction);
        }
    }

    if let Some(last) = last {
        resume.last_beacon_malfunction_date_time = Some(last.vessel_status_last_modification_date_time);
        resume.last_beacon_malfunction_vessel_status = Some(last.vessel_status);
    }
    resume
}

/// Summary of one vessel's malfunction history
///
/// Each malfunction counts with the status it started with: the previous
/// value of its first recorded vessel status change, or its current status
/// when none was recorded. The last malfunction is the latest to start.
pub fn vessel_resume(
    history: &[(BeaconMalfunction, Vec<BeaconMalfunctionAction>)],
) -> BeaconMalfunctionResume {
    let mut resume = BeaconMalfunctionResume::default();

    for (beacon_malfunction, actions) in history {
        count_status(&mut resume, status_at_start(beacon_malfunction, actions));
    }

    if let Some((last, _)) = history
        .iter()
        .max_by_key(|(b, _)| (b.malfunction_start_date_time, b.id))
    {
        resume.last_beacon_malfunction_date_time = Some(last.malfunction_start_date_time);
        resume.last_beacon_malfunction_vessel_status = Some(last.vessel_status);
    }
    resume
}

fn status_at_start(beacon_malfunction: &BeaconMalfunction, actions: &[BeaconMalfunctionAction]) -> VesselStatus {
    actions
        .iter()
        .filter(|a| a.property_name == ActionPropertyName::VesselStatus)
        .min_by_key(|a| a.date_time)
        .and_then(|a| a.previous_value.parse().ok())
        .unwrap_or(beacon_malfunction.vessel_status)
}

fn count_status(resume: &mut BeaconMalfunctionResume, status: VesselStatus) {
    match status {
        VesselStatus::AtSea => resume.number_of_beacons_at_sea += 1,
        VesselStatus::AtPort => resume.number_of_beacons_at_port += 1,
        _ => resume.number_of_beacons_with_other_status += 1,
    }
}

/// Group delivery attempts by notification event, oldest first
pub fn group_notifications(
    notifications: Vec<BeaconMalfunctionNotification>,
) -> Vec<BeaconMalfunctionNotifications> {
    let mut groups: BTreeMap<(DateTime<Utc>, &'static str), BeaconMalfunctionNotifications> = BTreeMap::new();

    for notification in notifications {
        let key = (notification.date_time_utc, notification.notification_type.as_str());
        groups
            .entry(key)
            .or_insert_with(|| BeaconMalfunctionNotifications {
                beacon_malfunction_id: notification.beacon_malfunction_id,
                date_time_utc: notification.date_time_utc,
                notification_type: notification.notification_type,
                notifications: Vec::new(),
            })
            .notifications
            .push(notification);
    }

    groups.into_values().collect()
}

/// Default listing: the non-archived set plus the most recently ended
/// archived records, capped at [`ARCHIVED_RETENTION`]
pub fn select_working_set(beacon_malfunctions: Vec<BeaconMalfunction>) -> Vec<BeaconMalfunction> {
    let (mut archived, mut current): (Vec<_>, Vec<_>) = beacon_malfunctions
        .into_iter()
        .partition(|b| b.stage == Stage::Archived);

    archived.sort_by(|a, b| b.malfunction_end_date_time.cmp(&a.malfunction_end_date_time));
    archived.truncate(ARCHIVED_RETENTION);

    current.extend(archived);
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beacon::model::{
        BeaconMalfunctionNotificationType, BeaconStatus, CommunicationMeans, EndOfBeaconMalfunctionReason,
        RecipientFunction,
    };
    use chrono::{Duration, TimeZone};
    use fmon_common::VesselIdentity;

    fn t(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 1, 10, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn malfunction(id: i64, stage: Stage, status: VesselStatus) -> BeaconMalfunction {
        BeaconMalfunction {
            id,
            vessel: VesselIdentity::by_internal_reference_number("FR224226850"),
            vessel_name: "BIDUBULE".to_string(),
            flag_state: Some("FR".to_string()),
            vessel_id: None,
            vessel_status: status,
            stage,
            malfunction_start_date_time: t(0),
            malfunction_end_date_time: None,
            vessel_status_last_modification_date_time: t(0),
            end_of_beacon_malfunction_reason: None,
            beacon_number: "123465".to_string(),
            beacon_status_at_malfunction_creation: BeaconStatus::Activated,
            notification_requested: None,
        }
    }

    #[test]
    fn test_stage_change_writes_one_action() {
        let current = malfunction(1, Stage::InitialEncounter, VesselStatus::AtSea);
        let update = UpdateBeaconMalfunction {
            stage: Some(Stage::RelaunchRequest),
            ..Default::default()
        };

        let plan = plan_update(&current, &update, t(2)).unwrap();

        assert_eq!(plan.beacon_malfunction.stage, Stage::RelaunchRequest);
        assert_eq!(plan.beacon_malfunction.vessel_status_last_modification_date_time, t(2));
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.actions[0].property_name, ActionPropertyName::Stage);
        assert_eq!(plan.actions[0].previous_value, "INITIAL_ENCOUNTER");
        assert_eq!(plan.actions[0].next_value, "RELAUNCH_REQUEST");
    }

    #[test]
    fn test_status_and_stage_change_write_two_actions() {
        let current = malfunction(1, Stage::TargetingVessel, VesselStatus::AtSea);
        let update = UpdateBeaconMalfunction {
            stage: Some(Stage::CrossCheck),
            vessel_status: Some(VesselStatus::AtPort),
            ..Default::default()
        };

        let plan = plan_update(&current, &update, t(1)).unwrap();

        assert_eq!(plan.actions.len(), 2);
        assert_eq!(plan.beacon_malfunction.vessel_status, VesselStatus::AtPort);
        assert_eq!(plan.beacon_malfunction.stage, Stage::CrossCheck);
    }

    #[test]
    fn test_unchanged_values_write_no_action_but_refresh_timestamp() {
        let current = malfunction(1, Stage::FourHourReport, VesselStatus::AtSea);
        let update = UpdateBeaconMalfunction {
            vessel_status: Some(VesselStatus::AtSea),
            ..Default::default()
        };

        let plan = plan_update(&current, &update, t(5)).unwrap();

        assert!(plan.actions.is_empty());
        assert_eq!(plan.beacon_malfunction.vessel_status_last_modification_date_time, t(5));
    }

    #[test]
    fn test_end_of_malfunction_requires_reason() {
        let current = malfunction(1, Stage::CrossCheck, VesselStatus::AtSea);
        let update = UpdateBeaconMalfunction {
            stage: Some(Stage::EndOfMalfunction),
            vessel_status: Some(VesselStatus::AtPort),
            ..Default::default()
        };

        let result = plan_update(&current, &update, t(1));

        assert!(matches!(result, Err(Error::CouldNotUpdateBeaconMalfunction(_))));
    }

    #[test]
    fn test_end_of_malfunction_sets_end_date() {
        let current = malfunction(1, Stage::CrossCheck, VesselStatus::AtSea);
        let update = UpdateBeaconMalfunction {
            stage: Some(Stage::EndOfMalfunction),
            end_of_beacon_malfunction_reason: Some(EndOfBeaconMalfunctionReason::ResumedTransmission),
            ..Default::default()
        };

        let plan = plan_update(&current, &update, t(3)).unwrap();

        assert_eq!(plan.beacon_malfunction.malfunction_end_date_time, Some(t(3)));
        assert_eq!(plan.actions.len(), 2);
    }

    #[test]
    fn test_end_of_malfunction_uses_stored_reason() {
        let mut current = malfunction(1, Stage::CrossCheck, VesselStatus::AtSea);
        current.end_of_beacon_malfunction_reason =
            Some(EndOfBeaconMalfunctionReason::TemporaryInterruptionOfSupervision);
        let update = UpdateBeaconMalfunction {
            stage: Some(Stage::EndOfMalfunction),
            ..Default::default()
        };

        assert!(plan_update(&current, &update, t(3)).is_ok());
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let cases = [
            (Stage::RelaunchRequest, Stage::InitialEncounter),
            (Stage::InitialEncounter, Stage::Archived),
            (Stage::Archived, Stage::EndOfMalfunction),
            (Stage::CrossCheck, Stage::ResumedTransmission),
        ];
        for (from, to) in cases {
            let mut current = malfunction(1, from, VesselStatus::AtSea);
            current.malfunction_end_date_time = Some(t(0));
            current.end_of_beacon_malfunction_reason = Some(EndOfBeaconMalfunctionReason::ResumedTransmission);
            let update = UpdateBeaconMalfunction {
                stage: Some(to),
                ..Default::default()
            };
            assert!(plan_update(&current, &update, t(1)).is_err(), "{} -> {} should fail", from, to);
        }
    }

    #[test]
    fn test_forward_skip_and_sideways_moves_are_allowed() {
        assert!(check_stage_transition(Stage::InitialEncounter, Stage::TargetingVessel).is_ok());
        assert!(check_stage_transition(Stage::CrossCheck, Stage::TargetingVessel).is_ok());
        assert!(check_stage_transition(Stage::EndOfMalfunction, Stage::Archived).is_ok());
        assert!(check_stage_transition(Stage::ResumedTransmission, Stage::Archived).is_ok());
    }

    #[test]
    fn test_empty_update_is_rejected() {
        let current = malfunction(1, Stage::CrossCheck, VesselStatus::AtSea);
        assert!(plan_update(&current, &UpdateBeaconMalfunction::default(), t(1)).is_err());
    }

    #[test]
    fn test_fleet_resume_ignores_archived() {
        let mut newest = malfunction(3, Stage::CrossCheck, VesselStatus::NoNews);
        newest.vessel_status_last_modification_date_time = t(10);
        let set = vec![
            malfunction(1, Stage::InitialEncounter, VesselStatus::AtSea),
            malfunction(2, Stage::RelaunchRequest, VesselStatus::AtPort),
            newest,
            malfunction(4, Stage::Archived, VesselStatus::AtSea),
        ];

        let resume = fleet_resume(&set);

        assert_eq!(resume.number_of_beacons_at_sea, 1);
        assert_eq!(resume.number_of_beacons_at_port, 1);
        assert_eq!(resume.number_of_beacons_with_other_status, 1);
        assert_eq!(resume.last_beacon_malfunction_vessel_status, Some(VesselStatus::NoNews));
    }

    #[test]
    fn test_vessel_resume_uses_status_at_start() {
        let first = malfunction(1, Stage::EndOfMalfunction, VesselStatus::AtSea);
        let mut second = malfunction(2, Stage::InitialEncounter, VesselStatus::AtSea);
        second.malfunction_start_date_time = t(5);
        let first_actions = vec![
            BeaconMalfunctionAction {
                beacon_malfunction_id: 1,
                property_name: ActionPropertyName::VesselStatus,
                previous_value: "AT_PORT".to_string(),
                next_value: "ACTIVITY_DETECTED".to_string(),
                date_time: t(1),
            },
            BeaconMalfunctionAction {
                beacon_malfunction_id: 1,
                property_name: ActionPropertyName::VesselStatus,
                previous_value: "ACTIVITY_DETECTED".to_string(),
                next_value: "AT_SEA".to_string(),
                date_time: t(2),
            },
        ];

        let resume = vessel_resume(&[(first, first_actions), (second, vec![])]);

        assert_eq!(resume.number_of_beacons_at_sea, 1);
        assert_eq!(resume.number_of_beacons_at_port, 1);
        assert_eq!(resume.last_beacon_malfunction_vessel_status, Some(VesselStatus::AtSea));
        assert_eq!(resume.last_beacon_malfunction_date_time, Some(t(5)));
    }

    #[test]
    fn test_notifications_grouped_by_event() {
        let notification = |id, hours, recipient: &str| BeaconMalfunctionNotification {
            id,
            beacon_malfunction_id: 1,
            date_time_utc: t(hours),
            notification_type: BeaconMalfunctionNotificationType::MalfunctionAtPortInitialNotification,
            communication_means: CommunicationMeans::Sms,
            recipient_function: RecipientFunction::VesselCaptain,
            recipient_name: Some(recipient.to_string()),
            recipient_address_or_number: "0000000000".to_string(),
            success: Some(true),
            error_message: None,
        };

        let groups = group_notifications(vec![
            notification(3, 4, "Later"),
            notification(1, 0, "Jack Sparrow"),
            notification(2, 0, "Will Turner"),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].date_time_utc, t(0));
        assert_eq!(groups[0].notifications.len(), 2);
        assert_eq!(groups[0].notifications[0].recipient_name.as_deref(), Some("Jack Sparrow"));
        assert_eq!(groups[1].notifications.len(), 1);
    }

    #[test]
    fn test_working_set_keeps_last_thirty_archived() {
        let mut all = vec![malfunction(0, Stage::InitialEncounter, VesselStatus::AtSea)];
        for i in 1..=40 {
            let mut archived = malfunction(i, Stage::Archived, VesselStatus::AtPort);
            archived.malfunction_end_date_time = Some(t(i));
            all.push(archived);
        }

        let set = select_working_set(all);

        assert_eq!(set.len(), 1 + ARCHIVED_RETENTION);
        assert_eq!(set[0].id, 0);
        assert_eq!(set[1].id, 40);
        assert_eq!(set.last().unwrap().id, 11);
    }
}
