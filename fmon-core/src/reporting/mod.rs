//! Reporting lifecycle: creation, archive, delete, update and listings

pub mod model;

use crate::repositories::{LastPositionRepository, ReferenceDataRepository, ReportingRepository};
use crate::{Error, Result};
use chrono::{DateTime, Months, Utc};
use fmon_common::VesselIdentity;
use futures::future::join_all;
use model::{
    BatchFailure, BatchOutcome, InfractionSuspicion, NewReporting, Observation, Reporting, ReportingType,
    ReportingValue, UpdatedReportingValues, VesselReportings,
};
use std::sync::Arc;
use tracing::{info, warn};

pub struct ReportingService {
    reportings: Arc<dyn ReportingRepository>,
    last_positions: Arc<dyn LastPositionRepository>,
    reference_data: Arc<dyn ReferenceDataRepository>,
    history_years: u32,
}

impl ReportingService {
    pub fn new(
        reportings: Arc<dyn ReportingRepository>,
        last_positions: Arc<dyn LastPositionRepository>,
        reference_data: Arc<dyn ReferenceDataRepository>,
        history_years: u32,
    ) -> Self {
        Self {
            reportings,
            last_positions,
            reference_data,
            history_years,
        }
    }

    /// Create an operator-authored reporting
    pub async fn add_reporting(&self, reporting: &NewReporting) -> Result<Reporting> {
        let reporting_type = reporting.value.reporting_type();
        if !reporting_type.is_editable() {
            return Err(Error::IllegalArgument(format!(
                "a {} reporting can only be created by validating an alert",
                reporting_type
            )));
        }
        check_title(&reporting.value)?;
        self.check_natinf(reporting.value.natinf_code()).await?;

        let saved = self.reportings.save(reporting).await?;
        info!(reporting_id = saved.id, reporting_type = %reporting_type, "Reporting created");
        Ok(saved)
    }

    /// Archive a reporting; archiving twice is a no-op
    pub async fn archive_reporting(&self, id: i64) -> Result<()> {
        if !self.reportings.archive(id).await? {
            return Err(Error::ReportingNotFound { id });
        }
        info!(reporting_id = id, "Reporting archived");
        Ok(())
    }

    /// Soft-delete a reporting; deleting twice is a no-op
    pub async fn delete_reporting(&self, id: i64) -> Result<()> {
        if !self.reportings.delete(id).await? {
            return Err(Error::ReportingNotFound { id });
        }
        info!(reporting_id = id, "Reporting deleted");
        Ok(())
    }

    /// Archive each id independently; one failure does not stop the others
    pub async fn archive_reportings(&self, ids: &[i64]) -> BatchOutcome {
        let results = join_all(ids.iter().map(|id| self.archive_reporting(*id))).await;
        batch_outcome(ids, results)
    }

    /// Delete each id independently; one failure does not stop the others
    pub async fn delete_reportings(&self, ids: &[i64]) -> BatchOutcome {
        let results = join_all(ids.iter().map(|id| self.delete_reporting(*id))).await;
        batch_outcome(ids, results)
    }

    /// Replace the editable fields of an INFRACTION_SUSPICION or
    /// OBSERVATION; sea front, flag state and DML are kept
    pub async fn update_reporting(&self, id: i64, updated: &UpdatedReportingValues) -> Result<Reporting> {
        let current = self
            .reportings
            .find_by_id(id)
            .await?
            .ok_or(Error::ReportingNotFound { id })?;

        if !current.reporting_type.is_editable() {
            return Err(Error::ReportingNotEditable {
                id,
                reporting_type: current.reporting_type.to_string(),
            });
        }

        let value = updated_value(&current.value, updated)?;
        check_title(&value)?;
        self.check_natinf(value.natinf_code()).await?;

        self.reportings.update_value(id, &value).await?;
        info!(reporting_id = id, reporting_type = %value.reporting_type(), "Reporting updated");

        self.reportings
            .find_by_id(id)
            .await?
            .ok_or(Error::ReportingNotFound { id })
    }

    /// Current reportings with a best-effort under-charter flag
    ///
    /// A reporting whose flag cannot be determined keeps `None`; the
    /// listing itself never fails because of it.
    pub async fn get_all_current_reportings(&self) -> Result<Vec<Reporting>> {
        let reportings = self.reportings.find_all_current().await?;

        let flags = join_all(reportings.iter().map(|reporting| self.under_charter(reporting))).await;

        Ok(reportings
            .into_iter()
            .zip(flags)
            .map(|(reporting, under_charter)| Reporting {
                under_charter,
                ..reporting
            })
            .collect())
    }

    /// Non-deleted reportings of a vessel since `from`, split into current
    /// and archived. Without `from`, the configured history window is used.
    pub async fn get_vessel_reportings(
        &self,
        identity: &VesselIdentity,
        from: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<VesselReportings> {
        let (identifier, value) = identity.lookup_key()?;
        let from = match from {
            Some(from) => from,
            None => now
                .checked_sub_months(Months::new(12 * self.history_years))
                .unwrap_or(DateTime::UNIX_EPOCH),
        };

        let reportings = self
            .reportings
            .find_current_and_archived_by_vessel(identifier, &value, from)
            .await?;

        let (archived, current) = reportings.into_iter().partition(|r| r.is_archived);
        Ok(VesselReportings { current, archived })
    }

    async fn under_charter(&self, reporting: &Reporting) -> Option<bool> {
        let (identifier, value) = match reporting.vessel.lookup_key() {
            Ok(key) => key,
            Err(e) => {
                warn!(reporting_id = reporting.id, error = %e, "Cannot resolve vessel of reporting");
                return None;
            }
        };

        match self.last_positions.find_under_charter_for_vessel(identifier, &value).await {
            Ok(under_charter) => under_charter,
            Err(e) => {
                warn!(reporting_id = reporting.id, error = %e, "Could not fetch under charter flag");
                None
            }
        }
    }

    async fn check_natinf(&self, natinf_code: Option<i32>) -> Result<()> {
        let Some(natinf_code) = natinf_code else {
            return Ok(());
        };
        match self.reference_data.find_infraction(natinf_code).await? {
            Some(_) => Ok(()),
            None => Err(Error::NatinfNotFound { natinf_code }),
        }
    }
}

fn check_title(value: &ReportingValue) -> Result<()> {
    let title = match value {
        ReportingValue::InfractionSuspicion(v) => &v.title,
        ReportingValue::Observation(v) => &v.title,
        ReportingValue::Alert(_) => return Ok(()),
    };
    if title.trim().is_empty() {
        return Err(Error::IllegalArgument("reporting title must not be blank".to_string()));
    }
    Ok(())
}

/// Build the new value from the edited fields and the stored context
fn updated_value(current: &ReportingValue, updated: &UpdatedReportingValues) -> Result<ReportingValue> {
    let (sea_front, flag_state, dml) = match current {
        ReportingValue::InfractionSuspicion(v) => (v.sea_front.clone(), v.flag_state.clone(), v.dml.clone()),
        ReportingValue::Observation(v) => (v.sea_front.clone(), v.flag_state.clone(), v.dml.clone()),
        ReportingValue::Alert(v) => (v.sea_front().map(str::to_string), v.zone().flag_state.clone(), None),
    };

    match updated.reporting_type {
        ReportingType::InfractionSuspicion => Ok(ReportingValue::InfractionSuspicion(InfractionSuspicion {
            reporting_actor: updated.reporting_actor,
            unit: updated.unit.clone(),
            author_trigram: updated.author_trigram.clone(),
            author_contact: updated.author_contact.clone(),
            title: updated.title.clone(),
            description: updated.description.clone(),
            natinf_code: updated.natinf_code,
            sea_front,
            flag_state,
            dml,
        })),
        ReportingType::Observation => Ok(ReportingValue::Observation(Observation {
            reporting_actor: updated.reporting_actor,
            unit: updated.unit.clone(),
            author_trigram: updated.author_trigram.clone(),
            author_contact: updated.author_contact.clone(),
            title: updated.title.clone(),
            description: updated.description.clone(),
            sea_front,
            flag_state,
            dml,
        })),
        ReportingType::Alert => Err(Error::IllegalArgument(
            "a reporting cannot be turned into an ALERT".to_string(),
        )),
    }
}

fn batch_outcome(ids: &[i64], results: Vec<Result<()>>) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for (id, result) in ids.iter().zip(results) {
        match result {
            Ok(()) => outcome.succeeded.push(*id),
            Err(e) => {
                warn!(reporting_id = id, error = %e, "Batch operation failed for reporting");
                outcome.failed.push(BatchFailure {
                    id: *id,
                    error: e.to_string(),
                });
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::model::{AlertType, ZoneAlert};
    use model::ReportingActor;

    fn updated(reporting_type: ReportingType) -> UpdatedReportingValues {
        UpdatedReportingValues {
            reporting_actor: ReportingActor::Unit,
            reporting_type,
            unit: Some("OFB SD 56".to_string()),
            author_trigram: Some("LTH".to_string()),
            author_contact: None,
            title: "Suspicion de chalutage dans les 3 milles".to_string(),
            description: None,
            natinf_code: Some(7059),
        }
    }

    fn observation() -> ReportingValue {
        ReportingValue::Observation(Observation {
            reporting_actor: ReportingActor::Ops,
            unit: None,
            author_trigram: Some("ABC".to_string()),
            author_contact: None,
            title: "Observation".to_string(),
            description: None,
            sea_front: Some("NAMO".to_string()),
            flag_state: Some("FR".to_string()),
            dml: Some("DML 29".to_string()),
        })
    }

    #[test]
    fn test_update_switches_type_and_keeps_context() {
        let value = updated_value(&observation(), &updated(ReportingType::InfractionSuspicion)).unwrap();

        let ReportingValue::InfractionSuspicion(suspicion) = value else {
            panic!("expected an infraction suspicion");
        };
        assert_eq!(suspicion.natinf_code, Some(7059));
        assert_eq!(suspicion.reporting_actor, ReportingActor::Unit);
        assert_eq!(suspicion.sea_front.as_deref(), Some("NAMO"));
        assert_eq!(suspicion.flag_state.as_deref(), Some("FR"));
        assert_eq!(suspicion.dml.as_deref(), Some("DML 29"));
    }

    #[test]
    fn test_update_to_observation_drops_natinf() {
        let value = updated_value(&observation(), &updated(ReportingType::Observation)).unwrap();

        assert_eq!(value.reporting_type(), ReportingType::Observation);
        assert_eq!(value.natinf_code(), None);
    }

    #[test]
    fn test_update_to_alert_is_rejected() {
        let result = updated_value(&observation(), &updated(ReportingType::Alert));

        assert!(matches!(result, Err(Error::IllegalArgument(_))));
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let mut values = updated(ReportingType::Observation);
        values.title = "  ".to_string();
        let value = updated_value(&observation(), &values).unwrap();

        assert!(check_title(&value).is_err());
        assert!(check_title(&ReportingValue::Alert(AlertType::MissingFarAlert(ZoneAlert::default()))).is_ok());
    }

    #[test]
    fn test_batch_outcome_keeps_every_id() {
        let outcome = batch_outcome(
            &[1, 2, 3],
            vec![Ok(()), Err(Error::ReportingNotFound { id: 2 }), Ok(())],
        );

        assert_eq!(outcome.succeeded, vec![1, 3]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].id, 2);
        assert_eq!(outcome.failed[0].error, "Reporting 2 not found");
    }
}
