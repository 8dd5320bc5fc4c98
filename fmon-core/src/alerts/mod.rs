//! Pending alert lifecycle: validation, silencing and detection ingestion

pub mod model;
pub mod silence;

use crate::reporting::model::Reporting;
use crate::repositories::{PendingAlertRepository, ReferenceDataRepository, SilencedAlertRepository};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use model::{OperationalAlert, PendingAlert, SilencedAlert};
use silence::SilenceAlertPeriod;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct AlertService {
    pending_alerts: Arc<dyn PendingAlertRepository>,
    silenced_alerts: Arc<dyn SilencedAlertRepository>,
    reference_data: Arc<dyn ReferenceDataRepository>,
}

impl AlertService {
    pub fn new(
        pending_alerts: Arc<dyn PendingAlertRepository>,
        silenced_alerts: Arc<dyn SilencedAlertRepository>,
        reference_data: Arc<dyn ReferenceDataRepository>,
    ) -> Self {
        Self {
            pending_alerts,
            silenced_alerts,
            reference_data,
        }
    }

    /// Pending alerts with the infraction each one stands for
    pub async fn get_operational_alerts(&self) -> Result<Vec<OperationalAlert>> {
        let alerts = self.pending_alerts.find_all().await?;

        let infractions = join_all(alerts.iter().map(|alert| async move {
            let natinf_code = alert.value.natinf_code()?;
            match self.reference_data.find_infraction(natinf_code).await {
                Ok(infraction) => infraction,
                Err(e) => {
                    warn!(natinf_code, error = %e, "Could not fetch infraction of alert");
                    None
                }
            }
        }))
        .await;

        Ok(alerts
            .into_iter()
            .zip(infractions)
            .map(|(alert, infraction)| OperationalAlert { alert, infraction })
            .collect())
    }

    /// Promote a pending alert into an ALERT reporting. Of two concurrent
    /// validations only one succeeds, the other sees the alert gone.
    pub async fn validate_alert(&self, id: i64, now: DateTime<Utc>) -> Result<Reporting> {
        let reporting = self
            .pending_alerts
            .validate(id, now)
            .await?
            .ok_or(Error::PendingAlertNotFound { id })?;

        info!(pending_alert_id = id, reporting_id = reporting.id, "Alert validated");
        Ok(reporting)
    }

    /// Suppress a pending alert for a period or between explicit dates
    pub async fn silence_alert(
        &self,
        id: i64,
        period: Option<SilenceAlertPeriod>,
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<SilencedAlert> {
        let window = silence::resolve_silence_window(period, after, before, now)?;

        let silenced = self
            .pending_alerts
            .silence(id, &window)
            .await?
            .ok_or(Error::PendingAlertNotFound { id })?;

        info!(
            pending_alert_id = id,
            silenced_alert_id = ?silenced.id,
            silenced_before_date = %silenced.silenced_before_date,
            "Alert silenced"
        );
        Ok(silenced)
    }

    /// Silenced alerts in force at `now`
    pub async fn get_silenced_alerts(&self, now: DateTime<Utc>) -> Result<Vec<SilencedAlert>> {
        self.silenced_alerts.find_all_active(now).await
    }

    pub async fn delete_silenced_alert(&self, id: i64) -> Result<()> {
        if !self.silenced_alerts.delete(id).await? {
            return Err(Error::SilencedAlertNotFound { id });
        }
        info!(silenced_alert_id = id, "Silenced alert deleted");
        Ok(())
    }

    pub async fn reactivate_silenced_alert(&self, id: i64) -> Result<()> {
        if !self.silenced_alerts.reactivate(id).await? {
            return Err(Error::SilencedAlertNotFound { id });
        }
        info!(silenced_alert_id = id, "Silenced alert reactivated");
        Ok(())
    }

    /// Replace the pending alerts of a rule configuration with its latest
    /// detections, minus the silenced ones. Returns the number stored.
    pub async fn ingest_detections(
        &self,
        alert_config_name: &str,
        detections: Vec<PendingAlert>,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let silenced = self.silenced_alerts.find_all_active(now).await?;
        let detected = detections.len();

        let alerts: Vec<PendingAlert> = detections
            .into_iter()
            .filter(|alert| !silenced.iter().any(|s| s.matches(alert)))
            .map(|alert| PendingAlert {
                id: None,
                alert_config_name: Some(alert_config_name.to_string()),
                ..alert
            })
            .collect();

        if alerts.len() < detected {
            debug!(
                alert_config_name,
                silenced = detected - alerts.len(),
                "Dropped silenced detections"
            );
        }

        self.pending_alerts.replace_for_config(alert_config_name, &alerts).await?;
        info!(alert_config_name, stored = alerts.len(), "Pending alerts replaced");
        Ok(alerts.len())
    }
}
