//! Logbook timeline reads and voyage navigation

pub mod enrichment;
pub mod model;
pub mod reconcile;

use crate::repositories::{LogbookRawMessageRepository, LogbookReportRepository, ReferenceDataRepository};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use model::{LogbookMessage, LogbookOperationType, Voyage, VoyageDatesAndTripNumber, VoyageRequest};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct LogbookService {
    reports: Arc<dyn LogbookReportRepository>,
    raw_messages: Arc<dyn LogbookRawMessageRepository>,
    reference_data: Arc<dyn ReferenceDataRepository>,
}

impl LogbookService {
    pub fn new(
        reports: Arc<dyn LogbookReportRepository>,
        raw_messages: Arc<dyn LogbookRawMessageRepository>,
        reference_data: Arc<dyn ReferenceDataRepository>,
    ) -> Self {
        Self {
            reports,
            raw_messages,
            reference_data,
        }
    }

    /// Reconciled and enriched timeline of a trip
    ///
    /// Without a trip number, the last trip started before `to` is used;
    /// no such trip is an error, not an empty timeline.
    pub async fn get_logbook_messages(
        &self,
        cfr: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        trip_number: Option<&str>,
    ) -> Result<Vec<LogbookMessage>> {
        let trip_number = match trip_number {
            Some(trip_number) => trip_number.to_string(),
            None => self.last_trip_before(cfr, to).await?.trip_number,
        };

        let operations = self
            .reports
            .find_all_messages_by_trip_number_between_dates(cfr, from, to, &trip_number)
            .await?;
        debug!(cfr, trip_number = %trip_number, operations = operations.len(), "Reconciling logbook operations");

        let mut messages = reconcile::reconcile(operations);
        enrichment::enrich_messages(self.reference_data.as_ref(), &mut messages).await;
        self.attach_raw_messages(&mut messages).await;

        Ok(messages)
    }

    /// A trip with navigation hints, relative to `trip_number` for
    /// PREVIOUS and NEXT
    pub async fn get_vessel_voyage(
        &self,
        cfr: &str,
        request: VoyageRequest,
        trip_number: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Voyage> {
        let trip = match (request, trip_number) {
            (VoyageRequest::Last, _) => self.last_trip_before(cfr, now).await?,
            (VoyageRequest::Previous, Some(trip_number)) => self
                .reports
                .find_trip_before(cfr, trip_number)
                .await?
                .ok_or_else(|| no_trip(cfr))?,
            (VoyageRequest::Next, Some(trip_number)) => self
                .reports
                .find_trip_after(cfr, trip_number)
                .await?
                .ok_or_else(|| no_trip(cfr))?,
            (_, None) => {
                return Err(Error::IllegalArgument(
                    "a trip number is required to navigate to the previous or next voyage".to_string(),
                ))
            }
        };

        let (previous, next) = tokio::join!(
            self.reports.find_trip_before(cfr, &trip.trip_number),
            self.reports.find_trip_after(cfr, &trip.trip_number),
        );

        let logbook_messages = self
            .get_logbook_messages(cfr, trip.start_date, trip.end_date, Some(&trip.trip_number))
            .await?;

        Ok(Voyage {
            is_last_voyage: next?.is_none(),
            is_first_voyage: previous?.is_none(),
            start_date: trip.start_date,
            end_date: trip.end_date,
            trip_number: trip.trip_number,
            logbook_messages,
        })
    }

    /// Store an already parsed operation
    ///
    /// COR, DEL and RET operations must reference an earlier operation of
    /// the same trip.
    pub async fn save_logbook_message(&self, message: &LogbookMessage) -> Result<()> {
        if message.operation_type != LogbookOperationType::Dat || message.referenced_report_id.is_some() {
            let referenced_report_id = message.referenced_report_id.as_deref().ok_or_else(|| {
                Error::IllegalArgument(format!(
                    "{} operation {} does not reference a report",
                    message.operation_type, message.operation_number
                ))
            })?;
            let referenced = self.reports.find_by_report_id(referenced_report_id).await?;
            check_referenced_operation(message, referenced.as_ref())?;
        }

        self.reports.save(message).await?;
        info!(
            operation_number = %message.operation_number,
            operation_type = %message.operation_type,
            "Saved logbook operation"
        );
        Ok(())
    }

    async fn last_trip_before(&self, cfr: &str, before: DateTime<Utc>) -> Result<VoyageDatesAndTripNumber> {
        self.reports
            .find_last_trip_before(cfr, before)
            .await?
            .ok_or_else(|| no_trip(cfr))
    }

    async fn attach_raw_messages(&self, messages: &mut [LogbookMessage]) {
        let raw_messages = join_all(
            messages
                .iter()
                .map(|m| self.raw_messages.find_raw_message(&m.operation_number)),
        )
        .await;

        for (message, raw) in messages.iter_mut().zip(raw_messages) {
            message.raw_message = raw.unwrap_or_else(|e| {
                warn!(operation_number = %message.operation_number, error = %e, "Could not fetch raw message");
                None
            });
        }
    }
}

fn no_trip(cfr: &str) -> Error {
    Error::NoLogbookFishingTripFound { cfr: cfr.to_string() }
}

/// A referenced operation must exist, precede the referencing one and belong
/// to the same trip when both carry a trip number
fn check_referenced_operation(message: &LogbookMessage, referenced: Option<&LogbookMessage>) -> Result<()> {
    let referenced_report_id = message.referenced_report_id.as_deref().unwrap_or_default();
    let Some(referenced) = referenced else {
        return Err(Error::IllegalArgument(format!(
            "operation {} references unknown report {}",
            message.operation_number, referenced_report_id
        )));
    };

    if referenced.operation_date_time >= message.operation_date_time {
        return Err(Error::IllegalArgument(format!(
            "operation {} must be later than the report {} it references",
            message.operation_number, referenced_report_id
        )));
    }

    if let (Some(trip), Some(referenced_trip)) = (&message.trip_number, &referenced.trip_number) {
        if trip != referenced_trip {
            return Err(Error::IllegalArgument(format!(
                "operation {} of trip {} references report {} of trip {}",
                message.operation_number, trip, referenced_report_id, referenced_trip
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use model::LogbookTransmissionFormat;

    fn operation(
        operation_number: &str,
        operation_type: LogbookOperationType,
        trip_number: Option<&str>,
        hour: u32,
    ) -> LogbookMessage {
        let mut message = LogbookMessage::new(
            operation_number,
            operation_type,
            Utc.with_ymd_and_hms(2021, 5, 1, hour, 0, 0).unwrap(),
            LogbookTransmissionFormat::Ers,
        );
        message.trip_number = trip_number.map(str::to_string);
        message
    }

    fn referencing(operation_type: LogbookOperationType, trip_number: Option<&str>, hour: u32) -> LogbookMessage {
        let mut message = operation("OP2", operation_type, trip_number, hour);
        message.referenced_report_id = Some("R1".to_string());
        message
    }

    #[test]
    fn test_reference_to_earlier_operation_is_accepted() {
        let original = operation("OP1", LogbookOperationType::Dat, Some("TRIP1"), 8);

        check_referenced_operation(&referencing(LogbookOperationType::Cor, Some("TRIP1"), 9), Some(&original)).unwrap();
        check_referenced_operation(&referencing(LogbookOperationType::Ret, None, 9), Some(&original)).unwrap();
    }

    #[test]
    fn test_unknown_reference_is_rejected() {
        let result = check_referenced_operation(&referencing(LogbookOperationType::Del, None, 9), None);
        assert!(matches!(result, Err(Error::IllegalArgument(_))));
    }

    #[test]
    fn test_reference_to_later_operation_is_rejected() {
        let original = operation("OP1", LogbookOperationType::Dat, Some("TRIP1"), 10);

        let result =
            check_referenced_operation(&referencing(LogbookOperationType::Cor, Some("TRIP1"), 9), Some(&original));
        assert!(matches!(result, Err(Error::IllegalArgument(_))));
    }

    #[test]
    fn test_reference_across_trips_is_rejected() {
        let original = operation("OP1", LogbookOperationType::Dat, Some("TRIP1"), 8);

        let result =
            check_referenced_operation(&referencing(LogbookOperationType::Cor, Some("TRIP2"), 9), Some(&original));
        assert!(matches!(result, Err(Error::IllegalArgument(_))));
    }
}
