//! Logbook reconciliation engine
//!
//! Turns the flat list of operations of one trip into the displayed
//! timeline. Only DAT and COR declarations are returned; RET and DEL
//! operations are consumed to derive `acknowledge` and `deleted` on the
//! declarations they reference. The result depends only on the input.

use super::model::{Acknowledge, LogbookMessage, LogbookMessageValue, LogbookOperationType, FAILOVER_SOFTWARE};
use std::collections::HashMap;

/// Reconcile the operations of a trip into an ordered timeline
pub fn reconcile(operations: Vec<LogbookMessage>) -> Vec<LogbookMessage> {
    let mut declarations = Vec::new();
    let mut deletions = Vec::new();
    let mut acknowledgments = Vec::new();

    for operation in operations {
        match operation.operation_type {
            LogbookOperationType::Dat | LogbookOperationType::Cor => declarations.push(operation),
            LogbookOperationType::Del => deletions.push(operation),
            LogbookOperationType::Ret => acknowledgments.push(operation),
        }
    }

    let mut declarations = deduplicate_retransmissions(declarations);

    flag_corrections(&mut declarations);
    flag_deletions(&mut declarations, &deletions);
    attach_acknowledgments(&mut declarations, &acknowledgments);

    for message in declarations.iter_mut() {
        if message.acknowledge.is_none() && message.transmission_format.has_implicit_acknowledgment() {
            message.acknowledge = Some(Acknowledge::implicit_success());
        }
        message.is_sent_by_failover_software = is_failover_software(message.software.as_deref());
    }

    declarations.sort_by(|a, b| a.ordering_key().cmp(&b.ordering_key()));
    declarations
}

/// Keep only the latest operation per report id
///
/// A declaration transmitted several times shares its report id; the most
/// recent copy wins. Declarations without a report id are all kept.
fn deduplicate_retransmissions(declarations: Vec<LogbookMessage>) -> Vec<LogbookMessage> {
    let mut latest_by_report: HashMap<String, LogbookMessage> = HashMap::new();
    let mut without_report_id = Vec::new();

    for message in declarations {
        let Some(report_id) = message.report_id.clone() else {
            without_report_id.push(message);
            continue;
        };
        match latest_by_report.get(&report_id) {
            Some(existing) if existing.ordering_key() >= message.ordering_key() => {}
            _ => {
                latest_by_report.insert(report_id, message);
            }
        }
    }

    without_report_id.extend(latest_by_report.into_values());
    without_report_id
}

/// For each COR/target pair, the earlier of the two is superseded
fn flag_corrections(declarations: &mut [LogbookMessage]) {
    let index_by_report: HashMap<String, usize> = declarations
        .iter()
        .enumerate()
        .filter_map(|(index, m)| m.report_id.clone().map(|r| (r, index)))
        .collect();

    let mut superseded = Vec::new();
    for (index, message) in declarations.iter().enumerate() {
        if message.operation_type != LogbookOperationType::Cor {
            continue;
        }
        let Some(target_index) = message
            .referenced_report_id
            .as_ref()
            .and_then(|r| index_by_report.get(r))
        else {
            continue;
        };
        if *target_index == index {
            continue;
        }
        let target = &declarations[*target_index];
        if target.ordering_key() <= message.ordering_key() {
            superseded.push(*target_index);
        } else {
            superseded.push(index);
        }
    }

    for index in superseded {
        declarations[index].is_corrected = true;
    }
}

fn flag_deletions(declarations: &mut [LogbookMessage], deletions: &[LogbookMessage]) {
    for deletion in deletions {
        let Some(referenced) = deletion.referenced_report_id.as_deref() else {
            continue;
        };
        for message in declarations
            .iter_mut()
            .filter(|m| m.report_id.as_deref() == Some(referenced))
        {
            message.deleted = true;
        }
    }
}

/// Attach the latest RET per referenced report id
fn attach_acknowledgments(declarations: &mut [LogbookMessage], acknowledgments: &[LogbookMessage]) {
    let mut latest: HashMap<&str, &LogbookMessage> = HashMap::new();
    for ret in acknowledgments {
        let Some(referenced) = ret.referenced_report_id.as_deref() else {
            continue;
        };
        match latest.get(referenced) {
            Some(existing) if existing.ordering_key() >= ret.ordering_key() => {}
            _ => {
                latest.insert(referenced, ret);
            }
        }
    }

    for message in declarations.iter_mut() {
        let Some(ret) = message.report_id.as_deref().and_then(|r| latest.get(r)) else {
            continue;
        };
        let acknowledge = match &ret.message {
            Some(LogbookMessageValue::Ret(body)) => {
                Acknowledge::from_return(body.return_status.clone(), body.rejection_cause.clone())
            }
            _ => Acknowledge::from_return(None, None),
        };
        message.acknowledge = Some(acknowledge);
    }
}

/// Case-insensitive match on the declared software name
pub fn is_failover_software(software: Option<&str>) -> bool {
    software
        .map(|s| s.to_lowercase().contains(&FAILOVER_SOFTWARE.to_lowercase()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logbook::model::{AcknowledgmentBody, LogbookTransmissionFormat};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 5, 1, 8, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn declaration(
        operation_number: &str,
        operation_type: LogbookOperationType,
        report_id: &str,
        minutes: i64,
    ) -> LogbookMessage {
        let mut message =
            LogbookMessage::new(operation_number, operation_type, t(minutes), LogbookTransmissionFormat::Ers);
        message.report_id = Some(report_id.to_string());
        message.message_type = Some("FAR".to_string());
        message
    }

    fn referencing(
        operation_number: &str,
        operation_type: LogbookOperationType,
        referenced: &str,
        minutes: i64,
    ) -> LogbookMessage {
        let mut message =
            LogbookMessage::new(operation_number, operation_type, t(minutes), LogbookTransmissionFormat::Ers);
        message.referenced_report_id = Some(referenced.to_string());
        message
    }

    fn ret(operation_number: &str, referenced: &str, status: &str, cause: Option<&str>, minutes: i64) -> LogbookMessage {
        let mut message = referencing(operation_number, LogbookOperationType::Ret, referenced, minutes);
        message.message = Some(LogbookMessageValue::Ret(AcknowledgmentBody {
            return_status: Some(status.to_string()),
            rejection_cause: cause.map(str::to_string),
        }));
        message
    }

    #[test]
    fn test_only_declarations_are_returned() {
        let result = reconcile(vec![
            declaration("OP1", LogbookOperationType::Dat, "R1", 0),
            ret("OP2", "R1", "000", None, 1),
            referencing("OP3", LogbookOperationType::Del, "R1", 2),
        ]);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].operation_number, "OP1");
    }

    #[test]
    fn test_correction_flags_earlier_message() {
        let mut cor = declaration("OP2", LogbookOperationType::Cor, "R2", 10);
        cor.referenced_report_id = Some("R1".to_string());

        let result = reconcile(vec![cor, declaration("OP1", LogbookOperationType::Dat, "R1", 0)]);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].operation_type, LogbookOperationType::Dat);
        assert!(result[0].is_corrected);
        assert_eq!(result[1].operation_type, LogbookOperationType::Cor);
        assert!(!result[1].is_corrected);
    }

    #[test]
    fn test_correction_chain_flags_every_superseded_message() {
        let mut cor1 = declaration("OP2", LogbookOperationType::Cor, "R2", 10);
        cor1.referenced_report_id = Some("R1".to_string());
        let mut cor2 = declaration("OP3", LogbookOperationType::Cor, "R3", 20);
        cor2.referenced_report_id = Some("R2".to_string());

        let result = reconcile(vec![declaration("OP1", LogbookOperationType::Dat, "R1", 0), cor1, cor2]);

        let flags: Vec<bool> = result.iter().map(|m| m.is_corrected).collect();
        assert_eq!(flags, vec![true, true, false]);
    }

    #[test]
    fn test_deleted_message_stays_visible() {
        let result = reconcile(vec![
            declaration("OP1", LogbookOperationType::Dat, "R1", 0),
            declaration("OP2", LogbookOperationType::Dat, "R2", 5),
            referencing("OP3", LogbookOperationType::Del, "R1", 10),
        ]);

        assert_eq!(result.len(), 2);
        assert!(result[0].deleted);
        assert!(!result[1].deleted);
    }

    #[test]
    fn test_rejected_acknowledgment_copies_cause() {
        let result = reconcile(vec![
            declaration("OP1", LogbookOperationType::Dat, "R1", 0),
            ret("OP2", "R1", "002", Some("Oops"), 1),
        ]);

        let acknowledge = result[0].acknowledge.as_ref().unwrap();
        assert!(!acknowledge.is_success);
        assert_eq!(acknowledge.return_status.as_deref(), Some("002"));
        assert_eq!(acknowledge.rejection_cause.as_deref(), Some("Oops"));
    }

    #[test]
    fn test_latest_acknowledgment_wins() {
        let result = reconcile(vec![
            declaration("OP1", LogbookOperationType::Dat, "R1", 0),
            ret("OP2", "R1", "002", Some("Oops"), 1),
            ret("OP3", "R1", "000", None, 2),
        ]);

        let acknowledge = result[0].acknowledge.as_ref().unwrap();
        assert!(acknowledge.is_success);
        assert_eq!(acknowledge.rejection_cause, None);
    }

    #[test]
    fn test_flux_without_ret_is_implicitly_acknowledged() {
        let mut flux = declaration("OP1", LogbookOperationType::Dat, "R1", 0);
        flux.transmission_format = LogbookTransmissionFormat::Flux;
        let mut visio = declaration("OP2", LogbookOperationType::Dat, "R2", 1);
        visio.transmission_format = LogbookTransmissionFormat::Visiocapture;
        let ers = declaration("OP3", LogbookOperationType::Dat, "R3", 2);

        let result = reconcile(vec![flux, visio, ers]);

        assert_eq!(result[0].acknowledge, Some(Acknowledge::implicit_success()));
        assert_eq!(result[1].acknowledge, Some(Acknowledge::implicit_success()));
        assert_eq!(result[2].acknowledge, None);
    }

    #[test]
    fn test_retransmission_keeps_latest_copy() {
        let mut first = declaration("OP1", LogbookOperationType::Dat, "R1", 0);
        first.analyzed_by_rules = vec!["first".to_string()];
        let mut second = declaration("OP2", LogbookOperationType::Dat, "R1", 3);
        second.analyzed_by_rules = vec!["second".to_string()];

        let result = reconcile(vec![second, first]);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].operation_number, "OP2");
    }

    #[test]
    fn test_ties_broken_by_operation_number() {
        let result = reconcile(vec![
            declaration("OP9", LogbookOperationType::Dat, "R9", 0),
            declaration("OP1", LogbookOperationType::Dat, "R1", 0),
        ]);

        assert_eq!(result[0].operation_number, "OP1");
        assert_eq!(result[1].operation_number, "OP9");
    }

    #[test]
    fn test_failover_software_flag() {
        let mut failover = declaration("OP1", LogbookOperationType::Dat, "R1", 0);
        failover.software = Some("JP/05883989/VISIOCaptures V1.4.7 E-SACAPT".to_string());
        let mut regular = declaration("OP2", LogbookOperationType::Dat, "R2", 1);
        regular.software = Some("TurboCatch (3.7-1)".to_string());

        let result = reconcile(vec![failover, regular]);

        assert!(result[0].is_sent_by_failover_software);
        assert!(!result[1].is_sent_by_failover_software);
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        let build = || {
            let mut cor = declaration("OP2", LogbookOperationType::Cor, "R2", 10);
            cor.referenced_report_id = Some("R1".to_string());
            vec![
                ret("OP4", "R2", "000", None, 12),
                cor,
                declaration("OP1", LogbookOperationType::Dat, "R1", 0),
                declaration("OP3", LogbookOperationType::Dat, "R3", 10),
            ]
        };

        let first = reconcile(build());
        let mut reversed = build();
        reversed.reverse();
        let second = reconcile(reversed);

        assert_eq!(first, second);
    }
}
