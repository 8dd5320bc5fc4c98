//! Logbook timeline reads against the SQLite store

mod helpers;

use fmon_core::cache::{CachePolicy, CachedReferenceData};
use fmon_core::db::SqliteStore;
use fmon_core::logbook::model::{
    AcknowledgmentBody, Catch, Departure, EffortZoneEntry, FishingActivityReport, Gear, Haul, LogbookMessageValue,
    LogbookOperationType, LogbookTransmissionFormat, PriorNotification, VoyageRequest,
};
use fmon_core::logbook::LogbookService;
use fmon_core::repositories::LogbookReportRepository;
use fmon_core::Error;
use helpers::*;
use std::sync::Arc;

const TRIP: &str = "9463714";

fn service(store: &SqliteStore) -> LogbookService {
    LogbookService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(CachedReferenceData::new(Arc::new(store.clone()), &CachePolicy::default())),
    )
}

fn catch(species: &str, weight: f64) -> Catch {
    Catch {
        species: Some(species.to_string()),
        weight: Some(weight),
        fao_zone: Some("27.8.a".to_string()),
        ..Default::default()
    }
}

async fn seed_reference_data(store: &SqliteStore) {
    seed_species(store, "TTV", "TORPILLE OCELLÉE").await;
    seed_species(store, "SMV", "STOMIAS BREVIBARBATUS").await;
    seed_species(store, "PNB", "CREVETTE ROYALE ROSE").await;
    seed_gear(store, "OTB", "Chaluts de fond à panneaux").await;
    seed_port(store, "AEJAZ", "Arzanah Island").await;
}

/// DEP, FAR, COE and PNO of one trip, saved out of order
async fn seed_trip(store: &SqliteStore) {
    let pno = declaration(
        "OOF20191014",
        TRIP,
        "R4",
        at(2019, 10, 14, 9, 0),
        "PNO",
        LogbookMessageValue::Pno(PriorNotification {
            port: Some("AEJAZ".to_string()),
            catch_onboard: vec![catch("PNB", 32.0)],
            ..Default::default()
        }),
    );
    let coe = declaration(
        "OOF20191013",
        TRIP,
        "R3",
        at(2019, 10, 13, 12, 0),
        "COE",
        LogbookMessageValue::Coe(EffortZoneEntry {
            target_species_on_entry: Some("DEM".to_string()),
            ..Default::default()
        }),
    );
    let far = declaration(
        "OOF20191012",
        TRIP,
        "R2",
        at(2019, 10, 12, 11, 0),
        "FAR",
        LogbookMessageValue::Far(FishingActivityReport {
            hauls: vec![Haul {
                gear: Some("OTB".to_string()),
                mesh: Some(80.0),
                catches: vec![catch("TTV", 123.0), catch("SMV", 52.0)],
                ..Default::default()
            }],
        }),
    );
    let dep = declaration(
        "OOF20191011",
        TRIP,
        "R1",
        at(2019, 10, 11, 2, 6),
        "DEP",
        LogbookMessageValue::Dep(Departure {
            departure_port: Some("AEJAZ".to_string()),
            anticipated_activity: Some("FSH".to_string()),
            gear_onboard: vec![Gear {
                gear: Some("OTB".to_string()),
                mesh: Some(80.0),
                ..Default::default()
            }],
            ..Default::default()
        }),
    );

    for message in [pno, coe, far, dep] {
        store.save(&message).await.unwrap();
    }
}

#[tokio::test]
async fn test_trip_timeline_is_ordered_and_enriched() {
    let store = memory_store().await;
    seed_reference_data(&store).await;
    seed_trip(&store).await;

    let messages = service(&store)
        .get_logbook_messages(CFR, at(2019, 10, 10, 0, 0), at(2019, 10, 15, 0, 0), Some(TRIP))
        .await
        .unwrap();

    let types: Vec<_> = messages.iter().map(|m| m.message_type.as_deref().unwrap()).collect();
    assert_eq!(types, vec!["DEP", "FAR", "COE", "PNO"]);

    let Some(LogbookMessageValue::Dep(dep)) = &messages[0].message else {
        panic!("expected DEP");
    };
    assert_eq!(dep.departure_port_name.as_deref(), Some("Arzanah Island"));
    assert_eq!(dep.gear_onboard[0].gear_name.as_deref(), Some("Chaluts de fond à panneaux"));

    let Some(LogbookMessageValue::Far(far)) = &messages[1].message else {
        panic!("expected FAR");
    };
    let species_names: Vec<_> = far.hauls[0]
        .catches
        .iter()
        .map(|c| c.species_name.as_deref().unwrap())
        .collect();
    assert_eq!(species_names, vec!["TORPILLE OCELLÉE", "STOMIAS BREVIBARBATUS"]);

    let Some(LogbookMessageValue::Coe(coe)) = &messages[2].message else {
        panic!("expected COE");
    };
    assert_eq!(coe.target_species_name_on_entry.as_deref(), Some("Démersal"));

    let Some(LogbookMessageValue::Pno(pno)) = &messages[3].message else {
        panic!("expected PNO");
    };
    assert_eq!(pno.port_name.as_deref(), Some("Arzanah Island"));
    assert_eq!(pno.catch_onboard[0].species_name.as_deref(), Some("CREVETTE ROYALE ROSE"));

    for message in &messages {
        assert!(!message.is_corrected);
        assert!(!message.deleted);
        assert!(message.acknowledge.is_none(), "ERS without RET has no acknowledgment");
    }
}

#[tokio::test]
async fn test_corrections_deletions_and_acknowledgments() {
    let store = memory_store().await;

    let original = declaration(
        "OP1",
        TRIP,
        "R1",
        at(2021, 5, 1, 8, 0),
        "FAR",
        LogbookMessageValue::Far(FishingActivityReport::default()),
    );

    let mut correction = declaration(
        "OP2",
        TRIP,
        "R2",
        at(2021, 5, 1, 9, 0),
        "FAR",
        LogbookMessageValue::Far(FishingActivityReport::default()),
    );
    correction.operation_type = LogbookOperationType::Cor;
    correction.referenced_report_id = Some("R1".to_string());

    let mut rejection = operation("OP3", LogbookOperationType::Ret, at(2021, 5, 1, 9, 5), LogbookTransmissionFormat::Ers);
    rejection.referenced_report_id = Some("R2".to_string());
    rejection.message_type = Some("RET".to_string());
    rejection.message = Some(LogbookMessageValue::Ret(AcknowledgmentBody {
        return_status: Some("002".to_string()),
        rejection_cause: Some("002 MGEN02 Message incorrect".to_string()),
    }));

    let mut flux_pno = declaration(
        "OP4",
        TRIP,
        "R3",
        at(2021, 5, 2, 6, 0),
        "PNO",
        LogbookMessageValue::Pno(PriorNotification::default()),
    );
    flux_pno.transmission_format = LogbookTransmissionFormat::Flux;
    flux_pno.software = Some("e-Sacapt Secours_ERSV3_2.3".to_string());

    let mut deletion = operation("OP5", LogbookOperationType::Del, at(2021, 5, 2, 7, 0), LogbookTransmissionFormat::Ers);
    deletion.referenced_report_id = Some("R3".to_string());

    for message in [original, correction, rejection, flux_pno, deletion] {
        store.save(&message).await.unwrap();
    }

    let messages = service(&store)
        .get_logbook_messages(CFR, at(2021, 5, 1, 0, 0), at(2021, 5, 3, 0, 0), Some(TRIP))
        .await
        .unwrap();

    let operation_numbers: Vec<_> = messages.iter().map(|m| m.operation_number.as_str()).collect();
    assert_eq!(operation_numbers, vec!["OP1", "OP2", "OP4"]);

    assert!(messages[0].is_corrected);
    assert!(!messages[1].is_corrected);

    let acknowledge = messages[1].acknowledge.as_ref().unwrap();
    assert!(!acknowledge.is_success);
    assert_eq!(acknowledge.return_status.as_deref(), Some("002"));
    assert_eq!(acknowledge.rejection_cause.as_deref(), Some("002 MGEN02 Message incorrect"));

    assert!(messages[2].deleted);
    assert!(messages[2].acknowledge.as_ref().unwrap().is_success);
    assert!(messages[2].is_sent_by_failover_software);
    assert!(!messages[0].is_sent_by_failover_software);
}

#[tokio::test]
async fn test_missing_trip_is_not_found() {
    let store = memory_store().await;

    let result = service(&store)
        .get_logbook_messages(CFR, at(2019, 10, 10, 0, 0), at(2019, 10, 15, 0, 0), None)
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, Error::NoLogbookFishingTripFound { ref cfr } if cfr == CFR));
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_trip_number_defaults_to_last_trip() {
    let store = memory_store().await;
    seed_trip(&store).await;

    let messages = service(&store)
        .get_logbook_messages(CFR, at(2019, 10, 10, 0, 0), at(2019, 10, 15, 0, 0), None)
        .await
        .unwrap();

    assert_eq!(messages.len(), 4);
    assert!(messages.iter().all(|m| m.trip_number.as_deref() == Some(TRIP)));
}

#[tokio::test]
async fn test_raw_message_is_attached() {
    let store = memory_store().await;
    seed_trip(&store).await;
    sqlx::query("INSERT INTO logbook_raw_messages (operation_number, xml_message) VALUES (?, ?)")
        .bind("OOF20191011")
        .bind("<ers:OPS AD=\"FRA\" FR=\"OOF\" ON=\"OOF20191011\"/>")
        .execute(store.pool())
        .await
        .unwrap();

    let messages = service(&store)
        .get_logbook_messages(CFR, at(2019, 10, 10, 0, 0), at(2019, 10, 15, 0, 0), Some(TRIP))
        .await
        .unwrap();

    assert!(messages[0].raw_message.as_deref().unwrap().contains("OOF20191011"));
    assert!(messages[1].raw_message.is_none());
}

#[tokio::test]
async fn test_voyage_navigation() {
    let store = memory_store().await;
    let first = declaration(
        "OP1",
        "TRIP1",
        "R1",
        at(2021, 1, 1, 8, 0),
        "DEP",
        LogbookMessageValue::Dep(Departure::default()),
    );
    let second = declaration(
        "OP2",
        "TRIP2",
        "R2",
        at(2021, 2, 1, 8, 0),
        "DEP",
        LogbookMessageValue::Dep(Departure::default()),
    );
    store.save(&first).await.unwrap();
    store.save(&second).await.unwrap();
    let service = service(&store);
    let now = at(2021, 3, 1, 0, 0);

    let last = service
        .get_vessel_voyage(CFR, VoyageRequest::Last, None, now)
        .await
        .unwrap();
    assert_eq!(last.trip_number, "TRIP2");
    assert!(last.is_last_voyage);
    assert!(!last.is_first_voyage);
    assert_eq!(last.logbook_messages.len(), 1);

    let previous = service
        .get_vessel_voyage(CFR, VoyageRequest::Previous, Some("TRIP2"), now)
        .await
        .unwrap();
    assert_eq!(previous.trip_number, "TRIP1");
    assert!(previous.is_first_voyage);
    assert!(!previous.is_last_voyage);

    let next = service
        .get_vessel_voyage(CFR, VoyageRequest::Next, Some("TRIP2"), now)
        .await;
    assert!(matches!(next, Err(Error::NoLogbookFishingTripFound { .. })));

    let without_trip = service
        .get_vessel_voyage(CFR, VoyageRequest::Previous, None, now)
        .await;
    assert!(matches!(without_trip, Err(Error::IllegalArgument(_))));
}

#[tokio::test]
async fn test_stored_operation_is_immutable() {
    let store = memory_store().await;
    let message = declaration(
        "OP1",
        TRIP,
        "R1",
        at(2021, 1, 1, 8, 0),
        "DEP",
        LogbookMessageValue::Dep(Departure::default()),
    );

    service(&store).save_logbook_message(&message).await.unwrap();
    let duplicate = service(&store).save_logbook_message(&message).await;

    assert!(matches!(duplicate, Err(Error::Database(_))));
}

#[tokio::test]
async fn test_ingestion_checks_referenced_report() {
    let store = memory_store().await;
    let service = service(&store);
    let original = declaration(
        "OP1",
        TRIP,
        "R1",
        at(2021, 5, 1, 8, 0),
        "FAR",
        LogbookMessageValue::Far(FishingActivityReport::default()),
    );
    service.save_logbook_message(&original).await.unwrap();

    let mut early_correction = declaration(
        "OP2",
        TRIP,
        "R2",
        at(2021, 5, 1, 7, 0),
        "FAR",
        LogbookMessageValue::Far(FishingActivityReport::default()),
    );
    early_correction.operation_type = LogbookOperationType::Cor;
    early_correction.referenced_report_id = Some("R1".to_string());
    let result = service.save_logbook_message(&early_correction).await;
    assert!(matches!(result, Err(Error::IllegalArgument(_))));

    let mut dangling_deletion =
        operation("OP3", LogbookOperationType::Del, at(2021, 5, 1, 9, 0), LogbookTransmissionFormat::Ers);
    dangling_deletion.referenced_report_id = Some("UNKNOWN".to_string());
    let result = service.save_logbook_message(&dangling_deletion).await;
    assert!(matches!(result, Err(Error::IllegalArgument(_))));

    let unreferenced_ret = operation("OP4", LogbookOperationType::Ret, at(2021, 5, 1, 9, 0), LogbookTransmissionFormat::Ers);
    let result = service.save_logbook_message(&unreferenced_ret).await;
    assert!(matches!(result, Err(Error::IllegalArgument(_))));

    let mut deletion = operation("OP5", LogbookOperationType::Del, at(2021, 5, 1, 9, 0), LogbookTransmissionFormat::Ers);
    deletion.referenced_report_id = Some("R1".to_string());
    service.save_logbook_message(&deletion).await.unwrap();

    let messages = service
        .get_logbook_messages(CFR, at(2021, 5, 1, 0, 0), at(2021, 5, 2, 0, 0), Some(TRIP))
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert!(!messages[0].is_corrected);
    assert!(messages[0].deleted);
}

#[tokio::test]
async fn test_acknowledgment_of_untagged_correction() {
    let store = memory_store().await;

    let original = declaration(
        "OP1",
        TRIP,
        "R1",
        at(2021, 5, 1, 8, 0),
        "FAR",
        LogbookMessageValue::Far(FishingActivityReport::default()),
    );

    let mut correction = declaration(
        "OP2",
        TRIP,
        "R2",
        at(2021, 5, 1, 9, 0),
        "FAR",
        LogbookMessageValue::Far(FishingActivityReport::default()),
    );
    correction.operation_type = LogbookOperationType::Cor;
    correction.trip_number = None;
    correction.referenced_report_id = Some("R1".to_string());

    let mut acknowledgment = operation("OP3", LogbookOperationType::Ret, at(2021, 5, 1, 9, 5), LogbookTransmissionFormat::Ers);
    acknowledgment.referenced_report_id = Some("R2".to_string());
    acknowledgment.message_type = Some("RET".to_string());
    acknowledgment.message = Some(LogbookMessageValue::Ret(AcknowledgmentBody {
        return_status: Some("000".to_string()),
        rejection_cause: None,
    }));

    let service = service(&store);
    for message in [original, correction, acknowledgment] {
        service.save_logbook_message(&message).await.unwrap();
    }

    let messages = service
        .get_logbook_messages(CFR, at(2021, 5, 1, 0, 0), at(2021, 5, 2, 0, 0), Some(TRIP))
        .await
        .unwrap();

    let operation_numbers: Vec<_> = messages.iter().map(|m| m.operation_number.as_str()).collect();
    assert_eq!(operation_numbers, vec!["OP1", "OP2"]);
    assert!(messages[0].is_corrected);
    let acknowledge = messages[1].acknowledge.as_ref().unwrap();
    assert!(acknowledge.is_success);
    assert_eq!(acknowledge.return_status.as_deref(), Some("000"));
}
