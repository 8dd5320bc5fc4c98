//! Use-case wiring over the SQLite store

use fmon_common::config::TomlConfig;
use fmon_core::alerts::AlertService;
use fmon_core::beacon::BeaconMalfunctionService;
use fmon_core::cache::{CachePolicy, CachedFleetSegments, CachedReferenceData, CachedVessels};
use fmon_core::db::SqliteStore;
use fmon_core::logbook::LogbookService;
use fmon_core::reporting::ReportingService;
use fmon_core::repositories::ReferenceDataRepository;
use fmon_core::risk::RiskFactorAggregator;
use fmon_core::vessel::VesselService;
use std::sync::Arc;
use tracing::debug;

pub struct Services {
    pub logbook: LogbookService,
    pub beacons: BeaconMalfunctionService,
    pub alerts: AlertService,
    pub reportings: ReportingService,
    pub vessels: VesselService,
    pub risk_factors: Arc<RiskFactorAggregator>,
}

impl Services {
    pub fn new(store: SqliteStore, config: &TomlConfig) -> Self {
        let policy = CachePolicy::from_config(&config.cache);
        debug!("Cache policy: {:?}", policy);

        let store = Arc::new(store);
        let reference_data: Arc<dyn ReferenceDataRepository> =
            Arc::new(CachedReferenceData::new(store.clone(), &policy));

        let risk_factors = Arc::new(RiskFactorAggregator::new(
            Arc::new(CachedFleetSegments::new(store.clone(), &policy)),
            store.clone(),
            store.clone(),
            &policy,
        ));

        Self {
            logbook: LogbookService::new(store.clone(), store.clone(), reference_data.clone()),
            beacons: BeaconMalfunctionService::new(store.clone()),
            alerts: AlertService::new(store.clone(), store.clone(), reference_data.clone()),
            reportings: ReportingService::new(
                store.clone(),
                store.clone(),
                reference_data,
                config.reportings.history_years,
            ),
            vessels: VesselService::new(
                Arc::new(CachedVessels::new(store.clone(), &policy)),
                store.clone(),
                store,
                risk_factors.clone(),
            ),
            risk_factors,
        }
    }
}
