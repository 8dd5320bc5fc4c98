//! Per-entity cache policy and caching repository decorators
//!
//! Each entity kind declares its own staleness budget. A kind without a TTL
//! is not cached at all. Decorators implement the same repository traits as
//! the stores they wrap, so use-cases behave identically with caching on or
//! off. Errors are never cached; missing entries are.

use crate::logbook::model::{GearCode, Port, Species};
use crate::reporting::model::Infraction;
use crate::repositories::{FleetSegmentRepository, ReferenceDataRepository, VesselRepository};
use crate::risk::FleetSegment;
use crate::vessel::model::Vessel;
use crate::Result;
use async_trait::async_trait;
use fmon_common::config::CacheConfig;
use fmon_common::{VesselIdentifier, VesselIdentity};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const ONE_WEEK: Duration = Duration::from_secs(7 * 24 * 3600);
const ONE_MINUTE: Duration = Duration::from_secs(60);
const THREE_HOURS: Duration = Duration::from_secs(3 * 3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Species,
    Gears,
    Ports,
    Infractions,
    Vessels,
    RiskFactors,
    FleetSegments,
}

impl CacheKind {
    pub const ALL: [CacheKind; 7] = [
        CacheKind::Species,
        CacheKind::Gears,
        CacheKind::Ports,
        CacheKind::Infractions,
        CacheKind::Vessels,
        CacheKind::RiskFactors,
        CacheKind::FleetSegments,
    ];

    /// Key used in the `[cache.ttl_seconds]` config table
    pub fn config_key(&self) -> &'static str {
        match self {
            CacheKind::Species => "species",
            CacheKind::Gears => "gears",
            CacheKind::Ports => "ports",
            CacheKind::Infractions => "infractions",
            CacheKind::Vessels => "vessels",
            CacheKind::RiskFactors => "risk_factors",
            CacheKind::FleetSegments => "fleet_segments",
        }
    }

    fn default_ttl(&self) -> Duration {
        match self {
            CacheKind::Species | CacheKind::Gears | CacheKind::Ports | CacheKind::Infractions => ONE_WEEK,
            CacheKind::Vessels => THREE_HOURS,
            CacheKind::RiskFactors | CacheKind::FleetSegments => ONE_MINUTE,
        }
    }
}

/// Staleness budget per entity kind
#[derive(Debug, Clone)]
pub struct CachePolicy {
    ttls: HashMap<CacheKind, Duration>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttls: CacheKind::ALL.iter().map(|k| (*k, k.default_ttl())).collect(),
        }
    }
}

impl CachePolicy {
    /// Nothing is cached
    pub fn disabled() -> Self {
        Self { ttls: HashMap::new() }
    }

    pub fn with_ttl(mut self, kind: CacheKind, ttl: Option<Duration>) -> Self {
        match ttl {
            Some(ttl) if !ttl.is_zero() => {
                self.ttls.insert(kind, ttl);
            }
            _ => {
                self.ttls.remove(&kind);
            }
        }
        self
    }

    pub fn ttl(&self, kind: CacheKind) -> Option<Duration> {
        self.ttls.get(&kind).copied()
    }

    /// Build from the `[cache]` config table; zero disables a kind
    pub fn from_config(config: &CacheConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let mut policy = Self::default();
        for (key, seconds) in &config.ttl_seconds {
            match CacheKind::ALL.iter().find(|k| k.config_key() == key) {
                Some(kind) => policy = policy.with_ttl(*kind, Some(Duration::from_secs(*seconds))),
                None => warn!("Unknown cache kind in configuration: {}", key),
            }
        }
        policy
    }

    /// A cache for `kind`, or None when the kind is not cached
    pub fn cache_for<K, V>(&self, kind: CacheKind) -> Option<TtlCache<K, V>>
    where
        K: Eq + Hash + Clone + Send,
        V: Clone + Send,
    {
        self.ttl(kind).map(TtlCache::new)
    }
}

/// Entries expire `ttl` after insertion. Expired entries are dropped on
/// every insert, so keys that are never read again do not accumulate.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, (Instant, V)>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((inserted, value)) if inserted.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, (inserted, _)| inserted.elapsed() < self.ttl);
        entries.insert(key, (Instant::now(), value));
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn invalidate_all(&self) {
        self.entries.lock().await.clear();
    }

    /// Return the cached value or load, store and return it
    pub async fn get_or_try_load<F, Fut>(&self, key: K, load: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.get(&key).await {
            return Ok(value);
        }
        let value = load().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }
}

async fn through<K, V, F, Fut>(cache: &Option<TtlCache<K, V>>, key: K, load: F) -> Result<V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V>>,
{
    match cache {
        Some(cache) => cache.get_or_try_load(key, load).await,
        None => load().await,
    }
}

/// Reference data lookups with long-lived caching
pub struct CachedReferenceData {
    inner: Arc<dyn ReferenceDataRepository>,
    species: Option<TtlCache<String, Option<Species>>>,
    gears: Option<TtlCache<String, Option<GearCode>>>,
    ports: Option<TtlCache<String, Option<Port>>>,
    infractions: Option<TtlCache<i32, Option<Infraction>>>,
}

impl CachedReferenceData {
    pub fn new(inner: Arc<dyn ReferenceDataRepository>, policy: &CachePolicy) -> Self {
        debug!("Reference data cache: {:?}", policy);
        Self {
            inner,
            species: policy.cache_for(CacheKind::Species),
            gears: policy.cache_for(CacheKind::Gears),
            ports: policy.cache_for(CacheKind::Ports),
            infractions: policy.cache_for(CacheKind::Infractions),
        }
    }
}

#[async_trait]
impl ReferenceDataRepository for CachedReferenceData {
    async fn find_species(&self, code: &str) -> Result<Option<Species>> {
        through(&self.species, code.to_string(), || self.inner.find_species(code)).await
    }

    async fn find_gear(&self, code: &str) -> Result<Option<GearCode>> {
        through(&self.gears, code.to_string(), || self.inner.find_gear(code)).await
    }

    async fn find_port(&self, locode: &str) -> Result<Option<Port>> {
        through(&self.ports, locode.to_string(), || self.inner.find_port(locode)).await
    }

    async fn find_infraction(&self, natinf_code: i32) -> Result<Option<Infraction>> {
        through(&self.infractions, natinf_code, || self.inner.find_infraction(natinf_code)).await
    }
}

pub struct CachedVessels {
    inner: Arc<dyn VesselRepository>,
    vessels: Option<TtlCache<(VesselIdentifier, String), Option<Vessel>>>,
}

impl CachedVessels {
    pub fn new(inner: Arc<dyn VesselRepository>, policy: &CachePolicy) -> Self {
        Self {
            inner,
            vessels: policy.cache_for(CacheKind::Vessels),
        }
    }
}

#[async_trait]
impl VesselRepository for CachedVessels {
    async fn find_vessel(&self, identity: &VesselIdentity) -> Result<Option<Vessel>> {
        let key = identity.lookup_key()?;
        through(&self.vessels, key, || self.inner.find_vessel(identity)).await
    }
}

pub struct CachedFleetSegments {
    inner: Arc<dyn FleetSegmentRepository>,
    segments: Option<TtlCache<String, Vec<FleetSegment>>>,
}

impl CachedFleetSegments {
    pub fn new(inner: Arc<dyn FleetSegmentRepository>, policy: &CachePolicy) -> Self {
        Self {
            inner,
            segments: policy.cache_for(CacheKind::FleetSegments),
        }
    }
}

#[async_trait]
impl FleetSegmentRepository for CachedFleetSegments {
    async fn find_current_segments(&self, cfr: &str) -> Result<Vec<FleetSegment>> {
        through(&self.segments, cfr.to_string(), || self.inner.find_current_segments(cfr)).await
    }
}
