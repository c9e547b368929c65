//! Query facade
//!
//! [`SatelliteTracker`] is what rendering and UI layers call. It answers
//! "where is satellite X at time T" against the current catalog snapshot,
//! keeps one compiled [`Propagator`] per satellite so coefficients are not
//! re-derived every frame, and attaches presentation metadata.
//!
//! Simulated time is expressed as elapsed seconds scaled by a time
//! acceleration factor; the resulting minutes are taken as the offset from
//! each satellite's element-set epoch.

pub mod presentation;

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::catalog::SatelliteCatalog;
use crate::config::CatalogConfig;
use crate::data::{CatalogManager, HttpClient};
use crate::satellite::{ObjectType, Satellite};
use crate::sgp4::{PropagationResult, Propagator};

pub use presentation::{country_color, organization_for, velocity_color, Color};

/// Error type for catalog queries
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("No satellite with catalog number {0}")]
    UnknownSatellite(u32),
}

/// Anything that can hand out the current catalog snapshot
pub trait CatalogProvider: Send + Sync {
    fn snapshot(&self) -> Arc<SatelliteCatalog>;
}

impl CatalogProvider for Arc<SatelliteCatalog> {
    fn snapshot(&self) -> Arc<SatelliteCatalog> {
        Arc::clone(self)
    }
}

impl<C: HttpClient> CatalogProvider for CatalogManager<C> {
    fn snapshot(&self) -> Arc<SatelliteCatalog> {
        CatalogManager::snapshot(self)
    }
}

impl<C: HttpClient> CatalogProvider for Arc<CatalogManager<C>> {
    fn snapshot(&self) -> Arc<SatelliteCatalog> {
        CatalogManager::snapshot(self)
    }
}

/// Minutes from epoch for `elapsed_seconds` of simulated time
pub fn simulated_minutes(elapsed_seconds: f64, time_acceleration: f64) -> f64 {
    elapsed_seconds * time_acceleration / 60.0
}

/// Display metadata for one satellite
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatelliteSummary {
    pub id: u32,
    pub name: String,
    pub country: String,
    pub organization: &'static str,
    pub object_type: &'static str,
    pub is_debris: bool,
    pub color: Color,
}

impl SatelliteSummary {
    fn of(sat: &Satellite) -> Self {
        let object_type = sat.object_type();
        Self {
            id: sat.id(),
            name: sat.name.clone(),
            country: sat.country().to_string(),
            organization: sat.organization(),
            object_type: object_type.as_str(),
            is_debris: object_type == ObjectType::Debris,
            color: country_color(sat.country()),
        }
    }
}

/// Propagated state of one satellite, ready for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct SatellitePosition {
    pub id: u32,
    pub name: String,
    pub result: PropagationResult,
    pub color: Color,
}

/// Point-in-time queries against a catalog provider
pub struct SatelliteTracker<P> {
    provider: P,
    time_acceleration: f64,
    max_satellites: Option<usize>,
    propagators: RwLock<HashMap<u32, Arc<Propagator>>>,
    /// Snapshot the cache was last pruned against
    last_snapshot: RwLock<Weak<SatelliteCatalog>>,
}

impl<P: CatalogProvider> SatelliteTracker<P> {
    /// Create a tracker with the default time acceleration and no enumeration cap
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, &CatalogConfig::default())
    }

    /// Create a tracker using the acceleration and cap from `config`
    pub fn with_config(provider: P, config: &CatalogConfig) -> Self {
        Self {
            provider,
            time_acceleration: config.time_acceleration,
            max_satellites: config.max_satellites,
            propagators: RwLock::new(HashMap::new()),
            last_snapshot: RwLock::new(Weak::new()),
        }
    }

    /// Get the configured time acceleration
    pub fn time_acceleration(&self) -> f64 {
        self.time_acceleration
    }

    /// Current catalog snapshot
    ///
    /// The first call after the provider publishes a new snapshot also drops
    /// cached propagators for satellites that left the catalog.
    pub fn catalog(&self) -> Arc<SatelliteCatalog> {
        let catalog = self.provider.snapshot();
        if self.snapshot_changed(&catalog) {
            self.retain_live(&catalog);
        }
        catalog
    }

    fn snapshot_changed(&self, catalog: &Arc<SatelliteCatalog>) -> bool {
        let seen = |last: &Weak<SatelliteCatalog>| Weak::as_ptr(last) == Arc::as_ptr(catalog);
        if self.last_snapshot.read().map(|last| seen(&last)).unwrap_or(false) {
            return false;
        }
        match self.last_snapshot.write() {
            Ok(mut last) if !seen(&last) => {
                *last = Arc::downgrade(catalog);
                true
            }
            _ => false,
        }
    }

    fn retain_live(&self, catalog: &SatelliteCatalog) {
        if let Ok(mut cache) = self.propagators.write() {
            let before = cache.len();
            cache.retain(|id, _| catalog.contains(*id));
            if cache.len() < before {
                debug!("Dropped {} cached propagators", before - cache.len());
            }
        }
    }

    /// Compiled propagator for a satellite, built on first use
    ///
    /// A cached propagator is reused only while its element set matches the
    /// satellite's; a refresh that brings a new epoch replaces it.
    pub fn propagator(&self, sat: &Satellite) -> Arc<Propagator> {
        let id = sat.id();
        if let Ok(cache) = self.propagators.read() {
            if let Some(prop) = cache.get(&id).filter(|p| *p.elements() == sat.elements) {
                return Arc::clone(prop);
            }
        }

        let prop = Arc::new(Propagator::new(&sat.elements));
        if let Ok(mut cache) = self.propagators.write() {
            cache.insert(id, Arc::clone(&prop));
        }
        prop
    }

    /// Number of propagators currently cached
    pub fn cached_propagators(&self) -> usize {
        self.propagators.read().map(|cache| cache.len()).unwrap_or(0)
    }

    /// Drop cached propagators for satellites no longer in the catalog
    pub fn prune(&self) {
        self.retain_live(&self.provider.snapshot());
    }

    /// Position of `id` after `elapsed_seconds` of simulated time
    pub fn position(
        &self,
        id: u32,
        elapsed_seconds: f64,
        time_acceleration: f64,
    ) -> Result<PropagationResult, QueryError> {
        let catalog = self.catalog();
        let sat = catalog.get(id).ok_or(QueryError::UnknownSatellite(id))?;
        let minutes = simulated_minutes(elapsed_seconds, time_acceleration);
        Ok(self.propagator(sat).propagate(minutes))
    }

    /// Position of `id` at a calendar time
    pub fn position_at(&self, id: u32, at: &DateTime<Utc>) -> Result<PropagationResult, QueryError> {
        let catalog = self.catalog();
        let sat = catalog.get(id).ok_or(QueryError::UnknownSatellite(id))?;
        Ok(self.propagator(sat).propagate_at(at))
    }

    /// Positions of every satellite (up to the enumeration cap)
    ///
    /// Uses the tracker's time acceleration. Failed propagations are
    /// included with their error tag so renderers can hide or flag them.
    pub fn positions(&self, elapsed_seconds: f64) -> Vec<SatellitePosition> {
        let minutes = simulated_minutes(elapsed_seconds, self.time_acceleration);
        let catalog = self.catalog();
        self.capped(&catalog)
            .map(|sat| SatellitePosition {
                id: sat.id(),
                name: sat.name.clone(),
                result: self.propagator(sat).propagate(minutes),
                color: country_color(sat.country()),
            })
            .collect()
    }

    /// Display metadata for every satellite (up to the enumeration cap)
    pub fn satellites(&self) -> Vec<SatelliteSummary> {
        let catalog = self.catalog();
        self.capped(&catalog).map(SatelliteSummary::of).collect()
    }

    /// Display metadata for one satellite
    pub fn summary(&self, id: u32) -> Result<SatelliteSummary, QueryError> {
        self.catalog()
            .get(id)
            .map(SatelliteSummary::of)
            .ok_or(QueryError::UnknownSatellite(id))
    }

    fn capped<'a>(&self, catalog: &'a SatelliteCatalog) -> impl Iterator<Item = &'a Satellite> {
        catalog.iter().take(self.max_satellites.unwrap_or(usize::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::seed::bundled_seed;
    use crate::sgp4::PropagationError;
    use crate::tle::parse_tle;
    use approx::assert_abs_diff_eq;
    use std::sync::Mutex;

    fn seeded() -> Arc<SatelliteCatalog> {
        Arc::new(SatelliteCatalog::from_category_texts(&bundled_seed()).0)
    }

    /// Provider whose snapshot can be swapped from the test
    struct Swappable(Mutex<Arc<SatelliteCatalog>>);

    impl CatalogProvider for Swappable {
        fn snapshot(&self) -> Arc<SatelliteCatalog> {
            Arc::clone(&self.0.lock().unwrap())
        }
    }

    #[test]
    fn test_simulated_minutes() {
        assert_eq!(simulated_minutes(60.0, 1.0), 1.0);
        assert_eq!(simulated_minutes(54.0, 100.0), 90.0);
        assert_eq!(simulated_minutes(0.0, 100.0), 0.0);
    }

    #[test]
    fn test_position_matches_direct_propagation() {
        let catalog = seeded();
        let tracker = SatelliteTracker::new(Arc::clone(&catalog));
        let result = tracker.position(25544, 54.0, 100.0).unwrap();

        let direct = Propagator::new(&catalog.get(25544).unwrap().elements).propagate(90.0);
        assert_eq!(result, direct);
        assert!(result.is_ok());
        assert_abs_diff_eq!(result.radius_km(), 6794.7, epsilon = 1.0);
    }

    #[test]
    fn test_unknown_satellite() {
        let tracker = SatelliteTracker::new(seeded());
        assert_eq!(
            tracker.position(1, 0.0, 1.0).unwrap_err(),
            QueryError::UnknownSatellite(1)
        );
        assert_eq!(tracker.summary(1).unwrap_err(), QueryError::UnknownSatellite(1));
        assert!(tracker.position_at(1, &Utc::now()).is_err());
    }

    #[test]
    fn test_position_at_epoch() {
        let catalog = seeded();
        let tracker = SatelliteTracker::new(Arc::clone(&catalog));
        let epoch = catalog.get(26824).unwrap().elements.epoch_datetime().unwrap();
        let at_epoch = tracker.position_at(26824, &epoch).unwrap();
        let direct = tracker.position(26824, 0.0, 1.0).unwrap();
        assert!((at_epoch.position - direct.position).norm() < 1e-3);
    }

    #[test]
    fn test_propagators_are_cached_and_invalidated() {
        let provider = Swappable(Mutex::new(seeded()));
        let tracker = SatelliteTracker::new(provider);
        assert_eq!(tracker.cached_propagators(), 0);

        tracker.position(25544, 0.0, 1.0).unwrap();
        tracker.position(25544, 60.0, 1.0).unwrap();
        assert_eq!(tracker.cached_propagators(), 1);

        let sat = tracker.catalog().get(25544).unwrap().clone();
        let first = tracker.propagator(&sat);
        assert!(Arc::ptr_eq(&first, &tracker.propagator(&sat)));

        // New epoch for the ISS and nothing else
        let newer = parse_tle(
            "ISS (ZARYA)",
            "1 25544U 98067A   24002.00000000  .00016717  00000-0  30000-3 0  9996",
            "2 25544  51.6400 201.0000 0006000  50.0000 310.0000 15.50000000432264",
        )
        .unwrap();
        let mut replacement = SatelliteCatalog::new();
        replacement.add_category("stations", vec![newer.clone()]);
        *tracker.provider.0.lock().unwrap() = Arc::new(replacement);

        let second = tracker.propagator(&newer);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*second.elements(), newer.elements);

        tracker.position(20580, 0.0, 1.0).unwrap_err();
        tracker.prune();
        assert_eq!(tracker.cached_propagators(), 1);
    }

    #[test]
    fn test_new_snapshot_prunes_departed_satellites() {
        let provider = Swappable(Mutex::new(seeded()));
        let tracker = SatelliteTracker::new(provider);
        for id in [25544, 20580, 26824] {
            tracker.position(id, 0.0, 1.0).unwrap();
        }
        assert_eq!(tracker.cached_propagators(), 3);

        // Same snapshot again keeps everything
        tracker.positions(0.0);
        assert_eq!(tracker.cached_propagators(), tracker.catalog().len());

        let iss = tracker.catalog().get(25544).unwrap().clone();
        let mut replacement = SatelliteCatalog::new();
        replacement.add_category("stations", vec![iss]);
        *tracker.provider.0.lock().unwrap() = Arc::new(replacement);

        // The next query sees the new snapshot and drops the rest
        assert!(tracker.position(25544, 0.0, 1.0).unwrap().is_ok());
        assert_eq!(tracker.cached_propagators(), 1);
        assert_eq!(tracker.summary(20580).unwrap_err(), QueryError::UnknownSatellite(20580));
        assert_eq!(tracker.cached_propagators(), 1);
    }

    #[test]
    fn test_positions_and_enumeration_cap() {
        let tracker = SatelliteTracker::new(seeded());
        let all = tracker.positions(0.0);
        assert_eq!(all.len(), 12);
        assert!(all.iter().all(|p| p.result.is_ok()));

        let config = CatalogConfig::default()
            .with_max_satellites(5)
            .with_time_acceleration(1.0);
        let capped = SatelliteTracker::with_config(seeded(), &config);
        assert_eq!(capped.time_acceleration(), 1.0);
        assert_eq!(capped.positions(0.0).len(), 5);
        assert_eq!(capped.satellites().len(), 5);
    }

    #[test]
    fn test_summaries() {
        let tracker = SatelliteTracker::new(seeded());
        let iss = tracker.summary(25544).unwrap();
        assert_eq!(iss.name, "ISS (ZARYA)");
        assert_eq!(iss.country, "98");
        assert_eq!(iss.organization, "Private/Other");
        assert_eq!(iss.object_type, "payload");
        assert!(!iss.is_debris);

        let rocket = tracker.summary(22220).unwrap();
        assert_eq!(rocket.object_type, "rocket body");

        let debris: Vec<_> = tracker.satellites().into_iter().filter(|s| s.is_debris).collect();
        assert_eq!(debris.len(), 2);
    }

    #[test]
    fn test_decayed_satellite_is_reported_not_dropped() {
        let decayed = parse_tle(
            "DECAY TEST",
            "1 99001U 24999A   24001.00000000  .00000000  00000-0  00000+0 0  9998",
            "2 99001  51.6000   0.0000 1000000   0.0000   0.0000 16.00000000    12",
        )
        .unwrap();
        let mut catalog = SatelliteCatalog::new();
        catalog.add_category("test", vec![decayed]);
        let tracker = SatelliteTracker::new(Arc::new(catalog));

        let positions = tracker.positions(0.0);
        assert_eq!(positions.len(), 1);
        assert!(matches!(
            positions[0].result.error,
            Some(PropagationError::Decayed(_))
        ));
    }

    #[test]
    fn test_concurrent_queries() {
        let tracker = SatelliteTracker::new(seeded());
        let expected = tracker.position(25485, 600.0, 1.0).unwrap();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    assert_eq!(tracker.position(25485, 600.0, 1.0).unwrap(), expected);
                });
            }
        });
    }
}
