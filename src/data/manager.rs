//! Catalog lifecycle: initial load, refresh and atomic replacement
//!
//! [`CatalogManager`] owns the current [`SatelliteCatalog`] snapshot behind an
//! `RwLock<Arc<_>>`. Readers clone the `Arc` and keep working on that
//! snapshot for as long as they like; a refresh builds a complete new
//! catalog off to the side and swaps the pointer, so no reader ever sees a
//! half-built catalog.
//!
//! Startup order is cache (if fresh), otherwise seed data. Network refreshes
//! run on demand or from a background thread started with
//! [`CatalogManager::spawn_refresh`]. Only one refresh runs at a time; a
//! request that arrives while one is in flight returns immediately.

use std::collections::BTreeMap;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, RwLock, TryLockError};
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};

use super::cache::TleCache;
use super::downloader::{FetchError, FetchReport, HttpClient, ReqwestClient, TleDownloader};
use super::seed;
use crate::catalog::SatelliteCatalog;
use crate::config::CatalogConfig;
use crate::Result;

/// Where the catalog loaded at startup came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// A fresh cache file
    Cache,
    /// Bundled or directory seed files
    Seed,
    /// Nothing usable; the catalog is empty until a refresh succeeds
    Empty,
}

/// Result of a refresh request
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// The refresh ran and the catalog was replaced
    Completed(FetchReport),
    /// Another refresh was already running; nothing was done
    AlreadyRunning,
}

/// Owns the current catalog snapshot and keeps it fresh
pub struct CatalogManager<C: HttpClient = ReqwestClient> {
    config: CatalogConfig,
    cache: TleCache,
    downloader: TleDownloader<C>,
    catalog: RwLock<Arc<SatelliteCatalog>>,
    refresh_lock: Mutex<()>,
}

impl CatalogManager<ReqwestClient> {
    /// Create a manager that fetches over HTTP
    pub fn new(config: CatalogConfig) -> Result<Self> {
        let client = ReqwestClient::new(config.request_timeout, config.resource_timeout)?;
        Ok(Self::with_client(config, client))
    }
}

impl<C: HttpClient> CatalogManager<C> {
    /// Create a manager with a caller-supplied HTTP client
    ///
    /// The catalog starts empty; call [`load_initial`](Self::load_initial).
    pub fn with_client(config: CatalogConfig, client: C) -> Self {
        Self {
            cache: TleCache::from_config(&config),
            downloader: TleDownloader::new(client, config.sources.clone()),
            catalog: RwLock::new(Arc::new(SatelliteCatalog::new())),
            refresh_lock: Mutex::new(()),
            config,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Get the cache file handle
    pub fn cache(&self) -> &TleCache {
        &self.cache
    }

    /// Current catalog snapshot
    pub fn snapshot(&self) -> Arc<SatelliteCatalog> {
        match self.catalog.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn install(&self, catalog: SatelliteCatalog) {
        let count = catalog.len();
        let catalog = Arc::new(catalog);
        match self.catalog.write() {
            Ok(mut guard) => *guard = catalog,
            Err(poisoned) => *poisoned.into_inner() = catalog,
        }
        info!("Catalog replaced: {} satellites", count);
    }

    fn build(texts: &BTreeMap<String, String>) -> SatelliteCatalog {
        let (catalog, reports) = SatelliteCatalog::from_category_texts(texts);
        let rejected: usize = reports.values().map(|r| r.invalid_count()).sum();
        if rejected > 0 {
            debug!("{} element sets rejected while building catalog", rejected);
        }
        catalog
    }

    /// Load the startup catalog from a fresh cache or else the seed data
    ///
    /// Never touches the network.
    pub fn load_initial(&self) -> LoadSource {
        if let Some(record) = self.cache.load_fresh() {
            let catalog = Self::build(&record.data);
            if !catalog.is_empty() {
                self.install(catalog);
                return LoadSource::Cache;
            }
            warn!("Cache file held no valid element sets, falling back to seed data");
        }

        let texts = seed::load_seed(self.config.use_bundled_seed, self.config.seed_dir.as_deref());
        let catalog = Self::build(&texts);
        if catalog.is_empty() {
            warn!("No cache and no seed data; catalog is empty until a refresh succeeds");
            return LoadSource::Empty;
        }
        info!("Loaded {} satellites from seed data", catalog.len());
        self.install(catalog);
        LoadSource::Seed
    }

    /// Fetch every source and replace the catalog
    pub fn refresh_now(&self) -> Result<RefreshOutcome> {
        self.refresh_with(|downloader| downloader.fetch_all())
    }

    /// Fetch only the listed categories and replace the catalog
    ///
    /// Categories that were not fetched keep their cached text.
    pub fn refresh_categories(&self, categories: &[&str]) -> Result<RefreshOutcome> {
        self.refresh_with(|downloader| downloader.fetch_categories(categories))
    }

    fn refresh_with<F>(&self, fetch: F) -> Result<RefreshOutcome>
    where
        F: FnOnce(&TleDownloader<C>) -> std::result::Result<FetchReport, FetchError>,
    {
        let _guard = match self.refresh_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!("Refresh already in progress, skipping");
                return Ok(RefreshOutcome::AlreadyRunning);
            }
        };

        let report = match fetch(&self.downloader) {
            Ok(report) => report,
            Err(e) => {
                warn!("Refresh failed, keeping current catalog: {}", e);
                return Err(e.into());
            }
        };

        // Fetched categories replace their cached text; the rest is kept
        let mut texts = self.cache.load().map(|record| record.data).unwrap_or_default();
        texts.extend(report.texts.clone());

        if let Err(e) = self.cache.save(texts.clone()) {
            warn!("Failed to write cache {}: {}", self.cache.path().display(), e);
        }

        let catalog = Self::build(&texts);
        info!(
            "Refresh complete: {} of {} sources succeeded, {} element sets",
            report.succeeded().count(),
            report.outcomes.len(),
            report.total_satellite_count()
        );
        self.install(catalog);
        Ok(RefreshOutcome::Completed(report))
    }
}

impl<C: HttpClient + 'static> CatalogManager<C> {
    /// Refresh now and then every `refresh_interval` on a background thread
    ///
    /// The thread stops when the returned handle is stopped or dropped.
    pub fn spawn_refresh(self: &Arc<Self>) -> std::io::Result<RefreshHandle> {
        let (stop, stopped) = mpsc::channel::<()>();
        let manager = Arc::clone(self);
        let interval = self.config.refresh_interval;

        let handle = thread::Builder::new()
            .name("satfield-refresh".to_string())
            .spawn(move || loop {
                if let Err(e) = manager.refresh_now() {
                    warn!("Background refresh failed: {}", e);
                }
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(RefreshHandle {
            stop: Some(stop),
            handle: Some(handle),
        })
    }
}

/// Handle to the background refresh thread
#[derive(Debug)]
pub struct RefreshHandle {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Stop the thread and wait for any in-flight refresh to finish
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Refresh thread panicked");
            }
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cache::CacheRecord;
    use crate::data::downloader::tests::{FakeClient, STATIONS};
    use crate::data::TleSource;
    use crate::SatfieldError;
    use chrono::Utc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn config(dir: &TempDir, sources: Vec<TleSource>) -> CatalogConfig {
        CatalogConfig::default()
            .with_cache_dir(dir.path())
            .with_sources(sources)
            .with_refresh_interval(Duration::from_secs(3_600))
    }

    #[test]
    fn test_startup_uses_seed_without_cache() {
        let dir = tempdir().unwrap();
        let manager = CatalogManager::with_client(config(&dir, vec![]), FakeClient::default());
        assert!(manager.snapshot().is_empty());
        assert_eq!(manager.load_initial(), LoadSource::Seed);
        assert_eq!(manager.snapshot().len(), 12);
    }

    #[test]
    fn test_startup_prefers_fresh_cache() {
        let dir = tempdir().unwrap();
        let manager = CatalogManager::with_client(config(&dir, vec![]), FakeClient::default());
        let mut data = BTreeMap::new();
        data.insert("stations".to_string(), STATIONS.to_string());
        manager.cache().save(data.clone()).unwrap();

        assert_eq!(manager.load_initial(), LoadSource::Cache);
        assert_eq!(manager.snapshot().len(), 2);

        // A stale cache falls back to the seed
        let stale = CacheRecord::new(data, Utc::now().timestamp() - 90_000);
        manager.cache().write(&stale).unwrap();
        assert_eq!(manager.load_initial(), LoadSource::Seed);
        assert_eq!(manager.snapshot().len(), 12);
    }

    #[test]
    fn test_empty_without_cache_or_seed() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir, vec![]).with_bundled_seed(false);
        let manager = CatalogManager::with_client(cfg, FakeClient::default());
        assert_eq!(manager.load_initial(), LoadSource::Empty);
        assert!(manager.snapshot().is_empty());
    }

    #[test]
    fn test_refresh_swaps_catalog_and_writes_cache() {
        let dir = tempdir().unwrap();
        let stations = TleSource::celestrak("stations", 1);
        let client = FakeClient::default().with(&stations, Ok(STATIONS));
        let manager = CatalogManager::with_client(
            config(&dir, vec![stations, TleSource::celestrak("offline", 2)]),
            client,
        );
        manager.load_initial();
        let before = manager.snapshot();

        let outcome = manager.refresh_now().unwrap();
        let RefreshOutcome::Completed(report) = outcome else {
            panic!("refresh did not run");
        };
        assert_eq!(report.succeeded().count(), 1);
        assert_eq!(report.failed().count(), 1);

        // Old snapshot is untouched, new one holds only the fetched data
        assert_eq!(before.len(), 12);
        let after = manager.snapshot();
        assert_eq!(after.len(), 2);
        assert!(after.contains(48274));

        let cached = manager.cache().load().unwrap();
        assert_eq!(cached.data.keys().collect::<Vec<_>>(), vec!["stations"]);
    }

    #[test]
    fn test_failed_refresh_keeps_catalog_and_cache() {
        let dir = tempdir().unwrap();
        let manager = CatalogManager::with_client(
            config(&dir, vec![TleSource::celestrak("offline", 1)]),
            FakeClient::default(),
        );
        manager.load_initial();

        let err = manager.refresh_now().unwrap_err();
        assert!(matches!(
            err,
            SatfieldError::Fetch(FetchError::AllSourcesFailed(1))
        ));
        assert_eq!(manager.snapshot().len(), 12);
        assert!(manager.cache().load().is_none());
    }

    #[test]
    fn test_category_refresh_merges_with_cache() {
        let dir = tempdir().unwrap();
        let stations = TleSource::celestrak("stations", 1);
        let client = FakeClient::default().with(&stations, Ok(STATIONS));
        let manager = CatalogManager::with_client(config(&dir, vec![stations]), client);

        let mut data = seed::bundled_seed();
        data.remove("stations");
        manager.cache().save(data).unwrap();

        manager.refresh_categories(&["stations"]).unwrap();
        let cached = manager.cache().load().unwrap();
        assert_eq!(cached.data.len(), 4);
        assert_eq!(manager.snapshot().len(), 12);
    }

    #[test]
    fn test_overlapping_refresh_is_coalesced() {
        let dir = tempdir().unwrap();
        let stations = TleSource::celestrak("stations", 1);
        let client = FakeClient::default().with(&stations, Ok(STATIONS));
        let manager = CatalogManager::with_client(config(&dir, vec![stations]), client);

        let held = manager.refresh_lock.lock().unwrap();
        assert!(matches!(
            manager.refresh_now().unwrap(),
            RefreshOutcome::AlreadyRunning
        ));
        drop(held);
        assert!(matches!(
            manager.refresh_now().unwrap(),
            RefreshOutcome::Completed(_)
        ));
        assert_eq!(manager.downloader.sources().len(), 1);
    }

    #[test]
    fn test_background_refresh_runs_and_stops() {
        let dir = tempdir().unwrap();
        let stations = TleSource::celestrak("stations", 1);
        let client = FakeClient::default().with(&stations, Ok(STATIONS));
        let manager = Arc::new(CatalogManager::with_client(config(&dir, vec![stations]), client));
        manager.load_initial();

        let handle = manager.spawn_refresh().unwrap();
        let mut waited = 0;
        while manager.snapshot().len() != 2 && waited < 500 {
            thread::sleep(Duration::from_millis(10));
            waited += 1;
        }
        handle.stop();

        assert_eq!(manager.snapshot().len(), 2);
        // One immediate refresh, then the thread waits out the hour-long interval
        assert_eq!(manager.downloader.client().calls.load(Ordering::SeqCst), 1);
    }
}
