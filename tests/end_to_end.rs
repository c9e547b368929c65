//! End-to-end tests through the public API: parse, propagate, load, refresh
//! and query, with an in-memory HTTP client standing in for the network.

use std::collections::HashMap;
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use tempfile::tempdir;

use satfield::data::{FetchError, HttpClient, TleSource};
use satfield::query::QueryError;
use satfield::{
    parse_tle, parse_tle_text, CatalogConfig, CatalogManager, LoadSource, Propagator,
    RefreshOutcome, SatelliteTracker,
};

const STATIONS: &str = "\
ISS (ZARYA)
1 25544U 98067A   24001.50000000  .00016717  00000-0  30000-3 0  9990
2 25544  51.6400 200.0000 0006000  50.0000 310.0000 15.50000000432106
CSS (TIANHE)
1 48274U 21035A   24001.25000000  .00020000  00000-0  23000-3 0  9990
2 48274  41.4700 120.5000 0004500 300.0000  60.0000 15.61000000150008
";

/// Serves fixed bodies by URL; anything else is a 404
struct StaticClient(HashMap<String, String>);

impl StaticClient {
    fn serving(pairs: &[(&TleSource, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(source, body)| (source.url.clone(), body.to_string()))
                .collect(),
        )
    }
}

impl HttpClient for StaticClient {
    fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.0.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

fn assert_vec_near(actual: &nalgebra::Vector3<f64>, expected: [f64; 3], eps: f64) {
    for (a, e) in actual.iter().zip(expected) {
        assert_abs_diff_eq!(*a, e, epsilon = eps);
    }
}

#[test]
fn test_reference_near_earth_vectors() {
    let sat = parse_tle(
        "",
        "1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753",
        "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667",
    )
    .unwrap();
    assert_eq!(sat.name, "5");
    let prop = Propagator::new(&sat.elements);
    assert!(!prop.is_deep_space());

    let at_epoch = prop.propagate(0.0);
    assert!(at_epoch.is_ok());
    assert_vec_near(&at_epoch.position, [7022.465293, -1400.082968, 0.039952], 1e-3);
    assert_vec_near(&at_epoch.velocity, [1.893841, 6.405894, 4.534807], 1e-5);

    let later = prop.propagate(360.0);
    assert_vec_near(&later.position, [-7154.031202, -3783.176825, -3536.194123], 1e-3);
    assert_vec_near(&later.velocity, [4.741887, -4.151818, -2.093935], 1e-5);

    let half_day = prop.propagate(720.0);
    assert_vec_near(&half_day.position, [-7134.593401, 6531.686413, 3260.271865], 1e-3);
}

#[test]
fn test_reference_deep_space_vectors() {
    // 12-hour resonant orbit
    let molniya = parse_tle(
        "MOLNIYA 2-14",
        "1 08195U 75081A   06176.33215444  .00000099  00000-0  11873-3 0   813",
        "2 08195  64.1586 279.0717 6877146 264.7651  20.2257  2.00491383225656",
    )
    .unwrap();
    let prop = Propagator::new(&molniya.elements);
    assert!(prop.is_deep_space());
    let at_epoch = prop.propagate(0.0);
    assert_vec_near(&at_epoch.position, [2349.89483, -14785.93812, 0.02119], 1e-2);
    assert_vec_near(&at_epoch.velocity, [2.721488, -3.256812, 4.498417], 1e-5);
    assert!(prop.propagate(1440.0).is_ok());

    // Geosynchronous
    let geo = parse_tle(
        "",
        "1 28626U 05008A   06176.46683397 -.00000205  00000-0  10000-3 0  2190",
        "2 28626   0.0019 286.9433 0000335  13.7918  55.6504  1.00271289  4921",
    )
    .unwrap();
    let prop = Propagator::new(&geo.elements);
    for t in [0.0, 120.0, 1440.0] {
        let result = prop.propagate(t);
        assert!(result.is_ok());
        assert_abs_diff_eq!(result.radius_km(), 42164.0, epsilon = 50.0);
        assert_abs_diff_eq!(result.speed_km_s(), 3.075, epsilon = 0.01);
        assert!(result.position.z.abs() < 10.0);
    }
}

#[test]
fn test_batch_parse_keeps_good_records() {
    let corrupted = STATIONS.replace("0  9990\n2 48274", "0  9991\n2 48274");
    let text = format!("{}garbage line\n\n", corrupted);
    let report = parse_tle_text(&text);
    assert_eq!(report.valid_count(), 1);
    assert_eq!(report.invalid_count(), 1);
    assert_eq!(report.satellites[0].id(), 25544);
    assert_eq!(report.rejected[0].name, "CSS (TIANHE)");
}

#[test]
fn test_iss_position_after_ninety_minutes() {
    let report = parse_tle_text(STATIONS);
    let iss = &report.satellites[0];
    let result = Propagator::new(&iss.elements).propagate(90.0);
    assert!(result.is_ok());
    assert_abs_diff_eq!(result.radius_km(), 6786.0, epsilon = 30.0);
    assert_abs_diff_eq!(result.speed_km_s(), 7.66, epsilon = 0.1);
}

#[test]
fn test_offline_startup_uses_bundled_seed() {
    let dir = tempdir().unwrap();
    let config = CatalogConfig::default()
        .with_cache_dir(dir.path())
        .with_sources(Vec::new());
    let manager = Arc::new(CatalogManager::with_client(config, StaticClient(HashMap::new())));
    assert_eq!(manager.load_initial(), LoadSource::Seed);

    let tracker = SatelliteTracker::new(Arc::clone(&manager));
    assert!(tracker.position(25544, 0.0, 100.0).unwrap().is_ok());
    assert_eq!(
        tracker.position(1, 0.0, 100.0).unwrap_err(),
        QueryError::UnknownSatellite(1)
    );
}

#[test]
fn test_refresh_then_restart_from_cache() {
    let dir = tempdir().unwrap();
    let stations = TleSource::new("stations", "https://example.test/stations.txt", 1);
    let missing = TleSource::new("missing", "https://example.test/missing.txt", 2);
    let config = CatalogConfig::default()
        .with_cache_dir(dir.path())
        .with_bundled_seed(false)
        .with_sources(vec![stations.clone(), missing]);

    let client = StaticClient::serving(&[(&stations, STATIONS)]);
    let manager = Arc::new(CatalogManager::with_client(config.clone(), client));
    assert_eq!(manager.load_initial(), LoadSource::Empty);

    let tracker = SatelliteTracker::with_config(Arc::clone(&manager), manager.config());
    assert!(tracker.satellites().is_empty());

    let snapshot_before = tracker.catalog();
    match manager.refresh_now().unwrap() {
        RefreshOutcome::Completed(report) => {
            assert_eq!(report.succeeded().count(), 1);
            assert_eq!(report.failed().count(), 1);
            assert_eq!(report.total_satellite_count(), 2);
        }
        RefreshOutcome::AlreadyRunning => panic!("no other refresh was running"),
    }
    // Readers holding the old snapshot are unaffected
    assert!(snapshot_before.is_empty());
    assert_eq!(tracker.satellites().len(), 2);
    assert_eq!(tracker.summary(48274).unwrap().name, "CSS (TIANHE)");

    // A new process with no network picks the cache up
    let restarted = CatalogManager::with_client(config, StaticClient(HashMap::new()));
    assert_eq!(restarted.load_initial(), LoadSource::Cache);
    assert_eq!(restarted.snapshot().len(), 2);
    assert!(restarted.refresh_now().is_err());
    assert_eq!(restarted.snapshot().len(), 2);
}

#[test]
fn test_config_file_drives_tracker() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("satfield.json");
    std::fs::write(
        &path,
        r#"{"max_satellites": 3, "time_acceleration": 60.0, "sources": []}"#,
    )
    .unwrap();
    let config = CatalogConfig::from_json_file(&path)
        .unwrap()
        .with_cache_dir(dir.path());
    assert_eq!(config.max_satellites, Some(3));

    let manager = Arc::new(CatalogManager::with_client(config, StaticClient(HashMap::new())));
    manager.load_initial();
    let tracker = SatelliteTracker::with_config(Arc::clone(&manager), manager.config());
    assert_eq!(tracker.satellites().len(), 3);

    // One second at 60x is one minute past epoch
    let positions = tracker.positions(1.0);
    assert_eq!(positions.len(), 3);
    let first = &positions[0];
    let sat = tracker.catalog().get(first.id).cloned().unwrap();
    assert_eq!(first.result, Propagator::new(&sat.elements).propagate(1.0));
}
