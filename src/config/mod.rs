//! Catalog configuration
//!
//! [`CatalogConfig`] is built explicitly and handed to the catalog manager and
//! the query facade at construction. It can be assembled in code with the
//! `with_*` builders or read from a JSON file in which every field is
//! optional; durations are written as whole seconds.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::TleSource;

/// Error type for configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Default cache directory, `$HOME/.cache/satfield`
pub fn default_cache_dir() -> PathBuf {
    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".cache").join("satfield")
}

/// Settings for loading, caching, refreshing and querying the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory holding the cache file
    pub cache_dir: PathBuf,
    /// Name of the cache file inside `cache_dir`
    pub cache_file_name: String,
    /// Cached data older than this is ignored at startup
    #[serde(with = "seconds")]
    pub max_cache_age: Duration,
    /// Time between background refreshes
    #[serde(with = "seconds")]
    pub refresh_interval: Duration,
    /// Connection timeout for each request
    #[serde(with = "seconds")]
    pub request_timeout: Duration,
    /// Timeout for a whole request including the body
    #[serde(with = "seconds")]
    pub resource_timeout: Duration,
    /// Extra directory of `.tle` / `.tle.gz` seed files
    pub seed_dir: Option<PathBuf>,
    /// Whether the seed files compiled into the crate are used
    pub use_bundled_seed: bool,
    /// Network sources, fetched in priority order
    pub sources: Vec<TleSource>,
    /// Cap on the number of satellites returned by enumeration
    pub max_satellites: Option<usize>,
    /// Simulated seconds per wall-clock second
    pub time_acceleration: f64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            cache_file_name: "tle_data.json".to_string(),
            max_cache_age: Duration::from_secs(86_400),
            refresh_interval: Duration::from_secs(3_600),
            request_timeout: Duration::from_secs(30),
            resource_timeout: Duration::from_secs(120),
            seed_dir: None,
            use_bundled_seed: true,
            sources: TleSource::defaults(),
            max_satellites: None,
            time_acceleration: 100.0,
        }
    }
}

impl CatalogConfig {
    /// Read a configuration from a JSON file, defaulting missing fields
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Full path of the cache file
    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(&self.cache_file_name)
    }

    /// Directory holding the catalog cache file
    pub fn with_cache_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Age past which cached data is ignored at startup
    pub fn with_max_cache_age(mut self, age: Duration) -> Self {
        self.max_cache_age = age;
        self
    }

    /// Period of the background refresh loop
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Connection timeout and whole-request timeout
    pub fn with_timeouts(mut self, request: Duration, resource: Duration) -> Self {
        self.request_timeout = request;
        self.resource_timeout = resource;
        self
    }

    /// Extra directory of seed files
    pub fn with_seed_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.seed_dir = Some(dir.into());
        self
    }

    /// Whether to fall back to the compiled-in seed data
    pub fn with_bundled_seed(mut self, enabled: bool) -> Self {
        self.use_bundled_seed = enabled;
        self
    }

    /// Replace the list of download sources
    pub fn with_sources(mut self, sources: Vec<TleSource>) -> Self {
        self.sources = sources;
        self
    }

    /// Cap the number of satellites the tracker enumerates
    pub fn with_max_satellites(mut self, limit: usize) -> Self {
        self.max_satellites = Some(limit);
        self
    }

    /// Simulated seconds per wall-clock second
    pub fn with_time_acceleration(mut self, acceleration: f64) -> Self {
        self.time_acceleration = acceleration;
        self
    }
}

/// Serialize a `Duration` as whole seconds
mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert_eq!(config.max_cache_age, Duration::from_secs(86_400));
        assert_eq!(config.refresh_interval, Duration::from_secs(3_600));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.resource_timeout, Duration::from_secs(120));
        assert!(config.use_bundled_seed);
        assert!(config.seed_dir.is_none());
        assert!(config.max_satellites.is_none());
        assert_eq!(config.time_acceleration, 100.0);
        assert_eq!(config.sources.len(), 7);
        assert!(config.cache_path().ends_with("satfield/tle_data.json"));
    }

    #[test]
    fn test_builders() {
        let config = CatalogConfig::default()
            .with_cache_dir("/tmp/sats")
            .with_max_cache_age(Duration::from_secs(60))
            .with_bundled_seed(false)
            .with_max_satellites(10)
            .with_sources(vec![])
            .with_time_acceleration(1.0);
        assert_eq!(config.cache_path(), PathBuf::from("/tmp/sats/tle_data.json"));
        assert_eq!(config.max_cache_age, Duration::from_secs(60));
        assert!(!config.use_bundled_seed);
        assert_eq!(config.max_satellites, Some(10));
        assert!(config.sources.is_empty());
        assert_eq!(config.time_acceleration, 1.0);
    }

    #[test]
    fn test_partial_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"cache_dir": "/var/cache/sats", "max_cache_age": 120, "max_satellites": 500}}"#
        )
        .unwrap();

        let config = CatalogConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/sats"));
        assert_eq!(config.max_cache_age, Duration::from_secs(120));
        assert_eq!(config.max_satellites, Some(500));
        assert_eq!(config.refresh_interval, Duration::from_secs(3_600));
        assert_eq!(config.sources, TleSource::defaults());
    }

    #[test]
    fn test_json_round_trip_and_errors() {
        let config = CatalogConfig::default().with_seed_dir("/opt/seed");
        let json = serde_json::to_string(&config).unwrap();
        let back: CatalogConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);

        let mut bad = NamedTempFile::new().unwrap();
        write!(bad, "{{ not json").unwrap();
        assert!(matches!(
            CatalogConfig::from_json_file(bad.path()),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            CatalogConfig::from_json_file("/nonexistent/satfield.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
