//! On-disk cache of fetched element-set text
//!
//! The cache is a single JSON file holding the raw text of every category,
//! the unix time it was written and a format version. Anything that cannot
//! be read back as a complete record of the current version counts as a
//! miss. Writes go to a temporary file that is renamed over the old one, so
//! readers never see half a record.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CatalogConfig;

/// Current cache file format
pub const CACHE_VERSION: u32 = 2;

/// Error type for cache writes
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to encode cache record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Contents of the cache file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Raw element-set text by category
    pub data: BTreeMap<String, String>,
    /// Unix time (seconds) the record was written
    pub timestamp: i64,
    /// File format version
    pub version: u32,
}

impl CacheRecord {
    /// Create a record of the current version stamped `timestamp`
    pub fn new(data: BTreeMap<String, String>, timestamp: i64) -> Self {
        Self {
            data,
            timestamp,
            version: CACHE_VERSION,
        }
    }

    /// Age relative to `now` (unix seconds); a future timestamp has age zero
    pub fn age_at(&self, now: i64) -> Duration {
        Duration::from_secs(now.saturating_sub(self.timestamp).max(0) as u64)
    }

    /// Whether the record is no older than `max_age` at `now`
    pub fn is_fresh_at(&self, max_age: Duration, now: i64) -> bool {
        self.age_at(now) <= max_age
    }
}

/// Cache file handle
#[derive(Debug, Clone)]
pub struct TleCache {
    path: PathBuf,
    max_age: Duration,
}

impl TleCache {
    /// Create a cache backed by `path`
    pub fn new<P: Into<PathBuf>>(path: P, max_age: Duration) -> Self {
        Self {
            path: path.into(),
            max_age,
        }
    }

    /// Create the cache described by a configuration
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::new(config.cache_path(), config.max_cache_age)
    }

    /// Get the cache file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the maximum age of a usable record
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Read the cached record, whatever its age
    ///
    /// A missing, unreadable, malformed or wrong-version file gives `None`.
    pub fn load(&self) -> Option<CacheRecord> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No cache file at {}", self.path.display());
                return None;
            }
            Err(e) => {
                warn!("Unreadable cache file {}: {}", self.path.display(), e);
                return None;
            }
        };

        let record: CacheRecord = match serde_json::from_str(&text) {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring malformed cache file {}: {}", self.path.display(), e);
                return None;
            }
        };

        if record.version != CACHE_VERSION {
            warn!(
                "Ignoring cache file version {} (expected {})",
                record.version, CACHE_VERSION
            );
            return None;
        }
        Some(record)
    }

    /// Read the cached record if it is younger than the maximum age
    pub fn load_fresh(&self) -> Option<CacheRecord> {
        let now = Utc::now().timestamp();
        let record = self.load()?;
        let age = record.age_at(now);
        if record.is_fresh_at(self.max_age, now) {
            info!("Using cached element sets ({} s old)", age.as_secs());
            Some(record)
        } else {
            info!(
                "Cached element sets are stale ({} s old, limit {} s)",
                age.as_secs(),
                self.max_age.as_secs()
            );
            None
        }
    }

    /// Age of the cached record, if there is one
    pub fn age(&self) -> Option<Duration> {
        self.load().map(|record| record.age_at(Utc::now().timestamp()))
    }

    /// Whether a usable, fresh record exists
    pub fn is_fresh(&self) -> bool {
        self.age().map(|age| age <= self.max_age).unwrap_or(false)
    }

    /// Write `data` as a new record stamped with the current time
    pub fn save(&self, data: BTreeMap<String, String>) -> Result<CacheRecord, CacheError> {
        let record = CacheRecord::new(data, Utc::now().timestamp());
        self.write(&record)?;
        Ok(record)
    }

    /// Write a record, replacing the cache file atomically
    pub fn write(&self, record: &CacheRecord) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("tmp");
        let result = (|| -> Result<(), CacheError> {
            let mut writer = BufWriter::new(File::create(&temp_path)?);
            serde_json::to_writer(&mut writer, record)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
            Ok(())
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        fs::rename(&temp_path, &self.path)?;
        debug!(
            "Wrote {} categories to {}",
            record.data.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Delete the cache file; a missing file is not an error
    pub fn clear(&self) -> Result<(), CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
