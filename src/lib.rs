//! Satfield: two-line element parsing, SGP4/SDP4 propagation and a
//! self-refreshing satellite catalog
//!
//! Element sets are parsed and validated by [`tle`], turned into mean
//! [`elements`], and propagated to TEME position and velocity by [`sgp4`].
//! The [`data`] layer keeps a [`catalog::SatelliteCatalog`] loaded from cache
//! or seed files and refreshed from the network, and [`query`] answers
//! point-in-time position questions against it.

use thiserror::Error;

pub mod catalog;
pub mod config;
pub mod constants;
pub mod data;
pub mod elements;
pub mod query;
pub mod satellite;
pub mod sgp4;
pub mod time;
pub mod tle;

// Re-export commonly used types
pub use catalog::SatelliteCatalog;
pub use config::CatalogConfig;
pub use data::{CatalogManager, LoadSource, RefreshOutcome};
pub use elements::OrbitalElements;
pub use query::{CatalogProvider, SatelliteTracker};
pub use satellite::{ObjectType, Satellite};
pub use sgp4::{PropagationError, PropagationResult, Propagator};
pub use tle::{parse_tle, parse_tle_text, ParseReport, Tle};

/// Main error type for the satfield library
#[derive(Debug, Error)]
pub enum SatfieldError {
    #[error("TLE error: {0}")]
    Tle(#[from] tle::TleError),

    #[error("Element error: {0}")]
    Elements(#[from] elements::ElementsError),

    #[error("Time error: {0}")]
    Time(#[from] time::TimeError),

    #[error("Cache error: {0}")]
    Cache(#[from] data::CacheError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] data::FetchError),

    #[error("Query error: {0}")]
    Query(#[from] query::QueryError),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for satfield operations
pub type Result<T> = std::result::Result<T, SatfieldError>;
