//! Element-set data sources
//!
//! Everything that produces raw element-set text lives here: the bundled and
//! on-disk seed files, the JSON cache, HTTP sources, and the manager that
//! decides which of them feeds the live catalog.

pub mod cache;
mod downloader;
pub mod manager;
pub mod seed;

pub use cache::{CacheError, CacheRecord, TleCache, CACHE_VERSION};
pub use downloader::{
    FetchError, FetchReport, HttpClient, ReqwestClient, SourceOutcome, SourceStats, TleDownloader,
    TleSource,
};
pub use manager::{CatalogManager, LoadSource, RefreshHandle, RefreshOutcome};
