//! Element-set downloads
//!
//! Each [`TleSource`] names a category and the URL its text is fetched from.
//! [`TleDownloader`] fetches every source in priority order through an
//! [`HttpClient`], validates the text with the batch parser and records
//! per-source statistics. One bad source never aborts the others; only a
//! refresh in which every source fails is an error.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tle::parse_tle_text;

const CELESTRAK_GP_URL: &str = "https://celestrak.org/NORAD/elements/gp.php";

/// Error type for fetching element-set text
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    #[error("Request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Response from {url} was empty")]
    EmptyBody { url: String },

    #[error("No valid element sets for category '{category}' ({invalid} rejected)")]
    NoValidEntries { category: String, invalid: usize },

    #[error("All {0} sources failed")]
    AllSourcesFailed(usize),
}

/// A named network source of element-set text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TleSource {
    /// Category the fetched satellites are filed under
    pub category: String,
    /// URL returning plain element-set text
    pub url: String,
    /// Lower numbers are fetched first
    pub priority: u8,
}

impl TleSource {
    /// Source for `category`; lower `priority` values are fetched first
    pub fn new(category: &str, url: &str, priority: u8) -> Self {
        Self {
            category: category.to_string(),
            url: url.to_string(),
            priority,
        }
    }

    /// A CelesTrak GP group in element-set format, filed under the group name
    pub fn celestrak(group: &str, priority: u8) -> Self {
        Self::new(
            group,
            &format!("{}?GROUP={}&FORMAT=tle", CELESTRAK_GP_URL, group),
            priority,
        )
    }

    /// Active satellites, stations, Starlink and the major debris clouds
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::celestrak("active", 1),
            Self::celestrak("stations", 1),
            Self::celestrak("starlink", 2),
            Self::celestrak("1982-092", 3),
            Self::celestrak("cosmos-2251-debris", 3),
            Self::celestrak("fengyun-1c-debris", 3),
            Self::celestrak("iridium-33-debris", 3),
        ]
    }
}

/// Plain-text HTTP GET
///
/// Implementations must return an error for non-success statuses and for
/// empty bodies.
pub trait HttpClient: Send + Sync {
    /// Fetch `url` and return the body as text
    fn get_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Blocking `reqwest` client with connect and total timeouts
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Build a blocking client with the given connect and total timeouts
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .user_agent(concat!("satfield/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Http {
                url: String::new(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let http_error = |e: reqwest::Error| FetchError::Http {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().map_err(http_error)?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let text = response.text().map_err(http_error)?;
        if text.trim().is_empty() {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }
        Ok(text)
    }
}

/// Statistics for one successfully fetched source
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStats {
    pub category: String,
    /// Non-blank lines in the response
    pub total_lines: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Time spent fetching and validating
    pub duration: Duration,
    pub fetched_at: DateTime<Utc>,
}

/// Outcome of fetching one source
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub source: TleSource,
    pub result: Result<SourceStats, FetchError>,
}

/// Aggregate outcome of a refresh with at least one successful source
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// Raw text of each successful category
    pub texts: BTreeMap<String, String>,
    /// Per-source outcomes in fetch order
    pub outcomes: Vec<SourceOutcome>,
}

impl FetchReport {
    /// Statistics of the sources that succeeded
    pub fn succeeded(&self) -> impl Iterator<Item = &SourceStats> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    /// Sources that failed, with the reason
    pub fn failed(&self) -> impl Iterator<Item = (&TleSource, &FetchError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.source, e)))
    }

    /// Valid element sets across all successful sources
    ///
    /// Objects listed by several categories are counted once per category.
    pub fn total_satellite_count(&self) -> usize {
        self.succeeded().map(|stats| stats.valid).sum()
    }
}

/// Fetches and validates element-set text from a set of sources
#[derive(Debug, Clone)]
pub struct TleDownloader<C> {
    client: C,
    sources: Vec<TleSource>,
}

impl<C: HttpClient> TleDownloader<C> {
    /// Create a downloader; sources are kept sorted by priority
    pub fn new(client: C, mut sources: Vec<TleSource>) -> Self {
        sources.sort_by_key(|source| source.priority);
        Self { client, sources }
    }

    /// Get the HTTP client
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Get the configured sources in fetch order
    pub fn sources(&self) -> &[TleSource] {
        &self.sources
    }

    /// Fetch every source
    pub fn fetch_all(&self) -> Result<FetchReport, FetchError> {
        self.fetch_matching(|_| true)
    }

    /// Fetch only the sources whose category is listed
    pub fn fetch_categories(&self, categories: &[&str]) -> Result<FetchReport, FetchError> {
        self.fetch_matching(|source| categories.contains(&source.category.as_str()))
    }

    fn fetch_matching<F>(&self, include: F) -> Result<FetchReport, FetchError>
    where
        F: Fn(&TleSource) -> bool,
    {
        let mut report = FetchReport::default();

        for source in self.sources.iter().filter(|s| include(s)) {
            let result = self.fetch_source(source);
            match &result {
                Ok((stats, _)) => info!(
                    "Fetched {}: {} valid, {} invalid of {} lines in {:.2} s",
                    stats.category,
                    stats.valid,
                    stats.invalid,
                    stats.total_lines,
                    stats.duration.as_secs_f64()
                ),
                Err(e) => warn!("Source {} failed: {}", source.category, e),
            }

            let result = result.map(|(stats, text)| {
                report.texts.insert(source.category.clone(), text);
                stats
            });
            report.outcomes.push(SourceOutcome {
                source: source.clone(),
                result,
            });
        }

        if report.texts.is_empty() {
            return Err(FetchError::AllSourcesFailed(report.outcomes.len()));
        }
        Ok(report)
    }

    fn fetch_source(&self, source: &TleSource) -> Result<(SourceStats, String), FetchError> {
        let started = Instant::now();
        let text = self.client.get_text(&source.url)?;
        let parsed = parse_tle_text(&text);

        if parsed.valid_count() == 0 {
            return Err(FetchError::NoValidEntries {
                category: source.category.clone(),
                invalid: parsed.invalid_count(),
            });
        }

        let stats = SourceStats {
            category: source.category.clone(),
            total_lines: parsed.total_lines,
            valid: parsed.valid_count(),
            invalid: parsed.invalid_count(),
            duration: started.elapsed(),
            fetched_at: Utc::now(),
        };
        Ok((stats, text))
    }
}
