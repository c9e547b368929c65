//! Two-line element set parsing and validation
//!
//! This module reads the fixed-column NORAD element-set format. A record is an
//! optional name line followed by two 69-column lines; files concatenate many
//! records back to back. Each record is validated (length, line numbers,
//! checksums, matching catalog numbers) before any field is interpreted, and
//! every rejection names the offending line or field.
//!
//! Batch parsing never stops at a bad record: rejected records are collected
//! in the [`ParseReport`] next to the satellites that parsed cleanly.

mod fields;

use std::fmt;

use log::debug;
use thiserror::Error;

use crate::constants::DEG2RAD;
use crate::elements::{ElementsError, OrbitalElements};
use crate::satellite::Satellite;
use crate::time::{self, TimeError};

pub use fields::{
    assumed_decimal, catalog_number, checksum, implied_fraction, CHECKSUM_SPAN, LINE_LENGTH,
};
use fields::{column, decimal, line1, line2, unsigned};

/// Number of rejected records echoed to the debug log per batch
const LOGGED_REJECTIONS: usize = 5;

/// Reason an element-set record was rejected
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TleError {
    #[error("Line {line} is {length} characters long, expected at least 69")]
    LineTooShort { line: u8, length: usize },

    #[error("Line {line} contains non-ASCII characters")]
    NonAscii { line: u8 },

    #[error("Line {line} does not start with \"{line} \"")]
    MissingLineNumber { line: u8 },

    #[error("Line {line} checksum mismatch: computed {computed}, found '{found}'")]
    ChecksumMismatch { line: u8, computed: u8, found: char },

    #[error("Catalog number mismatch between lines: '{line1}' vs '{line2}'")]
    CatalogNumberMismatch { line1: String, line2: String },

    #[error("Invalid {field} field: '{value}'")]
    InvalidField { field: &'static str, value: String },

    #[error("Invalid epoch: {0}")]
    InvalidEpoch(#[from] TimeError),

    #[error("Invalid orbital elements: {0}")]
    InvalidElements(#[from] ElementsError),
}

/// Raw element-set record: a name and the two element lines
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tle {
    pub name: String,
    pub line1: String,
    pub line2: String,
}

impl Tle {
    /// Build a record from its three lines
    ///
    /// Surrounding whitespace is trimmed from every line, and the `"0 "` prefix
    /// used by the three-line (3LE) format is stripped from the name.
    pub fn new(name: &str, line1: &str, line2: &str) -> Self {
        let name = name.trim();
        let name = name.strip_prefix("0 ").unwrap_or(name).trim();
        Self {
            name: name.to_string(),
            line1: line1.trim().to_string(),
            line2: line2.trim().to_string(),
        }
    }

    /// Check the record's structure without interpreting its fields
    pub fn validate(&self) -> Result<(), TleError> {
        for (number, line) in [(1u8, &self.line1), (2u8, &self.line2)] {
            validate_line(number, line)?;
        }

        let id1 = self.line1[line1::CATALOG_NUMBER].trim();
        let id2 = self.line2[line2::CATALOG_NUMBER].trim();
        if id1 != id2 {
            return Err(TleError::CatalogNumberMismatch {
                line1: id1.to_string(),
                line2: id2.to_string(),
            });
        }
        Ok(())
    }

    /// Validate the record and interpret every field
    pub fn parse(&self) -> Result<Satellite, TleError> {
        self.validate()?;
        let l1 = self.line1.as_str();
        let l2 = self.line2.as_str();

        let catalog = catalog_number(
            column(l1, line1::CATALOG_NUMBER, "catalog_number")?,
            "catalog_number",
        )?;
        let classification = l1.as_bytes()[line1::CLASSIFICATION] as char;
        let designator = column(l1, line1::DESIGNATOR, "international_designator")?
            .trim()
            .to_string();

        let year_text = column(l1, line1::EPOCH_YEAR, "epoch_year")?;
        if !year_text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TleError::InvalidField {
                field: "epoch_year",
                value: year_text.to_string(),
            });
        }
        let year = time::full_year(unsigned(year_text, "epoch_year")?);
        let day = decimal(column(l1, line1::EPOCH_DAY, "epoch_day")?, "epoch_day")?;
        let epoch_jd = time::epoch_to_jd(year, day)?;

        let mean_motion_dot = decimal(
            column(l1, line1::MEAN_MOTION_DOT, "mean_motion_dot")?,
            "mean_motion_dot",
        )?;
        let mean_motion_ddot = assumed_decimal(
            column(l1, line1::MEAN_MOTION_DDOT, "mean_motion_ddot")?,
            "mean_motion_ddot",
        )?;
        let bstar = assumed_decimal(column(l1, line1::BSTAR, "bstar")?, "bstar")?;
        let ephemeris_type = match l1.as_bytes()[line1::EPHEMERIS_TYPE] {
            b' ' => 0,
            b @ b'0'..=b'9' => b - b'0',
            other => {
                return Err(TleError::InvalidField {
                    field: "ephemeris_type",
                    value: (other as char).to_string(),
                })
            }
        };
        let element_set_number = unsigned(
            column(l1, line1::ELEMENT_SET_NUMBER, "element_set_number")?,
            "element_set_number",
        )?;

        let inclination = decimal(column(l2, line2::INCLINATION, "inclination")?, "inclination")?;
        let raan = decimal(column(l2, line2::RAAN, "raan")?, "raan")?;
        let eccentricity = implied_fraction(
            column(l2, line2::ECCENTRICITY, "eccentricity")?,
            "eccentricity",
        )?;
        let argument_of_perigee = decimal(
            column(l2, line2::ARGUMENT_OF_PERIGEE, "argument_of_perigee")?,
            "argument_of_perigee",
        )?;
        let mean_anomaly = decimal(column(l2, line2::MEAN_ANOMALY, "mean_anomaly")?, "mean_anomaly")?;
        let mean_motion = decimal(column(l2, line2::MEAN_MOTION, "mean_motion")?, "mean_motion")?;
        let revolution_number = unsigned(
            column(l2, line2::REVOLUTION_NUMBER, "revolution_number")?,
            "revolution_number",
        )?;

        let elements = OrbitalElements::new(
            epoch_jd,
            inclination * DEG2RAD,
            raan * DEG2RAD,
            eccentricity,
            argument_of_perigee * DEG2RAD,
            mean_anomaly * DEG2RAD,
            mean_motion,
            bstar,
        )?;

        let name = if self.name.is_empty() {
            catalog.to_string()
        } else {
            self.name.clone()
        };

        Ok(Satellite {
            name,
            catalog_number: catalog,
            classification,
            international_designator: designator,
            element_set_number,
            revolution_number,
            ephemeris_type,
            mean_motion_dot,
            mean_motion_ddot,
            elements,
            tle: self.clone(),
        })
    }
}

impl fmt::Display for Tle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.name.is_empty() {
            writeln!(f, "{}", self.name)?;
        }
        writeln!(f, "{}", self.line1)?;
        write!(f, "{}", self.line2)
    }
}

fn validate_line(number: u8, line: &str) -> Result<(), TleError> {
    if !line.is_ascii() {
        return Err(TleError::NonAscii { line: number });
    }
    if line.len() < LINE_LENGTH {
        return Err(TleError::LineTooShort {
            line: number,
            length: line.len(),
        });
    }
    let bytes = line.as_bytes();
    if bytes[0] != b'0' + number || bytes[1] != b' ' {
        return Err(TleError::MissingLineNumber { line: number });
    }

    let computed = checksum(line);
    let found = bytes[CHECKSUM_SPAN] as char;
    if found.to_digit(10) != Some(computed as u32) {
        return Err(TleError::ChecksumMismatch {
            line: number,
            computed,
            found,
        });
    }
    Ok(())
}

/// Parse a single record given its name and two element lines
pub fn parse_tle(name: &str, line1: &str, line2: &str) -> Result<Satellite, TleError> {
    Tle::new(name, line1, line2).parse()
}

/// A record that failed to parse, with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct TleRejection {
    /// One-based line number of the record's first line in the input text
    pub line_number: usize,
    /// Name line of the record, empty for two-line records
    pub name: String,
    /// Why the record was rejected
    pub error: TleError,
}

/// Outcome of parsing a block of element-set text
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    /// Records that parsed cleanly, in input order
    pub satellites: Vec<Satellite>,
    /// Records that were rejected
    pub rejected: Vec<TleRejection>,
    /// Number of non-blank lines in the input
    pub total_lines: usize,
}

impl ParseReport {
    /// Number of records that parsed cleanly
    pub fn valid_count(&self) -> usize {
        self.satellites.len()
    }

    /// Number of records that were rejected
    pub fn invalid_count(&self) -> usize {
        self.rejected.len()
    }
}

/// Split element-set text into raw records
///
/// A name line followed by lines starting `"1 "` and `"2 "` forms a
/// three-line record. A bare `"1 "`/`"2 "` pair forms a two-line record.
/// A `"1 "` line with no `"2 "` line after it is rejected with
/// [`TleError::MissingLineNumber`], together with its name line if it has
/// one. Other lines that fit no pattern are skipped one at a time.
///
/// Returns each record with the one-based line number it starts on, the
/// structural rejections, and the number of non-blank lines.
pub fn split_records(text: &str) -> (Vec<(usize, Tle)>, Vec<TleRejection>, usize) {
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
        .collect();

    let is_line = |idx: usize, prefix: &str| {
        lines
            .get(idx)
            .map(|(_, l)| l.starts_with(prefix))
            .unwrap_or(false)
    };
    let is_element_line = |idx: usize| is_line(idx, "1 ") || is_line(idx, "2 ");
    let missing_line2 = |line_number: usize, name: &str| TleRejection {
        line_number,
        name: name.strip_prefix("0 ").unwrap_or(name).trim().to_string(),
        error: TleError::MissingLineNumber { line: 2 },
    };

    let mut records = Vec::new();
    let mut rejected = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let (line_number, line) = lines[i];
        if is_line(i, "1 ") {
            if is_line(i + 1, "2 ") {
                records.push((line_number, Tle::new("", line, lines[i + 1].1)));
                i += 2;
            } else {
                rejected.push(missing_line2(line_number, ""));
                i += 1;
            }
        } else if !is_element_line(i) && is_line(i + 1, "1 ") {
            if is_line(i + 2, "2 ") {
                records.push((line_number, Tle::new(line, lines[i + 1].1, lines[i + 2].1)));
                i += 3;
            } else {
                rejected.push(missing_line2(line_number, line));
                i += 2;
            }
        } else {
            i += 1;
        }
    }
    (records, rejected, lines.len())
}

/// Parse a block of element-set text, collecting rejections instead of failing
pub fn parse_tle_text(text: &str) -> ParseReport {
    let (records, rejected, total_lines) = split_records(text);
    let mut report = ParseReport {
        total_lines,
        rejected,
        ..ParseReport::default()
    };

    for (line_number, tle) in records {
        match tle.parse() {
            Ok(sat) => report.satellites.push(sat),
            Err(error) => report.rejected.push(TleRejection {
                line_number,
                name: tle.name,
                error,
            }),
        }
    }

    report.rejected.sort_by_key(|r| r.line_number);
    for r in report.rejected.iter().take(LOGGED_REJECTIONS) {
        debug!(
            "Rejected element set '{}' at line {}: {}",
            r.name, r.line_number, r.error
        );
    }
    report
}
