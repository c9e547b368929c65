//! Satellite catalog entries
//!
//! A `Satellite` is what the element-set parser produces: the mean elements
//! plus the identity and bookkeeping fields carried on the two lines, and the
//! raw record for re-validation. Entries are never edited in place; a catalog
//! refresh replaces them wholesale.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::elements::OrbitalElements;
use crate::query::presentation;
use crate::time::full_year;
use crate::tle::Tle;

lazy_static! {
    /// Launch year, launch number of the year, piece letters
    static ref DESIGNATOR_PATTERN: Regex = Regex::new(r"^(\d{2})(\d{3})([A-Z]{1,3})$").unwrap();

    /// Whole-word name tokens that mark fragments and launch leftovers
    ///
    /// Matching is on case-insensitive word boundaries, with `DEB` as the usual
    /// catalog abbreviation. Plain substring matching is avoided on purpose so
    /// names such as `CAPSTONE` or `LENSAT` are not taken for debris.
    static ref DEBRIS_PATTERN: Regex = Regex::new(
        r"(?i)\b(DEB|DEBRIS|FRAGMENTS?|SLAG|SHROUDS?|BOLTS?|CAPS?|CLAMPS?|LENS)\b"
    )
    .unwrap();

    static ref ROCKET_BODY_PATTERN: Regex = Regex::new(r"(?i)\bR/B\b").unwrap();
}

/// Country code used when the designator is too short to carry one
pub const UNKNOWN_COUNTRY: &str = "UNK";

/// Broad classification of a tracked object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Payload,
    RocketBody,
    Debris,
}

impl ObjectType {
    /// Short display label
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Payload => "payload",
            ObjectType::RocketBody => "rocket body",
            ObjectType::Debris => "debris",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded COSPAR international designator, e.g. `98067A`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternationalDesignator {
    /// Four-digit launch year
    pub launch_year: i32,
    /// Launch number within the year
    pub launch_number: u32,
    /// Piece of the launch (`A` is usually the primary payload)
    pub piece: String,
}

impl InternationalDesignator {
    /// Decode a designator as it appears in columns 10-17 of line 1
    pub fn parse(text: &str) -> Option<Self> {
        let caps = DESIGNATOR_PATTERN.captures(text.trim())?;
        let year: u32 = caps[1].parse().ok()?;
        let launch_number: u32 = caps[2].parse().ok()?;
        Some(Self {
            launch_year: full_year(year),
            launch_number,
            piece: caps[3].to_string(),
        })
    }
}

/// A tracked object with its elements and catalog metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Satellite {
    /// Common name, from the name line or the catalog number
    pub name: String,
    /// NORAD catalog number (Alpha-5 ids decoded to 100000+)
    pub catalog_number: u32,
    /// Security classification character, normally `U`
    pub classification: char,
    /// International designator with padding removed
    pub international_designator: String,
    /// Element set number
    pub element_set_number: u32,
    /// Revolution number at epoch
    pub revolution_number: u32,
    /// Ephemeris type, zero for published sets
    pub ephemeris_type: u8,
    /// First derivative of mean motion divided by two, rev/day^2
    pub mean_motion_dot: f64,
    /// Second derivative of mean motion divided by six, rev/day^3
    pub mean_motion_ddot: f64,
    /// Mean elements at epoch
    pub elements: OrbitalElements,
    /// Raw record the entry was parsed from
    pub tle: Tle,
}

impl Satellite {
    /// Catalog identifier used for lookups
    pub fn id(&self) -> u32 {
        self.catalog_number
    }

    /// Two-character country field taken from the front of the designator
    ///
    /// Returns `"UNK"` when the designator is shorter than two characters.
    pub fn country(&self) -> &str {
        self.international_designator
            .get(..2)
            .filter(|code| code.trim().len() == 2)
            .unwrap_or(UNKNOWN_COUNTRY)
    }

    /// Operating organization guessed from the country field
    pub fn organization(&self) -> &'static str {
        presentation::organization_for(self.country())
    }

    /// Object type guessed from the name
    pub fn object_type(&self) -> ObjectType {
        if ROCKET_BODY_PATTERN.is_match(&self.name) {
            ObjectType::RocketBody
        } else if DEBRIS_PATTERN.is_match(&self.name) {
            ObjectType::Debris
        } else {
            ObjectType::Payload
        }
    }

    /// Whether the name marks this object as debris
    pub fn is_debris(&self) -> bool {
        self.object_type() == ObjectType::Debris
    }

    /// Decoded international designator, if it is well formed
    pub fn designator(&self) -> Option<InternationalDesignator> {
        InternationalDesignator::parse(&self.international_designator)
    }
}

impl fmt::Display for Satellite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.catalog_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tle::parse_tle;
    use rstest::rstest;

    fn with_name(name: &str) -> Satellite {
        let mut sat = parse_tle(
            "ISS (ZARYA)",
            "1 25544U 98067A   24001.50000000  .00016717  00000-0  30000-3 0  9990",
            "2 25544  51.6400 200.0000 0006000  50.0000 310.0000 15.50000000432106",
        )
        .unwrap();
        sat.name = name.to_string();
        sat
    }

    #[rstest]
    #[case("ISS (ZARYA)", ObjectType::Payload)]
    #[case("COSMOS 2251 DEB", ObjectType::Debris)]
    #[case("FENGYUN 1C debris", ObjectType::Debris)]
    #[case("DELTA 1 FRAGMENT", ObjectType::Debris)]
    #[case("ARIANE 5 SHROUD", ObjectType::Debris)]
    #[case("SL-16 R/B", ObjectType::RocketBody)]
    #[case("CAPELLA-11", ObjectType::Payload)]
    #[case("CAPSTONE", ObjectType::Payload)]
    #[case("LENSAT", ObjectType::Payload)]
    #[case("DEBUT", ObjectType::Payload)]
    fn test_object_type(#[case] name: &str, #[case] expected: ObjectType) {
        let sat = with_name(name);
        assert_eq!(sat.object_type(), expected);
        assert_eq!(sat.is_debris(), expected == ObjectType::Debris);
    }

    #[test]
    fn test_country_from_designator() {
        let mut sat = with_name("ISS (ZARYA)");
        assert_eq!(sat.country(), "98");
        assert_eq!(sat.organization(), "Private/Other");

        sat.international_designator = "A".to_string();
        assert_eq!(sat.country(), UNKNOWN_COUNTRY);

        sat.international_designator = String::new();
        assert_eq!(sat.country(), UNKNOWN_COUNTRY);
    }

    #[test]
    fn test_designator_decoding() {
        let sat = with_name("ISS (ZARYA)");
        let designator = sat.designator().unwrap();
        assert_eq!(designator.launch_year, 1998);
        assert_eq!(designator.launch_number, 67);
        assert_eq!(designator.piece, "A");

        let fengyun = InternationalDesignator::parse("99025AUF").unwrap();
        assert_eq!(fengyun.launch_year, 1999);
        assert_eq!(fengyun.launch_number, 25);
        assert_eq!(fengyun.piece, "AUF");

        assert_eq!(InternationalDesignator::parse("21035A").unwrap().launch_year, 2021);
        assert!(InternationalDesignator::parse("").is_none());
        assert!(InternationalDesignator::parse("9806A").is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(with_name("ISS (ZARYA)").to_string(), "ISS (ZARYA) (25544)");
    }
}
