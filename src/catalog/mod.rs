//! Satellite catalog
//!
//! A [`SatelliteCatalog`] is an immutable snapshot of every parsed entry,
//! keyed by catalog number and tagged with the source categories that
//! listed it. The manager builds a fresh catalog on every refresh and swaps
//! it in whole; nothing here is edited after construction.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::satellite::Satellite;
use crate::tle::{parse_tle_text, ParseReport};

/// Immutable collection of satellites merged from one or more categories
#[derive(Debug, Clone, Default)]
pub struct SatelliteCatalog {
    /// Entries by catalog number
    satellites: BTreeMap<u32, Satellite>,
    /// Catalog numbers listed by each category
    categories: BTreeMap<String, BTreeSet<u32>>,
}

impl SatelliteCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse raw element-set text for each category and merge the results
    ///
    /// Returns the catalog together with the parse report of every category
    /// so callers can log or display rejection counts.
    pub fn from_category_texts<'a, I>(texts: I) -> (Self, BTreeMap<String, ParseReport>)
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut catalog = Self::new();
        let mut reports = BTreeMap::new();
        for (category, text) in texts {
            let mut report = parse_tle_text(text);
            let satellites = std::mem::take(&mut report.satellites);
            debug!(
                "Category {}: {} valid, {} rejected",
                category,
                satellites.len(),
                report.invalid_count()
            );
            catalog.add_category(category, satellites);
            reports.insert(category.clone(), report);
        }
        (catalog, reports)
    }

    /// Add a category's satellites
    ///
    /// An object listed more than once keeps the element set with the newest
    /// epoch, but stays a member of every category that listed it.
    pub fn add_category(&mut self, category: &str, satellites: Vec<Satellite>) {
        let members = self.categories.entry(category.to_string()).or_default();
        for sat in satellites {
            members.insert(sat.catalog_number);
            match self.satellites.get(&sat.catalog_number) {
                Some(existing) if existing.elements.epoch_jd() >= sat.elements.epoch_jd() => {}
                _ => {
                    self.satellites.insert(sat.catalog_number, sat);
                }
            }
        }
    }

    /// Look up a satellite by catalog number
    pub fn get(&self, id: u32) -> Option<&Satellite> {
        self.satellites.get(&id)
    }

    /// Whether the catalog holds an entry for `id`
    pub fn contains(&self, id: u32) -> bool {
        self.satellites.contains_key(&id)
    }

    /// All satellites in catalog-number order
    pub fn iter(&self) -> impl Iterator<Item = &Satellite> {
        self.satellites.values()
    }

    /// Number of distinct satellites
    pub fn len(&self) -> usize {
        self.satellites.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }

    /// Names of the categories that contributed entries
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Satellites listed by `category`, empty for unknown categories
    pub fn in_category(&self, category: &str) -> Vec<&Satellite> {
        self.categories
            .get(category)
            .map(|ids| ids.iter().filter_map(|id| self.satellites.get(id)).collect())
            .unwrap_or_default()
    }

    /// Categories that list a given satellite
    pub fn categories_of(&self, id: u32) -> Vec<&str> {
        self.categories
            .iter()
            .filter(|(_, ids)| ids.contains(&id))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Case-insensitive substring search over names
    pub fn find_by_name(&self, query: &str) -> Vec<&Satellite> {
        let needle = query.to_uppercase();
        self.filter(|sat| sat.name.to_uppercase().contains(&needle))
    }

    /// Satellites matching a predicate
    pub fn filter<F>(&self, predicate: F) -> Vec<&Satellite>
    where
        F: Fn(&Satellite) -> bool,
    {
        self.satellites.values().filter(|sat| predicate(sat)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tle::parse_tle;

    const ISS_NAME: &str = "ISS (ZARYA)";
    const ISS_L1: &str = "1 25544U 98067A   24001.50000000  .00016717  00000-0  30000-3 0  9990";
    const ISS_L2: &str = "2 25544  51.6400 200.0000 0006000  50.0000 310.0000 15.50000000432106";
    const ISS_LATER_L1: &str = "1 25544U 98067A   24002.00000000  .00016717  00000-0  30000-3 0  9996";
    const ISS_LATER_L2: &str = "2 25544  51.6400 201.0000 0006000  50.0000 310.0000 15.50000000432264";

    const DEB_TEXT: &str = "\
COSMOS 2251 DEB
1 34427U 93036SX  24001.30000000  .00000500  00000-0  20000-3 0  9991
2 34427  74.0000 250.0000 0030000 100.0000 260.0000 14.40000000800009
FENGYUN 1C DEB
1 29228U 99025AUF 24001.30000000  .00000300  00000-0  12000-3 0  9997
2 29228  98.9000  30.0000 0100000 200.0000 160.0000 14.10000000900009
";

    fn iss() -> Satellite {
        parse_tle(ISS_NAME, ISS_L1, ISS_L2).unwrap()
    }

    fn iss_later() -> Satellite {
        parse_tle(ISS_NAME, ISS_LATER_L1, ISS_LATER_L2).unwrap()
    }

    #[test]
    fn test_newest_epoch_wins() {
        let mut catalog = SatelliteCatalog::new();
        catalog.add_category("active", vec![iss_later()]);
        catalog.add_category("stations", vec![iss()]);

        assert_eq!(catalog.len(), 1);
        let kept = catalog.get(25544).unwrap();
        assert_eq!(kept.elements, iss_later().elements);
        assert_eq!(catalog.categories_of(25544), vec!["active", "stations"]);

        // Same result regardless of insertion order
        let mut reversed = SatelliteCatalog::new();
        reversed.add_category("stations", vec![iss()]);
        reversed.add_category("active", vec![iss_later()]);
        assert_eq!(reversed.get(25544).unwrap().elements, iss_later().elements);
    }

    #[test]
    fn test_from_category_texts() {
        let mut texts = BTreeMap::new();
        texts.insert("debris".to_string(), DEB_TEXT.to_string());
        texts.insert(
            "stations".to_string(),
            format!("{}\n{}\n{}\nnot a record\n", ISS_NAME, ISS_L1, ISS_L2),
        );

        let (catalog, reports) = SatelliteCatalog::from_category_texts(&texts);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.categories().collect::<Vec<_>>(), vec!["debris", "stations"]);
        assert_eq!(reports["debris"].invalid_count(), 0);
        assert_eq!(reports["stations"].total_lines, 4);
        assert!(reports["debris"].satellites.is_empty());

        let debris = catalog.in_category("debris");
        assert_eq!(debris.len(), 2);
        assert!(debris.iter().all(|sat| sat.is_debris()));
        assert!(catalog.in_category("starlink").is_empty());
    }

    #[test]
    fn test_lookups() {
        let mut texts = BTreeMap::new();
        texts.insert("debris".to_string(), DEB_TEXT.to_string());
        let (mut catalog, _) = SatelliteCatalog::from_category_texts(&texts);
        catalog.add_category("stations", vec![iss()]);

        assert!(catalog.contains(25544));
        assert!(catalog.get(1).is_none());
        assert_eq!(catalog.find_by_name("zarya").len(), 1);
        assert_eq!(catalog.find_by_name("deb").len(), 2);
        assert!(catalog.find_by_name("hubble").is_empty());

        let ids: Vec<u32> = catalog.iter().map(|sat| sat.catalog_number).collect();
        assert_eq!(ids, vec![25544, 29228, 34427]);

        let polar = catalog.filter(|sat| sat.elements.inclination().to_degrees() > 90.0);
        assert_eq!(polar.len(), 1);
        assert_eq!(polar[0].name, "FENGYUN 1C DEB");
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = SatelliteCatalog::new();
        assert!(catalog.is_empty());
        assert_eq!(catalog.len(), 0);
        assert_eq!(catalog.categories().count(), 0);
    }
}
