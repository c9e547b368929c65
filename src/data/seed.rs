//! Seed element sets
//!
//! A small baseline catalog is compiled into the crate so a tracker is usable
//! with no network and no cache. A seed directory may add more categories:
//! every `<category>.tle` or gzipped `<category>.tle.gz` file in it is read,
//! and a directory file replaces the bundled text of the same category.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use log::{debug, warn};

const BUNDLED: &[(&str, &str)] = &[
    ("active", include_str!("../../data/seed/active.tle")),
    ("debris", include_str!("../../data/seed/debris.tle")),
    ("starlink", include_str!("../../data/seed/starlink.tle")),
    ("stations", include_str!("../../data/seed/stations.tle")),
];

/// Seed text compiled into the crate, by category
pub fn bundled_seed() -> BTreeMap<String, String> {
    BUNDLED
        .iter()
        .map(|(category, text)| (category.to_string(), text.to_string()))
        .collect()
}

/// Category name for a seed file, `None` for files that are not seeds
fn seed_category(path: &Path) -> Option<(String, bool)> {
    let name = path.file_name()?.to_str()?;
    if let Some(stem) = name.strip_suffix(".tle.gz") {
        Some((stem.to_string(), true))
    } else {
        name.strip_suffix(".tle").map(|stem| (stem.to_string(), false))
    }
}

fn read_seed_file(path: &Path, gzipped: bool) -> io::Result<String> {
    let mut text = String::new();
    if gzipped {
        GzDecoder::new(File::open(path)?).read_to_string(&mut text)?;
    } else {
        File::open(path)?.read_to_string(&mut text)?;
    }
    Ok(text)
}

/// Read every seed file in `dir`
///
/// Files that cannot be read or decompressed are skipped with a warning;
/// only a missing or unreadable directory is an error.
pub fn load_seed_dir<P: AsRef<Path>>(dir: P) -> io::Result<BTreeMap<String, String>> {
    let mut texts = BTreeMap::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        let Some((category, gzipped)) = seed_category(&path) else {
            continue;
        };
        match read_seed_file(&path, gzipped) {
            Ok(text) => {
                debug!("Loaded seed category {} from {}", category, path.display());
                texts.insert(category, text);
            }
            Err(e) => warn!("Skipping seed file {}: {}", path.display(), e),
        }
    }
    Ok(texts)
}

/// Bundled seed (if enabled) overlaid with the seed directory (if any)
pub fn load_seed(use_bundled: bool, dir: Option<&Path>) -> BTreeMap<String, String> {
    let mut texts = if use_bundled {
        bundled_seed()
    } else {
        BTreeMap::new()
    };
    if let Some(dir) = dir {
        match load_seed_dir(dir) {
            Ok(extra) => texts.extend(extra),
            Err(e) => warn!("Cannot read seed directory {}: {}", dir.display(), e),
        }
    }
    texts
}
