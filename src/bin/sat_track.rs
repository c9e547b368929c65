//! Satellite catalog and propagation tool
//!
//! Lists the catalog, shows one satellite, propagates a satellite over a time
//! span, or forces a refresh from the network.
//!
//! Usage:
//!   cargo run --bin sat_track -- list --category stations
//!   cargo run --bin sat_track -- propagate 25544 --span 90 --step 10
//!   RUST_LOG=debug cargo run --bin sat_track -- refresh

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use clap::{ArgAction, Parser, Subcommand};
use log::info;

use satfield::constants::RAD2DEG;
use satfield::data::{FetchReport, LoadSource, RefreshOutcome};
use satfield::{CatalogConfig, CatalogManager, Satellite, SatelliteTracker};

/// Type alias for the error type used throughout this module
type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Satellite catalog and propagation tool
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Browse the satellite catalog and propagate element sets",
    long_about = None
)]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Never contact the network, even when no cache or seed data exists
    #[arg(long, action = ArgAction::SetTrue)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List catalog entries
    List {
        /// Only satellites in this category
        #[arg(long)]
        category: Option<String>,

        /// Only satellites whose name contains this text
        #[arg(long)]
        name: Option<String>,

        /// Only debris
        #[arg(long, action = ArgAction::SetTrue)]
        debris: bool,

        /// Maximum number of rows
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show elements, metadata and current position of one satellite
    Show {
        /// NORAD catalog number
        id: u32,
    },

    /// Propagate one satellite and print a position table
    Propagate {
        /// NORAD catalog number
        id: u32,

        /// Span to cover in minutes
        #[arg(long, default_value = "90")]
        span: f64,

        /// Step between rows in minutes
        #[arg(long, default_value = "10")]
        step: f64,

        /// Start at the element-set epoch instead of now
        #[arg(long, action = ArgAction::SetTrue)]
        from_epoch: bool,
    },

    /// Fetch fresh element sets and rewrite the cache
    Refresh {
        /// Only these categories (default: all sources)
        #[arg(long = "category")]
        categories: Vec<String>,
    },
}

fn load_config(args: &Args) -> Result<CatalogConfig> {
    let mut config = match &args.config {
        Some(path) => CatalogConfig::from_json_file(path)?,
        None => CatalogConfig::default(),
    };
    if let Some(dir) = &args.cache_dir {
        config = config.with_cache_dir(dir);
    }
    Ok(config)
}

/// Prints a section header with a title and separator line
fn print_section_header(title: &str) {
    println!("\n{}:", title);
    println!("-------------------------------------------------------");
}

fn print_report(report: &FetchReport) {
    print_section_header("Sources");
    for stats in report.succeeded() {
        println!(
            "{:<12} {:>6} valid {:>4} invalid {:>7} lines  {:.2?}",
            stats.category, stats.valid, stats.invalid, stats.total_lines, stats.duration
        );
    }
    for (source, error) in report.failed() {
        println!("{:<12} FAILED: {}", source.category, error);
    }
    println!("Total element sets: {}", report.total_satellite_count());
}

fn list(
    tracker: &SatelliteTracker<Arc<CatalogManager>>,
    category: Option<&str>,
    name: Option<&str>,
    debris: bool,
    limit: usize,
) {
    let catalog = tracker.catalog();
    let mut satellites: Vec<&Satellite> = match (category, name) {
        (Some(category), _) => catalog.in_category(category),
        (None, Some(name)) => catalog.find_by_name(name),
        (None, None) => catalog.iter().collect(),
    };
    if let (Some(_), Some(name)) = (category, name) {
        let name = name.to_lowercase();
        satellites.retain(|sat| sat.name.to_lowercase().contains(&name));
    }
    if debris {
        satellites.retain(|sat| sat.is_debris());
    }

    println!(
        "{:>7}  {:<28} {:<4} {:<24} {}",
        "ID", "NAME", "CTRY", "ORGANIZATION", "TYPE"
    );
    for sat in satellites.iter().take(limit) {
        println!(
            "{:>7}  {:<28} {:<4} {:<24} {}",
            sat.id(),
            sat.name,
            sat.country(),
            sat.organization(),
            sat.object_type().as_str()
        );
    }
    println!("\n{} of {} shown", satellites.len().min(limit), satellites.len());
}

fn show(tracker: &SatelliteTracker<Arc<CatalogManager>>, id: u32) -> Result<()> {
    let summary = tracker.summary(id)?;
    let catalog = tracker.catalog();
    let sat = catalog
        .get(id)
        .ok_or(satfield::query::QueryError::UnknownSatellite(id))?;
    let el = &sat.elements;

    print_section_header(&format!("{} ({})", summary.name, summary.id));
    println!("Designator:     {}", sat.international_designator);
    println!("Country:        {}", summary.country);
    println!("Organization:   {}", summary.organization);
    println!("Object type:    {}", summary.object_type);
    println!("Categories:     {}", catalog.categories_of(id).join(", "));

    print_section_header("Elements");
    println!("Epoch:          {}", el.epoch_datetime()?.to_rfc3339());
    println!("Inclination:    {:.4} deg", el.inclination() * RAD2DEG);
    println!("RAAN:           {:.4} deg", el.raan() * RAD2DEG);
    println!("Eccentricity:   {:.7}", el.eccentricity());
    println!("Arg of perigee: {:.4} deg", el.argument_of_perigee() * RAD2DEG);
    println!("Mean anomaly:   {:.4} deg", el.mean_anomaly() * RAD2DEG);
    println!("Mean motion:    {:.8} rev/day", el.mean_motion());
    println!("BSTAR:          {:.4e}", el.bstar());
    println!(
        "Period:         {:.2} min ({})",
        el.period_minutes(),
        if el.is_deep_space() { "SDP4" } else { "SGP4" }
    );
    println!(
        "Perigee/apogee: {:.1} / {:.1} km",
        el.perigee_altitude_km(),
        el.apogee_altitude_km()
    );

    print_section_header("Now");
    let result = tracker.position_at(id, &Utc::now())?;
    match &result.error {
        None => {
            let p = result.position;
            println!("Position TEME:  [{:.3}, {:.3}, {:.3}] km", p.x, p.y, p.z);
            println!("Altitude:       {:.1} km", result.altitude_km());
            println!("Speed:          {:.4} km/s", result.speed_km_s());
        }
        Some(error) => println!("Propagation failed: {}", error),
    }
    Ok(())
}

fn propagate(
    tracker: &SatelliteTracker<Arc<CatalogManager>>,
    id: u32,
    span: f64,
    step: f64,
    from_epoch: bool,
) -> Result<()> {
    if step.is_nan() || step <= 0.0 {
        return Err("--step must be positive".into());
    }
    let catalog = tracker.catalog();
    let sat = catalog
        .get(id)
        .ok_or(satfield::query::QueryError::UnknownSatellite(id))?;
    let start: DateTime<Utc> = if from_epoch {
        sat.elements.epoch_datetime()?
    } else {
        Utc::now()
    };

    print_section_header(&format!("{} from {}", sat.name, start.to_rfc3339()));
    println!(
        "{:>9} {:>12} {:>12} {:>12} {:>10} {:>8}",
        "MIN", "X (km)", "Y (km)", "Z (km)", "ALT (km)", "V (km/s)"
    );

    let steps = (span / step).floor() as usize;
    for i in 0..=steps {
        let minutes = i as f64 * step;
        let at = start + ChronoDuration::milliseconds((minutes * 60_000.0).round() as i64);
        let result = tracker.position_at(id, &at)?;
        match &result.error {
            None => println!(
                "{:>9.1} {:>12.3} {:>12.3} {:>12.3} {:>10.1} {:>8.4}",
                minutes,
                result.position.x,
                result.position.y,
                result.position.z,
                result.altitude_km(),
                result.speed_km_s()
            ),
            Some(error) => println!("{:>9.1} {}", minutes, error),
        }
    }
    Ok(())
}

fn refresh(manager: &CatalogManager, categories: &[String]) -> Result<()> {
    let outcome = if categories.is_empty() {
        manager.refresh_now()?
    } else {
        let categories: Vec<&str> = categories.iter().map(String::as_str).collect();
        manager.refresh_categories(&categories)?
    };
    match outcome {
        RefreshOutcome::Completed(report) => {
            print_report(&report);
            println!(
                "Catalog now holds {} satellites; cache written to {}",
                manager.snapshot().len(),
                manager.cache().path().display()
            );
        }
        RefreshOutcome::AlreadyRunning => println!("A refresh is already running"),
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let config = load_config(&args)?;
    let manager = Arc::new(CatalogManager::new(config)?);

    if let Command::Refresh { categories } = &args.command {
        return refresh(&manager, categories);
    }

    let source = manager.load_initial();
    info!("Startup catalog from {:?}", source);
    if source == LoadSource::Empty && !args.offline {
        println!("No cached or seed data; fetching element sets...");
        manager.refresh_now()?;
    }

    let tracker = SatelliteTracker::with_config(Arc::clone(&manager), manager.config());
    match args.command {
        Command::List {
            category,
            name,
            debris,
            limit,
        } => list(&tracker, category.as_deref(), name.as_deref(), debris, limit),
        Command::Show { id } => show(&tracker, id)?,
        Command::Propagate {
            id,
            span,
            step,
            from_epoch,
        } => propagate(&tracker, id, span, step, from_epoch)?,
        Command::Refresh { .. } => {}
    }
    Ok(())
}
