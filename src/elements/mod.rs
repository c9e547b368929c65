//! Mean orbital elements
//!
//! `OrbitalElements` holds the six classical elements plus the BSTAR drag term
//! in normalized units: radians for angles, revolutions per day for mean
//! motion and a Julian date for the epoch. Derived quantities are computed on
//! demand so they can never drift out of sync with the stored elements.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::constants::{DEEP_SPACE_PERIOD_MIN, EARTH_RADIUS_KM, MINUTES_PER_DAY, TAU, XKE};
use crate::time::{self, TimeError};

/// Error type for element invariant violations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ElementsError {
    #[error("Eccentricity {0} is outside [0, 1)")]
    EccentricityOutOfRange(f64),

    #[error("Mean motion {0} rev/day must be positive")]
    NonPositiveMeanMotion(f64),

    #[error("Element {0} is not a finite number")]
    NonFinite(&'static str),
}

/// Immutable set of mean orbital elements at an epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitalElements {
    epoch_jd: f64,
    inclination: f64,
    raan: f64,
    eccentricity: f64,
    argument_of_perigee: f64,
    mean_anomaly: f64,
    mean_motion: f64,
    bstar: f64,
}

impl OrbitalElements {
    /// Create a new element set, checking its invariants
    ///
    /// # Arguments
    /// * `epoch_jd` - Epoch as a Julian date (UTC)
    /// * `inclination` - Inclination in radians
    /// * `raan` - Right ascension of the ascending node in radians
    /// * `eccentricity` - Eccentricity, in `[0, 1)`
    /// * `argument_of_perigee` - Argument of perigee in radians
    /// * `mean_anomaly` - Mean anomaly in radians
    /// * `mean_motion` - Mean motion in revolutions per day, strictly positive
    /// * `bstar` - BSTAR drag term in inverse earth radii
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        epoch_jd: f64,
        inclination: f64,
        raan: f64,
        eccentricity: f64,
        argument_of_perigee: f64,
        mean_anomaly: f64,
        mean_motion: f64,
        bstar: f64,
    ) -> Result<Self, ElementsError> {
        let named = [
            ("epoch", epoch_jd),
            ("inclination", inclination),
            ("raan", raan),
            ("eccentricity", eccentricity),
            ("argument_of_perigee", argument_of_perigee),
            ("mean_anomaly", mean_anomaly),
            ("mean_motion", mean_motion),
            ("bstar", bstar),
        ];
        if let Some((name, _)) = named.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ElementsError::NonFinite(name));
        }
        if !(0.0..1.0).contains(&eccentricity) {
            return Err(ElementsError::EccentricityOutOfRange(eccentricity));
        }
        if mean_motion <= 0.0 {
            return Err(ElementsError::NonPositiveMeanMotion(mean_motion));
        }

        Ok(Self {
            epoch_jd,
            inclination,
            raan,
            eccentricity,
            argument_of_perigee,
            mean_anomaly,
            mean_motion,
            bstar,
        })
    }

    /// Get the epoch as a Julian date
    pub fn epoch_jd(&self) -> f64 {
        self.epoch_jd
    }

    /// Get the inclination in radians
    pub fn inclination(&self) -> f64 {
        self.inclination
    }

    /// Get the right ascension of the ascending node in radians
    pub fn raan(&self) -> f64 {
        self.raan
    }

    /// Get the eccentricity
    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }

    /// Get the argument of perigee in radians
    pub fn argument_of_perigee(&self) -> f64 {
        self.argument_of_perigee
    }

    /// Get the mean anomaly at epoch in radians
    pub fn mean_anomaly(&self) -> f64 {
        self.mean_anomaly
    }

    /// Get the mean motion in revolutions per day
    pub fn mean_motion(&self) -> f64 {
        self.mean_motion
    }

    /// Get the BSTAR drag term
    pub fn bstar(&self) -> f64 {
        self.bstar
    }

    /// Mean motion in radians per minute
    pub fn mean_motion_rad_per_min(&self) -> f64 {
        self.mean_motion * TAU / MINUTES_PER_DAY
    }

    /// Orbital period in minutes
    pub fn period_minutes(&self) -> f64 {
        TAU / self.mean_motion_rad_per_min()
    }

    /// Whether the deep-space (SDP4) model applies
    ///
    /// An orbit of exactly 225 minutes is treated as deep space.
    pub fn is_deep_space(&self) -> bool {
        self.period_minutes() >= DEEP_SPACE_PERIOD_MIN
    }

    /// Keplerian semi-major axis in earth radii
    pub fn semi_major_axis_er(&self) -> f64 {
        (XKE / self.mean_motion_rad_per_min()).powf(2.0 / 3.0)
    }

    /// Keplerian semi-major axis in kilometers
    pub fn semi_major_axis_km(&self) -> f64 {
        self.semi_major_axis_er() * EARTH_RADIUS_KM
    }

    /// Perigee height above the equatorial radius in kilometers
    pub fn perigee_altitude_km(&self) -> f64 {
        self.semi_major_axis_km() * (1.0 - self.eccentricity) - EARTH_RADIUS_KM
    }

    /// Apogee height above the equatorial radius in kilometers
    pub fn apogee_altitude_km(&self) -> f64 {
        self.semi_major_axis_km() * (1.0 + self.eccentricity) - EARTH_RADIUS_KM
    }

    /// Two-body mean anomaly `minutes` after epoch, wrapped to `[0, 2pi)`
    pub fn mean_anomaly_at(&self, minutes: f64) -> f64 {
        (self.mean_anomaly + self.mean_motion_rad_per_min() * minutes).rem_euclid(TAU)
    }

    /// Epoch as a UTC calendar time
    pub fn epoch_datetime(&self) -> Result<DateTime<Utc>, TimeError> {
        time::jd_to_datetime(self.epoch_jd)
    }
}
