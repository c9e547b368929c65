//! Constants module for orbital calculations
//!
//! Gravity constants follow the WGS-72 model, which is the model the published
//! element sets are fitted against. Using WGS-84 values here would degrade
//! accuracy rather than improve it.

use std::f64::consts::PI;

// Earth model (WGS-72)
/// Earth's equatorial radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6378.135;
/// Gravitational parameter in km^3/s^2
pub const MU_KM3_S2: f64 = 398_600.8;
/// sqrt(GM) in earth-radii^1.5 per minute
pub const XKE: f64 = 0.074_366_916_133_173_4;
/// Time units per minute (1 / XKE)
pub const TUMIN: f64 = 1.0 / XKE;
/// Second zonal harmonic (oblateness)
pub const J2: f64 = 0.001_082_616;
/// Third zonal harmonic
pub const J3: f64 = -0.000_002_538_81;
/// Fourth zonal harmonic
pub const J4: f64 = -0.000_001_655_97;
/// J3 / J2
pub const J3OJ2: f64 = J3 / J2;

// Time constants
/// Minutes in a day
pub const MINUTES_PER_DAY: f64 = 1440.0;
/// Seconds in a day
pub const DAY_S: f64 = 86_400.0;
/// J2000.0 epoch as Julian date
pub const J2000: f64 = 2_451_545.0;
/// Julian date of 1949 December 31 00:00 UT, the SGP4 "days since 1950" origin
pub const JD_1950: f64 = 2_433_281.5;
/// Julian date of the Unix epoch (1970-01-01T00:00:00Z)
pub const JD_UNIX_EPOCH: f64 = 2_440_587.5;

// Angles
/// Degrees to radians conversion factor
pub const DEG2RAD: f64 = PI / 180.0;
/// Radians to degrees conversion factor
pub const RAD2DEG: f64 = 180.0 / PI;
/// Tau (2*PI) for full circle
pub const TAU: f64 = 2.0 * PI;

// Orbit classification
/// Orbital period (minutes) at and above which the deep-space model applies
pub const DEEP_SPACE_PERIOD_MIN: f64 = 225.0;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_xke_matches_gravitational_parameter() {
        // xke = 60 / sqrt(R^3 / mu)
        let derived = 60.0 / (EARTH_RADIUS_KM.powi(3) / MU_KM3_S2).sqrt();
        assert_relative_eq!(XKE, derived, max_relative = 1e-12);
    }
}
