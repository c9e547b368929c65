//! SGP4/SDP4 orbit propagation
//!
//! [`Propagator`] is the compiled form of an element set: construction derives
//! every drag, gravity and (for deep-space orbits) lunar-solar coefficient
//! once, and [`Propagator::propagate`] then evaluates the theory at any time
//! offset without allocating or mutating anything. Output is in the TEME
//! frame, kilometers and kilometers per second.
//!
//! Orbits with a period under 225 minutes use the near-earth SGP4 theory.
//! Longer periods add the SDP4 deep-space terms from [`deep_space`].
//!
//! Propagation failures are reported inside the [`PropagationResult`] rather
//! than as `Err`, because a decayed orbit still carries a meaningful (if
//! sub-surface) position that callers may want to display.

pub mod deep_space;

use std::f64::consts::PI;

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use thiserror::Error;

use crate::constants::{EARTH_RADIUS_KM, J2, J3OJ2, J4, TAU, XKE};
use crate::elements::OrbitalElements;
use crate::time;

pub use deep_space::{Resonance, MAX_RESONANT_MINUTES};
use deep_space::{DeepSpace, DeepSpaceInput, MeanElements};

/// Newton iterations allowed when solving Kepler's equation
const KEPLER_MAX_ITERATIONS: usize = 10;
const KEPLER_TOLERANCE: f64 = 1.0e-12;
/// Largest single Newton step (radians)
const KEPLER_MAX_STEP: f64 = 0.95;

/// Floor applied to the drag-corrected mean eccentricity
const MIN_ECCENTRICITY: f64 = 1.0e-6;
/// Guard used in place of `1 + cos(i)` for retrograde equatorial orbits
const RETROGRADE_GUARD: f64 = 1.5e-12;

/// Perigee height (km) below which the simplified drag model is used
const SIMPLIFIED_PERIGEE_KM: f64 = 220.0;

/// Kilometers per second in one earth radius per minute
const VELOCITY_SCALE: f64 = EARTH_RADIUS_KM * XKE / 60.0;

/// Reason a propagation result should not be trusted
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum PropagationError {
    #[error("Mean eccentricity {0} is outside the valid range")]
    InvalidEccentricity(f64),

    #[error("Mean motion {0} rad/min is not positive")]
    InvalidMeanMotion(f64),

    #[error("Semi-latus rectum {0} is negative")]
    InvalidSemiLatusRectum(f64),

    #[error("Satellite has decayed (orbit radius {0:.4} earth radii)")]
    Decayed(f64),

    #[error("Propagation produced non-finite values")]
    Diverged,

    #[error("Offset of {0} minutes is beyond the resonance integration range")]
    OutOfRange(f64),
}

/// Position and velocity at one instant, with an optional failure tag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagationResult {
    /// Position in kilometers, TEME frame
    pub position: Vector3<f64>,
    /// Velocity in kilometers per second, TEME frame
    pub velocity: Vector3<f64>,
    /// Set when the theory broke down; vectors are zero except for `Decayed`
    pub error: Option<PropagationError>,
}

impl PropagationResult {
    fn failed(error: PropagationError) -> Self {
        Self {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            error: Some(error),
        }
    }

    /// Whether the result carries no error
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Distance from the Earth's center in kilometers
    pub fn radius_km(&self) -> f64 {
        self.position.norm()
    }

    /// Height above the equatorial radius in kilometers
    pub fn altitude_km(&self) -> f64 {
        self.radius_km() - EARTH_RADIUS_KM
    }

    /// Speed in kilometers per second
    pub fn speed_km_s(&self) -> f64 {
        self.velocity.norm()
    }
}

/// An element set compiled for repeated propagation
///
/// Construction is the expensive step; keep the propagator around and call
/// [`propagate`](Self::propagate) as often as needed. The type holds no
/// interior mutability and is `Send + Sync`.
#[derive(Debug, Clone)]
pub struct Propagator {
    elements: OrbitalElements,

    /// Un-Kozai'd mean motion, rad/min
    no: f64,
    /// Skip the higher-order drag terms (low perigee or deep space)
    simplified: bool,

    // Inclination functions
    con41: f64,
    x1mth2: f64,
    x7thm1: f64,

    // Long-period periodic coefficients
    aycof: f64,
    xlcof: f64,

    // Secular rates
    mdot: f64,
    argpdot: f64,
    nodedot: f64,

    // Drag coefficients
    cc1: f64,
    cc4: f64,
    cc5: f64,
    d2: f64,
    d3: f64,
    d4: f64,
    delmo: f64,
    eta: f64,
    omgcof: f64,
    xmcof: f64,
    nodecf: f64,
    sinmao: f64,
    t2cof: f64,
    t3cof: f64,
    t4cof: f64,
    t5cof: f64,

    deep_space: Option<DeepSpace>,
}

impl Propagator {
    /// Derive the propagation coefficients for an element set
    pub fn new(elements: &OrbitalElements) -> Self {
        let ecco = elements.eccentricity();
        let inclo = elements.inclination();
        let argpo = elements.argument_of_perigee();
        let mo = elements.mean_anomaly();
        let bstar = elements.bstar();
        let no_kozai = elements.mean_motion_rad_per_min();

        let eccsq = ecco * ecco;
        let omeosq = 1.0 - eccsq;
        let rteosq = omeosq.sqrt();
        let cosio = inclo.cos();
        let cosio2 = cosio * cosio;
        let sinio = inclo.sin();

        // Recover the original mean motion and semi-major axis from the
        // Kozai mean motion in the element set
        let ak = (XKE / no_kozai).powf(2.0 / 3.0);
        let d1 = 0.75 * J2 * (3.0 * cosio2 - 1.0) / (rteosq * omeosq);
        let del = d1 / (ak * ak);
        let adel = ak * (1.0 - del * del - del * (1.0 / 3.0 + 134.0 * del * del / 81.0));
        let del = d1 / (adel * adel);
        let no = no_kozai / (1.0 + del);

        let ao = (XKE / no).powf(2.0 / 3.0);
        let po = ao * omeosq;
        let posq = po * po;
        let pinvsq = 1.0 / posq;
        let rp = ao * (1.0 - ecco);
        let con42 = 1.0 - 5.0 * cosio2;
        let con41 = -con42 - cosio2 - cosio2;

        // Atmospheric density parameters, adjusted for low perigees
        let perigee_km = (rp - 1.0) * EARTH_RADIUS_KM;
        let mut simplified = rp < SIMPLIFIED_PERIGEE_KM / EARTH_RADIUS_KM + 1.0;
        let (sfour, qzms24) = if perigee_km < 156.0 {
            let s = if perigee_km < 98.0 { 20.0 } else { perigee_km - 78.0 };
            (s / EARTH_RADIUS_KM + 1.0, ((120.0 - s) / EARTH_RADIUS_KM).powi(4))
        } else {
            (78.0 / EARTH_RADIUS_KM + 1.0, ((120.0 - 78.0) / EARTH_RADIUS_KM).powi(4))
        };

        let tsi = 1.0 / (ao - sfour);
        let eta = ao * ecco * tsi;
        let etasq = eta * eta;
        let eeta = ecco * eta;
        let psisq = (1.0 - etasq).abs();
        let coef = qzms24 * tsi.powi(4);
        let coef1 = coef / psisq.powf(3.5);
        let cc2 = coef1
            * no
            * (ao * (1.0 + 1.5 * etasq + eeta * (4.0 + etasq))
                + 0.375 * J2 * tsi / psisq * con41 * (8.0 + 3.0 * etasq * (8.0 + etasq)));
        let cc1 = bstar * cc2;
        let cc3 = if ecco > 1.0e-4 {
            -2.0 * coef * tsi * J3OJ2 * no * sinio / ecco
        } else {
            0.0
        };
        let x1mth2 = 1.0 - cosio2;
        let cc4 = 2.0
            * no
            * coef1
            * ao
            * omeosq
            * (eta * (2.0 + 0.5 * etasq) + ecco * (0.5 + 2.0 * etasq)
                - J2 * tsi / (ao * psisq)
                    * (-3.0 * con41 * (1.0 - 2.0 * eeta + etasq * (1.5 - 0.5 * eeta))
                        + 0.75 * x1mth2 * (2.0 * etasq - eeta * (1.0 + etasq)) * (2.0 * argpo).cos()));
        let cc5 = 2.0 * coef1 * ao * omeosq * (1.0 + 2.75 * (etasq + eeta) + eeta * etasq);

        // Secular gravity rates
        let cosio4 = cosio2 * cosio2;
        let temp1 = 1.5 * J2 * pinvsq * no;
        let temp2 = 0.5 * temp1 * J2 * pinvsq;
        let temp3 = -0.46875 * J4 * pinvsq * pinvsq * no;
        let mdot = no
            + 0.5 * temp1 * rteosq * con41
            + 0.0625 * temp2 * rteosq * (13.0 - 78.0 * cosio2 + 137.0 * cosio4);
        let argpdot = -0.5 * temp1 * con42
            + 0.0625 * temp2 * (7.0 - 114.0 * cosio2 + 395.0 * cosio4)
            + temp3 * (3.0 - 36.0 * cosio2 + 49.0 * cosio4);
        let xhdot1 = -temp1 * cosio;
        let nodedot =
            xhdot1 + (0.5 * temp2 * (4.0 - 19.0 * cosio2) + 2.0 * temp3 * (3.0 - 7.0 * cosio2)) * cosio;

        let omgcof = bstar * cc3 * argpo.cos();
        let xmcof = if ecco > 1.0e-4 {
            -2.0 / 3.0 * coef * bstar / eeta
        } else {
            0.0
        };
        let nodecf = 3.5 * omeosq * xhdot1 * cc1;
        let t2cof = 1.5 * cc1;
        let delmo = (1.0 + eta * mo.cos()).powi(3);

        let deep_space = if elements.is_deep_space() {
            simplified = true;
            Some(DeepSpace::new(&DeepSpaceInput {
                epoch_jd: elements.epoch_jd(),
                elements: MeanElements {
                    eccentricity: ecco,
                    inclination: inclo,
                    node: elements.raan(),
                    argument_of_perigee: argpo,
                    mean_anomaly: mo,
                    mean_motion: no,
                },
                mdot,
                argpdot,
                nodedot,
            }))
        } else {
            None
        };

        let (mut d2, mut d3, mut d4) = (0.0, 0.0, 0.0);
        let (mut t3cof, mut t4cof, mut t5cof) = (0.0, 0.0, 0.0);
        if !simplified {
            let cc1sq = cc1 * cc1;
            d2 = 4.0 * ao * tsi * cc1sq;
            let temp = d2 * tsi * cc1 / 3.0;
            d3 = (17.0 * ao + sfour) * temp;
            d4 = 0.5 * temp * ao * tsi * (221.0 * ao + 31.0 * sfour) * cc1;
            t3cof = d2 + 2.0 * cc1sq;
            t4cof = 0.25 * (3.0 * d3 + cc1 * (12.0 * d2 + 10.0 * cc1sq));
            t5cof = 0.2 * (3.0 * d4 + 12.0 * cc1 * d3 + 6.0 * d2 * d2 + 15.0 * cc1sq * (2.0 * d2 + cc1sq));
        }

        Self {
            elements: *elements,
            no,
            simplified,
            con41,
            x1mth2,
            x7thm1: 7.0 * cosio2 - 1.0,
            aycof: -0.5 * J3OJ2 * sinio,
            xlcof: xlcof_for(sinio, cosio),
            mdot,
            argpdot,
            nodedot,
            cc1,
            cc4,
            cc5,
            d2,
            d3,
            d4,
            delmo,
            eta,
            omgcof,
            xmcof,
            nodecf,
            sinmao: mo.sin(),
            t2cof,
            t3cof,
            t4cof,
            t5cof,
            deep_space,
        }
    }

    /// Get the element set this propagator was compiled from
    pub fn elements(&self) -> &OrbitalElements {
        &self.elements
    }

    /// Whether the deep-space (SDP4) terms are active
    pub fn is_deep_space(&self) -> bool {
        self.deep_space.is_some()
    }

    /// Resonance class of the orbit (always `None` for near-earth orbits)
    pub fn resonance(&self) -> Resonance {
        self.deep_space
            .as_ref()
            .map(DeepSpace::resonance)
            .unwrap_or(Resonance::None)
    }

    /// Propagate to a Julian date
    pub fn propagate_jd(&self, jd: f64) -> PropagationResult {
        self.propagate(time::minutes_between(self.elements.epoch_jd(), jd))
    }

    /// Propagate to a calendar time
    pub fn propagate_at(&self, at: &DateTime<Utc>) -> PropagationResult {
        self.propagate_jd(time::datetime_to_jd(at))
    }

    /// Propagate `tsince` minutes from the element-set epoch
    pub fn propagate(&self, tsince: f64) -> PropagationResult {
        if !tsince.is_finite() {
            return PropagationResult::failed(PropagationError::Diverged);
        }
        if let Some(ds) = &self.deep_space {
            if !ds.in_range(tsince) {
                return PropagationResult::failed(PropagationError::OutOfRange(tsince));
            }
        }
        let t = tsince;
        let el = &self.elements;
        let ecco = el.eccentricity();
        let inclo = el.inclination();
        let argpo = el.argument_of_perigee();
        let bstar = el.bstar();

        // Secular gravity and atmospheric drag
        let xmdf = el.mean_anomaly() + self.mdot * t;
        let argpdf = argpo + self.argpdot * t;
        let nodedf = el.raan() + self.nodedot * t;
        let t2 = t * t;
        let mut argpm = argpdf;
        let mut mm = xmdf;
        let mut nodem = nodedf + self.nodecf * t2;
        let mut tempa = 1.0 - self.cc1 * t;
        let mut tempe = bstar * self.cc4 * t;
        let mut templ = self.t2cof * t2;

        if !self.simplified {
            let delomg = self.omgcof * t;
            let delm = self.xmcof * ((1.0 + self.eta * xmdf.cos()).powi(3) - self.delmo);
            let temp = delomg + delm;
            mm = xmdf + temp;
            argpm = argpdf - temp;
            let t3 = t2 * t;
            let t4 = t3 * t;
            tempa -= self.d2 * t2 + self.d3 * t3 + self.d4 * t4;
            tempe += bstar * self.cc5 * (mm.sin() - self.sinmao);
            templ += self.t3cof * t3 + t4 * (self.t4cof + t * self.t5cof);
        }

        let mut nm = self.no;
        let mut em = ecco;
        let mut inclm = inclo;

        if let Some(ds) = &self.deep_space {
            let mean = ds.secular(
                t,
                MeanElements {
                    eccentricity: em,
                    inclination: inclm,
                    node: nodem,
                    argument_of_perigee: argpm,
                    mean_anomaly: mm,
                    mean_motion: nm,
                },
                self.no,
                argpo,
                self.argpdot,
            );
            em = mean.eccentricity;
            inclm = mean.inclination;
            nodem = mean.node;
            argpm = mean.argument_of_perigee;
            mm = mean.mean_anomaly;
            nm = mean.mean_motion;
        }

        if nm <= 0.0 {
            return PropagationResult::failed(PropagationError::InvalidMeanMotion(nm));
        }

        let am = (XKE / nm).powf(2.0 / 3.0) * tempa * tempa;
        let nm = XKE / am.powf(1.5);
        em -= tempe;

        if !(-0.001..1.0).contains(&em) {
            return PropagationResult::failed(PropagationError::InvalidEccentricity(em));
        }
        let em = em.max(MIN_ECCENTRICITY);

        mm += self.no * templ;
        let xlm = (mm + argpm + nodem) % TAU;
        let nodem = nodem % TAU;
        let argpm = argpm % TAU;
        let mm = (xlm - argpm - nodem) % TAU;

        // Lunar-solar periodics
        let mut ep = em;
        let mut xincp = inclm;
        let mut argpp = argpm;
        let mut nodep = nodem;
        let mut mp = mm;
        let mut aycof = self.aycof;
        let mut xlcof = self.xlcof;
        let mut con41 = self.con41;
        let mut x1mth2 = self.x1mth2;
        let mut x7thm1 = self.x7thm1;

        if let Some(ds) = &self.deep_space {
            let perturbed = ds.periodics(
                t,
                MeanElements {
                    eccentricity: ep,
                    inclination: xincp,
                    node: nodep,
                    argument_of_perigee: argpp,
                    mean_anomaly: mp,
                    mean_motion: nm,
                },
            );
            ep = perturbed.eccentricity;
            xincp = perturbed.inclination;
            nodep = perturbed.node;
            argpp = perturbed.argument_of_perigee;
            mp = perturbed.mean_anomaly;

            if xincp < 0.0 {
                xincp = -xincp;
                nodep += PI;
                argpp -= PI;
            }
            if !(0.0..=1.0).contains(&ep) {
                return PropagationResult::failed(PropagationError::InvalidEccentricity(ep));
            }

            let sinip = xincp.sin();
            let cosip = xincp.cos();
            let cosisq = cosip * cosip;
            aycof = -0.5 * J3OJ2 * sinip;
            xlcof = xlcof_for(sinip, cosip);
            con41 = 3.0 * cosisq - 1.0;
            x1mth2 = 1.0 - cosisq;
            x7thm1 = 7.0 * cosisq - 1.0;
        }
        let sinip = xincp.sin();
        let cosip = xincp.cos();

        // Long-period periodics
        let axnl = ep * argpp.cos();
        let temp = 1.0 / (am * (1.0 - ep * ep));
        let aynl = ep * argpp.sin() + temp * aycof;
        let xl = mp + argpp + nodep + temp * xlcof * axnl;

        // Kepler's equation, solved for E + omega
        let u = (xl - nodep) % TAU;
        let mut eo1 = u;
        for _ in 0..KEPLER_MAX_ITERATIONS {
            let sineo1 = eo1.sin();
            let coseo1 = eo1.cos();
            let step = (u - aynl * coseo1 + axnl * sineo1 - eo1)
                / (1.0 - coseo1 * axnl - sineo1 * aynl);
            eo1 += step.clamp(-KEPLER_MAX_STEP, KEPLER_MAX_STEP);
            if step.abs() < KEPLER_TOLERANCE {
                break;
            }
        }

        // Short-period periodics
        let sineo1 = eo1.sin();
        let coseo1 = eo1.cos();
        let ecose = axnl * coseo1 + aynl * sineo1;
        let esine = axnl * sineo1 - aynl * coseo1;
        let el2 = axnl * axnl + aynl * aynl;
        let pl = am * (1.0 - el2);
        if pl < 0.0 {
            return PropagationResult::failed(PropagationError::InvalidSemiLatusRectum(pl));
        }

        let rl = am * (1.0 - ecose);
        let rdotl = am.sqrt() * esine / rl;
        let rvdotl = pl.sqrt() / rl;
        let betal = (1.0 - el2).sqrt();
        let temp = esine / (1.0 + betal);
        let sinu = am / rl * (sineo1 - aynl - axnl * temp);
        let cosu = am / rl * (coseo1 - axnl + aynl * temp);
        let su = sinu.atan2(cosu);
        let sin2u = (cosu + cosu) * sinu;
        let cos2u = 1.0 - 2.0 * sinu * sinu;
        let temp = 1.0 / pl;
        let temp1 = 0.5 * J2 * temp;
        let temp2 = temp1 * temp;

        let mrt = rl * (1.0 - 1.5 * temp2 * betal * con41) + 0.5 * temp1 * x1mth2 * cos2u;
        let su = su - 0.25 * temp2 * x7thm1 * sin2u;
        let xnode = nodep + 1.5 * temp2 * cosip * sin2u;
        let xinc = xincp + 1.5 * temp2 * cosip * sinip * cos2u;
        let mvt = rdotl - nm * temp1 * x1mth2 * sin2u / XKE;
        let rvdot = rvdotl + nm * temp1 * (x1mth2 * cos2u + 1.5 * con41) / XKE;

        // Orientation vectors in TEME
        let (sinsu, cossu) = su.sin_cos();
        let (snod, cnod) = xnode.sin_cos();
        let (sini, cosi) = xinc.sin_cos();
        let xmx = -snod * cosi;
        let xmy = cnod * cosi;
        let u_vec = Vector3::new(xmx * sinsu + cnod * cossu, xmy * sinsu + snod * cossu, sini * sinsu);
        let v_vec = Vector3::new(xmx * cossu - cnod * sinsu, xmy * cossu - snod * sinsu, sini * cossu);

        let position = u_vec * (mrt * EARTH_RADIUS_KM);
        let velocity = (u_vec * mvt + v_vec * rvdot) * VELOCITY_SCALE;

        if !position.iter().chain(velocity.iter()).all(|c| c.is_finite()) {
            return PropagationResult::failed(PropagationError::Diverged);
        }

        PropagationResult {
            position,
            velocity,
            error: (mrt < 1.0).then_some(PropagationError::Decayed(mrt)),
        }
    }
}

/// Long-period coefficient for the mean longitude, guarded near i = 180 deg
fn xlcof_for(sinio: f64, cosio: f64) -> f64 {
    let denom = if (cosio + 1.0).abs() > RETROGRADE_GUARD {
        1.0 + cosio
    } else {
        RETROGRADE_GUARD
    };
    -0.25 * J3OJ2 * sinio * (3.0 + 5.0 * cosio) / denom
}
