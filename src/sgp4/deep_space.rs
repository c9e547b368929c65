//! Deep-space (SDP4) perturbations
//!
//! Orbits with periods of 225 minutes or more feel the Sun and Moon strongly
//! enough that SGP4's near-earth theory is not sufficient. This module holds
//! the lunar-solar terms computed once at construction:
//!
//! - secular rates of eccentricity, inclination, node, perigee and mean anomaly
//! - long-period periodic coefficients for the solar and lunar series
//! - resonance terms for 24-hour (synchronous) and 12-hour (half-day) orbits,
//!   whose mean longitude is integrated numerically from epoch
//!
//! Nothing here is mutated after construction. The resonance integrator keeps
//! its state on the stack and always starts from epoch, so a deep-space
//! propagator can be shared freely between threads. Resonant orbits are only
//! integrated out to [`MAX_RESONANT_MINUTES`] either side of epoch.

use std::f64::consts::PI;

use crate::constants::{JD_1950, TAU, XKE};
use crate::time::gstime;

// Solar and lunar mean motions (rad/min) and orbital eccentricities
const ZNS: f64 = 1.19459e-5;
const ZES: f64 = 0.01675;
const ZNL: f64 = 1.5835218e-4;
const ZEL: f64 = 0.05490;

// Solar and lunar perturbation amplitudes
const C1SS: f64 = 2.986_479_7e-6;
const C1L: f64 = 4.796_806_5e-7;

// Solar orbit orientation
const ZSINIS: f64 = 0.397_854_16;
const ZCOSIS: f64 = 0.917_448_67;
const ZCOSGS: f64 = 0.194_590_5;
const ZSINGS: f64 = -0.980_884_58;

// Geopotential resonance coefficients
const Q22: f64 = 1.789_167_9e-6;
const Q31: f64 = 2.146_074_8e-6;
const Q33: f64 = 2.212_301_5e-7;
const ROOT22: f64 = 1.789_167_9e-6;
const ROOT32: f64 = 3.739_379_2e-7;
const ROOT44: f64 = 7.363_695_3e-9;
const ROOT52: f64 = 1.142_863_9e-7;
const ROOT54: f64 = 2.176_580_3e-9;

// Resonance phase angles
const FASX2: f64 = 0.131_309_08;
const FASX4: f64 = 2.884_319_8;
const FASX6: f64 = 0.374_480_87;
const G22: f64 = 5.768_639_6;
const G32: f64 = 0.952_408_98;
const G44: f64 = 1.801_499_8;
const G52: f64 = 1.050_833_0;
const G54: f64 = 4.410_889_8;

/// Earth rotation rate in rad/min
const RPTIM: f64 = 4.375_269_088_011_299_66e-3;

/// Integrator step (minutes) and half its square
const STEP: f64 = 720.0;
const STEP2: f64 = 259_200.0;

/// Largest offset from epoch (minutes, five years) a resonant orbit is
/// integrated to; this caps a call at about 3700 integrator steps
pub const MAX_RESONANT_MINUTES: f64 = 5.0 * 365.25 * 1440.0;

/// Below this inclination the node rates are ill-defined and dropped
const LOW_INCLINATION: f64 = 5.235_987_7e-2;

// Resonance windows on the un-Kozai'd mean motion (rad/min)
const SYNCHRONOUS_MIN: f64 = 0.003_490_658_5;
const SYNCHRONOUS_MAX: f64 = 0.005_235_987_7;
const HALF_DAY_MIN: f64 = 8.26e-3;
const HALF_DAY_MAX: f64 = 9.24e-3;
const HALF_DAY_MIN_ECCENTRICITY: f64 = 0.5;

/// Orbital resonance with the Earth's rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resonance {
    /// No resonance terms apply
    None,
    /// Period near one sidereal day (geostationary class)
    Synchronous,
    /// Period near half a day with high eccentricity (Molniya class)
    HalfDay,
}

/// Mean elements as they pass through the deep-space corrections
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MeanElements {
    pub eccentricity: f64,
    pub inclination: f64,
    pub node: f64,
    pub argument_of_perigee: f64,
    pub mean_anomaly: f64,
    pub mean_motion: f64,
}

/// Inputs the deep-space terms are derived from
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeepSpaceInput {
    pub epoch_jd: f64,
    pub elements: MeanElements,
    pub mdot: f64,
    pub argpdot: f64,
    pub nodedot: f64,
}

/// Long-period periodic coefficients for one perturbing body
#[derive(Debug, Clone, Copy, Default)]
struct PeriodicSeries {
    e2: f64,
    e3: f64,
    i2: f64,
    i3: f64,
    l2: f64,
    l3: f64,
    l4: f64,
    gh2: f64,
    gh3: f64,
    gh4: f64,
    h2: f64,
    h3: f64,
    /// Mean anomaly of the body at epoch
    m0: f64,
}

impl PeriodicSeries {
    /// Periodic deltas (e, i, l, gh, h) at `t` minutes from epoch
    fn at(&self, t: f64, mean_motion: f64, eccentricity: f64) -> [f64; 5] {
        let zm = self.m0 + mean_motion * t;
        let zf = zm + 2.0 * eccentricity * zm.sin();
        let sinzf = zf.sin();
        let f2 = 0.5 * sinzf * sinzf - 0.25;
        let f3 = -0.5 * sinzf * zf.cos();
        [
            self.e2 * f2 + self.e3 * f3,
            self.i2 * f2 + self.i3 * f3,
            self.l2 * f2 + self.l3 * f3 + self.l4 * sinzf,
            self.gh2 * f2 + self.gh3 * f3 + self.gh4 * sinzf,
            self.h2 * f2 + self.h3 * f3,
        ]
    }
}

/// Resonance terms and the integrator's starting point
#[derive(Debug, Clone, Copy)]
enum ResonanceTerms {
    None,
    Synchronous {
        del1: f64,
        del2: f64,
        del3: f64,
        xfact: f64,
        xlamo: f64,
    },
    HalfDay {
        d2201: f64,
        d2211: f64,
        d3210: f64,
        d3222: f64,
        d4410: f64,
        d4422: f64,
        d5220: f64,
        d5232: f64,
        d5421: f64,
        d5433: f64,
        xfact: f64,
        xlamo: f64,
    },
}

/// Intermediate geometry shared by the solar and lunar passes
#[derive(Debug, Clone, Copy, Default)]
struct BodyTerms {
    s1: f64,
    s2: f64,
    s3: f64,
    s4: f64,
    s5: f64,
    z1: f64,
    z3: f64,
    z11: f64,
    z13: f64,
    z21: f64,
    z23: f64,
    z31: f64,
    z33: f64,
}

/// Precomputed lunar-solar terms for one deep-space orbit
#[derive(Debug, Clone)]
pub(crate) struct DeepSpace {
    solar: PeriodicSeries,
    lunar: PeriodicSeries,
    dedt: f64,
    didt: f64,
    dmdt: f64,
    dnodt: f64,
    domdt: f64,
    /// Greenwich sidereal time at epoch
    gsto: f64,
    resonance: ResonanceTerms,
}

impl DeepSpace {
    /// Derive the lunar-solar terms for an orbit
    pub fn new(input: &DeepSpaceInput) -> Self {
        let el = &input.elements;
        let days_since_1950 = input.epoch_jd - JD_1950;
        let gsto = gstime(input.epoch_jd);

        let em = el.eccentricity;
        let emsq = em * em;
        let betasq = 1.0 - emsq;
        let rtemsq = betasq.sqrt();
        let sinim = el.inclination.sin();
        let cosim = el.inclination.cos();
        let snodm = el.node.sin();
        let cnodm = el.node.cos();
        let sinomm = el.argument_of_perigee.sin();
        let cosomm = el.argument_of_perigee.cos();

        // Lunar orbit orientation at epoch
        let day = days_since_1950 + 18_261.5;
        let xnodce = (4.523_602_0 - 9.242_202_9e-4 * day) % TAU;
        let stem = xnodce.sin();
        let ctem = xnodce.cos();
        let zcosil = 0.913_751_64 - 0.035_680_96 * ctem;
        let zsinil = (1.0 - zcosil * zcosil).sqrt();
        let zsinhl = 0.089_683_511 * stem / zsinil;
        let zcoshl = (1.0 - zsinhl * zsinhl).sqrt();
        let gam = 5.835_151_4 + 0.001_944_368_0 * day;
        let zx = (0.397_854_16 * stem / zsinil).atan2(zcoshl * ctem + 0.917_448_67 * zsinhl * stem);
        let zx = gam + zx - xnodce;

        let xnoi = 1.0 / el.mean_motion;
        let geometry = |zcosg: f64,
                        zsing: f64,
                        zcosi: f64,
                        zsini: f64,
                        zcosh: f64,
                        zsinh: f64,
                        cc: f64,
                        ze: f64| {
            let a1 = zcosg * zcosh + zsing * zcosi * zsinh;
            let a3 = -zsing * zcosh + zcosg * zcosi * zsinh;
            let a7 = -zcosg * zsinh + zsing * zcosi * zcosh;
            let a8 = zsing * zsini;
            let a9 = zsing * zsinh + zcosg * zcosi * zcosh;
            let a10 = zcosg * zsini;
            let a2 = cosim * a7 + sinim * a8;
            let a4 = cosim * a9 + sinim * a10;
            let a5 = -sinim * a7 + cosim * a8;
            let a6 = -sinim * a9 + cosim * a10;

            let x1 = a1 * cosomm + a2 * sinomm;
            let x2 = a3 * cosomm + a4 * sinomm;
            let x3 = -a1 * sinomm + a2 * cosomm;
            let x4 = -a3 * sinomm + a4 * cosomm;
            let x5 = a5 * sinomm;
            let x6 = a6 * sinomm;
            let x7 = a5 * cosomm;
            let x8 = a6 * cosomm;

            let z31 = 12.0 * x1 * x1 - 3.0 * x3 * x3;
            let z32 = 24.0 * x1 * x2 - 6.0 * x3 * x4;
            let z33 = 12.0 * x2 * x2 - 3.0 * x4 * x4;
            let z1 = 3.0 * (a1 * a1 + a2 * a2) + z31 * emsq;
            let z2 = 6.0 * (a1 * a3 + a2 * a4) + z32 * emsq;
            let z3 = 3.0 * (a3 * a3 + a4 * a4) + z33 * emsq;
            let z11 = -6.0 * a1 * a5 + emsq * (-24.0 * x1 * x7 - 6.0 * x3 * x5);
            let z12 = -6.0 * (a1 * a6 + a3 * a5)
                + emsq * (-24.0 * (x2 * x7 + x1 * x8) - 6.0 * (x3 * x6 + x4 * x5));
            let z13 = -6.0 * a3 * a6 + emsq * (-24.0 * x2 * x8 - 6.0 * x4 * x6);
            let z21 = 6.0 * a2 * a5 + emsq * (24.0 * x1 * x5 - 6.0 * x3 * x7);
            let z22 = 6.0 * (a4 * a5 + a2 * a6)
                + emsq * (24.0 * (x2 * x5 + x1 * x6) - 6.0 * (x4 * x7 + x3 * x8));
            let z23 = 6.0 * a4 * a6 + emsq * (24.0 * x2 * x6 - 6.0 * x4 * x8);
            let z1 = z1 + z1 + betasq * z31;
            let z2 = z2 + z2 + betasq * z32;
            let z3 = z3 + z3 + betasq * z33;

            let s3 = cc * xnoi;
            let s2 = -0.5 * s3 / rtemsq;
            let s4 = s3 * rtemsq;
            let s1 = -15.0 * em * s4;
            let s5 = x1 * x3 + x2 * x4;
            let s6 = x2 * x3 + x1 * x4;
            let s7 = x2 * x4 - x1 * x3;

            let series = PeriodicSeries {
                e2: 2.0 * s1 * s6,
                e3: 2.0 * s1 * s7,
                i2: 2.0 * s2 * z12,
                i3: 2.0 * s2 * (z13 - z11),
                l2: -2.0 * s3 * z2,
                l3: -2.0 * s3 * (z3 - z1),
                l4: -2.0 * s3 * (-21.0 - 9.0 * emsq) * ze,
                gh2: 2.0 * s4 * z32,
                gh3: 2.0 * s4 * (z33 - z31),
                gh4: -18.0 * s4 * ze,
                h2: -2.0 * s2 * z22,
                h3: -2.0 * s2 * (z23 - z21),
                m0: 0.0,
            };
            let terms = BodyTerms {
                s1,
                s2,
                s3,
                s4,
                s5,
                z1,
                z3,
                z11,
                z13,
                z21,
                z23,
                z31,
                z33,
            };
            (series, terms)
        };

        let (solar, sun) = geometry(ZCOSGS, ZSINGS, ZCOSIS, ZSINIS, cnodm, snodm, C1SS, ZES);
        let solar = PeriodicSeries {
            m0: (6.256_583_7 + 0.017_201_977 * day) % TAU,
            ..solar
        };

        let (lunar, moon) = geometry(
            zx.cos(),
            zx.sin(),
            zcosil,
            zsinil,
            zcoshl * cnodm + zsinhl * snodm,
            snodm * zcoshl - cnodm * zsinhl,
            C1L,
            ZEL,
        );
        let lunar = PeriodicSeries {
            m0: (4.719_967_2 + 0.229_971_50 * day - gam) % TAU,
            ..lunar
        };

        // Secular rates from both bodies
        let near_equatorial =
            el.inclination < LOW_INCLINATION || el.inclination > PI - LOW_INCLINATION;

        let ses = sun.s1 * ZNS * sun.s5;
        let sis = sun.s2 * ZNS * (sun.z11 + sun.z13);
        let sls = -ZNS * sun.s3 * (sun.z1 + sun.z3 - 14.0 - 6.0 * emsq);
        let sghs = sun.s4 * ZNS * (sun.z31 + sun.z33 - 6.0);
        let mut shs = -ZNS * sun.s2 * (sun.z21 + sun.z23);
        if near_equatorial {
            shs = 0.0;
        }
        if sinim != 0.0 {
            shs /= sinim;
        }
        let sgs = sghs - cosim * shs;

        let dedt = ses + moon.s1 * ZNL * moon.s5;
        let didt = sis + moon.s2 * ZNL * (moon.z11 + moon.z13);
        let dmdt = sls - ZNL * moon.s3 * (moon.z1 + moon.z3 - 14.0 - 6.0 * emsq);
        let sghl = moon.s4 * ZNL * (moon.z31 + moon.z33 - 6.0);
        let mut shll = -ZNL * moon.s2 * (moon.z21 + moon.z23);
        if near_equatorial {
            shll = 0.0;
        }
        let mut domdt = sgs + sghl;
        let mut dnodt = shs;
        if sinim != 0.0 {
            domdt -= cosim / sinim * shll;
            dnodt += shll / sinim;
        }

        let resonance = resonance_terms(input, gsto, sinim, cosim, dmdt, domdt, dnodt);

        Self {
            solar,
            lunar,
            dedt,
            didt,
            dmdt,
            dnodt,
            domdt,
            gsto,
            resonance,
        }
    }

    /// Which resonance class the orbit falls into
    pub fn resonance(&self) -> Resonance {
        match self.resonance {
            ResonanceTerms::None => Resonance::None,
            ResonanceTerms::Synchronous { .. } => Resonance::Synchronous,
            ResonanceTerms::HalfDay { .. } => Resonance::HalfDay,
        }
    }

    /// Whether `t` minutes from epoch is within the integrator's range
    ///
    /// Always true for non-resonant orbits, whose cost does not grow with `t`.
    pub fn in_range(&self, t: f64) -> bool {
        matches!(self.resonance, ResonanceTerms::None) || t.abs() <= MAX_RESONANT_MINUTES
    }

    /// Apply lunar-solar secular rates and resonance effects at `t` minutes
    ///
    /// `mean` carries the drag-corrected mean elements; `no` is the un-Kozai'd
    /// mean motion at epoch. `argpo`/`argpdot` feed the half-day harmonics.
    pub fn secular(&self, t: f64, mean: MeanElements, no: f64, argpo: f64, argpdot: f64) -> MeanElements {
        let mut out = MeanElements {
            eccentricity: mean.eccentricity + self.dedt * t,
            inclination: mean.inclination + self.didt * t,
            argument_of_perigee: mean.argument_of_perigee + self.domdt * t,
            node: mean.node + self.dnodt * t,
            mean_anomaly: mean.mean_anomaly + self.dmdt * t,
            mean_motion: mean.mean_motion,
        };

        let (xfact, xlamo) = match self.resonance {
            ResonanceTerms::None => return out,
            ResonanceTerms::Synchronous { xfact, xlamo, .. } => (xfact, xlamo),
            ResonanceTerms::HalfDay { xfact, xlamo, .. } => (xfact, xlamo),
        };

        let theta = (self.gsto + t * RPTIM) % TAU;
        let delt = if t > 0.0 { STEP } else { -STEP };

        // Integrate from epoch in fixed steps, then Taylor-expand the remainder
        let mut atime = 0.0;
        let mut xni = no;
        let mut xli = xlamo;
        let (xldot, xndt, xnddt, ft) = loop {
            let (xndt, xnddt) = self.resonance_rates(xli, argpo + argpdot * atime);
            let xldot = xni + xfact;
            let xnddt = xnddt * xldot;

            if (t - atime).abs() < STEP {
                break (xldot, xndt, xnddt, t - atime);
            }
            xli += xldot * delt + xndt * STEP2;
            xni += xndt * delt + xnddt * STEP2;
            atime += delt;
        };

        let nm = xni + xndt * ft + xnddt * ft * ft * 0.5;
        let xl = xli + xldot * ft + xndt * ft * ft * 0.5;
        out.mean_anomaly = match self.resonance {
            ResonanceTerms::Synchronous { .. } => xl - out.node - out.argument_of_perigee + theta,
            _ => xl - 2.0 * out.node + 2.0 * theta,
        };
        out.mean_motion = nm;
        out
    }

    /// Mean-motion rate and its derivative (before the `xldot` factor)
    fn resonance_rates(&self, xli: f64, xomi: f64) -> (f64, f64) {
        match self.resonance {
            ResonanceTerms::None => (0.0, 0.0),
            ResonanceTerms::Synchronous { del1, del2, del3, .. } => {
                let xndt = del1 * (xli - FASX2).sin()
                    + del2 * (2.0 * (xli - FASX4)).sin()
                    + del3 * (3.0 * (xli - FASX6)).sin();
                let xnddt = del1 * (xli - FASX2).cos()
                    + 2.0 * del2 * (2.0 * (xli - FASX4)).cos()
                    + 3.0 * del3 * (3.0 * (xli - FASX6)).cos();
                (xndt, xnddt)
            }
            ResonanceTerms::HalfDay {
                d2201,
                d2211,
                d3210,
                d3222,
                d4410,
                d4422,
                d5220,
                d5232,
                d5421,
                d5433,
                ..
            } => {
                let x2omi = xomi + xomi;
                let x2li = xli + xli;
                let xndt = d2201 * (x2omi + xli - G22).sin()
                    + d2211 * (xli - G22).sin()
                    + d3210 * (xomi + xli - G32).sin()
                    + d3222 * (-xomi + xli - G32).sin()
                    + d4410 * (x2omi + x2li - G44).sin()
                    + d4422 * (x2li - G44).sin()
                    + d5220 * (xomi + xli - G52).sin()
                    + d5232 * (-xomi + xli - G52).sin()
                    + d5421 * (xomi + x2li - G54).sin()
                    + d5433 * (-xomi + x2li - G54).sin();
                let xnddt = d2201 * (x2omi + xli - G22).cos()
                    + d2211 * (xli - G22).cos()
                    + d3210 * (xomi + xli - G32).cos()
                    + d3222 * (-xomi + xli - G32).cos()
                    + d5220 * (xomi + xli - G52).cos()
                    + d5232 * (-xomi + xli - G52).cos()
                    + 2.0
                        * (d4410 * (x2omi + x2li - G44).cos()
                            + d4422 * (x2li - G44).cos()
                            + d5421 * (xomi + x2li - G54).cos()
                            + d5433 * (-xomi + x2li - G54).cos());
                (xndt, xnddt)
            }
        }
    }

    /// Add the lunar-solar long-period periodics at `t` minutes
    ///
    /// Only eccentricity, inclination, node, perigee and mean anomaly change;
    /// mean motion passes through untouched.
    pub fn periodics(&self, t: f64, mean: MeanElements) -> MeanElements {
        let [ses, sis, sls, sghs, shs] = self.solar.at(t, ZNS, ZES);
        let [sel, sil, sll, sghl, shll] = self.lunar.at(t, ZNL, ZEL);
        let pe = ses + sel;
        let pinc = sis + sil;
        let pl = sls + sll;
        let pgh = sghs + sghl;
        let ph = shs + shll;

        let inclp = mean.inclination + pinc;
        let ep = mean.eccentricity + pe;
        let sinip = inclp.sin();
        let cosip = inclp.cos();
        let mut nodep = mean.node;
        let mut argpp = mean.argument_of_perigee;
        let mut mp = mean.mean_anomaly;

        if inclp >= 0.2 {
            let ph = ph / sinip;
            argpp += pgh - cosip * ph;
            nodep += ph;
            mp += pl;
        } else {
            // Lyddane modification for low inclinations
            let sinop = nodep.sin();
            let cosop = nodep.cos();
            let alfdp = sinip * sinop + ph * cosop + pinc * cosip * sinop;
            let betdp = sinip * cosop - ph * sinop + pinc * cosip * cosop;
            nodep %= TAU;
            let xls = mp + argpp + pl + pgh + (cosip - pinc * sinip) * nodep;
            let xnoh = nodep;
            nodep = alfdp.atan2(betdp);
            if (xnoh - nodep).abs() > PI {
                if nodep < xnoh {
                    nodep += TAU;
                } else {
                    nodep -= TAU;
                }
            }
            mp += pl;
            argpp = xls - mp - cosip * nodep;
        }

        MeanElements {
            eccentricity: ep,
            inclination: inclp,
            node: nodep,
            argument_of_perigee: argpp,
            mean_anomaly: mp,
            mean_motion: mean.mean_motion,
        }
    }
}

/// Classify the resonance and derive its integration constants
fn resonance_terms(
    input: &DeepSpaceInput,
    gsto: f64,
    sinim: f64,
    cosim: f64,
    dmdt: f64,
    domdt: f64,
    dnodt: f64,
) -> ResonanceTerms {
    let el = &input.elements;
    let nm = el.mean_motion;
    let ecc = el.eccentricity;
    let aonv = (nm / XKE).powf(2.0 / 3.0);
    let theta = gsto % TAU;

    if nm > SYNCHRONOUS_MIN && nm < SYNCHRONOUS_MAX {
        let emsq = ecc * ecc;
        let g200 = 1.0 + emsq * (-2.5 + 0.8125 * emsq);
        let g310 = 1.0 + 2.0 * emsq;
        let g300 = 1.0 + emsq * (-6.0 + 6.60937 * emsq);
        let f220 = 0.75 * (1.0 + cosim) * (1.0 + cosim);
        let f311 = 0.9375 * sinim * sinim * (1.0 + 3.0 * cosim) - 0.75 * (1.0 + cosim);
        let f330 = 1.0 + cosim;
        let f330 = 1.875 * f330 * f330 * f330;
        let del = 3.0 * nm * nm * aonv * aonv;
        return ResonanceTerms::Synchronous {
            del1: del * f311 * g310 * Q31 * aonv,
            del2: 2.0 * del * f220 * g200 * Q22,
            del3: 3.0 * del * f330 * g300 * Q33 * aonv,
            xfact: input.mdot + input.argpdot + input.nodedot - RPTIM + dmdt + domdt + dnodt - nm,
            xlamo: (el.mean_anomaly + el.node + el.argument_of_perigee - theta) % TAU,
        };
    }

    if (HALF_DAY_MIN..=HALF_DAY_MAX).contains(&nm) && ecc >= HALF_DAY_MIN_ECCENTRICITY {
        let em = ecc;
        let emsq = em * em;
        let eoc = em * emsq;
        let cosisq = cosim * cosim;

        let g201 = -0.306 - (em - 0.64) * 0.440;
        let (g211, g310, g322, g410, g422, g520) = if em <= 0.65 {
            (
                3.616 - 13.2470 * em + 16.2900 * emsq,
                -19.302 + 117.3900 * em - 228.4190 * emsq + 156.5910 * eoc,
                -18.9068 + 109.7927 * em - 214.6334 * emsq + 146.5816 * eoc,
                -41.122 + 242.6940 * em - 471.0940 * emsq + 313.9530 * eoc,
                -146.407 + 841.8800 * em - 1629.014 * emsq + 1083.4350 * eoc,
                -532.114 + 3017.977 * em - 5740.032 * emsq + 3708.2760 * eoc,
            )
        } else {
            let g520 = if em > 0.715 {
                -5149.66 + 29936.92 * em - 54087.36 * emsq + 31324.56 * eoc
            } else {
                1464.74 - 4664.75 * em + 3763.64 * emsq
            };
            (
                -72.099 + 331.819 * em - 508.738 * emsq + 266.724 * eoc,
                -346.844 + 1582.851 * em - 2415.925 * emsq + 1246.113 * eoc,
                -342.585 + 1554.908 * em - 2366.899 * emsq + 1215.972 * eoc,
                -1052.797 + 4758.686 * em - 7193.992 * emsq + 3651.957 * eoc,
                -3581.690 + 16178.110 * em - 24462.770 * emsq + 12422.520 * eoc,
                g520,
            )
        };
        let (g533, g521, g532) = if em < 0.7 {
            (
                -919.22770 + 4988.61 * em - 9064.77 * emsq + 5542.21 * eoc,
                -822.71072 + 4568.6173 * em - 8491.4146 * emsq + 5337.524 * eoc,
                -853.66600 + 4690.25 * em - 8624.77 * emsq + 5341.4 * eoc,
            )
        } else {
            (
                -37995.78 + 161616.52 * em - 229838.2 * emsq + 109377.94 * eoc,
                -51752.104 + 218913.95 * em - 309468.16 * emsq + 146349.42 * eoc,
                -40023.88 + 170470.89 * em - 242699.48 * emsq + 115605.82 * eoc,
            )
        };

        let sini2 = sinim * sinim;
        let f220 = 0.75 * (1.0 + 2.0 * cosim + cosisq);
        let f221 = 1.5 * sini2;
        let f321 = 1.875 * sinim * (1.0 - 2.0 * cosim - 3.0 * cosisq);
        let f322 = -1.875 * sinim * (1.0 + 2.0 * cosim - 3.0 * cosisq);
        let f441 = 35.0 * sini2 * f220;
        let f442 = 39.375 * sini2 * sini2;
        let f522 = 9.84375
            * sinim
            * (sini2 * (1.0 - 2.0 * cosim - 5.0 * cosisq)
                + 1.0 / 3.0 * (-2.0 + 4.0 * cosim + 6.0 * cosisq));
        let f523 = sinim
            * (4.92187512 * sini2 * (-2.0 - 4.0 * cosim + 10.0 * cosisq)
                + 6.56250012 * (1.0 + 2.0 * cosim - 3.0 * cosisq));
        let f542 = 29.53125 * sinim * (2.0 - 8.0 * cosim + cosisq * (-12.0 + 8.0 * cosim + 10.0 * cosisq));
        let f543 = 29.53125 * sinim * (-2.0 - 8.0 * cosim + cosisq * (12.0 + 8.0 * cosim - 10.0 * cosisq));

        let ainv2 = aonv * aonv;
        let mut temp1 = 3.0 * nm * nm * ainv2;
        let mut temp = temp1 * ROOT22;
        let d2201 = temp * f220 * g201;
        let d2211 = temp * f221 * g211;
        temp1 *= aonv;
        temp = temp1 * ROOT32;
        let d3210 = temp * f321 * g310;
        let d3222 = temp * f322 * g322;
        temp1 *= aonv;
        temp = 2.0 * temp1 * ROOT44;
        let d4410 = temp * f441 * g410;
        let d4422 = temp * f442 * g422;
        temp1 *= aonv;
        temp = temp1 * ROOT52;
        let d5220 = temp * f522 * g520;
        let d5232 = temp * f523 * g532;
        temp = 2.0 * temp1 * ROOT54;
        let d5421 = temp * f542 * g521;
        let d5433 = temp * f543 * g533;

        return ResonanceTerms::HalfDay {
            d2201,
            d2211,
            d3210,
            d3222,
            d4410,
            d4422,
            d5220,
            d5232,
            d5421,
            d5433,
            xfact: input.mdot + dmdt + 2.0 * (input.nodedot + dnodt - RPTIM) - nm,
            xlamo: (el.mean_anomaly + el.node + el.node - theta - theta) % TAU,
        };
    }

    ResonanceTerms::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEG2RAD, MINUTES_PER_DAY};

    fn input(mean_motion_rev_day: f64, eccentricity: f64, inclination_deg: f64) -> DeepSpaceInput {
        let n = mean_motion_rev_day * TAU / MINUTES_PER_DAY;
        DeepSpaceInput {
            epoch_jd: 2_460_310.5,
            elements: MeanElements {
                eccentricity,
                inclination: inclination_deg * DEG2RAD,
                node: 1.0,
                argument_of_perigee: 4.7,
                mean_anomaly: 0.2,
                mean_motion: n,
            },
            mdot: n,
            argpdot: 0.0,
            nodedot: 0.0,
        }
    }

    #[test]
    fn test_resonance_classification() {
        assert_eq!(DeepSpace::new(&input(1.0027, 0.0002, 0.02)).resonance(), Resonance::Synchronous);
        assert_eq!(DeepSpace::new(&input(2.006, 0.7, 63.4)).resonance(), Resonance::HalfDay);
        // half-day period but nearly circular (GPS)
        assert_eq!(DeepSpace::new(&input(2.0056, 0.005, 55.0)).resonance(), Resonance::None);
        assert_eq!(DeepSpace::new(&input(6.4, 0.001, 45.0)).resonance(), Resonance::None);
    }

    #[test]
    fn test_secular_is_identity_at_epoch_without_resonance() {
        let inp = input(6.4, 0.001, 45.0);
        let ds = DeepSpace::new(&inp);
        let out = ds.secular(0.0, inp.elements, inp.elements.mean_motion, 4.7, 0.0);
        assert_eq!(out, inp.elements);
    }

    #[test]
    fn test_resonant_mean_motion_stays_close_to_epoch_value() {
        for inp in [input(1.0027, 0.0002, 0.02), input(2.006, 0.7, 63.4)] {
            let ds = DeepSpace::new(&inp);
            let n0 = inp.elements.mean_motion;
            for t in [-2000.0, 0.0, 1440.0, 10_000.0] {
                let out = ds.secular(t, inp.elements, n0, 4.7, 0.0);
                assert!(out.mean_motion.is_finite());
                assert!(((out.mean_motion - n0) / n0).abs() < 1e-3, "t = {}", t);
            }
        }
    }

    #[test]
    fn test_periodics_are_small() {
        let inp = input(2.006, 0.7, 63.4);
        let ds = DeepSpace::new(&inp);
        for t in [0.0, 720.0, 43_200.0] {
            let out = ds.periodics(t, inp.elements);
            assert!((out.eccentricity - inp.elements.eccentricity).abs() < 0.01);
            assert!((out.inclination - inp.elements.inclination).abs() < 0.01);
            assert_eq!(out.mean_motion, inp.elements.mean_motion);
        }
    }
}
