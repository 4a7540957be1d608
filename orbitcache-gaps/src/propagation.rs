//! Orbital propagation from a two-line element set.
//!
//! [`KeplerPropagator`] is a two-body propagator with secular J2 drift of the
//! node and perigee. It is accurate to a few tens of kilometres over a day,
//! which is plenty for drawing a ground track across an outage.

use chrono::NaiveDate;
use orbitcache_schema::TleRecord;
use std::f64::consts::TAU;
use thiserror::Error as ThisError;

const MU: f64 = 398_600.4418;
const EARTH_RADIUS_KM: f64 = 6_378.137;
const J2: f64 = 1.082_626_68e-3;
const FLATTENING: f64 = 1.0 / 298.257_223_563;
const SECONDS_PER_DAY: f64 = 86_400.0;
const KEPLER_MAX_ITERATIONS: usize = 20;
const KEPLER_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum PropagationError {
    #[error("invalid orbital elements: {0}")]
    InvalidElements(String),

    #[error("kepler solver did not converge at t={0}")]
    Diverged(i64),
}

/// Geodetic sub-satellite point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagatedPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_km: f64,
    pub velocity_kmh: f64,
}

pub trait Propagator: Send + Sync {
    fn compute_position(
        &self,
        tle: &TleRecord,
        timestamp_seconds: i64,
    ) -> Result<PropagatedPosition, PropagationError>;
}

/// Mean elements read from the fixed columns of an element set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitalElements {
    /// Element epoch as fractional unix seconds.
    pub epoch_seconds: f64,
    pub inclination: f64,
    pub raan: f64,
    pub eccentricity: f64,
    pub arg_perigee: f64,
    pub mean_anomaly: f64,
    /// Radians per second.
    pub mean_motion: f64,
}

impl OrbitalElements {
    pub fn parse(tle: &TleRecord) -> Result<Self, PropagationError> {
        let l1 = tle.line1.as_str();
        let l2 = tle.line2.as_str();

        let yy: i32 = field(l1, 18, 20, "epoch year")?;
        let day: f64 = field(l1, 20, 32, "epoch day")?;
        let year = if yy < 57 { 2000 + yy } else { 1900 + yy };
        let year_start = NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| PropagationError::InvalidElements(format!("epoch year {year}")))?
            .and_utc()
            .timestamp() as f64;

        let ecc_digits = column(l2, 26, 33, "eccentricity")?;
        let eccentricity: f64 = format!("0.{ecc_digits}")
            .parse()
            .map_err(|_| PropagationError::InvalidElements(format!("eccentricity `{ecc_digits}`")))?;
        if !(0.0..1.0).contains(&eccentricity) {
            return Err(PropagationError::InvalidElements(format!(
                "eccentricity {eccentricity}"
            )));
        }

        let revs_per_day: f64 = field(l2, 52, 63, "mean motion")?;
        if revs_per_day <= 0.0 {
            return Err(PropagationError::InvalidElements(format!(
                "mean motion {revs_per_day}"
            )));
        }

        Ok(Self {
            epoch_seconds: year_start + (day - 1.0) * SECONDS_PER_DAY,
            inclination: field::<f64>(l2, 8, 16, "inclination")?.to_radians(),
            raan: field::<f64>(l2, 17, 25, "right ascension")?.to_radians(),
            eccentricity,
            arg_perigee: field::<f64>(l2, 34, 42, "argument of perigee")?.to_radians(),
            mean_anomaly: field::<f64>(l2, 43, 51, "mean anomaly")?.to_radians(),
            mean_motion: revs_per_day * TAU / SECONDS_PER_DAY,
        })
    }
}

fn column<'a>(
    line: &'a str,
    from: usize,
    to: usize,
    name: &str,
) -> Result<&'a str, PropagationError> {
    line.get(from..to)
        .map(str::trim)
        .ok_or_else(|| PropagationError::InvalidElements(format!("{name} columns missing")))
}

fn field<T: std::str::FromStr>(
    line: &str,
    from: usize,
    to: usize,
    name: &str,
) -> Result<T, PropagationError> {
    let raw = column(line, from, to, name)?;
    raw.parse()
        .map_err(|_| PropagationError::InvalidElements(format!("{name} `{raw}`")))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeplerPropagator;

impl Propagator for KeplerPropagator {
    fn compute_position(
        &self,
        tle: &TleRecord,
        timestamp_seconds: i64,
    ) -> Result<PropagatedPosition, PropagationError> {
        let el = OrbitalElements::parse(tle)?;
        let dt = timestamp_seconds as f64 - el.epoch_seconds;

        let n = el.mean_motion;
        let e = el.eccentricity;
        let a = (MU / (n * n)).cbrt();
        let p = a * (1.0 - e * e);

        let (sin_i, cos_i) = el.inclination.sin_cos();
        let k = n * J2 * (EARTH_RADIUS_KM / p).powi(2);
        let raan = el.raan - 1.5 * k * cos_i * dt;
        let argp = el.arg_perigee + 0.75 * k * (5.0 * cos_i * cos_i - 1.0) * dt;
        let mean_anomaly = (el.mean_anomaly + n * dt).rem_euclid(TAU);

        let ecc_anomaly = solve_kepler(mean_anomaly, e)
            .ok_or(PropagationError::Diverged(timestamp_seconds))?;
        let nu = 2.0
            * ((1.0 + e).sqrt() * (ecc_anomaly / 2.0).sin())
                .atan2((1.0 - e).sqrt() * (ecc_anomaly / 2.0).cos());

        let (sin_nu, cos_nu) = nu.sin_cos();
        let r = p / (1.0 + e * cos_nu);
        let (xp, yp) = (r * cos_nu, r * sin_nu);
        let h = (MU / p).sqrt();
        let (vxp, vyp) = (-h * sin_nu, h * (e + cos_nu));

        let (sin_o, cos_o) = raan.sin_cos();
        let (sin_w, cos_w) = argp.sin_cos();
        let rot = [
            [
                cos_o * cos_w - sin_o * sin_w * cos_i,
                -cos_o * sin_w - sin_o * cos_w * cos_i,
            ],
            [
                sin_o * cos_w + cos_o * sin_w * cos_i,
                -sin_o * sin_w + cos_o * cos_w * cos_i,
            ],
            [sin_w * sin_i, cos_w * sin_i],
        ];
        let eci = rot.map(|row| row[0] * xp + row[1] * yp);
        let vel = rot.map(|row| row[0] * vxp + row[1] * vyp);

        let theta = gmst(timestamp_seconds as f64);
        let (sin_t, cos_t) = theta.sin_cos();
        let x = eci[0] * cos_t + eci[1] * sin_t;
        let y = -eci[0] * sin_t + eci[1] * cos_t;
        let z = eci[2];

        let (latitude, altitude_km) = geodetic(x, y, z);
        let speed = (vel[0] * vel[0] + vel[1] * vel[1] + vel[2] * vel[2]).sqrt();

        Ok(PropagatedPosition {
            latitude: latitude.to_degrees(),
            longitude: (y.atan2(x).to_degrees() + 180.0).rem_euclid(360.0) - 180.0,
            altitude_km,
            velocity_kmh: speed * 3600.0,
        })
    }
}

fn solve_kepler(mean_anomaly: f64, e: f64) -> Option<f64> {
    let mut ea = if e < 0.8 { mean_anomaly } else { std::f64::consts::PI };
    for _ in 0..KEPLER_MAX_ITERATIONS {
        let delta = (ea - e * ea.sin() - mean_anomaly) / (1.0 - e * ea.cos());
        ea -= delta;
        if delta.abs() < KEPLER_TOLERANCE {
            return Some(ea);
        }
    }
    None
}

/// Greenwich mean sidereal time in radians.
fn gmst(unix_seconds: f64) -> f64 {
    let jd = unix_seconds / SECONDS_PER_DAY + 2_440_587.5;
    let degrees = 280.460_618_37 + 360.985_647_366_29 * (jd - 2_451_545.0);
    degrees.rem_euclid(360.0).to_radians()
}

/// Earth-fixed cartesian to (geodetic latitude in radians, height in km).
fn geodetic(x: f64, y: f64, z: f64) -> (f64, f64) {
    let e2 = FLATTENING * (2.0 - FLATTENING);
    let rho = (x * x + y * y).sqrt();
    let mut lat = z.atan2(rho * (1.0 - e2));
    let mut n = EARTH_RADIUS_KM;
    for _ in 0..6 {
        let sin_lat = lat.sin();
        n = EARTH_RADIUS_KM / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        lat = (z + n * e2 * sin_lat).atan2(rho);
    }

    let cos_lat = lat.cos();
    let alt = if cos_lat.abs() > 1e-10 {
        rho / cos_lat - n
    } else {
        z.abs() - n * (1.0 - e2)
    };
    (lat, alt)
}
