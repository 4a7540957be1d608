use crate::analyzer::{BoundedGap, GapAnalyzer, GapInfo};
use crate::propagation::PropagationError;
use orbitcache_schema::{PositionOrigin, PositionRecord, TleRecord};

/// Outcome of trying to bridge one gap.
#[derive(Debug, Clone, PartialEq)]
pub enum GapFill {
    Interpolated(Vec<PositionRecord>),
    Propagated(Vec<PositionRecord>),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Longer than `max_gap_hours`; the absence is preserved.
    ExceedsMaxGap,
    /// Needs propagation but no element set is cached yet.
    NoElementSet,
    /// No sample fits strictly inside the gap at the chosen step.
    NoInteriorSteps,
}

impl GapFill {
    pub fn records(&self) -> &[PositionRecord] {
        match self {
            GapFill::Interpolated(records) | GapFill::Propagated(records) => records,
            GapFill::Skipped(_) => &[],
        }
    }

    pub fn into_records(self) -> Vec<PositionRecord> {
        match self {
            GapFill::Interpolated(records) | GapFill::Propagated(records) => records,
            GapFill::Skipped(_) => Vec::new(),
        }
    }
}

impl GapAnalyzer {
    pub fn exceeds_max_gap(&self, gap: &GapInfo) -> bool {
        gap.duration_hours > self.config.max_gap_hours
    }

    /// Propagate the element set across the gap.
    pub fn fill_gap_with_orbital(
        &self,
        gap: &GapInfo,
        tle: &TleRecord,
    ) -> Result<Vec<PositionRecord>, PropagationError> {
        if self.exceeds_max_gap(gap) {
            return Ok(Vec::new());
        }

        let step = self.config.synthetic_step_seconds;
        interior_steps(gap.start_timestamp, gap.end_timestamp, step)
            .map(|ts| {
                let p = self.propagator.compute_position(tle, ts)?;
                Ok(PositionRecord::synthetic(
                    ts,
                    p.latitude,
                    p.longitude,
                    p.altitude_km,
                    p.velocity_kmh,
                    PositionOrigin::Propagated,
                ))
            })
            .collect()
    }

    /// Straight-line bridge between the boundary samples at the live feed's
    /// cadence. Longitude follows the short way around the antimeridian.
    pub fn fill_gap_with_interpolation(
        &self,
        gap: &GapInfo,
        start: &PositionRecord,
        end: &PositionRecord,
    ) -> Vec<PositionRecord> {
        if self.exceeds_max_gap(gap) {
            return Vec::new();
        }

        let span = (end.timestamp_seconds - start.timestamp_seconds) as f64;
        if span <= 0.0 {
            return Vec::new();
        }

        let mut dlon = end.longitude - start.longitude;
        if dlon > 180.0 {
            dlon -= 360.0;
        } else if dlon < -180.0 {
            dlon += 360.0;
        }

        let step = self.config.expected_interval_seconds;
        interior_steps(gap.start_timestamp, gap.end_timestamp, step)
            .map(|ts| {
                let f = (ts - start.timestamp_seconds) as f64 / span;
                PositionRecord::synthetic(
                    ts,
                    lerp(start.latitude, end.latitude, f),
                    wrap_longitude(start.longitude + dlon * f),
                    lerp(start.altitude_km, end.altitude_km, f),
                    lerp(start.velocity_kmh, end.velocity_kmh, f),
                    PositionOrigin::Interpolated,
                )
            })
            .collect()
    }

    /// Pick a strategy for `gap` and run it.
    pub fn fill_gap(
        &self,
        gap: &BoundedGap<'_>,
        tle: Option<&TleRecord>,
    ) -> Result<GapFill, PropagationError> {
        if self.exceeds_max_gap(&gap.info) {
            return Ok(GapFill::Skipped(SkipReason::ExceedsMaxGap));
        }

        let fill = if gap.info.use_orbital_calculation {
            let Some(tle) = tle else {
                return Ok(GapFill::Skipped(SkipReason::NoElementSet));
            };
            GapFill::Propagated(self.fill_gap_with_orbital(&gap.info, tle)?)
        } else {
            GapFill::Interpolated(self.fill_gap_with_interpolation(&gap.info, gap.start, gap.end))
        };

        if fill.records().is_empty() {
            return Ok(GapFill::Skipped(SkipReason::NoInteriorSteps));
        }
        Ok(fill)
    }
}

/// Timestamps strictly inside the gap, `step` seconds apart. The boundary
/// samples are observed data and are never regenerated.
fn interior_steps(start: i64, end: i64, step: i64) -> impl Iterator<Item = i64> {
    let step = step.max(1);
    (1..)
        .map(move |k| start + k * step)
        .take_while(move |ts| *ts < end)
}

fn lerp(a: f64, b: f64, f: f64) -> f64 {
    a + (b - a) * f
}

fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GapFillingConfig;
    use crate::propagation::{PropagatedPosition, Propagator};
    use orbitcache_schema::{SYNTHETIC_VISIBILITY, TleSource};
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[derive(Default)]
    struct CountingPropagator {
        calls: AtomicUsize,
    }

    impl Propagator for CountingPropagator {
        fn compute_position(
            &self,
            _tle: &TleRecord,
            timestamp_seconds: i64,
        ) -> Result<PropagatedPosition, PropagationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PropagatedPosition {
                latitude: (timestamp_seconds % 50) as f64,
                longitude: 10.0,
                altitude_km: 415.0,
                velocity_kmh: 27_600.0,
            })
        }
    }

    fn tle() -> TleRecord {
        TleRecord::new("1 ...".to_string(), "2 ...".to_string(), 0, TleSource::Primary)
    }

    fn sample(ts: i64, lon: f64) -> PositionRecord {
        PositionRecord::observed(ts, 10.0, lon, 410.0, 27_600.0, "eclipsed")
    }

    fn analyzer(propagator: Arc<CountingPropagator>) -> GapAnalyzer {
        GapAnalyzer::new(GapFillingConfig::default(), propagator)
    }

    #[test]
    fn orbital_fill_steps_inside_the_gap() {
        let propagator = Arc::new(CountingPropagator::default());
        let a = analyzer(propagator.clone());
        let gap = a.gap_between(0, 30 * 3600);

        let records = a.fill_gap_with_orbital(&gap, &tle()).expect("propagates");

        // 30h at 300s steps, boundaries excluded.
        assert_eq!(records.len(), 359);
        assert_eq!(propagator.calls.load(Ordering::SeqCst), 359);
        assert_eq!(records.first().map(|r| r.timestamp_seconds), Some(300));
        assert_eq!(records.last().map(|r| r.timestamp_seconds), Some(30 * 3600 - 300));
        assert!(records.iter().all(|r| r.origin == PositionOrigin::Propagated
            && r.visibility == SYNTHETIC_VISIBILITY));
    }

    #[test]
    fn stale_gap_is_not_filled() {
        let propagator = Arc::new(CountingPropagator::default());
        let a = analyzer(propagator.clone());
        let gap = a.gap_between(0, 200 * 3600);
        assert!((gap.duration_hours - 200.0).abs() < 1e-9);

        let records = a.fill_gap_with_orbital(&gap, &tle()).expect("no error");
        assert!(records.is_empty());
        assert_eq!(propagator.calls.load(Ordering::SeqCst), 0);

        let start = sample(0, 0.0);
        let end = sample(200 * 3600, 0.0);
        let bounded = BoundedGap {
            info: gap,
            start: &start,
            end: &end,
        };
        assert_eq!(
            a.fill_gap(&bounded, Some(&tle())).expect("no error"),
            GapFill::Skipped(SkipReason::ExceedsMaxGap)
        );
    }

    #[test]
    fn interpolation_crosses_the_antimeridian() {
        let a = analyzer(Arc::new(CountingPropagator::default()));
        let start = sample(0, 170.0);
        let end = sample(1200, -170.0);
        let gap = a.gap_between(0, 1200);

        let records = a.fill_gap_with_interpolation(&gap, &start, &end);
        let lon_at = |ts: i64| {
            records
                .iter()
                .find(|r| r.timestamp_seconds == ts)
                .map(|r| r.longitude)
                .expect("sample at step")
        };

        // 5 s cadence, boundaries excluded.
        assert_eq!(records.len(), 239);
        assert!((lon_at(300) - 175.0).abs() < 1e-9);
        assert!((lon_at(600) - -180.0).abs() < 1e-9);
        assert!((lon_at(900) - -175.0).abs() < 1e-9);
        assert!(records.iter().all(|r| r.origin == PositionOrigin::Interpolated));
    }

    #[test]
    fn long_gap_without_tle_waits() {
        let a = analyzer(Arc::new(CountingPropagator::default()));
        let start = sample(0, 0.0);
        let end = sample(48 * 3600, 0.0);
        let bounded = BoundedGap {
            info: a.gap_between(0, 48 * 3600),
            start: &start,
            end: &end,
        };
        assert_eq!(
            a.fill_gap(&bounded, None).expect("no error"),
            GapFill::Skipped(SkipReason::NoElementSet)
        );
    }

    #[test]
    fn one_minute_outage_is_bridged_at_feed_cadence() {
        let a = analyzer(Arc::new(CountingPropagator::default()));
        let series = vec![sample(0, 0.0), sample(5, 0.1), sample(65, 1.3), sample(70, 1.4)];

        let gaps = a.detect_open_gaps(&series);
        assert_eq!(gaps.len(), 1);
        let records = match a.fill_gap(&gaps[0], None).expect("no error") {
            GapFill::Interpolated(records) => records,
            other => panic!("expected interpolation, got {other:?}"),
        };
        let stamps: Vec<i64> = records.iter().map(|r| r.timestamp_seconds).collect();
        assert_eq!(stamps, (10..65).step_by(5).collect::<Vec<_>>());

        let mut bridged = series.clone();
        bridged.extend(records);
        bridged.sort_by_key(|r| r.timestamp_seconds);
        assert!(a.detect_gaps(&bridged, 5).is_empty());
        assert!(a.detect_open_gaps(&bridged).is_empty());
    }

    #[test]
    fn gap_narrower_than_one_step_is_skipped() {
        let a = analyzer(Arc::new(CountingPropagator::default()));
        let start = sample(0, 0.0);
        let end = sample(5, 0.1);
        let bounded = BoundedGap {
            info: a.gap_between(0, 5),
            start: &start,
            end: &end,
        };
        assert_eq!(
            a.fill_gap(&bounded, None).expect("no error"),
            GapFill::Skipped(SkipReason::NoInteriorSteps)
        );
    }
}
