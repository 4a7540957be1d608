use crate::config::GapFillingConfig;
use crate::propagation::Propagator;
use orbitcache_schema::PositionRecord;
use serde::Serialize;
use std::sync::Arc;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// A missing span between two consecutive samples. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GapInfo {
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    pub duration_hours: f64,
    pub use_orbital_calculation: bool,
}

/// A gap together with the two samples that bound it.
#[derive(Debug, Clone, Copy)]
pub struct BoundedGap<'a> {
    pub info: GapInfo,
    pub start: &'a PositionRecord,
    pub end: &'a PositionRecord,
}

/// Stateless gap detection plus filling (see `fill.rs`).
#[derive(Clone)]
pub struct GapAnalyzer {
    pub(crate) config: GapFillingConfig,
    pub(crate) propagator: Arc<dyn Propagator>,
}

impl GapAnalyzer {
    pub fn new(config: GapFillingConfig, propagator: Arc<dyn Propagator>) -> Self {
        Self { config, propagator }
    }

    pub fn config(&self) -> &GapFillingConfig {
        &self.config
    }

    /// Long gaps need propagation; short ones are interpolated.
    pub fn should_use_orbital_calculation(&self, duration_hours: f64) -> bool {
        duration_hours > self.config.orbital_threshold_hours
    }

    pub fn gap_between(&self, start_timestamp: i64, end_timestamp: i64) -> GapInfo {
        let duration_hours = (end_timestamp - start_timestamp) as f64 / SECONDS_PER_HOUR;
        GapInfo {
            start_timestamp,
            end_timestamp,
            duration_hours,
            use_orbital_calculation: self.should_use_orbital_calculation(duration_hours),
        }
    }

    /// Scan ascending samples for intervals larger than the tolerated cadence.
    ///
    /// Pairs that are not strictly ascending are ignored.
    pub fn detect_gaps(
        &self,
        records: &[PositionRecord],
        expected_interval_seconds: i64,
    ) -> Vec<GapInfo> {
        self.scan(records, expected_interval_seconds)
            .into_iter()
            .map(|gap| gap.info)
            .collect()
    }

    /// Gaps whose both boundary samples are observed.
    ///
    /// Once a gap has been filled, every consecutive pair inside it touches a
    /// synthetic sample, so filled spans are not reported again. Unfilled gaps
    /// (stale, or waiting on an element set) keep showing up.
    pub fn detect_open_gaps<'a>(&self, records: &'a [PositionRecord]) -> Vec<BoundedGap<'a>> {
        self.scan(records, self.config.expected_interval_seconds)
            .into_iter()
            .filter(|gap| !gap.start.is_synthetic() && !gap.end.is_synthetic())
            .collect()
    }

    fn scan<'a>(
        &self,
        records: &'a [PositionRecord],
        expected_interval_seconds: i64,
    ) -> Vec<BoundedGap<'a>> {
        let tolerance = expected_interval_seconds.max(1) as f64
            * self.config.gap_tolerance_factor.max(1.0);

        records
            .windows(2)
            .filter_map(|pair| {
                let (start, end) = (&pair[0], &pair[1]);
                let delta = end.timestamp_seconds - start.timestamp_seconds;
                if delta <= 0 || delta as f64 <= tolerance {
                    return None;
                }
                Some(BoundedGap {
                    info: self.gap_between(start.timestamp_seconds, end.timestamp_seconds),
                    start,
                    end,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::KeplerPropagator;
    use orbitcache_schema::PositionOrigin;

    fn analyzer() -> GapAnalyzer {
        GapAnalyzer::new(GapFillingConfig::default(), Arc::new(KeplerPropagator))
    }

    fn sample(ts: i64) -> PositionRecord {
        PositionRecord::observed(ts, 0.0, 0.0, 410.0, 27_600.0, "daylight")
    }

    #[test]
    fn single_gap_is_detected() {
        let records: Vec<_> = [0, 5, 10, 3610].into_iter().map(sample).collect();
        let gaps = analyzer().detect_gaps(&records, 5);

        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].start_timestamp, 10);
        assert_eq!(gaps[0].end_timestamp, 3610);
        assert!((gaps[0].duration_hours - 1.0).abs() < 1e-9);
        assert!(!gaps[0].use_orbital_calculation);
    }

    #[test]
    fn jitter_within_tolerance_is_not_a_gap() {
        let records: Vec<_> = [0, 6, 13, 20, 27].into_iter().map(sample).collect();
        assert!(analyzer().detect_gaps(&records, 5).is_empty());
    }

    #[test]
    fn threshold_routing() {
        let a = analyzer();
        assert!(!a.should_use_orbital_calculation(23.0));
        assert!(a.should_use_orbital_calculation(25.0));
        assert!(a.gap_between(0, 30 * 3600).use_orbital_calculation);
    }

    #[test]
    fn unordered_pairs_are_ignored() {
        let records: Vec<_> = [100, 50, 50].into_iter().map(sample).collect();
        assert!(analyzer().detect_gaps(&records, 5).is_empty());
    }

    #[test]
    fn filled_gaps_are_not_reopened() {
        let mut records = vec![sample(0), sample(5)];
        records.push(PositionRecord::synthetic(
            305,
            0.0,
            0.0,
            410.0,
            27_600.0,
            PositionOrigin::Interpolated,
        ));
        records.push(sample(3605));
        records.push(sample(3610));
        records.push(sample(7200));

        let open = analyzer().detect_open_gaps(&records);
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].start.timestamp_seconds, 3610);
        assert_eq!(open[0].end.timestamp_seconds, 7200);
    }
}
