//! Reduce per-worker timings to the duration of a run.

use crate::Report;
use std::time::Duration;

/// The marking time measured by one worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimingSample {
    pub rank: usize,
    pub elapsed: Duration,
}

/// Marking times of every worker in a run, ordered by rank.
///
/// Workers run concurrently, so the duration of a run is that of its slowest worker.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Timings {
    samples: Vec<TimingSample>,
}

impl Timings {
    /// Creates a set of timings from `samples` in any order.
    pub fn new(mut samples: Vec<TimingSample>) -> Self {
        samples.sort_by_key(|sample| sample.rank);
        Self { samples }
    }

    /// Extracts the timing of every report.
    pub fn from_reports(reports: &[Report]) -> Self {
        reports
            .iter()
            .map(|report| TimingSample {
                rank: report.rank,
                elapsed: report.elapsed,
            })
            .collect()
    }

    /// Returns the longest marking time, or zero if there are no samples.
    pub fn max(&self) -> Duration {
        self.slowest()
            .map(|sample| sample.elapsed)
            .unwrap_or(Duration::ZERO)
    }

    /// Returns the sample of the slowest worker (lowest rank on ties).
    pub fn slowest(&self) -> Option<&TimingSample> {
        self.samples
            .iter()
            .rev()
            .max_by_key(|sample| sample.elapsed)
    }

    pub fn samples(&self) -> &[TimingSample] {
        &self.samples
    }
}

impl FromIterator<TimingSample> for Timings {
    fn from_iter<I: IntoIterator<Item = TimingSample>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
