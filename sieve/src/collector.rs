//! Assemble worker reports into the global result.

use crate::{Bitmap, Error, Partition, Phase, Report, SeedTable};
use std::ops::{Bound, RangeBounds};
use tracing::debug;

/// Flags over `[0, N]`, where bit `n` is set iff `n` is prime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sieve {
    limit: u64,
    flags: Bitmap,
}

impl Sieve {
    /// Returns the largest integer covered (`N`).
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Returns true if `n` is prime. Integers past the limit are never prime.
    pub fn is_prime(&self, n: u64) -> bool {
        usize::try_from(n)
            .ok()
            .and_then(|index| self.flags.get(index))
            .unwrap_or(false)
    }

    /// Returns all primes up to the limit in ascending order.
    pub fn primes(&self) -> impl Iterator<Item = u64> + '_ {
        self.flags.iter_ones().map(|index| index as u64)
    }

    /// Returns the primes inside `range`, clamped to `[0, N]`, in ascending order.
    pub fn primes_in(&self, range: impl RangeBounds<u64>) -> impl Iterator<Item = u64> + '_ {
        let low = match range.start_bound() {
            Bound::Included(&low) => Some(low),
            Bound::Excluded(&low) => low.checked_add(1),
            Bound::Unbounded => Some(0),
        };
        let high = match range.end_bound() {
            Bound::Included(&high) => Some(high.min(self.limit)),
            Bound::Excluded(&high) => high.checked_sub(1).map(|high| high.min(self.limit)),
            Bound::Unbounded => Some(self.limit),
        };
        let span = match (low, high) {
            (Some(low), Some(high)) => low..=high,
            #[allow(clippy::reversed_empty_ranges)]
            _ => 1..=0,
        };
        span.filter(|&n| self.is_prime(n))
    }

    /// Returns the number of primes up to the limit.
    pub fn count(&self) -> usize {
        self.flags.count_ones()
    }

    /// Returns the underlying flags.
    pub const fn flags(&self) -> &Bitmap {
        &self.flags
    }
}

/// Where the [Collector] writes one worker's bitmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// First integer covered by the worker.
    pub offset: u64,

    /// Number of flags the worker must report.
    pub len: u64,
}

/// Gathers the seed flags and every worker's bitmap into a [Sieve].
///
/// The collector derives the placement of each worker on its own by walking the block sizes in
/// rank order, rather than trusting the offsets workers compute. A report whose offset or size
/// disagrees with that placement aborts the collection.
#[derive(Clone, Debug)]
pub struct Collector {
    partition: Partition,
    placements: Vec<Placement>,
}

impl Collector {
    /// Creates a collector for the reports of `partition`.
    pub fn new(partition: Partition) -> Self {
        let workers = partition.workers() as u64;
        let base = partition.total() / workers;
        let larger = partition.total() % workers;

        let mut offset = partition.bound() + 1;
        let mut placements = Vec::with_capacity(partition.workers());
        for rank in 0..workers {
            let len = if rank < larger { base + 1 } else { base };
            placements.push(Placement { offset, len });
            offset += len;
        }
        Self {
            partition,
            placements,
        }
    }

    /// Returns the placement of every worker, ordered by rank.
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Merges `seeds` and one report per worker into a [Sieve].
    ///
    /// Reports may be supplied in any order.
    pub fn collect(&self, seeds: &SeedTable, reports: Vec<Report>) -> Result<Sieve, Error> {
        let partition = &self.partition;
        let seed_flags = seeds.flags();
        let expected = (partition.bound() + 1) as usize;
        if seeds.bound() != partition.bound() || seed_flags.len() != expected {
            return Err(Error::SeedMismatch {
                expected,
                found: seed_flags.len(),
            });
        }

        let size = partition.limit() as usize + 1;
        let mut flags = Bitmap::zeroes(size).map_err(|_| Error::AllocationFailed {
            phase: Phase::Gather,
            bits: size,
        })?;
        for index in seed_flags.iter_ones() {
            flags.set(index);
        }

        let workers = partition.workers();
        let mut received = vec![false; workers];
        for report in &reports {
            let rank = report.rank;
            let Some(placement) = self.placements.get(rank) else {
                return Err(Error::UnknownRank { rank, workers });
            };
            if received[rank] {
                return Err(Error::DuplicateReport(rank));
            }
            if report.start != placement.offset {
                return Err(Error::OffsetMismatch {
                    rank,
                    expected: placement.offset,
                    found: report.start,
                });
            }
            if report.bitmap.len() as u64 != placement.len {
                return Err(Error::SizeMismatch {
                    rank,
                    expected: placement.len as usize,
                    found: report.bitmap.len(),
                });
            }

            let offset = placement.offset as usize;
            for index in report.bitmap.iter_ones() {
                flags.set(offset + index);
            }
            received[rank] = true;
        }

        let count = received.iter().filter(|&&received| received).count();
        if count != workers {
            return Err(Error::MissingReports {
                received: count,
                expected: workers,
            });
        }
        debug!(workers, limit = partition.limit(), "collected reports");

        Ok(Sieve {
            limit: partition.limit(),
            flags,
        })
    }
}
