//! Split the range past the seed bound into one contiguous block per worker.

use crate::Error;
use std::ops::RangeInclusive;

/// Returns `⌊√n⌋`.
pub fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }

    // The float estimate can be off by one in either direction for large inputs
    let mut root = (n as f64).sqrt() as u64;
    while root.checked_mul(root).map_or(true, |square| square > n) {
        root -= 1;
    }
    while (root + 1)
        .checked_mul(root + 1)
        .is_some_and(|square| square <= n)
    {
        root += 1;
    }
    root
}

/// A contiguous interval `[start, end]` assigned to exactly one worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Block {
    rank: usize,
    start: u64,
    len: u64,
}

impl Block {
    /// Returns the rank of the worker that owns the block.
    pub const fn rank(&self) -> usize {
        self.rank
    }

    /// Returns the first integer in the block.
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// Returns the last integer in the block.
    ///
    /// For an empty block this is `start - 1`.
    pub const fn end(&self) -> u64 {
        self.start + self.len - 1
    }

    /// Returns the number of integers in the block.
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if the block covers no integers.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the integers covered by the block.
    pub fn range(&self) -> RangeInclusive<u64> {
        self.start..=self.end()
    }
}

/// Assignment of `(M, N]` to `W` workers, where `M = ⌊√N⌋`.
///
/// With `R = N - M`, every worker receives `⌊R / W⌋` integers and the first `R mod W` workers
/// receive one more. Blocks are ordered by rank, pairwise disjoint, and leave no gap. When
/// `R < W`, the trailing workers receive empty blocks positioned at `N + 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Partition {
    limit: u64,
    bound: u64,
    workers: usize,
    base: u64,
    remainder: u64,
}

impl Partition {
    /// Creates the partition of `(⌊√limit⌋, limit]` across `workers` workers.
    pub fn new(limit: u64, workers: usize) -> Result<Self, Error> {
        if limit < 2 {
            return Err(Error::InvalidLimit(limit));
        }
        if workers < 1 {
            return Err(Error::InvalidWorkers(workers));
        }
        if u32::try_from(workers).is_err() {
            return Err(Error::TooManyWorkers(workers));
        }

        // Empty blocks start at N + 1
        if limit == u64::MAX {
            return Err(Error::LimitTooLarge(limit));
        }
        let bound = isqrt(limit);
        let total = limit - bound;
        let count = workers as u64;
        Ok(Self {
            limit,
            bound,
            workers,
            base: total / count,
            remainder: total % count,
        })
    }

    /// Returns the largest integer tested (`N`).
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Returns the seed bound (`M = ⌊√N⌋`).
    pub const fn bound(&self) -> u64 {
        self.bound
    }

    /// Returns the number of workers (`W`).
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Returns the number of integers shared among the workers (`R = N - M`).
    pub const fn total(&self) -> u64 {
        self.limit - self.bound
    }

    /// Returns the block assigned to `rank`, or `None` if there is no such worker.
    pub fn block(&self, rank: usize) -> Option<Block> {
        if rank >= self.workers {
            return None;
        }
        let k = rank as u64;
        let first = self.bound + 1;
        let block = if k < self.remainder {
            Block {
                rank,
                start: first + k * (self.base + 1),
                len: self.base + 1,
            }
        } else {
            Block {
                rank,
                start: first + self.remainder * (self.base + 1) + (k - self.remainder) * self.base,
                len: self.base,
            }
        };
        Some(block)
    }

    /// Returns the blocks of all workers, ordered by rank.
    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        (0..self.workers).filter_map(|rank| self.block(rank))
    }
}
