//! Compute primes with a parallel segmented sieve.
//!
//! # Overview
//!
//! The sieve finds every prime up to a limit `N` in three phases:
//!
//! 1. The coordinator sequentially sieves the seed range `[2, ⌊√N⌋]` into a [SeedTable].
//! 2. The remaining range `(⌊√N⌋, N]` is split by a [Partition] into `W` contiguous [Block]s.
//!    Each worker receives the seed table, strikes the multiples of every seed prime inside its
//!    own block, and reports the resulting bitmap back to the coordinator.
//! 3. The coordinator's [Collector] waits for all `W` reports and places each bitmap at the
//!    offset of its block, producing a single [Sieve] over `[0, N]`.
//!
//! Every worker also times its marking phase. The coordinator reduces these samples to the
//! slowest worker's duration (see [Timings]).
//!
//! # Execution Models
//!
//! The partitioning and marking logic is identical regardless of how workers are scheduled. The
//! [Strategy] trait abstracts over the scheduling model:
//!
//! - [Sequential]: every worker runs in turn on the caller's thread.
//! - [Shared]: workers run on a rayon thread pool and read one seed table by reference.
//! - [Isolated]: workers share no memory with the coordinator and exchange encoded [wire]
//!   messages over channels, as independent processes would.
//!
//! # Example
//!
//! ```
//! use commonware_sieve::{Config, Engine, Sequential};
//!
//! let engine = Engine::new(Config::new(30, 3), Sequential).unwrap();
//! let output = engine.run().unwrap();
//! assert_eq!(
//!     output.sieve.primes().collect::<Vec<_>>(),
//!     vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]
//! );
//! ```

#![doc(
    html_logo_url = "https://commonware.xyz/imgs/rustdoc_logo.svg",
    html_favicon_url = "https://commonware.xyz/favicon.ico"
)]

use std::{
    fmt::{self, Display, Formatter},
    time::Duration,
};
use thiserror::Error;

pub mod bitmap;
pub use bitmap::Bitmap;
mod collector;
pub use collector::{Collector, Placement, Sieve};
mod engine;
pub use engine::{sieve, Engine, Output};
mod marker;
pub use marker::mark;
mod partition;
pub use partition::{isqrt, Block, Partition};
mod seed;
pub use seed::SeedTable;
pub mod strategy;
pub use strategy::{Isolated, Sequential, Shared, Strategy};
mod timing;
pub use timing::{TimingSample, Timings};
pub mod wire;
pub mod worker;
pub use worker::{Link, Report};

/// The stage of a run in which an [Error] occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Checking the [Config] before any work starts.
    Validation,
    /// Sieving the seed range on the coordinator.
    Seeding,
    /// Delivering the seed table to the workers.
    Distribution,
    /// Striking composites inside a worker's block.
    Marking,
    /// Collecting worker reports on the coordinator.
    Gather,
}

impl Phase {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Self::Validation => 0,
            Self::Seeding => 1,
            Self::Distribution => 2,
            Self::Marking => 3,
            Self::Gather => 4,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Validation),
            1 => Some(Self::Seeding),
            2 => Some(Self::Distribution),
            3 => Some(Self::Marking),
            4 => Some(Self::Gather),
            _ => None,
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "configuration validation",
            Self::Seeding => "seed computation",
            Self::Distribution => "distribution",
            Self::Marking => "marking",
            Self::Gather => "gather",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while computing a [Sieve].
///
/// Every error aborts the whole run: no partial result is ever returned.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid limit {0}: must be at least 2")]
    InvalidLimit(u64),
    #[error("invalid worker count {0}: must be at least 1")]
    InvalidWorkers(usize),
    #[error("too many workers: {0}")]
    TooManyWorkers(usize),
    #[error("limit {0} exceeds addressable memory")]
    LimitTooLarge(u64),
    #[error("allocation of {bits} bits failed during {phase}")]
    AllocationFailed { phase: Phase, bits: usize },
    #[error("failed to spawn worker {0}")]
    SpawnFailed(usize),
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("send to worker {rank} failed during {phase}")]
    SendFailed { phase: Phase, rank: usize },
    #[error("receive failed during {0}")]
    RecvFailed(Phase),
    #[error("timed out during {0}")]
    Timeout(Phase),
    #[error("report from unknown worker {rank} (workers: {workers})")]
    UnknownRank { rank: usize, workers: usize },
    #[error("duplicate report from worker {0}")]
    DuplicateReport(usize),
    #[error("missing reports: received {received} of {expected}")]
    MissingReports { received: usize, expected: usize },
    #[error("worker {rank} reported offset {found}, expected {expected}")]
    OffsetMismatch { rank: usize, expected: u64, found: u64 },
    #[error("worker {rank} reported {found} flags, expected {expected}")]
    SizeMismatch {
        rank: usize,
        expected: usize,
        found: usize,
    },
    #[error("seed table holds {found} flags, expected {expected}")]
    SeedMismatch { expected: usize, found: usize },
    #[error("malformed message during {phase}: {source}")]
    Decode {
        phase: Phase,
        #[source]
        source: commonware_codec::Error,
    },
    #[error("worker {rank} failed during {phase}")]
    WorkerFailed { rank: usize, phase: Phase },
}

impl Error {
    /// Returns the [Phase] in which the error occurred.
    pub fn phase(&self) -> Phase {
        match self {
            Self::InvalidLimit(_)
            | Self::InvalidWorkers(_)
            | Self::TooManyWorkers(_)
            | Self::LimitTooLarge(_) => Phase::Validation,
            Self::AllocationFailed { phase, .. }
            | Self::SendFailed { phase, .. }
            | Self::Decode { phase, .. }
            | Self::WorkerFailed { phase, .. } => *phase,
            Self::RecvFailed(phase) | Self::Timeout(phase) => *phase,
            Self::SpawnFailed(_) | Self::ThreadPool(_) | Self::SeedMismatch { .. } => {
                Phase::Distribution
            }
            Self::UnknownRank { .. }
            | Self::DuplicateReport(_)
            | Self::MissingReports { .. }
            | Self::OffsetMismatch { .. }
            | Self::SizeMismatch { .. } => Phase::Gather,
        }
    }
}

/// Configuration for an [Engine].
#[derive(Clone, Debug)]
pub struct Config {
    /// Largest number tested for primality (`N`).
    pub limit: u64,

    /// Number of workers sharing the range past the seed bound (`W`).
    pub workers: usize,

    /// Maximum time to wait for the next worker report.
    ///
    /// If `None`, the coordinator waits indefinitely.
    pub gather_timeout: Option<Duration>,
}

impl Config {
    /// Creates a configuration without a gather timeout.
    pub fn new(limit: u64, workers: usize) -> Self {
        Self {
            limit,
            workers,
            gather_timeout: None,
        }
    }

    /// Checks that the configuration describes a run that can be attempted.
    pub fn validate(&self) -> Result<(), Error> {
        if self.limit < 2 {
            return Err(Error::InvalidLimit(self.limit));
        }
        if self.workers < 1 {
            return Err(Error::InvalidWorkers(self.workers));
        }
        if u32::try_from(self.workers).is_err() {
            return Err(Error::TooManyWorkers(self.workers));
        }

        // The global result holds one flag for every integer in [0, N]
        let addressable = usize::try_from(self.limit)
            .ok()
            .and_then(|limit| limit.checked_add(1));
        if addressable.is_none() {
            return Err(Error::LimitTooLarge(self.limit));
        }
        Ok(())
    }
}
