//! The worker side of a run.
//!
//! A worker only knows its rank and the [Partition] of the run. It derives its own [Block]
//! (see [Partition::block]), waits on its [Link] for the seed table, marks its block, and reports
//! the outcome back over the same [Link]. How the seed table and the report travel is decided by
//! the [Link] implementation of each [crate::Strategy].

use crate::{mark, Bitmap, Block, Error, Partition, SeedTable};
use std::{
    borrow::Borrow,
    time::{Duration, Instant},
};
use tracing::{debug, warn};

/// The result of one worker's marking phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    /// Rank of the reporting worker.
    pub rank: usize,

    /// First integer covered by `bitmap`, as computed by the worker.
    pub start: u64,

    /// Flags of the worker's block (`true` = prime).
    pub bitmap: Bitmap,

    /// Time spent marking (excludes waiting for the seed table).
    pub elapsed: Duration,
}

/// Connection between one worker and the coordinator.
pub trait Link {
    /// The form in which the seed table reaches the worker.
    type Seeds: Borrow<SeedTable>;

    /// Blocks until the coordinator has made the seed table available.
    fn receive(&mut self) -> Result<Self::Seeds, Error>;

    /// Delivers the outcome of worker `rank` to the coordinator.
    fn report(&mut self, rank: usize, outcome: Result<Report, Error>) -> Result<(), Error>;
}

/// Runs worker `rank` to completion over `link`.
///
/// A failure while marking is reported to the coordinator rather than dropped, so the
/// coordinator can abort the run with the cause.
pub fn work<L: Link>(rank: usize, partition: &Partition, link: &mut L) -> Result<(), Error> {
    let outcome = run(rank, partition, link);
    if let Err(err) = &outcome {
        warn!(rank, ?err, "worker failed");
    }
    link.report(rank, outcome)
}

fn run<L: Link>(rank: usize, partition: &Partition, link: &mut L) -> Result<Report, Error> {
    let block: Block = partition.block(rank).ok_or(Error::UnknownRank {
        rank,
        workers: partition.workers(),
    })?;
    let seeds = link.receive()?;
    let seeds: &SeedTable = seeds.borrow();

    let started = Instant::now();
    let bitmap = mark(&block, seeds.primes())?;
    let elapsed = started.elapsed();
    debug!(
        rank,
        start = block.start(),
        len = block.len(),
        ?elapsed,
        "marked block"
    );

    Ok(Report {
        rank,
        start: block.start(),
        bitmap,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Phase;

    /// Hands out a fixed table and records whatever is reported.
    struct Loopback<'a> {
        seeds: Option<&'a SeedTable>,
        outcomes: Vec<(usize, Result<Report, Error>)>,
    }

    impl<'a> Link for Loopback<'a> {
        type Seeds = &'a SeedTable;

        fn receive(&mut self) -> Result<&'a SeedTable, Error> {
            self.seeds.ok_or(Error::RecvFailed(Phase::Distribution))
        }

        fn report(&mut self, rank: usize, outcome: Result<Report, Error>) -> Result<(), Error> {
            self.outcomes.push((rank, outcome));
            Ok(())
        }
    }

    #[test]
    fn test_reports_own_block() {
        let partition = Partition::new(100, 4).unwrap();
        let seeds = SeedTable::compute(partition.bound()).unwrap();
        let mut link = Loopback {
            seeds: Some(&seeds),
            outcomes: Vec::new(),
        };
        work(2, &partition, &mut link).unwrap();

        let (rank, outcome) = link.outcomes.pop().unwrap();
        assert_eq!(rank, 2);
        let report = outcome.unwrap();
        assert_eq!(report.rank, 2);
        assert_eq!(report.start, 57);
        assert_eq!(report.bitmap.len(), 22);
        let primes: Vec<u64> = report
            .bitmap
            .iter_ones()
            .map(|offset| report.start + offset as u64)
            .collect();
        assert_eq!(primes, vec![59, 61, 67, 71, 73]);
    }

    #[test]
    fn test_reports_missing_seeds() {
        let partition = Partition::new(100, 4).unwrap();
        let mut link = Loopback {
            seeds: None,
            outcomes: Vec::new(),
        };
        work(0, &partition, &mut link).unwrap();

        let (rank, outcome) = link.outcomes.pop().unwrap();
        assert_eq!(rank, 0);
        assert!(matches!(
            outcome,
            Err(Error::RecvFailed(Phase::Distribution))
        ));
    }

    #[test]
    fn test_reports_unknown_rank() {
        let partition = Partition::new(100, 4).unwrap();
        let seeds = SeedTable::compute(partition.bound()).unwrap();
        let mut link = Loopback {
            seeds: Some(&seeds),
            outcomes: Vec::new(),
        };
        work(4, &partition, &mut link).unwrap();

        let (_, outcome) = link.outcomes.pop().unwrap();
        assert!(matches!(
            outcome,
            Err(Error::UnknownRank {
                rank: 4,
                workers: 4
            })
        ));
    }
}
