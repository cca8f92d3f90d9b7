//! Drive a run from configuration to result.

use crate::{Collector, Config, Error, Partition, SeedTable, Sequential, Sieve, Strategy, Timings};
use std::{sync::Arc, time::Instant};
use tracing::info;

/// The result of a successful run.
#[derive(Clone, Debug)]
pub struct Output {
    /// Primality flags over `[0, N]`.
    pub sieve: Sieve,

    /// Marking time of every worker.
    pub timings: Timings,
}

/// Coordinates seeding, distribution, marking, and gathering under a [Strategy].
#[derive(Clone, Debug)]
pub struct Engine<S: Strategy> {
    config: Config,
    strategy: S,
    partition: Partition,
}

impl<S: Strategy> Engine<S> {
    /// Validates `config` and plans the partition of the run.
    pub fn new(config: Config, strategy: S) -> Result<Self, Error> {
        config.validate()?;
        let partition = Partition::new(config.limit, config.workers)?;
        Ok(Self {
            config,
            strategy,
            partition,
        })
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Computes every prime up to the configured limit.
    ///
    /// Any failure in any phase aborts the run.
    pub fn run(&self) -> Result<Output, Error> {
        let partition = &self.partition;
        info!(
            limit = partition.limit(),
            workers = partition.workers(),
            bound = partition.bound(),
            strategy = ?self.strategy,
            "starting sieve"
        );
        let started = Instant::now();

        let seeds = Arc::new(SeedTable::compute(partition.bound())?);
        let reports = self
            .strategy
            .execute(&seeds, partition, self.config.gather_timeout)?;
        let timings = Timings::from_reports(&reports);
        let sieve = Collector::new(*partition).collect(&seeds, reports)?;

        info!(
            primes = sieve.count(),
            slowest = ?timings.max(),
            total = ?started.elapsed(),
            "sieve complete"
        );
        Ok(Output { sieve, timings })
    }
}

/// Computes every prime up to `limit` using `workers` sequential workers.
pub fn sieve(limit: u64, workers: usize) -> Result<Sieve, Error> {
    let engine = Engine::new(Config::new(limit, workers), Sequential)?;
    Ok(engine.run()?.sieve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Phase;
    use commonware_macros::test_traced;

    #[test_traced]
    fn test_thirty_across_three() {
        let engine = Engine::new(Config::new(30, 3), Sequential).unwrap();
        let blocks: Vec<(u64, u64)> = engine
            .partition()
            .blocks()
            .map(|block| (block.start(), block.end()))
            .collect();
        assert_eq!(blocks, vec![(6, 14), (15, 22), (23, 30)]);

        let output = engine.run().unwrap();
        assert_eq!(output.timings.samples().len(), 3);
        assert_eq!(
            output.sieve.primes().collect::<Vec<_>>(),
            vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]
        );
    }

    #[test_traced]
    fn test_rejects_config() {
        let err = Engine::new(Config::new(1, 1), Sequential).unwrap_err();
        assert_eq!(err.phase(), Phase::Validation);
        let err = Engine::new(Config::new(10, 0), Sequential).unwrap_err();
        assert_eq!(err.phase(), Phase::Validation);
    }

    #[test_traced]
    fn test_sieve() {
        assert_eq!(sieve(2, 1).unwrap().primes().collect::<Vec<_>>(), vec![2]);
        assert_eq!(sieve(10_000, 8).unwrap().count(), 1_229);
    }
}
