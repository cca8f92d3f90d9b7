use super::Strategy;
use crate::{
    worker::{work, Link},
    Error, Partition, Report, SeedTable,
};
use std::{sync::Arc, time::Duration};

/// A sequential execution strategy.
///
/// Every worker runs to completion on the current thread before the next one starts. Workers
/// borrow the coordinator's seed table directly. Useful for:
///
/// - Debugging and testing (deterministic execution)
/// - Small limits where spawning workers costs more than marking
/// - Baselines when comparing against the parallel models
///
/// The gather timeout is ignored: no worker is ever waited on.
#[derive(Default, Debug, Clone)]
pub struct Sequential;

/// Hands the borrowed seed table to an inline worker and keeps its outcome.
struct Inline<'a> {
    seeds: &'a SeedTable,
    outcomes: &'a mut Vec<Result<Report, Error>>,
}

impl<'a> Link for Inline<'a> {
    type Seeds = &'a SeedTable;

    fn receive(&mut self) -> Result<&'a SeedTable, Error> {
        Ok(self.seeds)
    }

    fn report(&mut self, _rank: usize, outcome: Result<Report, Error>) -> Result<(), Error> {
        self.outcomes.push(outcome);
        Ok(())
    }
}

impl Strategy for Sequential {
    fn execute(
        &self,
        seeds: &Arc<SeedTable>,
        partition: &Partition,
        _timeout: Option<Duration>,
    ) -> Result<Vec<Report>, Error> {
        let mut outcomes = Vec::with_capacity(partition.workers());
        for rank in 0..partition.workers() {
            let mut link = Inline {
                seeds: seeds.as_ref(),
                outcomes: &mut outcomes,
            };
            work(rank, partition, &mut link)?;
        }
        outcomes.into_iter().collect()
    }
}
