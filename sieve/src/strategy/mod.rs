//! Schedule workers under different execution models.
//!
//! A [Strategy] decides where workers run and how the seed table and reports travel between
//! them and the coordinator. Every strategy runs the same [crate::worker::work] routine, so the
//! partitioning and marking logic never depends on the model chosen:
//!
//! - [Sequential]: workers run one after another on the current thread.
//! - [Shared]: workers run on a rayon thread pool and borrow the coordinator's seed table.
//! - [Isolated]: workers run on dedicated threads that only exchange encoded messages.

use crate::{Error, Partition, Phase, Report, SeedTable};
use std::{
    fmt,
    sync::{
        mpsc::{Receiver, RecvTimeoutError},
        Arc,
    },
    time::Duration,
};

mod isolated;
pub use isolated::Isolated;
mod sequential;
pub use sequential::Sequential;
mod shared;
pub use shared::Shared;

/// An execution model for the workers of a run.
pub trait Strategy: Clone + Send + Sync + fmt::Debug + 'static {
    /// Starts one worker per block of `partition`, makes `seeds` available to all of them, and
    /// waits until every worker has reported.
    ///
    /// Reports are returned in arrival order. If `timeout` is set, waiting longer than `timeout`
    /// for any single report aborts the run.
    fn execute(
        &self,
        seeds: &Arc<SeedTable>,
        partition: &Partition,
        timeout: Option<Duration>,
    ) -> Result<Vec<Report>, Error>;
}

/// Receives the next message, waiting at most `timeout` if one is set.
fn recv<T>(receiver: &Receiver<T>, timeout: Option<Duration>, phase: Phase) -> Result<T, Error> {
    match timeout {
        Some(timeout) => receiver.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => Error::Timeout(phase),
            RecvTimeoutError::Disconnected => Error::RecvFailed(phase),
        }),
        None => receiver.recv().map_err(|_| Error::RecvFailed(phase)),
    }
}

/// Waits for `workers` messages on `receiver` and converts each into a [Report].
///
/// If every sender hangs up before `workers` messages arrive, the reports received so far are
/// discarded.
fn gather<T, F>(
    receiver: &Receiver<T>,
    workers: usize,
    timeout: Option<Duration>,
    mut parse: F,
) -> Result<Vec<Report>, Error>
where
    F: FnMut(T) -> Result<Report, Error>,
{
    let mut reports = Vec::with_capacity(workers);
    while reports.len() < workers {
        let message = match recv(receiver, timeout, Phase::Gather) {
            Ok(message) => message,
            Err(Error::RecvFailed(_)) => {
                return Err(Error::MissingReports {
                    received: reports.len(),
                    expected: workers,
                })
            }
            Err(err) => return Err(err),
        };
        reports.push(parse(message)?);
    }
    Ok(reports)
}
