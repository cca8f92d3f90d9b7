use super::{gather, Strategy};
use crate::{
    worker::{work, Link},
    Error, Partition, Phase, Report, SeedTable,
};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use std::{
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc,
    },
    time::Duration,
};
use tracing::debug;

/// A shared-memory execution strategy backed by a rayon thread pool.
///
/// Each worker is a task on the pool. All tasks are spawned up front and block until the
/// coordinator releases the seed table, which every worker then reads through the same [Arc]:
/// the table is never copied. Reports move back to the coordinator over a channel.
///
/// # Thread Pool Ownership
///
/// `Shared` holds an [`Arc<ThreadPool>`], so it can be cheaply cloned and shared across
/// threads. The pool may have fewer threads than there are workers.
///
/// # Timeouts
///
/// If a gather timeout fires, `execute` returns immediately. Workers that have not reported yet
/// keep running on the pool and their late reports are dropped.
///
/// # Examples
///
/// ```
/// use commonware_sieve::{Config, Engine, Shared};
///
/// let strategy = Shared::with_threads(2).unwrap();
/// let output = Engine::new(Config::new(1_000, 4), strategy).unwrap().run().unwrap();
/// assert_eq!(output.sieve.count(), 168);
/// ```
#[derive(Debug, Clone)]
pub struct Shared {
    thread_pool: Arc<ThreadPool>,
}

impl Shared {
    /// Creates a new [`Shared`] strategy with the given [`ThreadPool`].
    pub const fn new(thread_pool: Arc<ThreadPool>) -> Self {
        Self { thread_pool }
    }

    /// Creates a new [`Shared`] strategy with a dedicated pool of `threads` threads.
    pub fn with_threads(threads: usize) -> Result<Self, ThreadPoolBuildError> {
        let thread_pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("sieve-pool-{index}"))
            .build()?;
        Ok(Self::new(Arc::new(thread_pool)))
    }
}

impl From<Arc<ThreadPool>> for Shared {
    fn from(thread_pool: Arc<ThreadPool>) -> Self {
        Self::new(thread_pool)
    }
}

/// One-shot release of the seed table plus a route back to the coordinator.
struct Handoff {
    release: Receiver<Arc<SeedTable>>,
    reports: Sender<Result<Report, Error>>,
}

impl Link for Handoff {
    type Seeds = Arc<SeedTable>;

    fn receive(&mut self) -> Result<Arc<SeedTable>, Error> {
        self.release
            .recv()
            .map_err(|_| Error::RecvFailed(Phase::Distribution))
    }

    fn report(&mut self, rank: usize, outcome: Result<Report, Error>) -> Result<(), Error> {
        self.reports.send(outcome).map_err(|_| Error::SendFailed {
            phase: Phase::Gather,
            rank,
        })
    }
}

impl Strategy for Shared {
    fn execute(
        &self,
        seeds: &Arc<SeedTable>,
        partition: &Partition,
        timeout: Option<Duration>,
    ) -> Result<Vec<Report>, Error> {
        let workers = partition.workers();
        let (report_sender, report_receiver) = mpsc::channel();

        // Spawn every worker before the table is released
        let mut releases = Vec::with_capacity(workers);
        for rank in 0..workers {
            let (release, waiter) = mpsc::sync_channel(1);
            let mut link = Handoff {
                release: waiter,
                reports: report_sender.clone(),
            };
            let partition = *partition;
            self.thread_pool.spawn(move || {
                if let Err(err) = work(rank, &partition, &mut link) {
                    debug!(rank, ?err, "worker exited early");
                }
            });
            releases.push(release);
        }
        drop(report_sender);

        // Release the table (dropping the senders on error unblocks waiting workers)
        for (rank, release) in releases.iter().enumerate() {
            release
                .send(seeds.clone())
                .map_err(|_| Error::SendFailed {
                    phase: Phase::Distribution,
                    rank,
                })?;
        }
        debug!(workers, "released seed table");

        gather(&report_receiver, workers, timeout, |outcome| outcome)
    }
}
