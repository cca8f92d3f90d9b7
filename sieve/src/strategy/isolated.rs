use super::{gather, Strategy};
use crate::{
    wire::{Message, Seeds},
    worker::{work, Link},
    Error, Partition, Phase, Report, SeedTable,
};
use bytes::Bytes;
use commonware_codec::{Decode, Encode, RangeCfg};
use std::{
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc,
    },
    thread,
    time::Duration,
};
use tracing::{debug, warn};

/// A message-passing execution strategy.
///
/// Each worker runs on its own named thread and shares nothing with the coordinator but two
/// byte channels, as an independent process would. The coordinator encodes the seed flags once
/// and sends every worker its own copy. Workers decode the flags into a private seed table and
/// send back an encoded report tagged with their rank.
///
/// If a gather timeout fires, `execute` returns immediately and unresponsive workers are left
/// detached.
#[derive(Default, Debug, Clone)]
pub struct Isolated;

/// The byte channels of one isolated worker.
struct Mailbox {
    bound: u64,
    seeds: Receiver<Bytes>,
    reports: Sender<Bytes>,
}

impl Link for Mailbox {
    type Seeds = SeedTable;

    fn receive(&mut self) -> Result<SeedTable, Error> {
        let message = self
            .seeds
            .recv()
            .map_err(|_| Error::RecvFailed(Phase::Distribution))?;
        let seeds = Seeds::decode_cfg(message, &()).map_err(|source| Error::Decode {
            phase: Phase::Distribution,
            source,
        })?;
        if seeds.bound != self.bound {
            return Err(Error::SeedMismatch {
                expected: usize::try_from(self.bound)
                    .unwrap_or(usize::MAX)
                    .saturating_add(1),
                found: seeds.flags.len(),
            });
        }
        SeedTable::from_flags(seeds.bound, seeds.flags)
    }

    fn report(&mut self, rank: usize, outcome: Result<Report, Error>) -> Result<(), Error> {
        let message = match outcome {
            Ok(report) => Message::Report(report),
            Err(err) => Message::Failure {
                rank,
                phase: err.phase(),
            },
        };
        self.reports
            .send(message.encode().freeze())
            .map_err(|_| Error::SendFailed {
                phase: Phase::Gather,
                rank,
            })
    }
}

/// Converts a worker message into a [Report], surfacing reported failures.
///
/// `range` bounds the length of a reported bitmap.
fn parse(message: Bytes, range: &RangeCfg) -> Result<Report, Error> {
    match Message::decode_cfg(message, range) {
        Ok(Message::Report(report)) => Ok(report),
        Ok(Message::Failure { rank, phase }) => Err(Error::WorkerFailed { rank, phase }),
        Err(source) => Err(Error::Decode {
            phase: Phase::Gather,
            source,
        }),
    }
}

impl Strategy for Isolated {
    fn execute(
        &self,
        seeds: &Arc<SeedTable>,
        partition: &Partition,
        timeout: Option<Duration>,
    ) -> Result<Vec<Report>, Error> {
        let workers = partition.workers();
        let (report_sender, report_receiver) = mpsc::channel();

        // Launch every worker with nothing but the partition and its channels
        let mut outboxes = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        for rank in 0..workers {
            let (outbox, inbox) = mpsc::channel();
            let mut mailbox = Mailbox {
                bound: partition.bound(),
                seeds: inbox,
                reports: report_sender.clone(),
            };
            let partition = *partition;
            let handle = thread::Builder::new()
                .name(format!("sieve-worker-{rank}"))
                .spawn(move || work(rank, &partition, &mut mailbox))
                .map_err(|_| Error::SpawnFailed(rank))?;
            outboxes.push(outbox);
            handles.push(handle);
        }
        drop(report_sender);

        // Broadcast (each worker receives its own copy of the encoded flags)
        let message = Seeds::from(seeds.as_ref()).encode().freeze();
        for (rank, outbox) in outboxes.iter().enumerate() {
            outbox
                .send(Bytes::copy_from_slice(&message))
                .map_err(|_| Error::SendFailed {
                    phase: Phase::Distribution,
                    rank,
                })?;
        }
        debug!(workers, bytes = message.len(), "broadcast seed table");

        // No block is longer than the first one
        let longest = partition.block(0).map_or(0, |block| block.len() as usize);
        let range: RangeCfg = (..=longest).into();
        let reports = gather(&report_receiver, workers, timeout, |message| {
            parse(message, &range)
        })?;
        for (rank, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => debug!(rank, ?err, "worker exited with error"),
                Err(_) => warn!(rank, "worker panicked"),
            }
        }
        Ok(reports)
    }
}
