//! Messages exchanged between the coordinator and isolated workers.
//!
//! # Format
//!
//! All integers are big-endian. A bitmap is written as its length in bits (`u64`) followed by
//! its packed blocks.
//!
//! ```txt
//! Seeds:   bound: u64 | flags: bitmap (bound + 1 bits)
//! Report:  0u8 | rank: u32 | start: u64 | elapsed_nanos: u64 | flags: bitmap
//! Failure: 1u8 | rank: u32 | phase: u8
//! ```
//!
//! Decode with [commonware_codec::Decode::decode_cfg], which rejects trailing data. A [Message]
//! takes the range of bitmap lengths the coordinator accepts as its configuration.

use crate::{Bitmap, Phase, Report, SeedTable};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, RangeCfg, Read, ReadExt, Write};
use std::time::Duration;

/// Tag of a [Message::Report].
const REPORT: u8 = 0;

/// Tag of a [Message::Failure].
const FAILURE: u8 = 1;

/// Seed flags broadcast by the coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Seeds {
    /// Seed bound `M`.
    pub bound: u64,

    /// Sieve flags over `[0, M]`.
    pub flags: Bitmap,
}

impl From<&SeedTable> for Seeds {
    fn from(table: &SeedTable) -> Self {
        Self {
            bound: table.bound(),
            flags: table.flags().clone(),
        }
    }
}

impl Write for Seeds {
    fn write(&self, buf: &mut impl BufMut) {
        self.bound.write(buf);
        self.flags.write(buf);
    }
}

impl Read for Seeds {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
        let bound = u64::read(buf)?;
        let len = bound
            .checked_add(1)
            .and_then(|len| usize::try_from(len).ok())
            .ok_or(Error::Invalid("Seeds", "bound too large"))?;
        let flags = Bitmap::read_cfg(buf, &(len..=len).into())?;
        if flags.get(0) == Some(true) || flags.get(1) == Some(true) {
            return Err(Error::Invalid("Seeds", "0 or 1 marked prime"));
        }
        Ok(Self { bound, flags })
    }
}

impl EncodeSize for Seeds {
    fn encode_size(&self) -> usize {
        u64::SIZE + self.flags.encode_size()
    }
}

/// A message sent by a worker to the coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// The worker marked its block.
    Report(Report),

    /// The worker could not mark its block.
    Failure { rank: usize, phase: Phase },
}

// Ranks are bounded by the worker count, which [crate::Partition] limits to u32.
impl Write for Message {
    fn write(&self, buf: &mut impl BufMut) {
        match self {
            Self::Report(report) => {
                REPORT.write(buf);
                (report.rank as u32).write(buf);
                report.start.write(buf);
                u64::try_from(report.elapsed.as_nanos())
                    .unwrap_or(u64::MAX)
                    .write(buf);
                report.bitmap.write(buf);
            }
            Self::Failure { rank, phase } => {
                FAILURE.write(buf);
                (*rank as u32).write(buf);
                phase.to_u8().write(buf);
            }
        }
    }
}

impl Read for Message {
    type Cfg = RangeCfg;

    fn read_cfg(buf: &mut impl Buf, range: &Self::Cfg) -> Result<Self, Error> {
        let message = match u8::read(buf)? {
            REPORT => {
                let rank = u32::read(buf)? as usize;
                let start = u64::read(buf)?;
                let elapsed = Duration::from_nanos(u64::read(buf)?);
                let bitmap = Bitmap::read_cfg(buf, range)?;
                Self::Report(Report {
                    rank,
                    start,
                    bitmap,
                    elapsed,
                })
            }
            FAILURE => {
                let rank = u32::read(buf)? as usize;
                let code = u8::read(buf)?;
                let phase = Phase::from_u8(code).ok_or(Error::InvalidEnum(code))?;
                Self::Failure { rank, phase }
            }
            tag => return Err(Error::InvalidEnum(tag)),
        };
        Ok(message)
    }
}

impl EncodeSize for Message {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + u32::SIZE
            + match self {
                Self::Report(report) => u64::SIZE + u64::SIZE + report.bitmap.encode_size(),
                Self::Failure { .. } => u8::SIZE,
            }
    }
}
