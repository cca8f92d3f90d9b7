//! Sequential sieve of the seed range `[0, M]`.

use crate::{Bitmap, Error, Phase};
use tracing::debug;

/// Primes up to the seed bound `M`, together with the sieve flags they were read from.
///
/// The table is built once by the coordinator and never mutated afterwards. Workers either
/// borrow it (shared memory) or decode their own copy of the flags (message passing).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedTable {
    bound: u64,
    flags: Bitmap,
    primes: Vec<u64>,
}

impl SeedTable {
    /// Sieves `[0, bound]`.
    ///
    /// Every multiple of a prime `p` starting at `p * p` is cleared; smaller multiples were
    /// already cleared by a smaller prime.
    pub fn compute(bound: u64) -> Result<Self, Error> {
        let size = usize::try_from(bound)
            .ok()
            .and_then(|bound| bound.checked_add(1))
            .ok_or(Error::AllocationFailed {
                phase: Phase::Seeding,
                bits: usize::MAX,
            })?;
        let mut flags = Bitmap::ones(size).map_err(|_| Error::AllocationFailed {
            phase: Phase::Seeding,
            bits: size,
        })?;
        flags.clear(0);
        if size > 1 {
            flags.clear(1);
        }

        let mut primes = Vec::new();
        for i in 2..size {
            if flags.get(i) != Some(true) {
                continue;
            }
            primes.push(i as u64);
            let Some(mut multiple) = i.checked_mul(i) else {
                continue;
            };
            while multiple < size {
                flags.clear(multiple);
                multiple += i;
            }
        }
        debug!(bound, seeds = primes.len(), "computed seed table");

        Ok(Self {
            bound,
            flags,
            primes,
        })
    }

    /// Rebuilds a table from received sieve flags covering `[0, bound]`.
    ///
    /// Indices 0 and 1 are never treated as seeds, whatever their flag says.
    pub fn from_flags(bound: u64, flags: Bitmap) -> Result<Self, Error> {
        let expected = usize::try_from(bound)
            .ok()
            .and_then(|bound| bound.checked_add(1))
            .unwrap_or(usize::MAX);
        if flags.len() != expected {
            return Err(Error::SeedMismatch {
                expected,
                found: flags.len(),
            });
        }
        let primes = flags
            .iter_ones()
            .filter(|&index| index >= 2)
            .map(|index| index as u64)
            .collect();
        Ok(Self {
            bound,
            flags,
            primes,
        })
    }

    /// Returns the seed bound `M`.
    pub const fn bound(&self) -> u64 {
        self.bound
    }

    /// Returns the seed primes in ascending order.
    pub fn primes(&self) -> &[u64] {
        &self.primes
    }

    /// Returns the sieve flags over `[0, M]`.
    pub const fn flags(&self) -> &Bitmap {
        &self.flags
    }
}
