//! Strike composites inside a single worker's block.

use crate::{Bitmap, Block, Error, Phase};

/// Returns the bitmap of `block` with every multiple of a seed prime cleared.
///
/// Bit `i` of the result describes `block.start() + i`. A bit is only ever cleared, never set,
/// so `seeds` may be supplied in any order. The first multiple struck for a prime `p` is
/// `max(p * p, ⌈start / p⌉ * p)`: smaller multiples have a smaller prime factor that strikes them.
pub fn mark(block: &Block, seeds: &[u64]) -> Result<Bitmap, Error> {
    let len = usize::try_from(block.len()).map_err(|_| Error::AllocationFailed {
        phase: Phase::Marking,
        bits: usize::MAX,
    })?;
    let mut bitmap = Bitmap::ones(len).map_err(|_| Error::AllocationFailed {
        phase: Phase::Marking,
        bits: len,
    })?;
    if block.is_empty() {
        return Ok(bitmap);
    }

    let (start, end) = (block.start(), block.end());
    for &prime in seeds {
        if prime < 2 {
            continue;
        }

        // No multiple of prime left to strike inside the block (also covers prime > end)
        let Some(square) = prime.checked_mul(prime).filter(|&square| square <= end) else {
            continue;
        };
        let Some(aligned) = start.div_ceil(prime).checked_mul(prime) else {
            continue;
        };
        let first = square.max(aligned);
        for multiple in (first..=end).step_by(prime as usize) {
            bitmap.clear((multiple - start) as usize);
        }
    }
    Ok(bitmap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{isqrt, Partition, SeedTable};
    use proptest::prelude::*;

    fn trial_division(n: u64) -> bool {
        n >= 2 && (2..n).take_while(|d| d * d <= n).all(|d| n % d != 0)
    }

    fn survivors(block: &Block, bitmap: &Bitmap) -> Vec<u64> {
        bitmap
            .iter_ones()
            .map(|offset| block.start() + offset as u64)
            .collect()
    }

    #[test]
    fn test_first_block_of_hundred() {
        let partition = Partition::new(100, 4).unwrap();
        let block = partition.block(0).unwrap();
        let bitmap = mark(&block, &[2, 3, 5, 7]).unwrap();
        assert_eq!(bitmap.len(), 23);
        assert_eq!(survivors(&block, &bitmap), vec![11, 13, 17, 19, 23, 29, 31]);
    }

    #[test]
    fn test_last_block_of_hundred() {
        let partition = Partition::new(100, 4).unwrap();
        let block = partition.block(3).unwrap();
        let bitmap = mark(&block, &[2, 3, 5, 7]).unwrap();
        assert_eq!(survivors(&block, &bitmap), vec![79, 83, 89, 97]);
    }

    #[test]
    fn test_no_seeds() {
        // N = 3: M = 1, the only block is [2, 3] and there are no seeds
        let partition = Partition::new(3, 1).unwrap();
        let block = partition.block(0).unwrap();
        let bitmap = mark(&block, &[]).unwrap();
        assert_eq!(survivors(&block, &bitmap), vec![2, 3]);
    }

    #[test]
    fn test_seed_past_end() {
        let partition = Partition::new(30, 3).unwrap();
        let block = partition.block(0).unwrap();

        // 7 * 7 > 14 and 31 > 14: neither strikes anything
        let bitmap = mark(&block, &[7, 31]).unwrap();
        assert_eq!(bitmap.count_ones(), block.len() as usize);
    }

    #[test]
    fn test_empty_block() {
        let partition = Partition::new(10, 10).unwrap();
        let block = partition.block(9).unwrap();
        assert!(block.is_empty());
        let bitmap = mark(&block, &[2, 3]).unwrap();
        assert!(bitmap.is_empty());
    }

    #[test]
    fn test_square_inside_block() {
        // Block [6, 14] with seeds [2, 3, 5]: 9 is struck by 3 starting at 3 * 3
        let partition = Partition::new(30, 3).unwrap();
        let block = partition.block(0).unwrap();
        let bitmap = mark(&block, &[2, 3, 5]).unwrap();
        assert_eq!(survivors(&block, &bitmap), vec![7, 11, 13]);
    }

    proptest! {
        #[test]
        fn marking_matches_trial_division(limit in 2u64..5_000, workers in 1usize..16, rank in 0usize..16) {
            let partition = Partition::new(limit, workers).unwrap();
            let block = partition.block(rank % workers).unwrap();
            let seeds = SeedTable::compute(isqrt(limit)).unwrap();
            let bitmap = mark(&block, seeds.primes()).unwrap();

            prop_assert_eq!(bitmap.len() as u64, block.len());
            for (offset, n) in block.range().enumerate() {
                prop_assert_eq!(bitmap.get(offset), Some(trial_division(n)));
            }
        }

        #[test]
        fn seed_order_is_irrelevant(limit in 2u64..5_000, workers in 1usize..8, rank in 0usize..8) {
            let partition = Partition::new(limit, workers).unwrap();
            let block = partition.block(rank % workers).unwrap();
            let seeds = SeedTable::compute(isqrt(limit)).unwrap();
            let mut reversed = seeds.primes().to_vec();
            reversed.reverse();

            let forward = mark(&block, seeds.primes()).unwrap();
            let backward = mark(&block, &reversed).unwrap();
            prop_assert_eq!(forward, backward);
        }
    }
}
