//! Packed bitmap backing every sieve buffer.
//!
//! The bitmap stores bits in [u8] blocks, which is eight times more compact than a
//! [`Vec<bool>`] and lets a block be shipped between workers as raw bytes. If the length of the
//! bitmap is not a multiple of 8, the last block contains bits that are not part of the bitmap.
//! An invariant of the implementation is that these trailing bits are always 0.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error as CodecError, FixedSize, RangeCfg, Read, ReadExt, Write};
use std::{
    collections::TryReserveError,
    fmt::{self, Formatter},
};

/// Type alias for the underlying block type.
type Block = u8;

/// Number of bits in a [Block].
const BITS_PER_BLOCK: usize = Block::BITS as usize;

/// Empty block of bits (all bits set to 0).
const EMPTY_BLOCK: Block = 0;

/// Full block of bits (all bits set to 1).
const FULL_BLOCK: Block = Block::MAX;

/// Maximum number of bits printed by the [fmt::Debug] implementation.
const MAX_DEBUG_BITS: usize = 64;

/// A fixed-length sequence of bits.
///
/// In the sieve, a set bit means "candidate prime" and a cleared bit means "known composite".
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    /// The underlying storage for the bits.
    storage: Vec<Block>,

    /// The total number of bits.
    num_bits: usize,
}

impl Bitmap {
    /// Creates a bitmap with `size` bits, all set to one.
    ///
    /// Returns an error if the storage cannot be allocated.
    pub fn ones(size: usize) -> Result<Self, TryReserveError> {
        let mut result = Self::filled(size, FULL_BLOCK)?;
        result.clear_trailing_bits();
        Ok(result)
    }

    /// Creates a bitmap with `size` bits, all set to zero.
    ///
    /// Returns an error if the storage cannot be allocated.
    pub fn zeroes(size: usize) -> Result<Self, TryReserveError> {
        Self::filled(size, EMPTY_BLOCK)
    }

    /// Reconstructs a bitmap of `num_bits` bits from its packed representation.
    ///
    /// Returns `None` if `bytes` does not hold exactly enough blocks for `num_bits` or if any
    /// trailing bit past `num_bits` is set.
    pub fn from_bytes(bytes: &[u8], num_bits: usize) -> Option<Self> {
        if bytes.len() != Self::num_blocks(num_bits) {
            return None;
        }
        let result = Self {
            storage: bytes.to_vec(),
            num_bits,
        };
        if result.trailing_bits_set() {
            return None;
        }
        Some(result)
    }

    /// Returns the number of bits in the bitmap.
    #[inline]
    pub fn len(&self) -> usize {
        self.num_bits
    }

    /// Returns true if the bitmap contains no bits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_bits == 0
    }

    /// Gets the value of the bit at `index`.
    ///
    /// Returns `None` if the index is out of bounds.
    #[inline]
    pub fn get(&self, index: usize) -> Option<bool> {
        if index >= self.num_bits {
            return None;
        }
        Some(self.storage[Self::block_index(index)] & Self::mask(index) != 0)
    }

    /// Sets the bit at `index` to 1.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn set(&mut self, index: usize) {
        self.assert_index(index);
        self.storage[Self::block_index(index)] |= Self::mask(index);
    }

    /// Sets the bit at `index` to 0.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn clear(&mut self, index: usize) {
        self.assert_index(index);
        self.storage[Self::block_index(index)] &= !Self::mask(index);
    }

    /// Returns the number of bits set to 1.
    pub fn count_ones(&self) -> usize {
        self.storage
            .iter()
            .map(|block| block.count_ones() as usize)
            .sum()
    }

    /// Returns an iterator over the indices of all bits set to 1, in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.storage
            .iter()
            .enumerate()
            .filter(|(_, block)| **block != EMPTY_BLOCK)
            .flat_map(|(i, &block)| {
                (0..BITS_PER_BLOCK)
                    .filter(move |offset| block & (1 << offset) != 0)
                    .map(move |offset| i * BITS_PER_BLOCK + offset)
            })
    }

    /// Returns the packed blocks of the bitmap.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.storage
    }

    /// Returns the number of blocks needed to hold `num_bits` bits.
    #[inline]
    pub(crate) fn num_blocks(num_bits: usize) -> usize {
        num_bits.div_ceil(BITS_PER_BLOCK)
    }

    fn filled(size: usize, block: Block) -> Result<Self, TryReserveError> {
        let blocks = Self::num_blocks(size);
        let mut storage = Vec::new();
        storage.try_reserve_exact(blocks)?;
        storage.resize(blocks, block);
        Ok(Self {
            storage,
            num_bits: size,
        })
    }

    #[inline]
    fn block_index(index: usize) -> usize {
        index / BITS_PER_BLOCK
    }

    #[inline]
    fn mask(index: usize) -> Block {
        1 << (index % BITS_PER_BLOCK)
    }

    #[inline]
    fn assert_index(&self, index: usize) {
        assert!(
            index < self.num_bits,
            "index {index} out of bounds (len {})",
            self.num_bits
        );
    }

    /// Mask of the bits in the last block that belong to the bitmap.
    fn last_block_mask(&self) -> Option<Block> {
        match self.num_bits % BITS_PER_BLOCK {
            0 => None,
            used => Some((1 << used) - 1),
        }
    }

    fn clear_trailing_bits(&mut self) {
        if let (Some(mask), Some(last)) = (self.last_block_mask(), self.storage.last_mut()) {
            *last &= mask;
        }
    }

    fn trailing_bits_set(&self) -> bool {
        match (self.last_block_mask(), self.storage.last()) {
            (Some(mask), Some(last)) => last & !mask != 0,
            _ => false,
        }
    }
}

// ---------- Codec ----------

impl Write for Bitmap {
    fn write(&self, buf: &mut impl BufMut) {
        // A block of the sieve may hold more bits than a varint length allows
        (self.num_bits as u64).write(buf);
        buf.put_slice(&self.storage);
    }
}

impl Read for Bitmap {
    type Cfg = RangeCfg;

    fn read_cfg(buf: &mut impl Buf, range: &Self::Cfg) -> Result<Self, CodecError> {
        // Parse length
        let num_bits = usize::try_from(u64::read(buf)?).map_err(|_| CodecError::InvalidUsize)?;
        if !range.contains(&num_bits) {
            return Err(CodecError::InvalidLength(num_bits));
        }

        // Parse blocks (checking the buffer before allocating)
        let num_blocks = Self::num_blocks(num_bits);
        if buf.remaining() < num_blocks {
            return Err(CodecError::EndOfBuffer);
        }
        let blocks = buf.copy_to_bytes(num_blocks);
        Self::from_bytes(&blocks, num_bits).ok_or(CodecError::Invalid("Bitmap", "trailing bits"))
    }
}

impl EncodeSize for Bitmap {
    fn encode_size(&self) -> usize {
        u64::SIZE + self.storage.len()
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Bitmap[")?;
        for index in 0..self.num_bits.min(MAX_DEBUG_BITS) {
            let bit = self.get(index).unwrap_or_default();
            write!(f, "{}", if bit { '1' } else { '0' })?;
        }
        if self.num_bits > MAX_DEBUG_BITS {
            write!(f, "...")?;
        }
        write!(f, "; {}]", self.num_bits)
    }
}
