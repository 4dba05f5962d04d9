//! The optional block map: a compaction of the 1024-row-granularity offset index's trailer.
//!
//! When present, it lets OID-to-offset resolution skip over 1k-row blocks that were entirely
//! deleted and dropped from the index file, at the cost of a prefix-sum over set bits.

use crate::cursor::ByteCursor;
use crate::{Error, Result};
use std::io::{Read, Seek};

/// `bits[block]` is set iff 1k-row block `block` is still present in the offset index; `prefix[block]`
/// is the number of set bits before `block`, letting OID resolution map a block index straight to
/// its compacted position.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockMap {
    bits: Vec<u8>,
    prefix: Vec<u32>,
    num_blocks: usize,
}

impl BlockMap {
    /// Reads the block map from the index trailer.
    ///
    /// `bitmap_u32_words == 0` means no block map exists (dense layout); callers should treat
    /// that as `Ok(None)`, which this function signals by returning `Ok(None)` itself.
    pub fn read<R: Read + Seek>(
        cursor: &mut ByteCursor<R>,
        bitmap_u32_words: u32,
        bits_for_blockmap: u32,
        num_1k_blocks: u32,
    ) -> Result<Option<BlockMap>> {
        if bitmap_u32_words == 0 {
            return Ok(None);
        }
        let byte_len = (bits_for_blockmap as usize).div_ceil(8);
        let bits = cursor.read_bytes(byte_len)?;
        let set_bits = bits.iter().map(|b| b.count_ones()).sum::<u32>();
        if set_bits != num_1k_blocks {
            return Err(Error::FormatError(format!(
                "block map set-bit count {} does not match num_1k_blocks {}",
                set_bits, num_1k_blocks
            )));
        }

        let num_blocks = bits_for_blockmap as usize;
        let mut prefix = Vec::with_capacity(num_blocks);
        let mut running = 0u32;
        for block in 0..num_blocks {
            prefix.push(running);
            if bit_at(&bits, block) {
                running += 1;
            }
        }

        Ok(Some(BlockMap { bits, prefix, num_blocks }))
    }

    /// Resolves a 1k-row block index to its compacted slot, or `None` if that block was dropped.
    pub fn resolve(&self, block: usize) -> Option<usize> {
        if block >= self.num_blocks || !bit_at(&self.bits, block) {
            return None;
        }
        Some(self.prefix[block] as usize)
    }
}

fn bit_at(bits: &[u8], index: usize) -> bool {
    let byte = bits[index / 8];
    byte & (1 << (index % 8)) != 0
}
