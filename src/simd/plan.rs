//! Loop planning: vectorized main loop plus scalar remainder.

use std::iter::StepBy;
use std::ops::Range;

/// Calculate number of full blocks and remainder offset
///
/// Returns (num_full_blocks, simd_processed_elements)
#[inline(always)]
pub fn calculate_blocks(data_len: usize, block_size: usize) -> (usize, usize) {
    let num_blocks = data_len / block_size;
    let simd_elements = num_blocks * block_size;
    (num_blocks, simd_elements)
}

/// Split of a buffer into full unrolled vector blocks and a scalar tail.
///
/// One block is `lanes * unroll` elements. Elements past the last full block
/// go through the scalar remainder loop, which is what keeps arbitrary buffer
/// lengths correct. A plan with zero lanes is all remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPlan {
    pub len: usize,
    pub lanes: usize,
    pub unroll: usize,
    pub simd_len: usize,
}

impl BlockPlan {
    pub fn new(len: usize, lanes: usize, unroll: usize) -> Self {
        let block = lanes * unroll.max(1);
        let simd_len = if block == 0 {
            0
        } else {
            calculate_blocks(len, block).1
        };
        Self {
            len,
            lanes,
            unroll,
            simd_len,
        }
    }

    pub fn scalar(len: usize) -> Self {
        Self::new(len, 0, 1)
    }

    /// Start offsets of every vector in the main loop
    pub fn vector_offsets(&self) -> StepBy<Range<usize>> {
        (0..self.simd_len).step_by(self.lanes.max(1))
    }

    /// Indices handled by the scalar remainder loop
    pub fn remainder(&self) -> Range<usize> {
        self.simd_len..self.len
    }
}
