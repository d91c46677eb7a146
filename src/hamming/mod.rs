//! Extended Hamming codes over 16- and 32-bit data words.
//!
//! Each data word gets a code of `⌈log2(w) + 2⌉` bits: one parity bit per
//! fixed mask (bit `k + 1`) and an overall parity bit (bit 0) over the data
//! and the mask parities. Scalar and vector backends produce identical codes.

mod codec;
pub mod masks;

pub use codec::HammingCodec;

use crate::simd::{Lane, LaneVectors};
use masks::{PARITY_MASKS_16, PARITY_MASKS_32};

/// Data word with its parity code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(C)]
pub struct Codeword<T> {
    pub data: T,
    pub code: u8,
}

/// Which popcount primitive computes the parities.
///
/// Both strategies produce the same codes; they differ only in the
/// instruction mix, which is what the benchmark compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PopcountStrategy {
    /// Native popcount instruction
    #[default]
    Hardware,
    /// SWAR / shift-xor bit tricks
    BitTrick,
}

impl PopcountStrategy {
    pub const ALL: [PopcountStrategy; 2] = [PopcountStrategy::Hardware, PopcountStrategy::BitTrick];

    pub fn as_str(self) -> &'static str {
        match self {
            PopcountStrategy::Hardware => "popcnt",
            PopcountStrategy::BitTrick => "bittrick",
        }
    }

    #[inline(always)]
    fn count<T: Lane>(self, value: T) -> u32 {
        match self {
            PopcountStrategy::Hardware => value.count_ones(),
            PopcountStrategy::BitTrick => value.count_ones_swar(),
        }
    }
}

/// Data word widths with a Hamming mask table.
pub trait HammingLane: LaneVectors {
    /// Parity masks followed by the all-ones data mask
    const PARITY_MASKS: &'static [Self];

    /// Bits of the parity code (mask parities plus the overall bit)
    const CODE_BITS: u32 = Self::PARITY_MASKS.len() as u32;

    /// Per-mask lane parity bitmaps from a native kernel, if one exists
    /// for this lane count. Returns false to fall back to portable lanes.
    fn native_bitmaps(_chunk: &[Self], _lanes: usize, _out: &mut [u64]) -> bool {
        false
    }
}

impl HammingLane for u16 {
    const PARITY_MASKS: &'static [u16] = &PARITY_MASKS_16;

    fn native_bitmaps(chunk: &[u16], lanes: usize, out: &mut [u64]) -> bool {
        #[cfg(all(target_arch = "x86_64", feature = "simd"))]
        {
            crate::simd::x86_64::parity_bitmaps_u16(chunk, lanes, &PARITY_MASKS_16, out)
        }
        #[cfg(not(all(target_arch = "x86_64", feature = "simd")))]
        {
            let _ = (chunk, lanes, out);
            false
        }
    }
}

impl HammingLane for u32 {
    const PARITY_MASKS: &'static [u32] = &PARITY_MASKS_32;
}

/// Scalar code of one data word.
#[inline(always)]
pub fn compute_code<T: HammingLane>(data: T, strategy: PopcountStrategy) -> u8 {
    let masks = T::PARITY_MASKS;
    let parity_masks = &masks[..masks.len() - 1];

    let mut code = 0u8;
    for (k, &mask) in parity_masks.iter().enumerate() {
        code |= ((strategy.count(data.bitand(mask)) & 1) as u8) << (k + 1);
    }
    code | ((strategy.count(data) + code.count_ones()) & 1) as u8
}
