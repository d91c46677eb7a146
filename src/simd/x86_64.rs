//! x86_64 entry points and parity kernels
//!
//! The `with_*` entry points enable a set of target features and call a
//! pass that is `#[inline(always)]` down to its lane operations, so the
//! whole pass is generated for those features. Callers must have detected
//! every enabled feature at runtime.
//!
//! The parity kernel computes, for every mask, the bitmap of lanes whose
//! `data & mask` has odd parity. Parity is folded with shifts and XORs,
//! then each lane's bit is widened to a 0/-1 word, saturated down to bytes
//! with `packs` and collected with `movemask`.
//!
//! - SSE2 (128-bit): 8 lanes, baseline on x86_64
//! - AVX2 (256-bit): 16 lanes, requires runtime detection

use super::has_avx2;

/// # Safety
/// The CPU must support POPCNT.
#[target_feature(enable = "popcnt")]
pub unsafe fn with_popcnt<T>(pass: impl FnOnce() -> T) -> T {
    pass()
}

/// # Safety
/// The CPU must support AVX2.
#[target_feature(enable = "avx2")]
pub unsafe fn with_avx2<T>(pass: impl FnOnce() -> T) -> T {
    pass()
}

/// # Safety
/// The CPU must support AVX2 and POPCNT.
#[target_feature(enable = "avx2,popcnt")]
pub unsafe fn with_avx2_popcnt<T>(pass: impl FnOnce() -> T) -> T {
    pass()
}

/// # Safety
/// The CPU must support AVX-512F and AVX-512BW.
#[target_feature(enable = "avx512f,avx512bw")]
pub unsafe fn with_avx512<T>(pass: impl FnOnce() -> T) -> T {
    pass()
}

/// # Safety
/// The CPU must support AVX-512F, AVX-512BW and POPCNT.
#[target_feature(enable = "avx512f,avx512bw,popcnt")]
pub unsafe fn with_avx512_popcnt<T>(pass: impl FnOnce() -> T) -> T {
    pass()
}

/// Lane popcount: `vpopcntb/w` (BITALG) and `vpopcntd/q` (VPOPCNTDQ).
///
/// # Safety
/// The CPU must support AVX-512F, AVX-512BW, BITALG, VPOPCNTDQ and POPCNT.
#[target_feature(enable = "avx512f,avx512bw,avx512bitalg,avx512vpopcntdq,popcnt")]
pub unsafe fn with_avx512_vpopcnt<T>(pass: impl FnOnce() -> T) -> T {
    pass()
}

/// Fills `out[k]` with the parity bitmap of `data[..lanes] & masks[k]`.
///
/// Returns false when no native kernel covers `lanes`, leaving `out`
/// untouched.
pub fn parity_bitmaps_u16(data: &[u16], lanes: usize, masks: &[u16], out: &mut [u64]) -> bool {
    debug_assert!(out.len() >= masks.len());
    match lanes {
        8 if data.len() >= 8 => {
            // SAFETY: SSE2 is part of the x86_64 baseline and the slice
            // holds at least 8 elements
            unsafe { parity_bitmaps_sse2(data, masks, out) };
            true
        }
        16 if data.len() >= 16 && has_avx2() => {
            // SAFETY: AVX2 support verified at runtime, slice holds 16 elements
            unsafe { parity_bitmaps_avx2(data, masks, out) };
            true
        }
        _ => false,
    }
}

#[target_feature(enable = "sse2")]
unsafe fn parity_bitmaps_sse2(data: &[u16], masks: &[u16], out: &mut [u64]) {
    unsafe {
        use std::arch::x86_64::*;

        let input = _mm_loadu_si128(data.as_ptr() as *const __m128i);
        let one = _mm_set1_epi16(1);
        let zero = _mm_setzero_si128();

        for (k, &mask) in masks.iter().enumerate() {
            let mut x = _mm_and_si128(input, _mm_set1_epi16(mask as i16));
            x = _mm_xor_si128(x, _mm_srli_epi16::<8>(x));
            x = _mm_xor_si128(x, _mm_srli_epi16::<4>(x));
            x = _mm_xor_si128(x, _mm_srli_epi16::<2>(x));
            x = _mm_xor_si128(x, _mm_srli_epi16::<1>(x));

            // 0x0000 / 0xFFFF per lane, saturated to 0x00 / 0xFF per byte
            let parity = _mm_sub_epi16(zero, _mm_and_si128(x, one));
            let packed = _mm_packs_epi16(parity, parity);
            out[k] = (_mm_movemask_epi8(packed) as u32 & 0xFF) as u64;
        }
    }
}

#[target_feature(enable = "avx2")]
unsafe fn parity_bitmaps_avx2(data: &[u16], masks: &[u16], out: &mut [u64]) {
    unsafe {
        use std::arch::x86_64::*;

        let input = _mm256_loadu_si256(data.as_ptr() as *const __m256i);
        let one = _mm256_set1_epi16(1);
        let zero = _mm256_setzero_si256();

        for (k, &mask) in masks.iter().enumerate() {
            let mut x = _mm256_and_si256(input, _mm256_set1_epi16(mask as i16));
            x = _mm256_xor_si256(x, _mm256_srli_epi16::<8>(x));
            x = _mm256_xor_si256(x, _mm256_srli_epi16::<4>(x));
            x = _mm256_xor_si256(x, _mm256_srli_epi16::<2>(x));
            x = _mm256_xor_si256(x, _mm256_srli_epi16::<1>(x));

            let parity = _mm256_sub_epi16(zero, _mm256_and_si256(x, one));
            // packs works per 128-bit half: bytes 0..8 hold lanes 0..8,
            // bytes 16..24 hold lanes 8..16
            let packed = _mm256_packs_epi16(parity, parity);
            let bits = _mm256_movemask_epi8(packed) as u32;
            out[k] = ((bits & 0xFF) | ((bits >> 8) & 0xFF00)) as u64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::has_popcnt;

    fn reference(data: &[u16], mask: u16) -> u64 {
        data.iter()
            .enumerate()
            .map(|(i, &d)| (((d & mask).count_ones() & 1) as u64) << i)
            .fold(0, |acc, b| acc | b)
    }

    #[test]
    fn test_sse2_bitmaps() {
        let data = [0u16, 1, 3, 0xFFFF, 0x8000, 0xAD5B, 0x1234, 0x7FFF];
        let masks = [0xFFFFu16, 0xAD5B, 0x00F0];
        let mut out = [0u64; 3];
        assert!(parity_bitmaps_u16(&data, 8, &masks, &mut out));
        for (k, &mask) in masks.iter().enumerate() {
            assert_eq!(out[k], reference(&data, mask), "mask {:#x}", mask);
        }
    }

    #[test]
    fn test_avx2_bitmaps() {
        if !has_avx2() {
            return;
        }
        let data: Vec<u16> = (0..16u16).map(|i| i.wrapping_mul(0x9E37) ^ 0x5A5A).collect();
        let masks = [0xFFFFu16, 0x366D, 0xC78E, 0xF800];
        let mut out = [0u64; 4];
        assert!(parity_bitmaps_u16(&data, 16, &masks, &mut out));
        for (k, &mask) in masks.iter().enumerate() {
            assert_eq!(out[k], reference(&data, mask), "mask {:#x}", mask);
        }
    }

    #[test]
    fn test_entry_points_run_the_pass() {
        let pass = || (0..64u32).map(|i| (i * 0x0101_0101).count_ones()).sum::<u32>();
        let expected = pass();
        // SAFETY: each entry point is entered only after detection
        unsafe {
            if has_popcnt() {
                assert_eq!(with_popcnt(pass), expected);
            }
            if has_avx2() {
                assert_eq!(with_avx2(pass), expected);
            }
        }
    }

    #[test]
    fn test_unsupported_lane_count() {
        let data = [0u16; 32];
        let mut out = [0u64; 1];
        assert!(!parity_bitmaps_u16(&data, 32, &[0xFFFF], &mut out));
        assert!(!parity_bitmaps_u16(&data[..4], 8, &[0xFFFF], &mut out));
    }
}
