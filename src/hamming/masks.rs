//! Parity masks for extended Hamming (SECDED) codes.
//!
//! Entry `k` selects the data bits covered by code bit `k + 1`. The last
//! entry of each table covers every data bit and feeds the overall parity in
//! code bit 0.

/// Hamming(22,16): five parity masks plus the data-parity mask
pub const PARITY_MASKS_16: [u16; 6] = [0xAD5B, 0x366D, 0xC78E, 0x07F0, 0xF800, 0xFFFF];

/// Hamming(39,32): six parity masks plus the data-parity mask
pub const PARITY_MASKS_32: [u32; 7] = [
    0x56AA_AD5B,
    0x9B33_366D,
    0xE3C3_C78E,
    0x03FC_07F0,
    0x03FF_F800,
    0xFC00_0000,
    0xFFFF_FFFF,
];

/// Largest mask table length across widths
pub const MAX_PARITY_MASKS: usize = 7;

#[cfg(test)]
mod tests {
    use super::*;

    /// Data bit `d` is covered by code bit `k + 1` iff the position of `d`
    /// in the interleaved codeword has bit `k` set.
    fn standard_masks(data_bits: u32, parity_bits: u32) -> Vec<u64> {
        let mut masks = vec![0u64; parity_bits as usize];
        let mut position = 0u32;
        for d in 0..data_bits {
            position += 1;
            while position.is_power_of_two() {
                position += 1;
            }
            for (k, mask) in masks.iter_mut().enumerate() {
                if position & (1 << k) != 0 {
                    *mask |= 1 << d;
                }
            }
        }
        masks
    }

    #[test]
    fn test_16_bit_masks_are_standard_positions() {
        let expected = standard_masks(16, 5);
        for (k, &mask) in PARITY_MASKS_16[..5].iter().enumerate() {
            assert_eq!(mask as u64, expected[k], "mask {}", k);
        }
    }

    #[test]
    fn test_32_bit_masks_are_standard_positions() {
        let expected = standard_masks(32, 6);
        for (k, &mask) in PARITY_MASKS_32[..6].iter().enumerate() {
            assert_eq!(mask as u64, expected[k], "mask {}", k);
        }
    }

    #[test]
    fn test_every_data_bit_covered_twice() {
        for bit in 0..16 {
            let covered = PARITY_MASKS_16[..5]
                .iter()
                .filter(|&&m| m & (1 << bit) != 0)
                .count();
            assert!(covered >= 2, "bit {}", bit);
        }
        for bit in 0..32 {
            let covered = PARITY_MASKS_32[..6]
                .iter()
                .filter(|&&m| m & (1 << bit) != 0)
                .count();
            assert!(covered >= 2, "bit {}", bit);
        }
    }
}
