//! Per-block XOR and CRC-32C checksums.
//!
//! The baseline against which the AN and Hamming codes are measured: one
//! checksum per block of `block_len` elements, recomputed and compared on
//! verification. The last block may be short.

use crate::errors::CodingError;
use crate::simd::Lane;
use crc::{CRC_32_ISCSI, Crc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const CASTAGNOLI: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumKind {
    /// XOR of all elements in the block, folded to 64 bits
    Xor,
    /// CRC-32C (Castagnoli) over the little-endian element bytes
    Crc32c,
}

impl ChecksumKind {
    pub const ALL: [ChecksumKind; 2] = [ChecksumKind::Xor, ChecksumKind::Crc32c];

    pub fn as_str(self) -> &'static str {
        match self {
            ChecksumKind::Xor => "xor",
            ChecksumKind::Crc32c => "crc32c",
        }
    }
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xor" => Ok(ChecksumKind::Xor),
            "crc" | "crc32c" => Ok(ChecksumKind::Crc32c),
            _ => Err(format!("Unknown checksum: {}", s)),
        }
    }
}

/// Checksum scheme applied block-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockChecksum {
    kind: ChecksumKind,
    block_len: usize,
}

impl BlockChecksum {
    pub fn new(kind: ChecksumKind, block_len: usize) -> Result<Self, CodingError> {
        if block_len == 0 {
            return Err(CodingError::InvalidConfig(
                "checksum block length must be positive".to_string(),
            ));
        }
        Ok(Self { kind, block_len })
    }

    pub fn kind(&self) -> ChecksumKind {
        self.kind
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Number of checksums needed for `len` elements
    pub fn blocks(&self, len: usize) -> usize {
        len.div_ceil(self.block_len)
    }

    /// Checksum of one block
    pub fn block<T: Lane>(&self, block: &[T]) -> u64 {
        match self.kind {
            ChecksumKind::Xor => {
                let folded = block.iter().fold(0u128, |acc, v| acc ^ v.to_bits());
                (folded as u64) ^ ((folded >> 64) as u64)
            }
            ChecksumKind::Crc32c => {
                let mut digest = CASTAGNOLI.digest();
                for value in block {
                    digest.update(value.le_bytes().as_ref());
                }
                digest.finalize() as u64
            }
        }
    }

    /// Fills `sums` with one checksum per block of `data`.
    pub fn compute<T: Lane>(&self, data: &[T], sums: &mut [u64]) -> Result<(), CodingError> {
        let expected = self.blocks(data.len());
        if sums.len() != expected {
            return Err(CodingError::LengthMismatch {
                expected,
                actual: sums.len(),
            });
        }
        for (sum, block) in sums.iter_mut().zip(data.chunks(self.block_len)) {
            *sum = self.block(block);
        }
        Ok(())
    }

    /// Recomputes every block checksum; the fault index is the block index.
    pub fn verify<T: Lane>(
        &self,
        data: &[T],
        sums: &[u64],
        iterations: usize,
    ) -> Result<(), CodingError> {
        let expected = self.blocks(data.len());
        if sums.len() != expected {
            return Err(CodingError::LengthMismatch {
                expected,
                actual: sums.len(),
            });
        }
        for iteration in 0..iterations {
            for (index, (block, &sum)) in data.chunks(self.block_len).zip(sums).enumerate() {
                if self.block(block) != sum {
                    return Err(CodingError::mismatch(index, iteration));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32c_check_value() {
        let data: Vec<u8> = b"123456789".to_vec();
        let sum = BlockChecksum::new(ChecksumKind::Crc32c, 9).unwrap();
        assert_eq!(sum.block(&data), 0xE306_9283);
    }

    #[test]
    fn test_crc_uses_little_endian_bytes() {
        let sum = BlockChecksum::new(ChecksumKind::Crc32c, 4).unwrap();
        let words = [0x3231u16, 0x3433];
        assert_eq!(sum.block(&words), sum.block(b"1234"));
    }

    #[test]
    fn test_xor_folds_wide_lanes() {
        let sum = BlockChecksum::new(ChecksumKind::Xor, 8).unwrap();
        assert_eq!(sum.block(&[0b1100u32, 0b1010]), 0b0110);
        assert_eq!(sum.block(&[(1u128 << 64) | 1]), 0);
        assert_eq!(sum.block(&[-1i16]), 0xFFFF);
    }

    #[test]
    fn test_compute_and_verify_with_short_tail() {
        for kind in ChecksumKind::ALL {
            let checksum = BlockChecksum::new(kind, 16).unwrap();
            let mut data: Vec<u32> = (0..70u32).map(|i| i.wrapping_mul(2_654_435_761)).collect();
            let mut sums = vec![0u64; checksum.blocks(data.len())];
            assert_eq!(sums.len(), 5);
            checksum.compute(&data, &mut sums).unwrap();
            assert!(checksum.verify(&data, &sums, 2).is_ok());

            data[68] ^= 1 << 20;
            let err = checksum.verify(&data, &sums, 2).unwrap_err();
            assert_eq!(err, CodingError::mismatch(4, 0), "{}", kind);
            assert!(!err.is_fatal());
        }
    }

    #[test]
    fn test_invalid_setup() {
        assert!(BlockChecksum::new(ChecksumKind::Xor, 0).is_err());
        let checksum = BlockChecksum::new(ChecksumKind::Xor, 4).unwrap();
        let mut sums = [0u64; 1];
        assert!(matches!(
            checksum.compute(&[1u8; 9], &mut sums),
            Err(CodingError::LengthMismatch { expected: 3, actual: 1 })
        ));
    }
}
