//! Scalar lane types carried by the vector layer.

use std::fmt::Debug;
use std::hash::Hash;

/// One lane of a vector: a fixed-width machine integer.
///
/// All arithmetic is modular (wrapping) in the lane width, which is exactly
/// the arithmetic AN codes rely on. Bit views and popcounts work on the
/// unsigned reinterpretation.
pub trait Lane: Copy + Debug + Default + PartialEq + Eq + PartialOrd + Ord + Hash + Send + Sync + 'static {
    /// Little-endian byte representation
    type Bytes: AsRef<[u8]>;

    const BITS: u32;
    const SIGNED: bool;
    const MIN: Self;
    const MAX: Self;
    const ZERO: Self;
    const ONE: Self;

    fn wrapping_add(self, rhs: Self) -> Self;
    fn wrapping_sub(self, rhs: Self) -> Self;
    fn wrapping_mul(self, rhs: Self) -> Self;
    /// Truncating division; callers guarantee a non-zero divisor
    fn wrapping_div(self, rhs: Self) -> Self;
    /// Remainder with the sign of the dividend
    fn wrapping_rem(self, rhs: Self) -> Self;

    fn bitand(self, rhs: Self) -> Self;

    /// Native popcount (lowers to `popcnt`/`vpopcnt` where available)
    fn count_ones(self) -> u32;
    /// Branch-free SWAR popcount, no hardware support required
    fn count_ones_swar(self) -> u32;

    /// Two's-complement bits zero-extended to 128 bits
    fn to_bits(self) -> u128;
    /// Keeps the low `BITS` bits
    fn from_bits(bits: u128) -> Self;

    fn le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_lane {
    ($($t:ty => $u:ty),* $(,)?) => {$(
        impl Lane for $t {
            type Bytes = [u8; std::mem::size_of::<$t>()];

            const BITS: u32 = <$t>::BITS;
            const SIGNED: bool = <$t>::MIN != 0;
            const MIN: Self = <$t>::MIN;
            const MAX: Self = <$t>::MAX;
            const ZERO: Self = 0;
            const ONE: Self = 1;

            #[inline(always)]
            fn wrapping_add(self, rhs: Self) -> Self { <$t>::wrapping_add(self, rhs) }
            #[inline(always)]
            fn wrapping_sub(self, rhs: Self) -> Self { <$t>::wrapping_sub(self, rhs) }
            #[inline(always)]
            fn wrapping_mul(self, rhs: Self) -> Self { <$t>::wrapping_mul(self, rhs) }
            #[inline(always)]
            fn wrapping_div(self, rhs: Self) -> Self { <$t>::wrapping_div(self, rhs) }
            #[inline(always)]
            fn wrapping_rem(self, rhs: Self) -> Self { <$t>::wrapping_rem(self, rhs) }

            #[inline(always)]
            fn bitand(self, rhs: Self) -> Self { self & rhs }

            #[inline(always)]
            fn count_ones(self) -> u32 { <$t>::count_ones(self) }

            #[inline(always)]
            fn count_ones_swar(self) -> u32 {
                let mut x = self as $u;
                x = x - ((x >> 1) & (<$u>::MAX / 3));
                x = (x & (<$u>::MAX / 5)) + ((x >> 2) & (<$u>::MAX / 5));
                x = (x + (x >> 4)) & (<$u>::MAX / 17);
                (x.wrapping_mul(<$u>::MAX / 255) >> (<$u>::BITS - 8)) as u32
            }

            #[inline(always)]
            fn to_bits(self) -> u128 { (self as $u) as u128 }
            #[inline(always)]
            fn from_bits(bits: u128) -> Self { bits as $u as $t }

            #[inline(always)]
            fn le_bytes(self) -> Self::Bytes { self.to_le_bytes() }
        }
    )*};
}

impl_lane!(
    u8 => u8, i8 => u8,
    u16 => u16, i16 => u16,
    u32 => u32, i32 => u32,
    u64 => u64, i64 => u64,
    u128 => u128, i128 => u128,
);

#[cfg(test)]
mod tests {
    use super::*;

    fn swar_matches<T: Lane>(values: &[T]) {
        for &v in values {
            assert_eq!(v.count_ones(), v.count_ones_swar(), "{:?}", v);
        }
    }

    #[test]
    fn test_swar_popcount_matches_native() {
        swar_matches(&[0u8, 1, 0x80, 0xFF, 0xA5]);
        swar_matches(&[0i8, -1, i8::MIN, 0x55]);
        swar_matches(&[0u16, 0xFFFF, 0xAD5B, 0x8000]);
        swar_matches(&[0u32, u32::MAX, 0x56AA_AD5B, 0x1234_5678]);
        swar_matches(&[0i64, -1, i64::MIN, 0x0F0F_0F0F_0F0F_0F0F]);
        swar_matches(&[0u128, u128::MAX, 1 << 127, 0xDEAD_BEEF << 64]);
    }

    #[test]
    fn test_bits_roundtrip_signed() {
        assert_eq!((-1i16).to_bits(), 0xFFFF);
        assert_eq!(i16::from_bits(0xFFFF), -1);
        assert_eq!(u8::from_bits(0x1FF), 0xFF);
        assert!(i32::SIGNED);
        assert!(!u32::SIGNED);
    }

    #[test]
    fn test_signed_remainder_follows_dividend() {
        assert_eq!(Lane::wrapping_rem(-7i32, 3), -1);
        assert_eq!(Lane::wrapping_div(-7i32, 2), -3);
    }
}
