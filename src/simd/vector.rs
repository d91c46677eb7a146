//! Width-polymorphic vector type.
//!
//! `Simd<T, N>` is a plain lane array whose operations are written as
//! straight-line per-lane loops; with the lane count fixed at compile time
//! these lower to the native vector instructions of the target. Codecs are
//! written once against [`SimdVector`] and instantiated per width through
//! [`LaneVectors`].

use super::compress;
use super::lane::Lane;

/// Lane comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl CmpOp {
    #[inline(always)]
    pub fn eval<T: Lane>(self, a: T, b: T) -> bool {
        match self {
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Ge => a >= b,
            CmpOp::Gt => a > b,
        }
    }
}

/// One bit per lane, lane 0 in bit 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneMask {
    bits: u64,
    lanes: u32,
}

impl LaneMask {
    pub fn new(bits: u64, lanes: usize) -> Self {
        debug_assert!(lanes <= 64);
        let full = full_mask(lanes);
        Self {
            bits: bits & full,
            lanes: lanes as u32,
        }
    }

    pub fn bits(self) -> u64 {
        self.bits
    }

    pub fn all(self) -> bool {
        self.bits == full_mask(self.lanes as usize)
    }

    pub fn any(self) -> bool {
        self.bits != 0
    }

    pub fn and(self, other: Self) -> Self {
        Self::new(self.bits & other.bits, self.lanes as usize)
    }

    /// First lane whose bit is clear
    pub fn first_unset(self) -> Option<usize> {
        let inverted = !self.bits & full_mask(self.lanes as usize);
        (inverted != 0).then(|| inverted.trailing_zeros() as usize)
    }
}

#[inline(always)]
fn full_mask(lanes: usize) -> u64 {
    if lanes >= 64 {
        u64::MAX
    } else {
        (1u64 << lanes) - 1
    }
}

/// Primitives every vector width provides.
///
/// Each operation works on one full vector. Partial vectors never reach
/// this layer: codecs finish buffers with a scalar remainder loop.
pub trait SimdVector: Copy + std::fmt::Debug {
    type Lane: Lane;
    const LANES: usize;

    fn splat(value: Self::Lane) -> Self;
    /// Unaligned load of the first `LANES` elements of `src`
    fn load(src: &[Self::Lane]) -> Self;
    /// Unaligned store into the first `LANES` elements of `dst`
    fn store(self, dst: &mut [Self::Lane]);
    /// Converting load: lane `i` is `f(i)`
    fn load_with<F: FnMut(usize) -> Self::Lane>(f: F) -> Self;
    fn lane(&self, index: usize) -> Self::Lane;

    fn add(self, rhs: Self) -> Self;
    fn sub(self, rhs: Self) -> Self;
    /// Low half of the lane product
    fn mul_lo(self, rhs: Self) -> Self;
    fn div(self, rhs: Self) -> Self;
    fn rem(self, rhs: Self) -> Self;
    fn and(self, rhs: Self) -> Self;
    fn min(self, rhs: Self) -> Self;
    fn max(self, rhs: Self) -> Self;

    fn compare(self, rhs: Self, op: CmpOp) -> LaneMask;

    fn reduce_sum(self) -> Self::Lane;
    fn reduce_min(self) -> Self::Lane;
    fn reduce_max(self) -> Self::Lane;

    /// Per-lane popcount using the native instruction
    fn popcount(self) -> Self;
    /// Per-lane popcount using the SWAR bit trick
    fn popcount_swar(self) -> Self;

    /// Packs bit 0 of each lane into a bitmap, lane `i` at bit `i`
    fn pack_lsb(self) -> u64;

    /// Writes the lanes selected by `mask` contiguously to `dst`, keeping
    /// their order, and returns how many were written.
    fn compress_store(self, mask: LaneMask, dst: &mut [Self::Lane]) -> usize;
}

/// `N` lanes of `T`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct Simd<T, const N: usize>([T; N]);

impl<T: Lane, const N: usize> Simd<T, N> {
    pub fn from_array(lanes: [T; N]) -> Self {
        Simd(lanes)
    }

    pub fn to_array(self) -> [T; N] {
        self.0
    }

    #[inline(always)]
    fn map(self, f: impl Fn(T) -> T) -> Self {
        Simd(std::array::from_fn(|i| f(self.0[i])))
    }

    #[inline(always)]
    fn zip(self, rhs: Self, f: impl Fn(T, T) -> T) -> Self {
        Simd(std::array::from_fn(|i| f(self.0[i], rhs.0[i])))
    }
}

impl<T: Lane, const N: usize> SimdVector for Simd<T, N> {
    type Lane = T;
    const LANES: usize = N;

    #[inline(always)]
    fn splat(value: T) -> Self {
        Simd([value; N])
    }

    #[inline(always)]
    fn load(src: &[T]) -> Self {
        let mut lanes = [T::ZERO; N];
        lanes.copy_from_slice(&src[..N]);
        Simd(lanes)
    }

    #[inline(always)]
    fn store(self, dst: &mut [T]) {
        dst[..N].copy_from_slice(&self.0);
    }

    #[inline(always)]
    fn load_with<F: FnMut(usize) -> T>(f: F) -> Self {
        Simd(std::array::from_fn(f))
    }

    #[inline(always)]
    fn lane(&self, index: usize) -> T {
        self.0[index]
    }

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        self.zip(rhs, T::wrapping_add)
    }

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        self.zip(rhs, T::wrapping_sub)
    }

    #[inline(always)]
    fn mul_lo(self, rhs: Self) -> Self {
        self.zip(rhs, T::wrapping_mul)
    }

    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        self.zip(rhs, T::wrapping_div)
    }

    #[inline(always)]
    fn rem(self, rhs: Self) -> Self {
        self.zip(rhs, T::wrapping_rem)
    }

    #[inline(always)]
    fn and(self, rhs: Self) -> Self {
        self.zip(rhs, T::bitand)
    }

    #[inline(always)]
    fn min(self, rhs: Self) -> Self {
        self.zip(rhs, Ord::min)
    }

    #[inline(always)]
    fn max(self, rhs: Self) -> Self {
        self.zip(rhs, Ord::max)
    }

    #[inline(always)]
    fn compare(self, rhs: Self, op: CmpOp) -> LaneMask {
        let mut bits = 0u64;
        for i in 0..N {
            bits |= (op.eval(self.0[i], rhs.0[i]) as u64) << i;
        }
        LaneMask::new(bits, N)
    }

    #[inline(always)]
    fn reduce_sum(self) -> T {
        self.0.iter().fold(T::ZERO, |acc, &v| acc.wrapping_add(v))
    }

    #[inline(always)]
    fn reduce_min(self) -> T {
        self.0.iter().copied().fold(T::MAX, Ord::min)
    }

    #[inline(always)]
    fn reduce_max(self) -> T {
        self.0.iter().copied().fold(T::MIN, Ord::max)
    }

    #[inline(always)]
    fn popcount(self) -> Self {
        self.map(|v| T::from_bits(v.count_ones() as u128))
    }

    #[inline(always)]
    fn popcount_swar(self) -> Self {
        self.map(|v| T::from_bits(v.count_ones_swar() as u128))
    }

    #[inline(always)]
    fn pack_lsb(self) -> u64 {
        debug_assert!(N <= 64);
        let mut bits = 0u64;
        for i in 0..N {
            bits |= ((self.0[i].to_bits() & 1) as u64) << i;
        }
        bits
    }

    #[inline(always)]
    fn compress_store(self, mask: LaneMask, dst: &mut [T]) -> usize {
        compress::compress_store(&self.0, mask.bits(), dst)
    }
}

/// Vector types of each supported width for a lane type.
pub trait LaneVectors: Lane {
    type V128: SimdVector<Lane = Self>;
    type V256: SimdVector<Lane = Self>;
    type V512: SimdVector<Lane = Self>;
}

macro_rules! lane_vectors {
    ($($t:ty: $n:literal),* $(,)?) => {$(
        impl LaneVectors for $t {
            type V128 = Simd<$t, $n>;
            type V256 = Simd<$t, { $n * 2 }>;
            type V512 = Simd<$t, { $n * 4 }>;
        }
    )*};
}

lane_vectors!(
    u8: 16, i8: 16,
    u16: 8, i16: 8,
    u32: 4, i32: 4,
    u64: 2, i64: 2,
    u128: 1, i128: 1,
);

pub type U16x8 = Simd<u16, 8>;
pub type U32x4 = Simd<u32, 4>;
pub type U32x8 = Simd<u32, 8>;
