//! SIMD abstraction layer.
//!
//! Codecs are written once against [`SimdVector`] and instantiated for the
//! 128-, 256- and 512-bit widths through [`LaneVectors`]. The backend tag is
//! chosen when a codec is configured and dispatched on every call, through
//! the [`SimdLevel`] entry point whose target features the CPU reports.
//! Runtime CPU feature detection also picks the default width.

use crate::errors::CodingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

pub mod compress;
pub mod lane;
pub mod plan;
pub mod vector;

#[cfg(all(target_arch = "x86_64", feature = "simd"))]
pub(crate) mod x86_64;

pub use lane::Lane;
pub use plan::BlockPlan;
pub use vector::{CmpOp, LaneMask, LaneVectors, Simd, SimdVector};

/// Largest unroll factor a codec accepts.
pub const MAX_UNROLL: usize = 64;

// CPU feature detection cache
static HAS_AVX2: OnceLock<bool> = OnceLock::new();
static HAS_AVX512F: OnceLock<bool> = OnceLock::new();
static HAS_AVX512BW: OnceLock<bool> = OnceLock::new();
static HAS_AVX512_BITALG: OnceLock<bool> = OnceLock::new();
static HAS_AVX512_VPOPCNTDQ: OnceLock<bool> = OnceLock::new();
static HAS_POPCNT: OnceLock<bool> = OnceLock::new();

/// Check if AVX2 is available (cached after first call)
#[cfg(target_arch = "x86_64")]
pub fn has_avx2() -> bool {
    *HAS_AVX2.get_or_init(|| is_x86_feature_detected!("avx2"))
}

/// Check if AVX-512F is available (cached after first call)
#[cfg(target_arch = "x86_64")]
pub fn has_avx512f() -> bool {
    *HAS_AVX512F.get_or_init(|| is_x86_feature_detected!("avx512f"))
}

/// Check if AVX-512BW (8/16-bit lanes in 512-bit registers) is available
#[cfg(target_arch = "x86_64")]
pub fn has_avx512bw() -> bool {
    *HAS_AVX512BW.get_or_init(|| is_x86_feature_detected!("avx512bw"))
}

/// Check if AVX-512 BITALG (8/16-bit lane popcount) is available
#[cfg(target_arch = "x86_64")]
pub fn has_avx512_bitalg() -> bool {
    *HAS_AVX512_BITALG.get_or_init(|| is_x86_feature_detected!("avx512bitalg"))
}

/// Check if AVX-512 VPOPCNTDQ (32/64-bit lane popcount) is available
#[cfg(target_arch = "x86_64")]
pub fn has_avx512_vpopcntdq() -> bool {
    *HAS_AVX512_VPOPCNTDQ.get_or_init(|| is_x86_feature_detected!("avx512vpopcntdq"))
}

/// Check if the scalar POPCNT instruction is available
#[cfg(target_arch = "x86_64")]
pub fn has_popcnt() -> bool {
    *HAS_POPCNT.get_or_init(|| is_x86_feature_detected!("popcnt"))
}

#[cfg(not(target_arch = "x86_64"))]
pub fn has_avx2() -> bool {
    *HAS_AVX2.get_or_init(|| false)
}

#[cfg(not(target_arch = "x86_64"))]
pub fn has_avx512f() -> bool {
    *HAS_AVX512F.get_or_init(|| false)
}

#[cfg(not(target_arch = "x86_64"))]
pub fn has_avx512bw() -> bool {
    *HAS_AVX512BW.get_or_init(|| false)
}

#[cfg(not(target_arch = "x86_64"))]
pub fn has_avx512_bitalg() -> bool {
    *HAS_AVX512_BITALG.get_or_init(|| false)
}

#[cfg(not(target_arch = "x86_64"))]
pub fn has_avx512_vpopcntdq() -> bool {
    *HAS_AVX512_VPOPCNTDQ.get_or_init(|| false)
}

#[cfg(not(target_arch = "x86_64"))]
pub fn has_popcnt() -> bool {
    // aarch64 has CNT in the base NEON set
    *HAS_POPCNT.get_or_init(|| cfg!(target_arch = "aarch64"))
}

/// Check if NEON is available (aarch64 only)
pub fn has_neon() -> bool {
    cfg!(target_arch = "aarch64")
}

/// Vector width a codec runs its main loop with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// No vector main loop; every element goes through the scalar loop
    Scalar,
    V128,
    V256,
    V512,
}

impl Backend {
    pub const ALL: [Backend; 4] = [Backend::Scalar, Backend::V128, Backend::V256, Backend::V512];

    /// Vector width in bits, 0 for scalar
    pub fn bits(self) -> u32 {
        match self {
            Backend::Scalar => 0,
            Backend::V128 => 128,
            Backend::V256 => 256,
            Backend::V512 => 512,
        }
    }

    /// Lanes of `T` per vector, 0 for scalar
    pub fn lanes<T: Lane>(self) -> usize {
        (self.bits() / T::BITS) as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Scalar => "scalar",
            Backend::V128 => "v128",
            Backend::V256 => "v256",
            Backend::V512 => "v512",
        }
    }

    /// Widest width the running CPU supports natively.
    ///
    /// Without the `simd` feature this is always `Scalar`.
    pub fn detect() -> Self {
        if !cfg!(feature = "simd") || !cfg!(any(target_arch = "x86_64", target_arch = "aarch64")) {
            return Backend::Scalar;
        }
        match SimdLevel::select(Backend::V512, false).vector_bits() {
            512 => Backend::V512,
            256 => Backend::V256,
            _ => Backend::V128,
        }
    }

    /// Whether passes on this width run with instructions of that width.
    ///
    /// 128-bit lanes are baseline on x86_64 and aarch64. Wider backends are
    /// native only when dispatch enters them through a matching
    /// `target_feature` entry point; otherwise they still run, split into
    /// narrower registers.
    pub fn is_native(self) -> bool {
        match self {
            Backend::Scalar => true,
            Backend::V128 => cfg!(any(target_arch = "x86_64", target_arch = "aarch64")),
            Backend::V256 | Backend::V512 => {
                SimdLevel::select(self, false).vector_bits() >= self.bits()
            }
        }
    }
}

/// Target features a dispatched pass is compiled with.
///
/// Every generic pass is `#[inline(always)]`, so running it through
/// [`SimdLevel::run`] generates it inside a `#[target_feature]` entry point
/// and the lane loops lower to that instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimdLevel {
    /// Baseline target only (SSE2 on x86_64, NEON on aarch64)
    Portable,
    /// Baseline plus scalar POPCNT
    Popcnt,
    Avx2,
    Avx2Popcnt,
    /// AVX-512F and AVX-512BW
    Avx512,
    Avx512Popcnt,
    /// AVX-512 with BITALG and VPOPCNTDQ lane popcount
    Avx512VPopcnt,
}

impl SimdLevel {
    /// Best level the running CPU offers for `backend`. With `popcount`
    /// set, the level also enables the native popcount instructions.
    pub fn select(backend: Backend, popcount: bool) -> Self {
        if !cfg!(all(target_arch = "x86_64", feature = "simd")) {
            return SimdLevel::Portable;
        }
        let popcount = popcount && has_popcnt();
        let avx512 = has_avx512f() && has_avx512bw();
        let bits = match backend {
            Backend::Scalar | Backend::V128 => 128,
            Backend::V256 if has_avx2() => 256,
            Backend::V512 if avx512 => 512,
            Backend::V512 if has_avx2() => 256,
            Backend::V256 | Backend::V512 => 128,
        };

        match (bits, popcount) {
            (512, true) if has_avx512_bitalg() && has_avx512_vpopcntdq() => {
                SimdLevel::Avx512VPopcnt
            }
            (512, true) => SimdLevel::Avx512Popcnt,
            (512, false) => SimdLevel::Avx512,
            (256, true) => SimdLevel::Avx2Popcnt,
            (256, false) => SimdLevel::Avx2,
            (_, true) => SimdLevel::Popcnt,
            (_, false) => SimdLevel::Portable,
        }
    }

    /// Register width the level's instructions operate on
    pub fn vector_bits(self) -> u32 {
        match self {
            SimdLevel::Portable | SimdLevel::Popcnt => 128,
            SimdLevel::Avx2 | SimdLevel::Avx2Popcnt => 256,
            SimdLevel::Avx512 | SimdLevel::Avx512Popcnt | SimdLevel::Avx512VPopcnt => 512,
        }
    }

    /// Whether the level enables a native popcount instruction
    pub fn has_popcount(self) -> bool {
        matches!(
            self,
            SimdLevel::Popcnt
                | SimdLevel::Avx2Popcnt
                | SimdLevel::Avx512Popcnt
                | SimdLevel::Avx512VPopcnt
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SimdLevel::Portable => "portable",
            SimdLevel::Popcnt => "popcnt",
            SimdLevel::Avx2 => "avx2",
            SimdLevel::Avx2Popcnt => "avx2+popcnt",
            SimdLevel::Avx512 => "avx512",
            SimdLevel::Avx512Popcnt => "avx512+popcnt",
            SimdLevel::Avx512VPopcnt => "avx512+vpopcnt",
        }
    }

    /// Whether the running CPU has every feature the level enables
    pub fn is_supported(self) -> bool {
        if !cfg!(all(target_arch = "x86_64", feature = "simd")) {
            return self == SimdLevel::Portable;
        }
        let avx512 = has_avx512f() && has_avx512bw();
        match self {
            SimdLevel::Portable => true,
            SimdLevel::Popcnt => has_popcnt(),
            SimdLevel::Avx2 => has_avx2(),
            SimdLevel::Avx2Popcnt => has_avx2() && has_popcnt(),
            SimdLevel::Avx512 => avx512,
            SimdLevel::Avx512Popcnt => avx512 && has_popcnt(),
            SimdLevel::Avx512VPopcnt => {
                avx512 && has_popcnt() && has_avx512_bitalg() && has_avx512_vpopcntdq()
            }
        }
    }

    /// Runs `pass` inside the entry point for this level. An unsupported
    /// level runs `pass` on the baseline target instead.
    #[inline(always)]
    pub fn run<T>(self, pass: impl FnOnce() -> T) -> T {
        #[cfg(all(target_arch = "x86_64", feature = "simd"))]
        {
            if !self.is_supported() {
                return pass();
            }
            // SAFETY: every feature the entry point enables was detected
            // at runtime just above
            unsafe {
                match self {
                    SimdLevel::Portable => pass(),
                    SimdLevel::Popcnt => x86_64::with_popcnt(pass),
                    SimdLevel::Avx2 => x86_64::with_avx2(pass),
                    SimdLevel::Avx2Popcnt => x86_64::with_avx2_popcnt(pass),
                    SimdLevel::Avx512 => x86_64::with_avx512(pass),
                    SimdLevel::Avx512Popcnt => x86_64::with_avx512_popcnt(pass),
                    SimdLevel::Avx512VPopcnt => x86_64::with_avx512_vpopcnt(pass),
                }
            }
        }
        #[cfg(not(all(target_arch = "x86_64", feature = "simd")))]
        {
            pass()
        }
    }
}

impl fmt::Display for SimdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scalar" => Ok(Backend::Scalar),
            "v128" | "128" | "sse" | "neon" => Ok(Backend::V128),
            "v256" | "256" | "avx2" => Ok(Backend::V256),
            "v512" | "512" | "avx512" => Ok(Backend::V512),
            _ => Err(format!(
                "unknown backend '{}' (expected scalar, v128, v256 or v512)",
                s
            )),
        }
    }
}

/// Construction-time configuration shared by all codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodecConfig {
    pub backend: Backend,
    pub unroll: usize,
}

impl CodecConfig {
    pub fn new(backend: Backend, unroll: usize) -> Result<Self, CodingError> {
        if unroll == 0 || unroll > MAX_UNROLL {
            return Err(CodingError::InvalidConfig(format!(
                "unroll factor must be in 1..={}, got {}",
                MAX_UNROLL, unroll
            )));
        }
        Ok(Self { backend, unroll })
    }

    pub fn scalar() -> Self {
        Self {
            backend: Backend::Scalar,
            unroll: 1,
        }
    }

    /// Block plan for `len` elements processed with vectors of type `V`
    pub fn plan<V: SimdVector>(&self, len: usize) -> BlockPlan {
        match self.backend {
            Backend::Scalar => BlockPlan::scalar(len),
            _ => BlockPlan::new(len, V::LANES, self.unroll),
        }
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            backend: Backend::detect(),
            unroll: 1,
        }
    }
}

/// Calls `$recv.$method::<V>(args)` with `V` the vector type of `$lane`
/// matching `$backend`, inside the [`SimdLevel`] entry point selected for
/// it. The scalar backend borrows the 128-bit type; its block plan has no
/// vector part. The optional `$popcount` flag asks for native popcount.
macro_rules! dispatch_vector {
    ($backend:expr, $lane:ty, $popcount:expr; $recv:expr, $method:ident ( $($arg:expr),* $(,)? )) => {{
        let backend = $backend;
        let level = $crate::simd::SimdLevel::select(backend, $popcount);
        match backend {
            $crate::simd::Backend::Scalar | $crate::simd::Backend::V128 => level.run(|| {
                $recv.$method::<<$lane as $crate::simd::LaneVectors>::V128>($($arg),*)
            }),
            $crate::simd::Backend::V256 => level.run(|| {
                $recv.$method::<<$lane as $crate::simd::LaneVectors>::V256>($($arg),*)
            }),
            $crate::simd::Backend::V512 => level.run(|| {
                $recv.$method::<<$lane as $crate::simd::LaneVectors>::V512>($($arg),*)
            }),
        }
    }};
    ($backend:expr, $lane:ty; $recv:expr, $method:ident ( $($arg:expr),* $(,)? )) => {
        $crate::simd::dispatch_vector!($backend, $lane, false; $recv, $method($($arg),*))
    };
}

pub(crate) use dispatch_vector;
