//! Error-detecting encodings for in-memory integer data, vectorised.
//!
//! - [`AnCodec`]: AN codes (`value × A`) with validation by multiplicative
//!   inverse or remainder, plus arithmetic, aggregation and filtering
//!   directly on encoded data
//! - [`HammingCodec`]: extended Hamming codes over 16- and 32-bit words
//! - [`BlockChecksum`]: XOR and CRC-32C block checksums as a baseline
//! - [`bench`]: the harness that times all of them across SIMD widths
//!
//! ```
//! use an_bench::{AnCodec, CodecConfig, Layout};
//!
//! let codec = AnCodec::<u16>::new(63877, Layout::Inverse, CodecConfig::scalar()).unwrap();
//! let raw = [1u16, 2, 65535];
//! let mut encoded = [0u32; 3];
//! codec.encode(&raw, &mut encoded, 1).unwrap();
//! assert!(codec.check(&encoded, 1).is_ok());
//! ```

pub mod an;
pub mod bench;
mod buffer;
pub mod checksum;
mod core;
mod errors;
pub mod hamming;
pub mod inverse;
pub mod prelude;
pub mod simd;

pub use an::{AggregateOp, AnCodec, ArithmeticOp, FilterOp, Layout, RawElement};
pub use buffer::{AlignedBuffer, BUFFER_ALIGN};
pub use checksum::{BlockChecksum, ChecksumKind};
pub use crate::core::{
    BenchConfig, Constants, Matrix, SUPPORTED_WIDTHS, Settings, parse_constant,
};
pub use errors::{CodingError, FaultLocation};
pub use hamming::{Codeword, HammingCodec, HammingLane, PopcountStrategy};
pub use inverse::mod_inverse;
pub use simd::{Backend, CodecConfig, Lane, SimdLevel};
