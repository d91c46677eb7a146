//! Convenient re-exports for common usage.
//!
//! ```
//! use an_bench::prelude::*;
//!
//! let codec = HammingCodec::<u32>::new(CodecConfig::scalar(), PopcountStrategy::Hardware);
//! let mut words = [Codeword::default(); 2];
//! codec.encode(&[7, 9], &mut words, 1).unwrap();
//! assert!(codec.check(&words, 1).is_ok());
//! ```

pub use crate::{
    // AN codes
    AggregateOp,
    AnCodec,
    ArithmeticOp,
    // Configuration
    Backend,
    BenchConfig,
    // Checksums
    BlockChecksum,
    ChecksumKind,
    CodecConfig,
    // Errors
    CodingError,
    // Hamming codes
    Codeword,
    FaultLocation,
    FilterOp,
    HammingCodec,
    Layout,
    PopcountStrategy,
    RawElement,
    // Buffers
    AlignedBuffer,
    mod_inverse,
};
