//! AN arithmetic codes.
//!
//! A raw value `x` is stored as `x * A` in the next wider integer type. Valid
//! codewords are exactly the multiples of `A` whose quotient fits the raw
//! type, so most corruptions turn a codeword into a non-codeword. Addition,
//! subtraction, multiplication and (realigned) division stay closed over
//! codewords, which lets the codecs operate on encoded data directly.

mod codec;
mod ops;

pub use codec::AnCodec;

use crate::simd::{CmpOp, Lane, LaneVectors};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw element types with their encoded storage type.
pub trait RawElement: Lane {
    /// Next wider integer of the same signedness
    type Encoded: LaneVectors;

    /// Sign- or zero-extends into the encoded type
    fn widen(self) -> Self::Encoded;
    /// Keeps the low `BITS` bits
    fn narrow(encoded: Self::Encoded) -> Self;
}

macro_rules! impl_raw_element {
    ($($raw:ty => $enc:ty),* $(,)?) => {$(
        impl RawElement for $raw {
            type Encoded = $enc;

            #[inline(always)]
            fn widen(self) -> $enc {
                self as $enc
            }

            #[inline(always)]
            fn narrow(encoded: $enc) -> Self {
                encoded as $raw
            }
        }
    )*};
}

impl_raw_element!(
    u8 => u16, i8 => i16,
    u16 => u32, i16 => i32,
    u32 => u64, i32 => i64,
    u64 => u128, i64 => i128,
);

/// How `check` decides whether an encoded value is a codeword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `e * A⁻¹ mod 2^m` must land inside the raw range.
    ///
    /// One multiply and two compares, but a corruption that happens to decode
    /// back into the raw range passes unnoticed.
    #[default]
    Inverse,
    /// `e mod A` must be zero.
    DivMod,
}

impl Layout {
    pub const ALL: [Layout; 2] = [Layout::Inverse, Layout::DivMod];

    pub fn as_str(self) -> &'static str {
        match self {
            Layout::Inverse => "inverse",
            Layout::DivMod => "divmod",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inverse" | "inv" => Ok(Layout::Inverse),
            "divmod" | "mod" => Ok(Layout::DivMod),
            _ => Err(format!(
                "unknown layout '{}' (expected inverse or divmod)",
                s
            )),
        }
    }
}

/// Operators applicable to encoded data with a raw operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithmeticOp {
    pub const ALL: [ArithmeticOp; 4] = [
        ArithmeticOp::Add,
        ArithmeticOp::Sub,
        ArithmeticOp::Mul,
        ArithmeticOp::Div,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "add",
            ArithmeticOp::Sub => "sub",
            ArithmeticOp::Mul => "mul",
            ArithmeticOp::Div => "div",
        }
    }
}

/// Reductions over encoded data; results stay encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOp {
    Sum,
    Min,
    Max,
    Avg,
}

impl AggregateOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregateOp::Sum => "sum",
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Avg => "avg",
        }
    }
}

/// Scan predicates with raw-domain thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp<R> {
    Lt(R),
    Le(R),
    Eq(R),
    Ne(R),
    Ge(R),
    Gt(R),
    /// Inclusive on both ends
    Between(R, R),
}

impl<R: RawElement> FilterOp<R> {
    /// Raw-domain evaluation, the reference for the encoded scan
    pub fn matches(self, value: R) -> bool {
        match self {
            FilterOp::Between(lo, hi) => lo <= value && value <= hi,
            op => {
                let (cmp, threshold) = op.single();
                cmp.eval(value, threshold)
            }
        }
    }

    /// Comparison and threshold of a single-sided predicate
    fn single(self) -> (CmpOp, R) {
        match self {
            FilterOp::Lt(t) => (CmpOp::Lt, t),
            FilterOp::Le(t) => (CmpOp::Le, t),
            FilterOp::Eq(t) => (CmpOp::Eq, t),
            FilterOp::Ne(t) => (CmpOp::Ne, t),
            FilterOp::Ge(t) => (CmpOp::Ge, t),
            FilterOp::Gt(t) => (CmpOp::Gt, t),
            FilterOp::Between(lo, _) => (CmpOp::Ge, lo),
        }
    }
}
