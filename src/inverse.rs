//! Multiplicative inverses modulo powers of two.
//!
//! AN decoding multiplies by `A⁻¹ mod 2^k` instead of dividing by `A`. The
//! modulus 2^k does not fit the native word for k = 64 (or k = 128 for the
//! widest encoded type), so the extended Euclidean algorithm runs on
//! arbitrary-precision integers.

use crate::errors::CodingError;
use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};

/// Largest supported modulus exponent.
pub const MAX_BITS: u32 = 128;

/// Computes `a` with `a * b ≡ 1 (mod 2^bits)`.
///
/// `b` is reduced modulo `2^bits` first. Fails with `InvariantViolation` when
/// `b` is even (no inverse exists) or when the result does not pass its own
/// verification, and with `InvalidConfig` for `bits` outside `1..=128`.
pub fn mod_inverse(b: u128, bits: u32) -> Result<u128, CodingError> {
    if bits == 0 || bits > MAX_BITS {
        return Err(CodingError::InvalidConfig(format!(
            "modulus exponent must be in 1..={}, got {}",
            MAX_BITS, bits
        )));
    }

    let modulus = BigInt::one() << bits;
    let b_big = BigInt::from(b).mod_floor(&modulus);
    let violation = CodingError::InvariantViolation { constant: b, bits };

    if b_big.is_even() {
        return Err(violation);
    }

    // Forward pass: quotient sequence of (2^bits, b) down to a zero remainder
    let mut quotients = Vec::new();
    let mut r0 = modulus.clone();
    let mut r1 = b_big.clone();
    while !r1.is_zero() {
        let (q, r) = r0.div_rem(&r1);
        quotients.push(q);
        r0 = r1;
        r1 = r;
    }
    if !r0.is_one() {
        return Err(violation);
    }

    // Back-substitution: gcd = s*r_i + t*r_{i+1}, walked back to (2^bits, b)
    let mut s = BigInt::one();
    let mut t = BigInt::zero();
    for q in quotients.iter().rev() {
        let next_t = &s - &t * q;
        s = t;
        t = next_t;
    }

    let inverse = t.mod_floor(&modulus);
    if (&b_big * &inverse).mod_floor(&modulus) != BigInt::one() {
        return Err(violation);
    }

    match inverse.sign() {
        Sign::Minus => Err(violation),
        _ => inverse.to_u128().ok_or(violation),
    }
}
