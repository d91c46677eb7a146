//! Aggregation and filtering directly on AN-coded data.

use super::codec::{AnCodec, Enc};
use super::{AggregateOp, FilterOp, RawElement};
use crate::errors::{CodingError, ensure_len};
use crate::simd::{CmpOp, Lane, SimdVector, dispatch_vector};

/// Filter predicate with its thresholds already encoded
#[derive(Debug, Clone, Copy)]
struct EncodedPredicate<E> {
    first: (CmpOp, E),
    second: Option<(CmpOp, E)>,
}

impl<E: Lane> EncodedPredicate<E> {
    #[inline(always)]
    fn matches(&self, value: E) -> bool {
        let (op, threshold) = self.first;
        op.eval(value, threshold)
            && self
                .second
                .is_none_or(|(op, threshold)| op.eval(value, threshold))
    }
}

impl<R: RawElement> AnCodec<R> {
    /// Reduces encoded data; the result is still encoded.
    ///
    /// Sum wraps modulo 2^m, so it decodes exactly while the raw sum fits the
    /// encoded width. Min and max compare codewords directly since
    /// multiplication by a positive `A` preserves order. Avg is the realigned
    /// quotient of the sum by the element count. At least one pass runs even
    /// for `iterations == 0`.
    pub fn aggregate(
        &self,
        input: &[Enc<R>],
        op: AggregateOp,
        iterations: usize,
    ) -> Result<Enc<R>, CodingError> {
        self.run_aggregate(input, op, iterations, false)
    }

    /// Aggregation that validates every element it reads.
    pub fn aggregate_checked(
        &self,
        input: &[Enc<R>],
        op: AggregateOp,
        iterations: usize,
    ) -> Result<Enc<R>, CodingError> {
        self.run_aggregate(input, op, iterations, true)
    }

    fn run_aggregate(
        &self,
        input: &[Enc<R>],
        op: AggregateOp,
        iterations: usize,
        checked: bool,
    ) -> Result<Enc<R>, CodingError> {
        if input.is_empty() {
            return match op {
                AggregateOp::Sum => Ok(<Enc<R> as Lane>::ZERO),
                _ => Err(CodingError::EmptyInput),
            };
        }
        let count = match op {
            AggregateOp::Avg => Some(element_count::<Enc<R>>(input.len())?),
            _ => None,
        };

        let mut total = <Enc<R> as Lane>::ZERO;
        for iteration in 0..iterations.max(1) {
            total = dispatch_vector!(
                self.config.backend, Enc<R>;
                self, aggregate_pass(input, op, checked, iteration)
            )?;
        }

        Ok(match count {
            Some(count) => self.realign(total.wrapping_div(count)),
            None => total,
        })
    }

    #[inline(always)]
    fn aggregate_pass<V: SimdVector<Lane = Enc<R>>>(
        &self,
        input: &[Enc<R>],
        op: AggregateOp,
        checked: bool,
        iteration: usize,
    ) -> Result<Enc<R>, CodingError> {
        let plan = self.config.plan::<V>(input.len());
        let identity = match op {
            AggregateOp::Sum | AggregateOp::Avg => <Enc<R> as Lane>::ZERO,
            AggregateOp::Min => <Enc<R> as Lane>::MAX,
            AggregateOp::Max => <Enc<R> as Lane>::MIN,
        };

        let mut acc = V::splat(identity);
        for offset in plan.vector_offsets() {
            let encoded = V::load(&input[offset..]);
            if checked {
                self.ensure_valid(encoded, offset, iteration)?;
            }
            acc = match op {
                AggregateOp::Sum | AggregateOp::Avg => acc.add(encoded),
                AggregateOp::Min => acc.min(encoded),
                AggregateOp::Max => acc.max(encoded),
            };
        }

        let mut total = match op {
            AggregateOp::Sum | AggregateOp::Avg => acc.reduce_sum(),
            AggregateOp::Min => acc.reduce_min(),
            AggregateOp::Max => acc.reduce_max(),
        };
        for i in plan.remainder() {
            let value = input[i];
            if checked && !self.is_valid(value) {
                return Err(CodingError::corruption(i, iteration));
            }
            total = match op {
                AggregateOp::Sum | AggregateOp::Avg => total.wrapping_add(value),
                AggregateOp::Min => total.min(value),
                AggregateOp::Max => total.max(value),
            };
        }
        Ok(total)
    }

    /// Compacts the encoded values matching `predicate` into the front of
    /// `output`, keeping their order, and returns how many matched.
    ///
    /// Thresholds are encoded once per call; comparisons run on codewords.
    pub fn filter(
        &self,
        input: &[Enc<R>],
        predicate: FilterOp<R>,
        output: &mut [Enc<R>],
        iterations: usize,
    ) -> Result<usize, CodingError> {
        self.run_filter(input, predicate, output, iterations, false)
    }

    /// Filtering that validates every element it reads.
    pub fn filter_checked(
        &self,
        input: &[Enc<R>],
        predicate: FilterOp<R>,
        output: &mut [Enc<R>],
        iterations: usize,
    ) -> Result<usize, CodingError> {
        self.run_filter(input, predicate, output, iterations, true)
    }

    fn run_filter(
        &self,
        input: &[Enc<R>],
        predicate: FilterOp<R>,
        output: &mut [Enc<R>],
        iterations: usize,
        checked: bool,
    ) -> Result<usize, CodingError> {
        ensure_len(input.len(), output.len())?;
        let predicate = self.encode_predicate(predicate);

        let mut matched = 0;
        for iteration in 0..iterations {
            matched = dispatch_vector!(
                self.config.backend, Enc<R>;
                self, filter_pass(input, predicate, output, checked, iteration)
            )?;
        }
        Ok(matched)
    }

    fn encode_predicate(&self, predicate: FilterOp<R>) -> EncodedPredicate<Enc<R>> {
        match predicate {
            FilterOp::Between(lo, hi) => EncodedPredicate {
                first: (CmpOp::Ge, self.encode_value(lo)),
                second: Some((CmpOp::Le, self.encode_value(hi))),
            },
            single => {
                let (op, threshold) = single.single();
                EncodedPredicate {
                    first: (op, self.encode_value(threshold)),
                    second: None,
                }
            }
        }
    }

    #[inline(always)]
    fn filter_pass<V: SimdVector<Lane = Enc<R>>>(
        &self,
        input: &[Enc<R>],
        predicate: EncodedPredicate<Enc<R>>,
        output: &mut [Enc<R>],
        checked: bool,
        iteration: usize,
    ) -> Result<usize, CodingError> {
        let plan = self.config.plan::<V>(input.len());
        let (first_op, first) = predicate.first;
        let first = V::splat(first);
        let second = predicate
            .second
            .map(|(op, threshold)| (op, V::splat(threshold)));

        let mut written = 0;
        for offset in plan.vector_offsets() {
            let encoded = V::load(&input[offset..]);
            if checked {
                self.ensure_valid(encoded, offset, iteration)?;
            }
            let mut mask = encoded.compare(first, first_op);
            if let Some((op, threshold)) = second {
                mask = mask.and(encoded.compare(threshold, op));
            }
            written += encoded.compress_store(mask, &mut output[written..]);
        }

        for i in plan.remainder() {
            let value = input[i];
            if checked && !self.is_valid(value) {
                return Err(CodingError::corruption(i, iteration));
            }
            if predicate.matches(value) {
                output[written] = value;
                written += 1;
            }
        }
        Ok(written)
    }
}

/// `n` as a positive value of the encoded type, for averaging
fn element_count<E: Lane>(n: usize) -> Result<E, CodingError> {
    let count = E::from_bits(n as u128);
    if count <= E::ZERO || count.to_bits() != n as u128 {
        return Err(CodingError::InvalidConfig(format!(
            "cannot average {} elements in a {}-bit encoded type",
            n,
            E::BITS
        )));
    }
    Ok(count)
}
