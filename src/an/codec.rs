use super::{ArithmeticOp, Layout, RawElement};
use crate::errors::{CodingError, ensure_len};
use crate::inverse::mod_inverse;
use crate::simd::{CmpOp, CodecConfig, Lane, LaneMask, SimdLevel, SimdVector, dispatch_vector};

/// Encoded storage type of raw type `R`
pub(super) type Enc<R> = <R as RawElement>::Encoded;

/// AN codec for raw type `R`.
///
/// Holds the code constant `A`, its inverse modulo 2^m (m = bit width of the
/// encoded type), the check layout and the backend/unroll configuration.
/// Every operation takes an `iterations` count and repeats its full pass
/// that many times; faults report the iteration that saw them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnCodec<R: RawElement> {
    pub(super) a: Enc<R>,
    pub(super) a_inv: Enc<R>,
    /// Raw range widened into the encoded type
    pub(super) lo: Enc<R>,
    pub(super) hi: Enc<R>,
    pub(super) layout: Layout,
    pub(super) config: CodecConfig,
}

impl<R: RawElement> AnCodec<R> {
    /// Creates a codec for constant `a`.
    ///
    /// `a` must be odd and below 2^w for w-bit raw data.
    pub fn new(a: u128, layout: Layout, config: CodecConfig) -> Result<Self, CodingError> {
        if a >> R::BITS != 0 {
            return Err(CodingError::InvalidConstant {
                constant: a,
                raw_bits: R::BITS,
            });
        }
        let a_inv = mod_inverse(a, <Enc<R> as Lane>::BITS)?;

        Ok(Self {
            a: <Enc<R> as Lane>::from_bits(a),
            a_inv: <Enc<R> as Lane>::from_bits(a_inv),
            lo: R::MIN.widen(),
            hi: R::MAX.widen(),
            layout,
            config,
        })
    }

    pub fn a(&self) -> Enc<R> {
        self.a
    }

    pub fn a_inv(&self) -> Enc<R> {
        self.a_inv
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn config(&self) -> CodecConfig {
        self.config
    }

    /// Instruction set the passes of this codec run with
    pub fn level(&self) -> SimdLevel {
        SimdLevel::select(self.config.backend, false)
    }

    /// Same constant and layout on another backend/unroll configuration
    pub fn with_config(&self, config: CodecConfig) -> Self {
        Self { config, ..*self }
    }

    pub fn encode_value(&self, raw: R) -> Enc<R> {
        raw.widen().wrapping_mul(self.a)
    }

    /// Decodes a single value into the encoded width, without truncation to
    /// the raw type. Aggregation results use this.
    pub fn decode_value(&self, encoded: Enc<R>) -> Enc<R> {
        encoded.wrapping_mul(self.a_inv)
    }

    /// Rounds toward zero to a multiple of `A`
    #[inline(always)]
    pub(super) fn realign(&self, quotient: Enc<R>) -> Enc<R> {
        quotient.wrapping_sub(quotient.wrapping_rem(self.a))
    }

    /// Whether `encoded` passes this codec's check
    #[inline(always)]
    pub fn is_valid(&self, encoded: Enc<R>) -> bool {
        match self.layout {
            Layout::Inverse => {
                let decoded = encoded.wrapping_mul(self.a_inv);
                self.lo <= decoded && decoded <= self.hi
            }
            Layout::DivMod => encoded.wrapping_rem(self.a) == <Enc<R> as Lane>::ZERO,
        }
    }

    #[inline(always)]
    pub(super) fn valid_lanes<V: SimdVector<Lane = Enc<R>>>(&self, encoded: V) -> LaneMask {
        match self.layout {
            Layout::Inverse => {
                let decoded = encoded.mul_lo(V::splat(self.a_inv));
                decoded
                    .compare(V::splat(self.lo), CmpOp::Ge)
                    .and(decoded.compare(V::splat(self.hi), CmpOp::Le))
            }
            Layout::DivMod => encoded
                .rem(V::splat(self.a))
                .compare(V::splat(<Enc<R> as Lane>::ZERO), CmpOp::Eq),
        }
    }

    /// Fails at the first lane of `encoded` that is not a codeword
    #[inline(always)]
    pub(super) fn ensure_valid<V: SimdVector<Lane = Enc<R>>>(
        &self,
        encoded: V,
        offset: usize,
        iteration: usize,
    ) -> Result<(), CodingError> {
        match self.valid_lanes(encoded).first_unset() {
            Some(lane) => Err(CodingError::corruption(offset + lane, iteration)),
            None => Ok(()),
        }
    }

    /// `encoded[i] = raw[i] * A`
    pub fn encode(
        &self,
        input: &[R],
        output: &mut [Enc<R>],
        iterations: usize,
    ) -> Result<(), CodingError> {
        ensure_len(input.len(), output.len())?;
        for _ in 0..iterations {
            dispatch_vector!(self.config.backend, Enc<R>; self, encode_pass(input, output));
        }
        Ok(())
    }

    /// Fail-fast validation of every element.
    pub fn check(&self, input: &[Enc<R>], iterations: usize) -> Result<(), CodingError> {
        for iteration in 0..iterations {
            dispatch_vector!(self.config.backend, Enc<R>; self, check_pass(input, iteration))?;
        }
        Ok(())
    }

    /// `raw[i] = encoded[i] * A⁻¹` truncated to the raw width, without
    /// validation.
    pub fn decode(
        &self,
        input: &[Enc<R>],
        output: &mut [R],
        iterations: usize,
    ) -> Result<(), CodingError> {
        ensure_len(input.len(), output.len())?;
        for iteration in 0..iterations {
            dispatch_vector!(self.config.backend, Enc<R>; self, decode_pass(input, output, false, iteration))?;
        }
        Ok(())
    }

    /// Decode with the check fused into the same pass.
    pub fn decode_checked(
        &self,
        input: &[Enc<R>],
        output: &mut [R],
        iterations: usize,
    ) -> Result<(), CodingError> {
        ensure_len(input.len(), output.len())?;
        for iteration in 0..iterations {
            dispatch_vector!(self.config.backend, Enc<R>; self, decode_pass(input, output, true, iteration))?;
        }
        Ok(())
    }

    /// Applies `op` with a raw `operand` to every encoded element.
    ///
    /// Add and sub scale the operand by `A`; mul uses it as is. Div divides
    /// by the plain operand and realigns the quotient to the next multiple of
    /// `A` toward zero, which yields `(x / operand) * A` with truncating
    /// division.
    pub fn arithmetic(
        &self,
        input: &[Enc<R>],
        operand: R,
        op: ArithmeticOp,
        output: &mut [Enc<R>],
        iterations: usize,
    ) -> Result<(), CodingError> {
        self.run_arithmetic(input, operand, op, output, iterations, false)
    }

    /// Like [`arithmetic`](Self::arithmetic), but every input element is
    /// validated before the operator is applied.
    pub fn arithmetic_checked(
        &self,
        input: &[Enc<R>],
        operand: R,
        op: ArithmeticOp,
        output: &mut [Enc<R>],
        iterations: usize,
    ) -> Result<(), CodingError> {
        self.run_arithmetic(input, operand, op, output, iterations, true)
    }

    fn run_arithmetic(
        &self,
        input: &[Enc<R>],
        operand: R,
        op: ArithmeticOp,
        output: &mut [Enc<R>],
        iterations: usize,
        checked: bool,
    ) -> Result<(), CodingError> {
        ensure_len(input.len(), output.len())?;
        if op == ArithmeticOp::Div && operand == R::ZERO {
            return Err(CodingError::DivisionByZero);
        }
        let operand = match op {
            ArithmeticOp::Add | ArithmeticOp::Sub => self.encode_value(operand),
            ArithmeticOp::Mul | ArithmeticOp::Div => operand.widen(),
        };
        for iteration in 0..iterations {
            dispatch_vector!(
                self.config.backend, Enc<R>;
                self, arithmetic_pass(input, operand, op, output, checked, iteration)
            )?;
        }
        Ok(())
    }

    /// Verifies under this codec, then re-encodes under `target`'s constant
    /// with a single multiply by `A⁻¹ * A_target`.
    pub fn reencode_checked(
        &self,
        input: &[Enc<R>],
        target: &AnCodec<R>,
        output: &mut [Enc<R>],
        iterations: usize,
    ) -> Result<(), CodingError> {
        ensure_len(input.len(), output.len())?;
        let factor = self.a_inv.wrapping_mul(target.a);
        for iteration in 0..iterations {
            dispatch_vector!(
                self.config.backend, Enc<R>;
                self, reencode_pass(input, factor, output, iteration)
            )?;
        }
        Ok(())
    }

    #[inline(always)]
    fn encode_pass<V: SimdVector<Lane = Enc<R>>>(&self, input: &[R], output: &mut [Enc<R>]) {
        let plan = self.config.plan::<V>(input.len());
        let a = V::splat(self.a);

        for offset in plan.vector_offsets() {
            V::load_with(|lane| input[offset + lane].widen())
                .mul_lo(a)
                .store(&mut output[offset..]);
        }

        for i in plan.remainder() {
            output[i] = self.encode_value(input[i]);
        }
    }

    #[inline(always)]
    fn check_pass<V: SimdVector<Lane = Enc<R>>>(
        &self,
        input: &[Enc<R>],
        iteration: usize,
    ) -> Result<(), CodingError> {
        let plan = self.config.plan::<V>(input.len());

        for offset in plan.vector_offsets() {
            self.ensure_valid(V::load(&input[offset..]), offset, iteration)?;
        }

        for i in plan.remainder() {
            if !self.is_valid(input[i]) {
                return Err(CodingError::corruption(i, iteration));
            }
        }
        Ok(())
    }

    #[inline(always)]
    fn decode_pass<V: SimdVector<Lane = Enc<R>>>(
        &self,
        input: &[Enc<R>],
        output: &mut [R],
        checked: bool,
        iteration: usize,
    ) -> Result<(), CodingError> {
        let plan = self.config.plan::<V>(input.len());
        let a_inv = V::splat(self.a_inv);

        for offset in plan.vector_offsets() {
            let encoded = V::load(&input[offset..]);
            if checked {
                self.ensure_valid(encoded, offset, iteration)?;
            }
            let decoded = encoded.mul_lo(a_inv);
            for (lane, out) in output[offset..offset + V::LANES].iter_mut().enumerate() {
                *out = R::narrow(decoded.lane(lane));
            }
        }

        for i in plan.remainder() {
            if checked && !self.is_valid(input[i]) {
                return Err(CodingError::corruption(i, iteration));
            }
            output[i] = R::narrow(self.decode_value(input[i]));
        }
        Ok(())
    }

    #[inline(always)]
    fn apply(&self, op: ArithmeticOp, encoded: Enc<R>, operand: Enc<R>) -> Enc<R> {
        match op {
            ArithmeticOp::Add => encoded.wrapping_add(operand),
            ArithmeticOp::Sub => encoded.wrapping_sub(operand),
            ArithmeticOp::Mul => encoded.wrapping_mul(operand),
            ArithmeticOp::Div => self.realign(encoded.wrapping_div(operand)),
        }
    }

    #[inline(always)]
    fn apply_vector<V: SimdVector<Lane = Enc<R>>>(&self, op: ArithmeticOp, encoded: V, operand: V) -> V {
        match op {
            ArithmeticOp::Add => encoded.add(operand),
            ArithmeticOp::Sub => encoded.sub(operand),
            ArithmeticOp::Mul => encoded.mul_lo(operand),
            ArithmeticOp::Div => {
                let quotient = encoded.div(operand);
                quotient.sub(quotient.rem(V::splat(self.a)))
            }
        }
    }

    #[inline(always)]
    fn arithmetic_pass<V: SimdVector<Lane = Enc<R>>>(
        &self,
        input: &[Enc<R>],
        operand: Enc<R>,
        op: ArithmeticOp,
        output: &mut [Enc<R>],
        checked: bool,
        iteration: usize,
    ) -> Result<(), CodingError> {
        let plan = self.config.plan::<V>(input.len());
        let operand_v = V::splat(operand);

        for offset in plan.vector_offsets() {
            let encoded = V::load(&input[offset..]);
            if checked {
                self.ensure_valid(encoded, offset, iteration)?;
            }
            self.apply_vector(op, encoded, operand_v)
                .store(&mut output[offset..]);
        }

        for i in plan.remainder() {
            if checked && !self.is_valid(input[i]) {
                return Err(CodingError::corruption(i, iteration));
            }
            output[i] = self.apply(op, input[i], operand);
        }
        Ok(())
    }

    #[inline(always)]
    fn reencode_pass<V: SimdVector<Lane = Enc<R>>>(
        &self,
        input: &[Enc<R>],
        factor: Enc<R>,
        output: &mut [Enc<R>],
        iteration: usize,
    ) -> Result<(), CodingError> {
        let plan = self.config.plan::<V>(input.len());
        let factor_v = V::splat(factor);

        for offset in plan.vector_offsets() {
            let encoded = V::load(&input[offset..]);
            self.ensure_valid(encoded, offset, iteration)?;
            encoded.mul_lo(factor_v).store(&mut output[offset..]);
        }

        for i in plan.remainder() {
            if !self.is_valid(input[i]) {
                return Err(CodingError::corruption(i, iteration));
            }
            output[i] = input[i].wrapping_mul(factor);
        }
        Ok(())
    }
}
