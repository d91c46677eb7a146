use super::masks::MAX_PARITY_MASKS;
use super::{Codeword, HammingLane, PopcountStrategy, compute_code};
use crate::errors::{CodingError, ensure_len};
use crate::simd::{CmpOp, CodecConfig, SimdLevel, SimdVector, dispatch_vector};
use std::marker::PhantomData;

/// Most lanes any vector width holds (512-bit / 8-bit lanes)
const MAX_LANES: usize = 64;

/// Hamming encoder/checker for one data width, backend and popcount
/// strategy.
///
/// The vector path is bit-sliced: per mask it builds a bitmap with one
/// parity bit per lane, folds the overall parity as the XOR of all bitmaps
/// and then transposes the bitmaps back into per-lane codes.
#[derive(Debug, Clone, Copy)]
pub struct HammingCodec<T> {
    config: CodecConfig,
    strategy: PopcountStrategy,
    _lane: PhantomData<T>,
}

impl<T: HammingLane> HammingCodec<T> {
    pub fn new(config: CodecConfig, strategy: PopcountStrategy) -> Self {
        Self {
            config,
            strategy,
            _lane: PhantomData,
        }
    }

    pub fn config(&self) -> CodecConfig {
        self.config
    }

    pub fn strategy(&self) -> PopcountStrategy {
        self.strategy
    }

    /// Scalar code of a single word
    #[inline(always)]
    pub fn compute_code(&self, data: T) -> u8 {
        compute_code(data, self.strategy)
    }

    /// Difference between the stored and the recomputed code; zero for an
    /// intact word.
    #[inline(always)]
    pub fn syndrome(&self, word: &Codeword<T>) -> u8 {
        word.code ^ self.compute_code(word.data)
    }

    /// Instruction set the passes of this codec run with
    pub fn level(&self) -> SimdLevel {
        SimdLevel::select(self.config.backend, self.native_popcount())
    }

    fn native_popcount(&self) -> bool {
        self.strategy == PopcountStrategy::Hardware
    }

    /// Pairs every input word with its code.
    pub fn encode(
        &self,
        input: &[T],
        output: &mut [Codeword<T>],
        iterations: usize,
    ) -> Result<(), CodingError> {
        ensure_len(input.len(), output.len())?;
        for _ in 0..iterations {
            dispatch_vector!(self.config.backend, T, self.native_popcount(); self, encode_pass(input, output));
        }
        Ok(())
    }

    /// Recomputes every code and compares it bit-exact with the stored one.
    ///
    /// Reports the first divergent word as `ChecksumMismatch`.
    pub fn check(&self, words: &[Codeword<T>], iterations: usize) -> Result<(), CodingError> {
        for iteration in 0..iterations {
            dispatch_vector!(self.config.backend, T, self.native_popcount(); self, check_pass(words, iteration))?;
        }
        Ok(())
    }

    #[inline(always)]
    fn encode_pass<V: SimdVector<Lane = T>>(&self, input: &[T], output: &mut [Codeword<T>]) {
        let plan = self.config.plan::<V>(input.len());
        let mut codes = [0u8; MAX_LANES];

        for offset in plan.vector_offsets() {
            let chunk = &input[offset..offset + V::LANES];
            self.vector_codes::<V>(chunk, &mut codes);
            for (lane, word) in output[offset..offset + V::LANES].iter_mut().enumerate() {
                *word = Codeword {
                    data: chunk[lane],
                    code: codes[lane],
                };
            }
        }

        for i in plan.remainder() {
            output[i] = Codeword {
                data: input[i],
                code: self.compute_code(input[i]),
            };
        }
    }

    #[inline(always)]
    fn check_pass<V: SimdVector<Lane = T>>(
        &self,
        words: &[Codeword<T>],
        iteration: usize,
    ) -> Result<(), CodingError> {
        let plan = self.config.plan::<V>(words.len());
        let mut data = [T::ZERO; MAX_LANES];
        let mut codes = [0u8; MAX_LANES];

        for offset in plan.vector_offsets() {
            let block = &words[offset..offset + V::LANES];
            for (lane, word) in block.iter().enumerate() {
                data[lane] = word.data;
            }
            self.vector_codes::<V>(&data[..V::LANES], &mut codes);

            let computed = V::load_with(|lane| T::from_bits(codes[lane] as u128));
            let stored = V::load_with(|lane| T::from_bits(block[lane].code as u128));
            if let Some(lane) = computed.compare(stored, CmpOp::Eq).first_unset() {
                return Err(CodingError::mismatch(offset + lane, iteration));
            }
        }

        for i in plan.remainder() {
            if self.syndrome(&words[i]) != 0 {
                return Err(CodingError::mismatch(i, iteration));
            }
        }
        Ok(())
    }

    /// Codes of the `V::LANES` words in `chunk`, written to `codes`.
    #[inline(always)]
    fn vector_codes<V: SimdVector<Lane = T>>(&self, chunk: &[T], codes: &mut [u8]) {
        let masks = T::PARITY_MASKS;
        let mut bitmaps = [0u64; MAX_PARITY_MASKS];

        let native = self.strategy == PopcountStrategy::BitTrick
            && T::native_bitmaps(chunk, V::LANES, &mut bitmaps);
        if !native {
            let data = V::load(chunk);
            for (k, &mask) in masks.iter().enumerate() {
                let selected = data.and(V::splat(mask));
                let counts = match self.strategy {
                    PopcountStrategy::Hardware => selected.popcount(),
                    PopcountStrategy::BitTrick => selected.popcount_swar(),
                };
                bitmaps[k] = counts.pack_lsb();
            }
        }

        // Overall parity: data parity (last bitmap) xor every mask parity
        let overall = bitmaps[..masks.len()].iter().fold(0u64, |acc, b| acc ^ b);
        let parity_bits = masks.len() - 1;

        for (lane, code) in codes[..V::LANES].iter_mut().enumerate() {
            let mut value = ((overall >> lane) & 1) as u8;
            for (k, bitmap) in bitmaps[..parity_bits].iter().enumerate() {
                value |= (((bitmap >> lane) & 1) as u8) << (k + 1);
            }
            *code = value;
        }
    }
}
