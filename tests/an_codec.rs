//! AN codec integration tests
//!
//! Every operation is run on every backend and unroll factor over lengths
//! that leave a scalar remainder, and compared against the raw-domain
//! result.

use an_bench::{
    AggregateOp, AlignedBuffer, AnCodec, ArithmeticOp, Backend, CodecConfig, CodingError,
    FilterOp, Lane, Layout, RawElement,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

type Enc<R> = <R as RawElement>::Encoded;

const LEN: usize = 1003;

fn configs() -> Vec<CodecConfig> {
    let mut configs = Vec::new();
    for backend in Backend::ALL {
        for unroll in [1, 2, 3, 4] {
            configs.push(CodecConfig::new(backend, unroll).unwrap());
        }
    }
    configs
}

fn random_raw<R: RawElement>(rng: &mut StdRng, len: usize) -> Vec<R> {
    (0..len).map(|_| R::from_bits(rng.random::<u128>())).collect()
}

fn encoded<R: RawElement>(codec: &AnCodec<R>, raw: &[R]) -> Vec<Enc<R>> {
    let mut out = vec![<Enc<R> as Lane>::ZERO; raw.len()];
    codec.encode(raw, &mut out, 1).unwrap();
    out
}

// ============================================================================
// Encode / check / decode
// ============================================================================

#[test]
fn test_concrete_scenario() {
    let raw = AlignedBuffer::from_slice(&[0u16, 1, 65535, 12345]).unwrap();
    for layout in Layout::ALL {
        let codec = AnCodec::<u16>::new(63877, layout, CodecConfig::scalar()).unwrap();
        assert_eq!(codec.a_inv(), 3_510_769_485);

        let mut encoded = AlignedBuffer::<u32>::zeroed(raw.len()).unwrap();
        codec.encode(&raw, &mut encoded, 1).unwrap();
        assert_eq!(&encoded[..], &[0, 63877, 65535 * 63877, 12345 * 63877]);
        assert!(codec.check(&encoded, 3).is_ok());

        encoded[2] += 1;
        assert_eq!(codec.check(&encoded, 3), Err(CodingError::corruption(2, 0)));
    }
}

fn roundtrip_all<R: RawElement>(a: u128, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut raw = random_raw::<R>(&mut rng, LEN);
    raw[0] = R::MIN;
    raw[1] = R::MAX;
    raw[2] = R::ZERO;

    for layout in Layout::ALL {
        for config in configs() {
            let codec = AnCodec::<R>::new(a, layout, config).unwrap();
            let encoded = encoded(&codec, &raw);
            assert!(codec.check(&encoded, 2).is_ok(), "{} {:?}", layout, config);

            let mut decoded = vec![R::ZERO; LEN];
            codec.decode_checked(&encoded, &mut decoded, 2).unwrap();
            assert_eq!(decoded, raw, "{} {:?}", layout, config);
        }
    }
}

#[test]
fn test_roundtrip_every_width() {
    roundtrip_all::<u8>(233, 1);
    roundtrip_all::<i8>(233, 2);
    roundtrip_all::<u16>(63877, 3);
    roundtrip_all::<i16>(63877, 4);
    roundtrip_all::<u32>(4_294_967_291, 5);
    roundtrip_all::<i32>(2_147_483_645, 6);
    roundtrip_all::<u64>(18_446_744_073_709_551_557, 7);
    roundtrip_all::<i64>(9_223_372_036_854_775_783, 8);
}

#[test]
fn test_repeated_encode_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(11);
    let raw = random_raw::<u32>(&mut rng, LEN);
    let codec = AnCodec::<u32>::new(4_294_967_291, Layout::Inverse, CodecConfig::scalar()).unwrap();

    let once = encoded(&codec, &raw);
    let mut many = vec![0u64; LEN];
    codec.encode(&raw, &mut many, 5).unwrap();
    assert_eq!(once, many);
}

#[test]
fn test_divmod_detects_every_offset() {
    let mut rng = StdRng::seed_from_u64(12);
    let raw = random_raw::<u16>(&mut rng, LEN);

    for config in configs() {
        let codec = AnCodec::<u16>::new(63877, Layout::DivMod, config).unwrap();
        let mut encoded = encoded(&codec, &raw);
        let index = rng.random_range(0..LEN);
        let delta = rng.random_range(1..63877u32);
        encoded[index] = encoded[index].wrapping_add(delta);

        assert_eq!(
            codec.check(&encoded, 2),
            Err(CodingError::corruption(index, 0)),
            "{:?}",
            config
        );
    }
}

#[test]
fn test_vector_and_scalar_report_the_same_fault() {
    let raw: Vec<i16> = (0..LEN as i16).map(|i| i.wrapping_mul(37)).collect();
    let reference = AnCodec::<i16>::new(63877, Layout::Inverse, CodecConfig::scalar()).unwrap();
    let mut corrupt = encoded(&reference, &raw);
    corrupt[500] ^= 1 << 7;
    corrupt[LEN - 1] ^= 1;

    let expected = reference.check(&corrupt, 1).unwrap_err();
    assert_eq!(expected, CodingError::corruption(500, 0));
    for config in configs() {
        let codec = reference.with_config(config);
        assert_eq!(codec.check(&corrupt, 1), Err(expected.clone()), "{:?}", config);
    }
}

#[test]
fn test_dispatched_levels_match_scalar() {
    let mut rng = StdRng::seed_from_u64(13);
    let raw = random_raw::<u32>(&mut rng, LEN);
    let scalar = AnCodec::<u32>::new(4_294_967_291, Layout::DivMod, CodecConfig::scalar()).unwrap();
    let reference = encoded(&scalar, &raw);
    let mut scaled = vec![0u64; LEN];
    scalar
        .arithmetic_checked(&reference, 3, ArithmeticOp::Mul, &mut scaled, 1)
        .unwrap();

    for config in configs() {
        let codec = scalar.with_config(config);
        let level = codec.level();
        assert!(level.is_supported(), "{:?} {}", config, level);
        if config.backend.bits() > 128 {
            assert_eq!(config.backend.is_native(), level.vector_bits() >= config.backend.bits());
        }

        assert_eq!(encoded(&codec, &raw), reference, "{:?} {}", config, level);
        let mut output = vec![0u64; LEN];
        codec
            .arithmetic_checked(&reference, 3, ArithmeticOp::Mul, &mut output, 1)
            .unwrap();
        assert_eq!(output, scaled, "{:?} {}", config, level);
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

fn arithmetic_matches_raw<R: RawElement>(a: u128, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let raw = random_raw::<R>(&mut rng, LEN);

    for config in configs() {
        let codec = AnCodec::<R>::new(a, Layout::Inverse, config).unwrap();
        let input = encoded(&codec, &raw);

        for op in ArithmeticOp::ALL {
            let mut operand = R::from_bits(rng.random::<u128>());
            if operand == R::ZERO {
                operand = R::ONE;
            }
            let mut output = vec![<Enc<R> as Lane>::ZERO; LEN];
            codec
                .arithmetic(&input, operand, op, &mut output, 1)
                .unwrap();
            let mut decoded = vec![R::ZERO; LEN];
            codec.decode(&output, &mut decoded, 1).unwrap();

            for (i, (&x, &got)) in raw.iter().zip(&decoded).enumerate() {
                let want = match op {
                    ArithmeticOp::Add => x.wrapping_add(operand),
                    ArithmeticOp::Sub => x.wrapping_sub(operand),
                    ArithmeticOp::Mul => x.wrapping_mul(operand),
                    ArithmeticOp::Div => R::narrow(x.widen().wrapping_div(operand.widen())),
                };
                assert_eq!(got, want, "{} {:?} at {}: {:?} op {:?}", op.as_str(), config, i, x, operand);
            }
        }
    }
}

#[test]
fn test_arithmetic_matches_raw_domain() {
    arithmetic_matches_raw::<u8>(233, 21);
    arithmetic_matches_raw::<i8>(233, 22);
    arithmetic_matches_raw::<u16>(63877, 23);
    arithmetic_matches_raw::<i32>(2_147_483_645, 24);
}

#[test]
fn test_division_results_stay_codewords() {
    let raw: Vec<u16> = (0..LEN as u16).map(|i| i.wrapping_mul(65)).collect();
    for layout in Layout::ALL {
        let codec = AnCodec::<u16>::new(63877, layout, CodecConfig::new(Backend::V256, 2).unwrap())
            .unwrap();
        let input = encoded(&codec, &raw);
        let mut output = vec![0u32; LEN];
        codec
            .arithmetic_checked(&input, 7, ArithmeticOp::Div, &mut output, 1)
            .unwrap();
        assert!(codec.check(&output, 1).is_ok());
    }
}

// ============================================================================
// Aggregation and filtering
// ============================================================================

#[test]
fn test_aggregates_match_raw_domain() {
    // Small values keep the encoded sum below 2^32, which avg needs
    let mut rng = StdRng::seed_from_u64(31);
    let raw: Vec<u16> = (0..LEN).map(|_| rng.random_range(0..64)).collect();
    let sum: u32 = raw.iter().map(|&v| v as u32).sum();

    for config in configs() {
        let codec = AnCodec::<u16>::new(63877, Layout::Inverse, config).unwrap();
        let input = encoded(&codec, &raw);
        let decoded = |op| codec.decode_value(codec.aggregate_checked(&input, op, 2).unwrap());

        assert_eq!(decoded(AggregateOp::Sum), sum, "{:?}", config);
        assert_eq!(decoded(AggregateOp::Min), *raw.iter().min().unwrap() as u32);
        assert_eq!(decoded(AggregateOp::Max), *raw.iter().max().unwrap() as u32);
        assert_eq!(decoded(AggregateOp::Avg), sum / LEN as u32);
    }
}

#[test]
fn test_filter_between_matches_raw_domain() {
    let mut rng = StdRng::seed_from_u64(41);
    let raw = random_raw::<i16>(&mut rng, LEN);
    let predicate = FilterOp::Between(-1000i16, 12000);
    let expected: Vec<i16> = raw.iter().copied().filter(|&v| predicate.matches(v)).collect();

    for layout in Layout::ALL {
        for config in configs() {
            let codec = AnCodec::<i16>::new(63877, layout, config).unwrap();
            let input = encoded(&codec, &raw);
            let mut output = vec![0i32; LEN];
            let count = codec
                .filter_checked(&input, predicate, &mut output, 1)
                .unwrap();

            let mut decoded = vec![0i16; count];
            codec.decode_checked(&output[..count], &mut decoded, 1).unwrap();
            assert_eq!(decoded, expected, "{} {:?}", layout, config);
        }
    }
}

// ============================================================================
// Re-encoding
// ============================================================================

#[test]
fn test_reencode_under_new_constant() {
    let mut rng = StdRng::seed_from_u64(51);
    let raw = random_raw::<u64>(&mut rng, LEN);

    for config in configs() {
        let source = AnCodec::<u64>::new(18_446_744_073_709_551_557, Layout::Inverse, config)
            .unwrap();
        let target = AnCodec::<u64>::new(18_446_744_073_709_551_555, Layout::DivMod, config)
            .unwrap();
        let input = encoded(&source, &raw);
        let mut output = vec![0u128; LEN];
        source
            .reencode_checked(&input, &target, &mut output, 1)
            .unwrap();

        assert_eq!(output, encoded(&target, &raw), "{:?}", config);
        assert!(target.check(&output, 1).is_ok());
    }
}
