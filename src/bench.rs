//! Benchmark harness.
//!
//! Runs every combination of the configured test matrix on seeded random
//! data and records the time per element of each operation:
//! - AN codes: per width × layout × backend × unroll factor
//! - Hamming codes: per width (16/32) × backend × unroll × popcount strategy
//! - XOR / CRC-32C block checksums: per width
//!
//! A failing operation is recorded with its configuration and fault location
//! and the harness moves on to the next configuration.

use crate::an::{AggregateOp, AnCodec, ArithmeticOp, FilterOp, Layout, RawElement};
use crate::buffer::AlignedBuffer;
use crate::checksum::{BlockChecksum, ChecksumKind};
use crate::core::config::BenchConfig;
use crate::errors::CodingError;
use crate::hamming::{Codeword, HammingCodec, HammingLane, PopcountStrategy};
use crate::simd::{self, Backend, CodecConfig, Lane, SimdLevel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fmt::Write as _;
use std::time::{Duration, Instant};

/// Platform capabilities for SIMD.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformInfo {
    pub arch: &'static str,
    pub simd_features: Vec<&'static str>,
    /// Backend picked by runtime detection
    pub detected: Backend,
}

impl PlatformInfo {
    /// Detect current platform capabilities.
    pub fn detect() -> Self {
        let mut simd_features = Vec::new();

        #[cfg(target_arch = "x86_64")]
        {
            simd_features.push("SSE2");
            if simd::has_popcnt() {
                simd_features.push("POPCNT");
            }
            if simd::has_avx2() {
                simd_features.push("AVX2");
            }
            if simd::has_avx512f() {
                simd_features.push("AVX-512F");
            }
            if simd::has_avx512bw() {
                simd_features.push("AVX-512BW");
            }
            if simd::has_avx512_bitalg() {
                simd_features.push("AVX-512 BITALG");
            }
            if simd::has_avx512_vpopcntdq() {
                simd_features.push("AVX-512 VPOPCNTDQ");
            }
        }

        if simd::has_neon() {
            simd_features.push("NEON");
        }

        PlatformInfo {
            arch: std::env::consts::ARCH,
            simd_features,
            detected: Backend::detect(),
        }
    }

    /// Format as display string.
    pub fn display(&self) -> String {
        if self.simd_features.is_empty() {
            self.arch.to_string()
        } else {
            format!("{} ({})", self.arch, self.simd_features.join(", "))
        }
    }
}

/// Configuration a record was measured under. Fields that do not apply to
/// a test family are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Case {
    pub width: u32,
    pub layout: Option<Layout>,
    pub backend: Option<Backend>,
    pub unroll: Option<usize>,
    /// Popcount strategy or checksum kind
    pub variant: Option<&'static str>,
    /// Instruction set the dispatched passes ran with
    pub isa: Option<&'static str>,
}

impl Case {
    fn bare(width: u32) -> Self {
        Self {
            width,
            layout: None,
            backend: None,
            unroll: None,
            variant: None,
            isa: None,
        }
    }

    fn an(width: u32, layout: Layout, config: CodecConfig) -> Self {
        Self {
            width,
            layout: Some(layout),
            backend: Some(config.backend),
            unroll: Some(config.unroll),
            variant: None,
            isa: Some(SimdLevel::select(config.backend, false).as_str()),
        }
    }

    fn hamming(width: u32, config: CodecConfig, strategy: PopcountStrategy) -> Self {
        Self {
            width,
            layout: None,
            backend: Some(config.backend),
            unroll: Some(config.unroll),
            variant: Some(strategy.as_str()),
            isa: Some(SimdLevel::select(config.backend, strategy == PopcountStrategy::Hardware).as_str()),
        }
    }

    fn checksum(width: u32, kind: ChecksumKind) -> Self {
        Self {
            width,
            layout: None,
            backend: None,
            unroll: None,
            variant: Some(kind.as_str()),
            isa: None,
        }
    }
}

impl std::fmt::Display for Case {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "u{}", self.width)?;
        if let Some(layout) = self.layout {
            write!(f, " {}", layout)?;
        }
        if let Some(backend) = self.backend {
            write!(f, " {}", backend)?;
        }
        if let Some(unroll) = self.unroll {
            write!(f, " x{}", unroll)?;
        }
        if let Some(variant) = self.variant {
            write!(f, " {}", variant)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Ok,
    Failed {
        error: String,
        index: Option<usize>,
        iteration: Option<usize>,
    },
}

/// One timed operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchRecord {
    pub test: &'static str,
    #[serde(flatten)]
    pub case: Case,
    pub elements: usize,
    pub iterations: usize,
    pub total_ms: f64,
    pub ns_per_element: f64,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl BenchRecord {
    pub fn is_ok(&self) -> bool {
        self.outcome == Outcome::Ok
    }
}

/// Everything one harness run produced.
#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub platform: PlatformInfo,
    pub elements: usize,
    pub iterations: usize,
    pub seed: u64,
    pub records: Vec<BenchRecord>,
}

impl BenchReport {
    pub fn failures(&self) -> impl Iterator<Item = &BenchRecord> {
        self.records.iter().filter(|r| !r.is_ok())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Aligned text table, one row per record.
    pub fn to_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Platform: {}  elements: {}  iterations: {}  seed: {}\n",
            self.platform.display(),
            self.elements,
            self.iterations,
            self.seed
        );
        let _ = writeln!(
            out,
            "  {:<16} {:>5} {:<8} {:<7} {:>6} {:<9} {:<14} {:>12}  {}",
            "test", "width", "layout", "backend", "unroll", "variant", "isa", "ns/elem", "status"
        );
        for record in &self.records {
            let dash = || "-".to_string();
            let status = match &record.outcome {
                Outcome::Ok => "ok".to_string(),
                Outcome::Failed { error, .. } => format!("FAILED: {}", error),
            };
            let _ = writeln!(
                out,
                "  {:<16} {:>5} {:<8} {:<7} {:>6} {:<9} {:<14} {:>12.3}  {}",
                record.test,
                record.case.width,
                record.case.layout.map_or_else(dash, |l| l.to_string()),
                record.case.backend.map_or_else(dash, |b| b.to_string()),
                record.case.unroll.map_or_else(dash, |u| u.to_string()),
                record.case.variant.unwrap_or("-"),
                record.case.isa.unwrap_or("-"),
                record.ns_per_element,
                status
            );
        }
        out
    }
}

/// Runs the whole test matrix of `config`.
///
/// Only an unusable configuration is an error; failing operations end up in
/// the report. Per-configuration failures are echoed on stderr unless
/// `quiet` is set.
pub fn run(config: &BenchConfig, quiet: bool) -> Result<BenchReport, CodingError> {
    config.validate()?;

    let mut runner = Runner {
        config,
        quiet,
        rng: StdRng::seed_from_u64(config.settings.seed),
        records: Vec::new(),
    };

    for &width in &config.matrix.widths {
        match width {
            8 => runner.run_width::<u8>(width),
            16 => runner.run_width::<u16>(width),
            32 => runner.run_width::<u32>(width),
            64 => runner.run_width::<u64>(width),
            _ => unreachable!("validated width"),
        }
        if config.settings.hamming {
            match width {
                16 => runner.run_hamming::<u16>(width),
                32 => runner.run_hamming::<u32>(width),
                _ => {}
            }
        }
    }

    Ok(BenchReport {
        platform: PlatformInfo::detect(),
        elements: config.settings.elements,
        iterations: config.settings.iterations,
        seed: config.settings.seed,
        records: runner.records,
    })
}

struct Runner<'a> {
    config: &'a BenchConfig,
    quiet: bool,
    rng: StdRng,
    records: Vec<BenchRecord>,
}

impl Runner<'_> {
    fn random_buffer<T: Lane>(&mut self) -> Result<AlignedBuffer<T>, CodingError> {
        let mut buffer = AlignedBuffer::zeroed(self.config.settings.elements)?;
        let rng = &mut self.rng;
        buffer.fill_with(|_| T::from_bits(rng.random::<u128>()));
        Ok(buffer)
    }

    fn report(&self, case: Case, err: &CodingError) {
        if !self.quiet {
            eprintln!("Warning: {} failed: {}", case, err.message());
        }
    }

    /// Times `op` and records it; the result is passed through.
    fn time(
        &mut self,
        test: &'static str,
        case: Case,
        op: impl FnOnce() -> Result<(), CodingError>,
    ) -> Result<(), CodingError> {
        let start = Instant::now();
        let result = op();
        let elapsed = start.elapsed();
        self.push(test, case, elapsed, &result);
        result
    }

    fn push(&mut self, test: &'static str, case: Case, elapsed: Duration, result: &Result<(), CodingError>) {
        let elements = self.config.settings.elements;
        let iterations = self.config.settings.iterations;
        let work = elements.saturating_mul(iterations).max(1) as f64;

        let outcome = match result {
            Ok(()) => Outcome::Ok,
            Err(e) => Outcome::Failed {
                error: e.message(),
                index: e.location().map(|l| l.index),
                iteration: e.location().map(|l| l.iteration),
            },
        };
        self.records.push(BenchRecord {
            test,
            case,
            elements,
            iterations,
            total_ms: elapsed.as_secs_f64() * 1e3,
            ns_per_element: elapsed.as_nanos() as f64 / work,
            outcome,
        });
    }

    fn run_width<R: RawElement>(&mut self, width: u32) {
        let raw = match self.random_buffer::<R>() {
            Ok(raw) => raw,
            Err(e) => {
                self.push("setup", Case::bare(width), Duration::ZERO, &Err(e.clone()));
                self.report(Case::bare(width), &e);
                return;
            }
        };
        let config = self.config;
        let Some(constant) = config.constants.for_width(width) else {
            return;
        };

        let matrix = &config.matrix;
        for &layout in &matrix.layouts {
            for &backend in &matrix.backends {
                for &unroll in &matrix.unroll {
                    let result = CodecConfig::new(backend, unroll).and_then(|config| {
                        self.an_suite(&raw, constant, Case::an(width, layout, config), layout, config)
                    });
                    if let Err(e) = result {
                        let case = Case::an(width, layout, CodecConfig { backend, unroll });
                        self.report(case, &e);
                    }
                }
            }
        }

        if config.settings.checksums {
            for kind in ChecksumKind::ALL {
                let case = Case::checksum(width, kind);
                if let Err(e) = self.checksum_suite(&raw, case, kind) {
                    self.report(case, &e);
                }
            }
        }
    }

    fn an_suite<R: RawElement>(
        &mut self,
        raw: &[R],
        constant: u128,
        case: Case,
        layout: Layout,
        config: CodecConfig,
    ) -> Result<(), CodingError> {
        let iterations = self.config.settings.iterations;
        let codec = match AnCodec::<R>::new(constant, layout, config) {
            Ok(codec) => codec,
            Err(e) => {
                self.push("setup", case, Duration::ZERO, &Err(e.clone()));
                return Err(e);
            }
        };
        // Re-encoding target: the next smaller odd constant
        let target_constant = if constant > 2 { constant - 2 } else { constant };
        let target = AnCodec::<R>::new(target_constant, layout, config)?;

        let n = raw.len();
        let mut encoded = AlignedBuffer::<R::Encoded>::zeroed(n)?;
        let mut scratch = AlignedBuffer::<R::Encoded>::zeroed(n)?;
        let mut decoded = AlignedBuffer::<R>::zeroed(n)?;
        let operand = R::from_bits(3);

        self.time("encode", case, || codec.encode(raw, &mut encoded, iterations))?;
        self.time("check", case, || codec.check(&encoded, iterations))?;

        for op in ArithmeticOp::ALL {
            let test = match op {
                ArithmeticOp::Add => "add",
                ArithmeticOp::Sub => "sub",
                ArithmeticOp::Mul => "mul",
                ArithmeticOp::Div => "div",
            };
            self.time(test, case, || {
                codec.arithmetic(&encoded, operand, op, &mut scratch, iterations)
            })?;
        }

        for op in [AggregateOp::Sum, AggregateOp::Min, AggregateOp::Max] {
            let test = match op {
                AggregateOp::Sum => "sum",
                AggregateOp::Min => "min",
                _ => "max",
            };
            self.time(test, case, || {
                codec.aggregate(&encoded, op, iterations).map(|_| ())
            })?;
        }

        let threshold = R::from_bits(R::MAX.to_bits() / 2);
        self.time("filter_lt", case, || {
            codec
                .filter(&encoded, FilterOp::Lt(threshold), &mut scratch, iterations)
                .map(|_| ())
        })?;

        self.time("decode", case, || codec.decode(&encoded, &mut decoded, iterations))?;
        self.time("decode_checked", case, || {
            codec.decode_checked(&encoded, &mut decoded, iterations)
        })?;
        if decoded[..] != raw[..] {
            let index = decoded.iter().zip(raw).position(|(d, r)| d != r).unwrap_or(0);
            let err = CodingError::corruption(index, iterations.saturating_sub(1));
            self.push("roundtrip", case, Duration::ZERO, &Err(err.clone()));
            return Err(err);
        }

        self.time("reencode_checked", case, || {
            codec.reencode_checked(&encoded, &target, &mut scratch, iterations)
        })
    }

    fn checksum_suite<T: Lane>(&mut self, data: &[T], case: Case, kind: ChecksumKind) -> Result<(), CodingError> {
        let checksum = BlockChecksum::new(kind, self.config.settings.block_len)?;
        let iterations = self.config.settings.iterations;
        let mut sums = vec![0u64; checksum.blocks(data.len())];
        checksum.compute(data, &mut sums)?;

        let test = match kind {
            ChecksumKind::Xor => "xor",
            ChecksumKind::Crc32c => "crc",
        };
        self.time(test, case, || checksum.verify(data, &sums, iterations))
    }

    fn run_hamming<T: HammingLane>(&mut self, width: u32) {
        let data = match self.random_buffer::<T>() {
            Ok(data) => data,
            Err(e) => {
                self.push("setup", Case::bare(width), Duration::ZERO, &Err(e.clone()));
                self.report(Case::bare(width), &e);
                return;
            }
        };
        let config = self.config;
        let iterations = config.settings.iterations;
        let mut words = vec![Codeword::<T>::default(); data.len()];

        let matrix = &config.matrix;
        for &backend in &matrix.backends {
            for &unroll in &matrix.unroll {
                for strategy in PopcountStrategy::ALL {
                    let config = CodecConfig { backend, unroll };
                    let case = Case::hamming(width, config, strategy);
                    let codec = HammingCodec::<T>::new(config, strategy);

                    let result = self
                        .time("hamming_encode", case, || codec.encode(&data, &mut words, iterations))
                        .and_then(|()| self.time("hamming_check", case, || codec.check(&words, iterations)));
                    if let Err(e) = result {
                        self.report(case, &e);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> BenchConfig {
        let mut config = BenchConfig::default();
        config.settings.elements = 100;
        config.settings.iterations = 2;
        config.settings.block_len = 16;
        config.matrix.unroll = vec![1, 2];
        config
    }

    #[test]
    fn test_platform_detection() {
        let info = PlatformInfo::detect();
        assert!(!info.arch.is_empty());
        println!("Platform: {}", info.display());
    }

    #[test]
    fn test_full_matrix_passes() {
        let config = small_config();
        let report = run(&config, true).unwrap();
        assert_eq!(report.failures().count(), 0);

        // 13 AN tests per (width, layout, backend, unroll)
        let an = 4 * 2 * 4 * 2 * 13;
        // 2 Hamming tests per (width, backend, unroll, strategy), widths 16/32
        let hamming = 2 * 4 * 2 * 2 * 2;
        let checksums = 4 * 2;
        assert_eq!(report.records.len(), an + hamming + checksums);
    }

    #[test]
    fn test_options_trim_matrix() {
        let mut config = small_config();
        config.settings.hamming = false;
        config.settings.checksums = false;
        config.matrix.widths = vec![8];
        config.matrix.layouts = vec![Layout::DivMod];
        config.matrix.backends = vec![Backend::V128];
        config.matrix.unroll = vec![4];
        let report = run(&config, true).unwrap();
        assert_eq!(report.records.len(), 13);
        assert!(report.records.iter().all(|r| r.case.width == 8));
    }

    #[test]
    fn test_invalid_constant_rejected_up_front() {
        let mut config = small_config();
        config.constants.a16 = 2;
        assert!(run(&config, true).is_err());
    }

    #[test]
    fn test_same_seed_same_data() {
        let config = small_config();
        let mut a = Runner {
            config: &config,
            quiet: true,
            rng: StdRng::seed_from_u64(7),
            records: Vec::new(),
        };
        let mut b = Runner {
            config: &config,
            quiet: true,
            rng: StdRng::seed_from_u64(7),
            records: Vec::new(),
        };
        let x = a.random_buffer::<u32>().unwrap();
        let y = b.random_buffer::<u32>().unwrap();
        assert_eq!(&x[..], &y[..]);
    }

    #[test]
    fn test_huge_matrix_work_saturates() {
        let mut config = small_config();
        config.settings.elements = usize::MAX / 2;
        config.settings.iterations = 4;
        let mut runner = Runner {
            config: &config,
            quiet: true,
            rng: StdRng::seed_from_u64(1),
            records: Vec::new(),
        };
        runner.push("encode", Case::bare(16), Duration::from_millis(5), &Ok(()));

        let record = &runner.records[0];
        assert_eq!(record.iterations, 4);
        assert!(record.ns_per_element.is_finite());
        assert!(record.ns_per_element > 0.0);
    }

    #[test]
    fn test_records_name_dispatched_isa() {
        let config = CodecConfig::new(Backend::V256, 2).unwrap();
        let case = Case::an(32, Layout::Inverse, config);
        assert_eq!(case.isa, Some(SimdLevel::select(Backend::V256, false).as_str()));

        let bittrick = Case::hamming(16, config, PopcountStrategy::BitTrick);
        assert_eq!(bittrick.isa, case.isa);
        let hardware = Case::hamming(16, config, PopcountStrategy::Hardware);
        assert_eq!(hardware.isa, Some(SimdLevel::select(Backend::V256, true).as_str()));
        assert_eq!(Case::checksum(32, ChecksumKind::Crc32c).isa, None);
    }

    #[test]
    fn test_report_rendering() {
        let mut config = small_config();
        config.matrix.widths = vec![16];
        config.matrix.backends = vec![Backend::Scalar];
        config.matrix.unroll = vec![1];
        let report = run(&config, true).unwrap();

        let table = report.to_table();
        assert!(table.contains("encode"));
        assert!(table.contains("hamming_check"));
        assert!(table.contains("crc32c"));
        assert!(table.contains("isa"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        let first = &json["records"][0];
        assert_eq!(first["test"], "encode");
        assert_eq!(first["width"], 16);
        assert_eq!(first["status"], "ok");
    }
}
