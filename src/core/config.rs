use crate::an::Layout;
use crate::errors::CodingError;
use crate::simd::{Backend, MAX_UNROLL};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

/// Raw element widths the harness knows how to run.
pub const SUPPORTED_WIDTHS: [u32; 4] = [8, 16, 32, 64];

/// Benchmark configuration loaded from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BenchConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub constants: Constants,
    #[serde(default)]
    pub matrix: Matrix,
}

/// Run-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Elements per buffer
    pub elements: usize,
    /// Passes per timed operation
    pub iterations: usize,
    /// Seed for the random input data
    pub seed: u64,
    /// Run the Hamming tests (16- and 32-bit widths only)
    pub hamming: bool,
    /// Run the XOR and CRC block checksum tests
    pub checksums: bool,
    /// Elements per checksum block
    pub block_len: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            elements: 1 << 20,
            iterations: 10,
            seed: 42,
            hamming: true,
            checksums: true,
            block_len: 64,
        }
    }
}

/// Code constant A per raw width.
///
/// Accepts TOML integers or decimal/`0x` hex strings, since A for 64-bit
/// data does not fit a TOML integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constants {
    #[serde(serialize_with = "ser_constant", deserialize_with = "de_constant")]
    pub a8: u128,
    #[serde(serialize_with = "ser_constant", deserialize_with = "de_constant")]
    pub a16: u128,
    #[serde(serialize_with = "ser_constant", deserialize_with = "de_constant")]
    pub a32: u128,
    #[serde(serialize_with = "ser_constant", deserialize_with = "de_constant")]
    pub a64: u128,
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            a8: 233,
            a16: 63877,
            a32: 4_294_967_291,
            a64: 18_446_744_073_709_551_557,
        }
    }
}

impl Constants {
    /// Constant for raw elements of `width` bits
    pub fn for_width(&self, width: u32) -> Option<u128> {
        match width {
            8 => Some(self.a8),
            16 => Some(self.a16),
            32 => Some(self.a32),
            64 => Some(self.a64),
            _ => None,
        }
    }
}

/// The test matrix: every combination is benchmarked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Matrix {
    pub widths: Vec<u32>,
    pub layouts: Vec<Layout>,
    pub backends: Vec<Backend>,
    pub unroll: Vec<usize>,
}

impl Default for Matrix {
    fn default() -> Self {
        Self {
            widths: SUPPORTED_WIDTHS.to_vec(),
            layouts: Layout::ALL.to_vec(),
            backends: Backend::ALL.to_vec(),
            unroll: vec![1, 2, 4, 8],
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConstantRepr {
    Int(u64),
    Text(String),
}

fn de_constant<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    match ConstantRepr::deserialize(deserializer)? {
        ConstantRepr::Int(value) => Ok(value as u128),
        ConstantRepr::Text(text) => parse_constant(&text).map_err(serde::de::Error::custom),
    }
}

fn ser_constant<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    // Keep every value representable in TOML
    if *value <= i64::MAX as u128 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_str(&value.to_string())
    }
}

/// Parses a decimal or `0x`-prefixed hex constant.
pub fn parse_constant(text: &str) -> Result<u128, String> {
    let text = text.trim().replace('_', "");
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u128::from_str_radix(hex, 16),
        None => text.parse::<u128>(),
    };
    parsed.map_err(|e| format!("invalid constant '{}': {}", text, e))
}

/// Sections an override file sets; absent sections keep their values.
#[derive(Debug, Deserialize)]
struct ConfigOverlay {
    settings: Option<Settings>,
    constants: Option<Constants>,
    matrix: Option<Matrix>,
}

impl BenchConfig {
    /// Parses a configuration from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Loads the built-in configuration bundled with the binary.
    pub fn load_default() -> Result<Self, Box<dyn std::error::Error>> {
        let content = include_str!("../../bench.toml");
        Ok(Self::from_toml(content)?)
    }

    fn load_overlay(path: &Path) -> Result<ConfigOverlay, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads a single file on top of the built-in configuration.
    pub fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = Self::load_default()?;
        config.merge(Self::load_overlay(path)?);
        Ok(config)
    }

    /// Loads configuration with user overrides from standard locations.
    ///
    /// Searches in priority order:
    /// 1. Built-in configuration
    /// 2. `~/.config/an-bench/bench.toml` (user overrides)
    /// 3. `./bench.toml` (project-local overrides)
    ///
    /// Sections set by a later file replace the earlier ones.
    pub fn load_with_overrides() -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = Self::load_default()?;

        if let Some(config_dir) = dirs::config_dir() {
            let user_config_path = config_dir.join("an-bench").join("bench.toml");
            if user_config_path.exists() {
                match Self::load_overlay(&user_config_path) {
                    Ok(overlay) => config.merge(overlay),
                    Err(e) => {
                        eprintln!(
                            "Warning: Failed to load user config from {:?}: {}",
                            user_config_path, e
                        );
                    }
                }
            }
        }

        let local_config_path = Path::new("bench.toml");
        if local_config_path.exists() {
            match Self::load_overlay(local_config_path) {
                Ok(overlay) => config.merge(overlay),
                Err(e) => {
                    eprintln!(
                        "Warning: Failed to load local config from {:?}: {}",
                        local_config_path, e
                    );
                }
            }
        }

        Ok(config)
    }

    fn merge(&mut self, overlay: ConfigOverlay) {
        if let Some(settings) = overlay.settings {
            self.settings = settings;
        }
        if let Some(constants) = overlay.constants {
            self.constants = constants;
        }
        if let Some(matrix) = overlay.matrix {
            self.matrix = matrix;
        }
    }

    /// Rejects configurations the harness cannot run.
    pub fn validate(&self) -> Result<(), CodingError> {
        let invalid = |msg: String| Err(CodingError::InvalidConfig(msg));

        if self.settings.elements == 0 {
            return invalid("elements must be positive".to_string());
        }
        if self.settings.iterations == 0 {
            return invalid("iterations must be positive".to_string());
        }
        if self.settings.block_len == 0 {
            return invalid("block_len must be positive".to_string());
        }
        if self.matrix.widths.is_empty()
            || self.matrix.layouts.is_empty()
            || self.matrix.backends.is_empty()
            || self.matrix.unroll.is_empty()
        {
            return invalid("every matrix dimension needs at least one entry".to_string());
        }
        for &unroll in &self.matrix.unroll {
            if unroll == 0 || unroll > MAX_UNROLL {
                return invalid(format!(
                    "unroll factor must be in 1..={}, got {}",
                    MAX_UNROLL, unroll
                ));
            }
        }
        for &width in &self.matrix.widths {
            let Some(constant) = self.constants.for_width(width) else {
                return invalid(format!(
                    "unsupported width {} (expected one of 8, 16, 32, 64)",
                    width
                ));
            };
            if constant >> width != 0 {
                return Err(CodingError::InvalidConstant {
                    constant,
                    raw_bits: width,
                });
            }
            if constant % 2 == 0 {
                return Err(CodingError::InvariantViolation {
                    constant,
                    bits: width * 2,
                });
            }
        }
        Ok(())
    }
}
