use an_bench::{Backend, Layout};
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the benchmark matrix
    Run(RunArgs),
    /// Compute the multiplicative inverse of a constant modulo 2^bits
    Inverse(InverseArgs),
    /// Show platform and SIMD capabilities
    Info,
    /// Print the effective configuration
    Config(ConfigArgs),
}

/// Arguments for a benchmark run
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Configuration file (replaces the user and local overrides)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Elements per buffer
    #[arg(short = 'n', long)]
    pub elements: Option<usize>,

    /// Passes per timed operation
    #[arg(short = 'i', long)]
    pub iterations: Option<usize>,

    /// Seed for the random input data
    #[arg(long)]
    pub seed: Option<u64>,

    /// Raw element width (repeatable: 8, 16, 32, 64)
    #[arg(short = 'w', long = "width", value_name = "BITS")]
    pub widths: Vec<u32>,

    /// SIMD backend (repeatable: scalar, v128, v256, v512)
    #[arg(short = 'b', long = "backend", value_name = "BACKEND")]
    pub backends: Vec<Backend>,

    /// Unroll factor (repeatable)
    #[arg(short = 'u', long = "unroll", value_name = "N")]
    pub unroll: Vec<usize>,

    /// AN layout (repeatable: inverse, divmod)
    #[arg(short = 'l', long = "layout", value_name = "LAYOUT")]
    pub layouts: Vec<Layout>,

    /// Skip the Hamming tests
    #[arg(long)]
    pub no_hamming: bool,

    /// Skip the block checksum tests
    #[arg(long)]
    pub no_checksums: bool,

    /// Emit the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Suppress per-configuration failure warnings
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

/// Arguments for the inverse solver
#[derive(Args, Debug)]
pub struct InverseArgs {
    /// Odd constant, decimal or 0x-prefixed hex
    pub constant: String,

    /// Modulus exponent
    #[arg(short = 'k', long, default_value_t = 64)]
    pub bits: u32,
}

/// Arguments for printing the configuration
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Configuration file to resolve instead of the override chain
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print as JSON instead of TOML
    #[arg(long)]
    pub json: bool,
}
