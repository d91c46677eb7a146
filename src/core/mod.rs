pub mod config;

pub use config::{BenchConfig, Constants, Matrix, SUPPORTED_WIDTHS, Settings, parse_constant};
