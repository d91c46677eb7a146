use an_bench::BenchConfig;
use std::path::{Path, PathBuf};

use super::args::RunArgs;

/// Resolves the configuration: an explicit file replaces the override chain.
pub fn load_config(path: Option<&Path>) -> Result<BenchConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let path = expand_path(path);
            BenchConfig::load_from_file(&path)
                .map_err(|e| format!("Cannot load config '{}': {}", path.display(), e).into())
        }
        None => BenchConfig::load_with_overrides(),
    }
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

/// Applies command-line flags on top of the loaded configuration.
pub fn apply_run_args(config: &mut BenchConfig, args: &RunArgs) {
    if let Some(elements) = args.elements {
        config.settings.elements = elements;
    }
    if let Some(iterations) = args.iterations {
        config.settings.iterations = iterations;
    }
    if let Some(seed) = args.seed {
        config.settings.seed = seed;
    }
    if args.no_hamming {
        config.settings.hamming = false;
    }
    if args.no_checksums {
        config.settings.checksums = false;
    }
    if !args.widths.is_empty() {
        config.matrix.widths = args.widths.clone();
    }
    if !args.backends.is_empty() {
        config.matrix.backends = args.backends.clone();
    }
    if !args.unroll.is_empty() {
        config.matrix.unroll = args.unroll.clone();
    }
    if !args.layouts.is_empty() {
        config.matrix.layouts = args.layouts.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use an_bench::Backend;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        run: RunArgs,
    }

    #[test]
    fn test_flags_override_config() {
        let args = Harness::parse_from([
            "an-bench", "-n", "256", "--width", "16", "--width", "32", "-b", "avx2", "--no-hamming",
        ])
        .run;
        let mut config = BenchConfig::default();
        apply_run_args(&mut config, &args);

        assert_eq!(config.settings.elements, 256);
        assert_eq!(config.settings.iterations, 10);
        assert!(!config.settings.hamming);
        assert_eq!(config.matrix.widths, vec![16, 32]);
        assert_eq!(config.matrix.backends, vec![Backend::V256]);
        assert_eq!(config.matrix.unroll, vec![1, 2, 4, 8]);
    }

    #[test]
    fn test_expand_plain_path() {
        assert_eq!(expand_path(Path::new("bench.toml")), PathBuf::from("bench.toml"));
    }
}
