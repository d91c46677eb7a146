mod args;
mod config;

use an_bench::bench::{self, PlatformInfo};
use an_bench::{Backend, SimdLevel, mod_inverse, parse_constant};
use clap::Parser;

use args::{Command, ConfigArgs, InverseArgs, RunArgs};
use config::{apply_run_args, load_config};

#[derive(Parser)]
#[command(name = "an-bench")]
#[command(version)]
#[command(about = "Benchmark AN codes, Hamming codes and block checksums across SIMD widths", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run_bench(&args),
        Command::Inverse(args) => print_inverse(&args),
        Command::Info => {
            print_info();
            Ok(())
        }
        Command::Config(args) => print_config(&args),
    }
}

fn run_bench(args: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(args.config.as_deref())?;
    apply_run_args(&mut config, args);

    let report = bench::run(&config, args.quiet)?;
    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.to_table());
    }

    let failures = report.failures().count();
    if failures > 0 && !args.quiet {
        eprintln!(
            "Warning: {} of {} operations failed",
            failures,
            report.records.len()
        );
    }
    Ok(())
}

fn print_inverse(args: &InverseArgs) -> Result<(), Box<dyn std::error::Error>> {
    let constant = parse_constant(&args.constant)?;
    let inverse = mod_inverse(constant, args.bits)?;
    println!("{}", inverse);
    Ok(())
}

fn print_info() {
    let platform = PlatformInfo::detect();
    println!("Platform: {}", platform.display());
    println!("Selected backend: {}", platform.detected);
    println!("\nBackends:\n");
    for backend in Backend::ALL {
        let kind = if backend.is_native() { "native" } else { "portable" };
        println!(
            "  {:<7} {:>3} bits  {:>2} x u32  {:<8}  {:<14}  popcount: {}",
            backend.as_str(),
            backend.bits(),
            backend.lanes::<u32>(),
            kind,
            SimdLevel::select(backend, false),
            SimdLevel::select(backend, true)
        );
    }
}

fn print_config(args: &ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args.config.as_deref())?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", toml::to_string(&config)?);
    }
    Ok(())
}
