//! Conquest simulation CLI.
//!
//! Runs many concurrent runners against one in-memory store and outputs one
//! JSONL record per submission.
//!
//! Usage:
//!   cargo run --release --bin simulate -- [OPTIONS]
//!
//! Options:
//!   --runners N     Number of runners (default: 8)
//!   --rounds N      Rounds to play (default: 5)
//!   --threads N     Number of parallel threads (default: 4)
//!   --seed N        Random seed, 0 for entropy (default: 0)
//!   --spread M      Half-size of the contested square in meters (default: 600)
//!   --radius M      Typical loop radius in meters (default: 250)
//!   --output FILE   Output file path (default: stdout)
//!   --quiet         Suppress summary output

use std::env;
use std::fs::File;
use std::io::{self, BufWriter};
use std::process;
use std::str::FromStr;
use std::time::Instant;

use landgrab::simulation::{self, SimulationConfig};
use tracing_subscriber::EnvFilter;

fn value<T: FromStr>(args: &[String], i: usize, flag: &str) -> T {
    match args.get(i).map(|s| s.parse()) {
        Some(Ok(v)) => v,
        _ => {
            eprintln!("invalid or missing {} value", flag);
            print_usage();
            process::exit(2);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let mut config = SimulationConfig::default();
    let mut output_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--runners" => {
                i += 1;
                config.runners = value(&args, i, "--runners");
            }
            "--rounds" => {
                i += 1;
                config.rounds = value(&args, i, "--rounds");
            }
            "--threads" => {
                i += 1;
                config.threads = value(&args, i, "--threads");
            }
            "--seed" => {
                i += 1;
                config.seed = value(&args, i, "--seed");
            }
            "--spread" => {
                i += 1;
                config.spread_m = value(&args, i, "--spread");
            }
            "--radius" => {
                i += 1;
                config.loop_radius_m = value(&args, i, "--radius");
            }
            "--output" => {
                i += 1;
                output_path = Some(value(&args, i, "--output"));
            }
            "--quiet" => {
                config.quiet = true;
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    if !config.quiet {
        eprintln!(
            "Simulation: {} runners, {} rounds, spread {} m, radius {} m, {} threads",
            config.runners, config.rounds, config.spread_m, config.loop_radius_m, config.threads
        );
    }

    let start = Instant::now();
    let report = match simulation::run_simulation(&config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("simulation failed: {}", e);
            process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    if !config.quiet {
        eprintln!(
            "Completed {} submissions in {:.1}s ({:.1}/s)",
            report.submissions(),
            elapsed.as_secs_f64(),
            report.submissions() as f64 / elapsed.as_secs_f64().max(1e-9)
        );
        simulation::print_summary(&report);
    }

    let written = match &output_path {
        Some(path) => File::create(path)
            .and_then(|f| simulation::write_jsonl(&report.records, &mut BufWriter::new(f))),
        None => simulation::write_jsonl(&report.records, &mut BufWriter::new(io::stdout().lock())),
    };
    if let Err(e) = written {
        eprintln!("failed to write output: {}", e);
        process::exit(1);
    }
    if let (Some(path), false) = (&output_path, config.quiet) {
        eprintln!("Wrote {} records to {}", report.records.len(), path);
    }
    if !report.audit.consistent {
        process::exit(3);
    }
}

fn print_usage() {
    eprintln!("Usage: simulate [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --runners N      Number of runners (default: 8)");
    eprintln!("  --rounds N       Rounds to play (default: 5)");
    eprintln!("  --threads N      Number of parallel threads (default: 4)");
    eprintln!("  --seed N         Random seed, 0 for entropy (default: 0)");
    eprintln!("  --spread M       Half-size of the contested square in meters (default: 600)");
    eprintln!("  --radius M       Typical loop radius in meters (default: 250)");
    eprintln!("  --output FILE    Output file path (default: stdout)");
    eprintln!("  --quiet          Suppress summary output");
    eprintln!("  --help           Show this help");
}
