// USAGE cargo run --release -- --data data/ --output .

use std::{path::PathBuf, process::ExitCode, time::Instant};

use anyhow::{Context, Result};
use clap::Parser;
use ctd_station_split::{list_archives, split_all, Config};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Split multi-station CTD NetCDF cruise files into one file per station",
    long_about = None
)]
struct Args {
    /// Directory holding the parent cruise files
    #[arg(long, default_value = "data")]
    data: PathBuf,

    /// Directory under which one folder per cruise is created
    #[arg(long, short, default_value = ".")]
    output: PathBuf,

    /// JSON file overriding field names, naming and metadata rules
    #[arg(long)]
    config: Option<PathBuf>,

    /// Treat every entry of the data directory as a NetCDF file, not just *.nc
    #[arg(long)]
    all_files: bool,

    /// Stop at the first cruise file that fails
    #[arg(long)]
    fail_fast: bool,
}

// ─────────────────────────────────────────────────────────────────────
// Simple timing helper
// ─────────────────────────────────────────────────────────────────────
fn timeit<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let t0 = Instant::now();
    let out = f();
    log::debug!("{label:<20}{:?}", t0.elapsed());
    out
}

// ─────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────
fn run(args: &Args) -> Result<bool> {
    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    let parents = list_archives(&args.data, args.all_files)
        .with_context(|| format!("scanning {}", args.data.display()))?;
    if parents.is_empty() {
        log::warn!("no cruise files found in {}", args.data.display());
    }

    let report = timeit("split_all", || {
        split_all(&parents, &args.output, &config, args.fail_fast)
    })?;
    Ok(report.is_success())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
