use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use trace::{Scheduler, SimConfig, parse_hex, report};

/// Demand-paged virtual memory simulator driven by trace files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML file with simulation settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of physical 4 KiB frames
    #[arg(long)]
    frames: Option<u32>,

    /// Trace lines each process runs per turn
    #[arg(long)]
    quantum: Option<usize>,

    /// Initial page quota of every process (hex)
    #[arg(long, value_parser = parse_quota)]
    quota: Option<u32>,

    /// Write per-process summaries as JSON to this file
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Trace files, one process each
    #[arg(required = true)]
    traces: Vec<PathBuf>,
}

fn parse_quota(text: &str) -> Result<u32, String> {
    parse_hex(text).map_err(|e| format!("invalid hex quota {text:?}: {e}"))
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(frames) = args.frames {
        config.frames = frames;
    }
    if let Some(quantum) = args.quantum {
        config.quantum = quantum;
    }
    if let Some(quota) = args.quota {
        config.default_quota = quota;
    }
    log::info!("{:?}", config);

    let mut scheduler = Scheduler::new(&config)?;
    for path in &args.traces {
        scheduler
            .open_trace(path)
            .with_context(|| format!("Failed to start process for {}", path.display()))?;
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let summaries = scheduler.run(&mut out)?;
    out.flush().context("Failed to flush trace output")?;

    if let Some(path) = &args.summary_json {
        let file = File::create(path)
            .with_context(|| format!("Failed to create summary file {}", path.display()))?;
        report::write_json(BufWriter::new(file), &summaries)?;
    }

    Ok(())
}
