mod export;

use chrono::Local;
use clap::{Parser, ValueEnum};
use export::ExportFormat;
use proxydiff_common::{load_config, load_config_from, ProxydiffError, ScanMode};
use proxydiff_core::{CompareEngine, MediaInfoProbe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "proxydiff")]
#[command(author = "Proxydiff Contributors")]
#[command(version = "0.1.0")]
#[command(
    about = "Compare directory groups of video files and their proxies",
    long_about = None,
    after_help = "Examples:\n\
                  \x20 Single directories:   proxydiff /path/a /path/b\n\
                  \x20 Multiple directories: proxydiff \"/path/a1+/path/a2\" \"/path/b1+/path/b2\""
)]
struct Cli {
    /// First group of directories, joined with '+' (e.g. "dir1+dir2")
    group1: String,

    /// Second group of directories, joined with '+' (e.g. "dir1+dir2")
    group2: String,

    /// Comparison mode
    #[arg(short, long, value_enum, default_value = "normal")]
    mode: Mode,

    /// Output format
    #[arg(short, long, value_enum, default_value = "txt")]
    format: ExportFormat,

    /// Output file (default: comparison_results_<timestamp>.<format>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Extra ignore patterns (can be specified multiple times)
    #[arg(short, long)]
    ignore: Vec<String>,

    /// Maximum concurrent directory scans per group
    #[arg(long)]
    max_workers: Option<usize>,

    /// Per-file metadata probe timeout in seconds (proxy-advanced mode)
    #[arg(long)]
    probe_timeout: Option<u64>,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Compare all files by basename.extension
    Normal,
    /// Compare video files by basename only
    Proxy,
    /// Proxy comparison plus frame-count verification (requires mediainfo)
    ProxyAdvanced,
}

impl From<Mode> for ScanMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Normal => ScanMode::Normal,
            Mode::Proxy => ScanMode::Proxy,
            Mode::ProxyAdvanced => ScanMode::ProxyAdvanced,
        }
    }
}

fn main() {
    // Log to stderr so exported/structured output never mixes with it.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        if matches!(
            e.downcast_ref::<ProxydiffError>(),
            Some(ProxydiffError::ProbeUnavailable(_))
        ) {
            eprintln!("Error: mediainfo CLI is not installed!");
            eprintln!("Please install mediainfo:");
            eprintln!("  macOS:   brew install mediainfo");
            eprintln!("  Windows: Download from https://mediaarea.net/en/MediaInfo/Download");
            eprintln!("  Linux:   sudo apt-get install mediainfo");
        }
        error!("Comparison failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let dirs1 = parse_directory_group(&cli.group1)?;
    let dirs2 = parse_directory_group(&cli.group2)?;

    let loaded = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    let mut config = loaded.config;

    config.ignore_patterns.extend(cli.ignore);
    if let Some(workers) = cli.max_workers {
        config.max_scan_workers = workers;
    }
    if let Some(timeout) = cli.probe_timeout {
        config.probe_timeout_secs = timeout;
    }

    let mode: ScanMode = cli.mode.into();
    let output = cli
        .output
        .unwrap_or_else(|| default_output_name(cli.format));

    let mut engine = CompareEngine::new(config.clone(), mode);
    if mode == ScanMode::ProxyAdvanced {
        engine = engine.with_probe(Arc::new(MediaInfoProbe::new(Duration::from_secs(
            config.probe_timeout_secs,
        ))));
        info!("Reading video metadata (this may take a while)...");
    }

    info!("Scanning directories in {mode} mode...");
    let start = Instant::now();
    let result = engine.run(&dirs1, &dirs2)?;

    info!("Exporting results...");
    export::write_report(&result, cli.format, &output)?;

    info!("Results have been exported to: {}", output.display());
    info!("Files only in group 1: {}", result.unique_to_group1.len());
    info!("Files only in group 2: {}", result.unique_to_group2.len());
    if mode == ScanMode::ProxyAdvanced {
        info!("Frame count mismatches: {}", result.mismatches.len());
    }
    let conflict_total = result.group1_conflicts.len() + result.group2_conflicts.len();
    if conflict_total > 0 {
        info!("Filename conflicts (first occurrence kept): {conflict_total}");
    }
    info!(
        "Total execution time: {:.2} seconds",
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Split a `dir1+dir2+dir3` argument into paths, trimming whitespace around
/// each segment.
fn parse_directory_group(raw: &str) -> anyhow::Result<Vec<PathBuf>> {
    let dirs: Vec<PathBuf> = raw
        .split('+')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(PathBuf::from)
        .collect();

    if dirs.is_empty() {
        anyhow::bail!("no directories given in group argument: {raw:?}");
    }
    Ok(dirs)
}

fn default_output_name(format: ExportFormat) -> PathBuf {
    PathBuf::from(format!(
        "comparison_results_{}.{}",
        Local::now().format("%Y%m%d_%H%M%S"),
        format.extension()
    ))
}
