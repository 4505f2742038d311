use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use numscout::{
    generate, parse_size, scan::Batch, CliOverrides, GeneratorConfig, ScanConfig, ScanError,
    ScanMetrics, ScanObserver, ScanResult, Scanner,
};
use rand::Rng;
use std::io::IsTerminal;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
struct CliSearchConfig {
    /// File of newline-delimited integers
    file: PathBuf,

    /// Value to search for
    #[arg(short = 't', long, allow_hyphen_values = true)]
    target: Option<i64>,

    /// Draw the target uniformly from [0, MAX] instead of passing one
    #[arg(long, value_name = "MAX", conflicts_with = "target", allow_hyphen_values = true)]
    random_target: Option<i64>,

    /// Number of worker threads
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// Bytes per chunk (suffixes k, m, g)
    #[arg(short = 'c', long, value_parser = parse_size_arg)]
    chunk_size: Option<u64>,

    /// Ceiling on chunk bytes admitted at once (suffixes k, m, g)
    #[arg(short = 'm', long, value_parser = parse_size_arg)]
    ram_budget: Option<u64>,

    /// Configuration file (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print only the summary line
    #[arg(short, long)]
    stats: bool,

    /// Print the result as JSON
    #[arg(long, conflicts_with = "stats")]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a file of random integers, one per line
    Generate {
        /// Output file; replaced if it exists
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Number of records to write
        #[arg(short = 'n', long)]
        count: u64,

        /// Largest value that may be drawn
        #[arg(long, default_value = "1000000")]
        max_value: i64,

        /// Number of worker threads
        #[arg(short = 'j', long)]
        threads: Option<NonZeroUsize>,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Search a file for a value without loading it whole
    Search(Box<CliSearchConfig>),
}

fn parse_size_arg(s: &str) -> std::result::Result<u64, String> {
    parse_size(s).map_err(|e| e.to_string())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            output,
            count,
            max_value,
            threads,
            seed,
        } => {
            init_tracing(cli.log_level.as_deref().unwrap_or("warn"));

            let mut config = GeneratorConfig::new(count, max_value);
            if let Some(threads) = threads {
                config.worker_count = threads;
            }
            config.seed = seed;

            let start = Instant::now();
            let report = generate(&output, &config)?;
            let elapsed = start.elapsed();

            println!(
                "File '{}' created with {} records.",
                output.display().to_string().blue(),
                report.records
            );
            println!("\n=== Generation metrics ===");
            println!("Elapsed: {}", format_elapsed(elapsed));
            println!("Workers: {}", config.worker_count);
            println!("Bytes written: {}", report.bytes_written);
            println!("Seed: {}", report.seed);
            Ok(())
        }
        Commands::Search(args) => {
            let file_config = ScanConfig::load_from(args.config.as_deref())?;
            let target = match args.random_target {
                Some(max) if max < 0 => {
                    return Err(ScanError::config_error(
                        "--random-target needs a non-negative maximum",
                    )
                    .into())
                }
                Some(max) => Some(rand::rng().random_range(0..=max)),
                None => args.target,
            };

            let config = file_config.merge_with_cli(CliOverrides {
                worker_count: args.threads,
                chunk_bytes: args.chunk_size,
                ram_budget_bytes: args.ram_budget,
                target,
                log_level: cli.log_level,
            });
            config.validate()?;
            init_tracing(&config.log_level);

            let target = config.target.ok_or_else(|| {
                ScanError::config_error("no target given (use --target or --random-target)")
            })?;
            if !args.json {
                println!("Searching for {}...", target);
            }

            let file_size = std::fs::metadata(&args.file)
                .map_err(|e| ScanError::from_io(&args.file, e))?
                .len();
            let metrics = Arc::new(ScanMetrics::new());
            let progress = Arc::new(ScanProgress::new(
                file_size,
                !args.stats && !args.json && std::io::stdout().is_terminal(),
            ));
            let scanner = Scanner::new(config)?
                .with_observer(metrics.clone())
                .with_observer(progress.clone());

            let start = Instant::now();
            let result = scanner.scan(&args.file, target);
            let elapsed = start.elapsed();
            progress.finish();
            let result = result?;

            if args.json {
                let json = serde_json::to_string_pretty(&result)
                    .context("failed to serialize scan result")?;
                println!("{}", json);
            } else {
                print_search_results(target, &result, &metrics, elapsed, args.stats);
            }
            Ok(())
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn format_elapsed(elapsed: Duration) -> String {
    // humantime prints every unit down to nanoseconds; keep milliseconds
    let rounded = Duration::from_millis(elapsed.as_millis() as u64);
    if rounded.is_zero() {
        format!("{}µs", elapsed.as_micros())
    } else {
        humantime::format_duration(rounded).to_string()
    }
}

fn print_search_results(
    target: i64,
    result: &ScanResult,
    metrics: &ScanMetrics,
    elapsed: Duration,
    stats_only: bool,
) {
    let verdict = if result.found {
        format!("Number {} found!", target).green()
    } else {
        format!("Number {} not found.", target).yellow()
    };

    if stats_only {
        println!(
            "{} Scanned {} bytes in {} batches",
            verdict, result.bytes_scanned, result.batches
        );
        return;
    }

    println!("{}", verdict);
    if let Some(offset) = result.match_offset {
        println!("Matched in chunk at offset {}", offset);
    }

    let stats = metrics.get_stats();
    println!("\n=== Search metrics ===");
    println!("Elapsed: {}", format_elapsed(elapsed));
    println!("Workers: {}", result.workers_used);
    println!(
        "Bytes scanned: {} ({:.6} GiB)",
        result.bytes_scanned,
        result.bytes_scanned as f64 / BYTES_PER_GIB
    );
    println!("Peak resident chunk bytes: {}", stats.peak_resident_bytes);
    println!("Values checked: {}", result.values_checked);
    println!("Batches discarded: {}", result.chunks_discarded);
}

/// Progress bar over the bytes admitted so far
struct ScanProgress {
    bar: ProgressBar,
}

impl ScanProgress {
    fn new(file_size: u64, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(file_size)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] {bar:40} {bytes}/{total_bytes} ({bytes_per_sec})",
        ) {
            bar.set_style(style);
        }
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ScanObserver for ScanProgress {
    fn batch_retired(&self, batch: &Batch, _matched: bool) {
        let end = batch.range(self.bar.length().unwrap_or(0)).end;
        self.bar.set_position(end);
    }
}
