// this_file: src/main.rs
//! Pixpool CLI - exercise the pixel buffer reuse cache

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use pixpool::logging::{self, Timer};
use pixpool::workload::{self, WorkloadParams};
use pixpool::{PixelLayout, PoolConfig, ReuseCache, ReusePolicy, StatsReporter};
use std::path::PathBuf;

/// Pixpool - reuse cache for decoded pixel buffers
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long, global = true, default_value = "info")]
    log_level: String,

    /// Enable quiet mode (only errors)
    #[arg(short = 'q', long, global = true, conflicts_with = "log_level")]
    quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Capacity,
    Exact,
}

impl From<PolicyArg> for ReusePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Capacity => ReusePolicy::Capacity,
            PolicyArg::Exact => ReusePolicy::Exact,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a synthetic decode/display workload and print cache stats
    Simulate {
        /// JSON pool configuration (defaults apply otherwise)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// High watermark in bytes (overrides the config file)
        #[arg(long)]
        high: Option<usize>,

        /// Low watermark in bytes (overrides the config file)
        #[arg(long)]
        low: Option<usize>,

        /// Number of frames to decode
        #[arg(short, long, default_value_t = 1000)]
        frames: usize,

        /// Number of parallel decode workers
        #[arg(short, long, default_value_t = 4)]
        workers: usize,

        /// Reuse compatibility policy
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,

        /// Log every cache operation
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a JSON pool configuration
    Validate {
        /// Configuration file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(&cli.log_level, cli.quiet, true);

    match cli.command {
        Commands::Simulate {
            config,
            high,
            low,
            frames,
            workers,
            policy,
            verbose,
        } => {
            let mut pool_config = match config {
                Some(path) => PoolConfig::from_json_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => PoolConfig::default(),
            };
            if let Some(high) = high {
                pool_config.high_watermark_bytes = high;
            }
            if let Some(low) = low {
                pool_config.low_watermark_bytes = low;
            }
            if let Some(policy) = policy {
                pool_config.reuse_policy = policy.into();
            }
            pool_config.verbose_logging |= verbose;

            let params = WorkloadParams {
                frames,
                workers,
                layout: PixelLayout::Argb8888,
            };
            simulate(pool_config, &params)?;
        }
        Commands::Validate { config } => {
            let pool_config = PoolConfig::from_json_file(&config)
                .with_context(|| format!("invalid configuration {}", config.display()))?;
            println!(
                "OK: high={} low={} policy={:?}",
                pool_config.high_watermark_bytes,
                pool_config.low_watermark_bytes,
                pool_config.reuse_policy
            );
        }
        Commands::Version => {
            println!("pixpool version {}", pixpool::VERSION);
            println!("Pixel buffer reuse cache");
        }
    }

    Ok(())
}

fn simulate(config: PoolConfig, params: &WorkloadParams) -> Result<()> {
    let cache: ReuseCache = ReuseCache::try_new(config.clone())?;
    let reporter = match config.stats_interval() {
        Some(interval) => Some(StatsReporter::spawn(cache.clone(), interval)?),
        None => None,
    };

    info!(
        "Simulating {} frames on {} workers (high={} low={} policy={:?})",
        params.frames,
        params.workers,
        config.high_watermark_bytes,
        config.low_watermark_bytes,
        config.reuse_policy
    );
    let timer = Timer::new("simulate");
    let report = workload::run(&cache, params)?;
    let elapsed = timer.elapsed_ms();

    if let Some(reporter) = reporter {
        reporter.stop();
    }

    println!(
        "frames={} allocated={} reused={} elapsed_ms={:.1}",
        report.frames, report.allocated, report.reused, elapsed
    );
    println!("{}", report.stats);
    Ok(())
}
