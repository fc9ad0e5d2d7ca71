//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// `measrig` command-line driver for governor-sweep power measurements
#[derive(Parser)]
#[command(name = "measrig")]
#[command(author, version, about = "measrig measurement rig driver")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the rig configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the governor sweep experiment
    #[command(about = "Sweep cpufreq governors and CPU sets, saving one CSV per point")]
    Sweep {
        /// Local directory receiving the saved CSVs (overrides the config)
        #[arg(short, long)]
        dstdir: Option<PathBuf>,

        /// Measurement window per configuration in seconds (overrides the
        /// config)
        #[arg(short, long)]
        window: Option<u64>,

        /// Measure the idle system instead of starting the workload
        #[arg(long)]
        idle: bool,
    },

    /// Take one timed power measurement on every configured sampler unit
    #[command(about = "Run the power-meter samplers for a fixed duration and save the CSVs")]
    Sample {
        /// Measurement duration in seconds
        #[arg(short = 't', long, default_value_t = 60)]
        duration: u64,

        /// Meter measurement mode (e.g. "230V" or "12V"), overriding the
        /// configured default
        #[arg(short, long)]
        mode: Option<String>,

        /// Local directory receiving the saved CSVs (overrides the config)
        #[arg(short, long)]
        dstdir: Option<PathBuf>,
    },

    /// Generate transcoding load at a stochastic rate
    #[command(about = "Start ffmpeg transcodings of stochastically sized videos")]
    Wlgen {
        /// Directory holding the source video pool
        #[arg(short, long)]
        pool: PathBuf,

        /// Temporary destination directory of transcoded videos
        #[arg(short, long, default_value = "/tmp/measrig-wlgen")]
        dstdir: PathBuf,

        /// Maximum video size in bytes
        #[arg(long, default_value_t = 80_000_000)]
        vmax: u64,

        /// CPUs a transcoding is started on after every wait (defaults to
        /// all)
        #[arg(long, value_delimiter = ',')]
        cpus: Option<Vec<usize>>,

        /// Time between transcoding batches in seconds
        #[arg(short, long, default_value_t = 30)]
        wait: u64,

        /// Distribution of the video size
        #[arg(short, long, default_value = "exp", value_enum)]
        size: SizeDistribution,

        /// Video size for the constant distribution
        #[arg(long, default_value_t = 40_000_000)]
        csize: u64,

        /// Expectation value for the exponential distribution
        #[arg(short, long, default_value_t = 15_000_000.0)]
        mu: f64,

        /// Expectation value for the normal distribution
        #[arg(long, default_value_t = 15_000_000.0)]
        gmu: f64,

        /// Standard deviation for the normal distribution
        #[arg(long, default_value_t = 7_500_000.0)]
        gsigma: f64,

        /// Minimal video size for the uniform distribution
        #[arg(long, default_value_t = 1)]
        uvmin: u64,
    },

    /// Copy a constant-relative-distance subset of the video pool
    #[command(about = "Copy videos from the pool with constant relative size steps")]
    Subset {
        /// Directory holding the source video pool
        #[arg(short, long)]
        pool: PathBuf,

        /// Destination directory for the subset
        #[arg(short, long)]
        dstdir: PathBuf,

        /// Smallest video size in bytes
        #[arg(long, default_value_t = 11_500.0)]
        minsize: f64,

        /// Largest video size in bytes
        #[arg(long, default_value_t = 50_000_000.0)]
        maxsize: f64,

        /// Relative size step between consecutive videos
        #[arg(long, default_value_t = 1.0025)]
        factor: f64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Video size distributions of the workload generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SizeDistribution {
    /// Constant size
    Const,
    /// Exponentially distributed size
    Exp,
    /// Normally distributed size
    Gauss,
    /// Uniformly distributed size
    Uni,
}
