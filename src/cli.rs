use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Quasi-periodic oscillation search in multi-band light curves.
#[derive(Parser)]
#[command(
    name = "qhx",
    version,
    about = "Quasi-periodic oscillation search in multi-band light curves",
    after_help = "Log output goes to stderr; set RUST_LOG to override -v."
)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace). Logs are
    /// written to stderr so output files piped to stdout stay clean.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Detect periods common to the bands of every object in a table.
    Detect(DetectArgs),
    /// Superlet scalogram of a test signal or a single-column file.
    Superlet(SuperletArgs),
    /// Write a mock multi-band light curve as an observation table.
    Mock(MockArgs),
}

/// Arguments for the `detect` subcommand.
#[derive(clap::Args)]
pub struct DetectArgs {
    /// Path to TOML configuration file.
    #[arg(short, long, default_value = "qhx.toml")]
    pub config: PathBuf,

    /// Override input Parquet path from config.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Override output path from config (.csv or .parquet).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override global RNG seed from config.
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Analyse only this object (repeatable).
    #[arg(long = "object")]
    pub objects: Vec<String>,

    /// Override the number of worker threads.
    #[arg(short, long)]
    pub workers: Option<usize>,
}

/// Arguments for the `superlet` subcommand.
#[derive(clap::Args)]
pub struct SuperletArgs {
    /// Path to TOML configuration file; only `[superlet]` and `seed` are read.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Signal file, one value per line (first comma-separated field).
    /// Without it a harmonic-packet test signal is generated.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Sampling rate of the signal in Hz.
    #[arg(long, default_value_t = 1000.0)]
    pub samplerate: f64,

    /// Lowest analysed frequency.
    #[arg(long, default_value_t = 10.0)]
    pub fmin: f64,

    /// Highest analysed frequency.
    #[arg(long, default_value_t = 100.0)]
    pub fmax: f64,

    /// Number of analysed frequencies.
    #[arg(long, default_value_t = 91)]
    pub nfreq: usize,

    /// Output CSV of amplitudes, one row per frequency.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Override global RNG seed from config.
    #[arg(short, long)]
    pub seed: Option<u64>,
}

/// Arguments for the `mock` subcommand.
#[derive(clap::Args)]
pub struct MockArgs {
    /// Output Parquet path.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Object identifier written to the table.
    #[arg(long, default_value = "mock")]
    pub object_id: String,

    /// Bands to generate; each gets an independent draw.
    #[arg(long, value_delimiter = ',', default_value = "g,r")]
    pub bands: Vec<String>,

    /// Span of the light curve, in `--unit`.
    #[arg(long, default_value_t = 10.0)]
    pub time_interval: f64,

    /// Unit of the span (year, day, hour, minute, second).
    #[arg(long, default_value = "year")]
    pub unit: String,

    /// Damped random walk at a regular cadence instead of power-law noise.
    /// `--num-points` and `--magnitude` are ignored; the oscillation is
    /// `--amplitude` magnitudes at `--period` days, none when the amplitude is 0.
    #[arg(long)]
    pub drw: bool,

    /// Days between samples of the damped random walk.
    #[arg(long, default_value_t = 1.0)]
    pub cadence: f64,

    /// Points per band before removal.
    #[arg(long, default_value_t = 1000)]
    pub num_points: usize,

    /// Injected period in days.
    #[arg(long, default_value_t = 100.0)]
    pub period: f64,

    /// Sinusoid amplitude relative to the largest noise value.
    #[arg(long, default_value_t = 0.3)]
    pub amplitude: f64,

    /// Fraction of points removed at random.
    #[arg(long, default_value_t = 0.5)]
    pub remove_fraction: f64,

    /// Mean magnitude.
    #[arg(long, default_value_t = 22.0)]
    pub magnitude: f64,

    /// Constant magnitude error to store with every point.
    #[arg(long)]
    pub mag_error: Option<f64>,

    /// RNG seed.
    #[arg(short, long)]
    pub seed: Option<u64>,
}
