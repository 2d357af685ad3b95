//! Command-line interface definitions and argument parsing

use std::time::Duration;

use clap::Parser;

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};

/// Consumer segmentation CLI comparing K-Means and DBSCAN on purchase data
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the purchases CSV file
    #[arg(short, long, default_value = "data/purchases.csv")]
    pub input: String,

    /// Cluster-count search range for K-Means, as "LO..HI" (inclusive)
    #[arg(long, default_value = "2..10")]
    pub k_range: String,

    /// Neighborhood-radius sweep for DBSCAN, as "START..STOP" (STOP exclusive)
    #[arg(long, default_value = "0.3..2.0")]
    pub eps_range: String,

    /// Step between successive radius candidates
    #[arg(long, default_value = "0.1")]
    pub eps_step: f64,

    /// Minimum-neighbor-count search range for DBSCAN, as "LO..HI" (inclusive)
    #[arg(long, default_value = "3..10")]
    pub min_samples: String,

    /// Random seed for centroid initialization
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Reject DBSCAN candidates whose noise rate exceeds this fraction
    #[arg(long, default_value = "0.5")]
    pub noise_ceiling: f64,

    /// Members listed per cluster in the report
    #[arg(long, default_value = "10")]
    pub top_n: usize,

    /// Maximum iterations for K-Means
    #[arg(long, default_value = "300")]
    pub max_iters: u64,

    /// Tolerance for K-Means convergence
    #[arg(long, default_value = "1e-4")]
    pub tolerance: f64,

    /// Per-optimizer search deadline in seconds
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,

    /// Base path for cluster charts (PNG); charts are skipped when absent
    #[arg(short, long)]
    pub plot: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Build and validate the analysis configuration from the raw arguments.
    pub fn to_config(&self) -> Result<AnalysisConfig> {
        let (k_lo, k_hi) = parse_range::<usize>(&self.k_range, "--k-range")?;
        let (eps_lo, eps_hi) = parse_range::<f64>(&self.eps_range, "--eps-range")?;
        let (min_lo, min_hi) = parse_range::<usize>(&self.min_samples, "--min-samples")?;

        let config = AnalysisConfig {
            k_range: k_lo..=k_hi,
            eps_range: (eps_lo, eps_hi),
            eps_step: self.eps_step,
            min_samples_range: min_lo..=min_hi,
            seed: self.seed,
            noise_ceiling: self.noise_ceiling,
            top_n: self.top_n,
            max_iterations: self.max_iters,
            tolerance: self.tolerance,
            search_timeout: Duration::from_secs(self.timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Parse a "LO..HI" range argument.
fn parse_range<T: std::str::FromStr>(raw: &str, flag: &str) -> Result<(T, T)> {
    let (lo, hi) = raw
        .split_once("..")
        .ok_or_else(|| Error::Config(format!("{flag}: expected LO..HI, got '{raw}'")))?;
    let lo = lo
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{flag}: invalid lower bound '{lo}'")))?;
    let hi = hi
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{flag}: invalid upper bound '{hi}'")))?;
    Ok((lo, hi))
}
