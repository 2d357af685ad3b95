//! Analysis configuration surface with documented defaults

use std::ops::RangeInclusive;
use std::time::Duration;

use crate::error::{Error, Result};

/// Tunable parameters for one analysis run.
///
/// Every field has a sane default; [`validate`](AnalysisConfig::validate)
/// rejects invalid combinations before any fitting begins.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Cluster-count search range for the centroid optimizer (inclusive).
    /// The sweep is additionally capped at half the consumer count.
    pub k_range: RangeInclusive<usize>,
    /// Neighborhood-radius sweep for the density optimizer: candidates are
    /// `start, start + step, ...` strictly below `stop`.
    pub eps_range: (f64, f64),
    pub eps_step: f64,
    /// Minimum-neighbor-count search range for the density optimizer
    /// (inclusive).
    pub min_samples_range: RangeInclusive<usize>,
    /// Seed for centroid initialization; fixes the run end to end.
    pub seed: u64,
    /// Density candidates whose noise rate exceeds this fraction are
    /// rejected regardless of score.
    pub noise_ceiling: f64,
    /// Members listed per cluster in the aggregated profiles.
    pub top_n: usize,
    /// K-means iteration cap.
    pub max_iterations: u64,
    /// K-means convergence tolerance.
    pub tolerance: f64,
    /// Deadline per optimizer search; candidates not started in time are
    /// skipped.
    pub search_timeout: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            k_range: 2..=10,
            eps_range: (0.3, 2.0),
            eps_step: 0.1,
            min_samples_range: 3..=10,
            seed: 42,
            noise_ceiling: 0.5,
            top_n: 10,
            max_iterations: 300,
            tolerance: 1e-4,
            search_timeout: Duration::from_secs(30),
        }
    }
}

impl AnalysisConfig {
    /// Fail fast on invalid search parameters, before any computation.
    pub fn validate(&self) -> Result<()> {
        if self.k_range.is_empty() {
            return Err(Error::Config(format!(
                "cluster-count range {:?} is empty",
                self.k_range
            )));
        }
        if *self.k_range.start() < 2 {
            return Err(Error::Config(
                "cluster-count range must start at 2 or above".to_string(),
            ));
        }
        let (eps_start, eps_stop) = self.eps_range;
        if !eps_start.is_finite() || eps_start <= 0.0 {
            return Err(Error::Config(format!(
                "radius range must start above 0, got {eps_start}"
            )));
        }
        if !eps_stop.is_finite() || eps_stop <= eps_start {
            return Err(Error::Config(format!(
                "radius range {eps_start}..{eps_stop} is empty"
            )));
        }
        if !self.eps_step.is_finite() || self.eps_step <= 0.0 {
            return Err(Error::Config(format!(
                "radius step must be positive, got {}",
                self.eps_step
            )));
        }
        if self.min_samples_range.is_empty() {
            return Err(Error::Config(format!(
                "min-samples range {:?} is empty",
                self.min_samples_range
            )));
        }
        if *self.min_samples_range.start() == 0 {
            return Err(Error::Config(
                "min-samples range must start at 1 or above".to_string(),
            ));
        }
        if !self.noise_ceiling.is_finite()
            || self.noise_ceiling <= 0.0
            || self.noise_ceiling > 1.0
        {
            return Err(Error::Config(format!(
                "noise ceiling must be in (0, 1], got {}",
                self.noise_ceiling
            )));
        }
        if self.top_n == 0 {
            return Err(Error::Config("top-n must be at least 1".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(Error::Config(
                "max iterations must be at least 1".to_string(),
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(Error::Config(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.search_timeout.is_zero() {
            return Err(Error::Config(
                "search timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
