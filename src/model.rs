//! Seedable fit wrappers around the linfa clustering models

use linfa::prelude::*;
use linfa::Dataset;
use linfa_clustering::{Dbscan, KMeans};
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_isaac::Isaac64Rng;

use crate::error::{Error, Result};

/// Sentinel label for points a density method assigns to no cluster.
pub const NOISE: i32 = -1;

/// Per-row cluster labels over a feature matrix.
///
/// Labels are non-negative cluster ids; [`NOISE`] marks unassigned points.
/// K-means assignments never contain the noise label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAssignment {
    pub labels: Vec<i32>,
}

impl ClusterAssignment {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Distinct non-noise labels, sorted.
    pub fn cluster_labels(&self) -> Vec<i32> {
        let mut labels: Vec<i32> = self
            .labels
            .iter()
            .copied()
            .filter(|&l| l != NOISE)
            .collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    /// Number of distinct non-noise clusters.
    pub fn n_clusters(&self) -> usize {
        self.cluster_labels().len()
    }

    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == NOISE).count()
    }

    /// Fraction of points labeled noise, in `[0, 1]`.
    pub fn noise_rate(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        self.noise_count() as f64 / self.labels.len() as f64
    }
}

/// Fit K-means with `k` centroids and return the per-row assignment.
///
/// Initialization is seeded so identical inputs produce identical labels.
pub fn fit_kmeans(
    features: &Array2<f64>,
    k: usize,
    seed: u64,
    max_iterations: u64,
    tolerance: f64,
) -> Result<ClusterAssignment> {
    let n = features.nrows();
    if k == 0 || k > n {
        return Err(Error::Fit(format!(
            "k-means: k={k} is outside 1..={n} for {n} consumers"
        )));
    }

    let rng = Isaac64Rng::seed_from_u64(seed);
    let targets: Array1<usize> = Array1::zeros(n);
    let dataset = Dataset::new(features.clone(), targets);

    let model = KMeans::params_with(k, rng, L2Dist)
        .max_n_iterations(max_iterations)
        .tolerance(tolerance)
        .fit(&dataset)
        .map_err(|e| Error::Fit(format!("k-means (k={k}): {e}")))?;

    let labels = model.predict(&dataset);
    Ok(ClusterAssignment {
        labels: labels.iter().map(|&l| l as i32).collect(),
    })
}

/// Fit DBSCAN and return the per-row assignment with noise mapped to
/// [`NOISE`].
pub fn fit_dbscan(features: &Array2<f64>, eps: f64, min_samples: usize) -> Result<ClusterAssignment> {
    let labels = Dbscan::params(min_samples)
        .tolerance(eps)
        .transform(features)
        .map_err(|e| {
            Error::Fit(format!(
                "dbscan (eps={eps:.3}, min_samples={min_samples}): {e}"
            ))
        })?;

    Ok(ClusterAssignment {
        labels: labels
            .iter()
            .map(|l| l.map(|c| c as i32).unwrap_or(NOISE))
            .collect(),
    })
}
