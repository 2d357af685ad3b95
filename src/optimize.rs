//! Candidate search for both clustering strategies
//!
//! The two optimizers differ in search-space shape (1D cluster-count sweep
//! vs 2D radius x min-samples grid) and in noise handling, but share the
//! candidate engine: fan the fits out over a worker pool, score each with
//! the metric evaluator, and reduce with one selection policy
//! (silhouette, then Calinski-Harabasz, then noise rate, then model
//! simplicity). Candidate fits are pure over the shared read-only feature
//! matrix; a failed or late fit is logged and skipped, never fatal.

use std::cmp::Ordering;
use std::fmt;
use std::time::Instant;

use log::warn;
use ndarray::Array2;
use rayon::prelude::*;

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::metrics::{self, QualityReport};
use crate::model::{self, ClusterAssignment};

/// Scores within this distance rank as equal; the next selection criterion
/// decides.
const SCORE_EPS: f64 = 1e-9;

/// Search-space coordinates of one centroid candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmeansParams {
    pub k: usize,
}

impl fmt::Display for KmeansParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "k={}", self.k)
    }
}

/// Search-space coordinates of one density candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DbscanParams {
    pub eps: f64,
    pub min_samples: usize,
}

impl fmt::Display for DbscanParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "eps={:.2}, min_samples={}", self.eps, self.min_samples)
    }
}

/// One scored candidate configuration. Only the per-optimizer winner
/// outlives the search.
#[derive(Debug, Clone)]
pub struct CandidateResult<P> {
    pub params: P,
    pub assignment: ClusterAssignment,
    pub report: QualityReport,
}

/// Sweep k over the configured range, fit seeded K-means per candidate, and
/// select the best-scoring labeling.
///
/// The range is capped at half the consumer count and at the number of
/// distinct feature rows (k-means++ cannot seed more centroids than
/// distinct points); an empty effective range or a sweep where every
/// candidate scores undefined is an [`Error::Optimization`].
pub fn optimize_kmeans(
    features: &Array2<f64>,
    config: &AnalysisConfig,
) -> Result<CandidateResult<KmeansParams>> {
    let n = features.nrows();
    let distinct = distinct_rows(features);
    let k_lo = *config.k_range.start();
    let k_hi = (*config.k_range.end()).min(n / 2).min(distinct);
    if k_hi < k_lo {
        return Err(Error::Optimization(format!(
            "cluster-count range {:?} is empty for {n} consumers ({distinct} distinct)",
            config.k_range
        )));
    }

    let candidates: Vec<KmeansParams> = (k_lo..=k_hi).map(|k| KmeansParams { k }).collect();
    let deadline = Instant::now() + config.search_timeout;

    let results = run_candidates(&candidates, deadline, |params| {
        let assignment = model::fit_kmeans(
            features,
            params.k,
            config.seed,
            config.max_iterations,
            config.tolerance,
        )?;
        let report = metrics::evaluate(features, &assignment);
        Ok(CandidateResult {
            params: *params,
            assignment,
            report,
        })
    });

    let scored: Vec<_> = results
        .into_iter()
        .flatten()
        .filter(|c| c.report.silhouette.is_some())
        .collect();
    if scored.is_empty() {
        return Err(Error::Optimization(format!(
            "every candidate in k={k_lo}..={k_hi} produced an undefined quality score"
        )));
    }

    Ok(select_best(scored, |c| c.params.k))
}

/// Grid-search (eps, min_samples) over the configured ranges, fit DBSCAN per
/// cell, and select the best labeling among candidates that keep noise
/// below the ceiling and form at least two clusters.
///
/// This is the heaviest search: the grid fits are independent and run on
/// the worker pool.
pub fn optimize_dbscan(
    features: &Array2<f64>,
    config: &AnalysisConfig,
) -> Result<CandidateResult<DbscanParams>> {
    let (eps_start, eps_stop) = config.eps_range;
    let mut candidates = Vec::new();
    let mut step = 0usize;
    loop {
        let eps = eps_start + step as f64 * config.eps_step;
        if eps >= eps_stop {
            break;
        }
        for min_samples in config.min_samples_range.clone() {
            candidates.push(DbscanParams { eps, min_samples });
        }
        step += 1;
    }
    if candidates.is_empty() {
        return Err(Error::Optimization(format!(
            "radius range {eps_start}..{eps_stop} at step {} yields no candidates",
            config.eps_step
        )));
    }

    let deadline = Instant::now() + config.search_timeout;
    let results = run_candidates(&candidates, deadline, |params| {
        let assignment = model::fit_dbscan(features, params.eps, params.min_samples)?;
        let report = metrics::evaluate_with_noise(features, &assignment);
        Ok(CandidateResult {
            params: *params,
            assignment,
            report,
        })
    });

    let viable: Vec<_> = results
        .into_iter()
        .flatten()
        .filter(|c| {
            c.report.n_clusters >= 2
                && c.report.noise_rate.unwrap_or(1.0) <= config.noise_ceiling
        })
        .collect();
    if viable.is_empty() {
        return Err(Error::Optimization(format!(
            "no (eps, min_samples) candidate formed >= 2 clusters with noise rate <= {:.0}%",
            config.noise_ceiling * 100.0
        )));
    }

    Ok(select_best(viable, |c| c.report.n_clusters))
}

/// Number of distinct feature rows, compared bitwise.
fn distinct_rows(features: &Array2<f64>) -> usize {
    features
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|v| v.to_bits()).collect::<Vec<u64>>())
        .collect::<std::collections::BTreeSet<_>>()
        .len()
}

/// Fit all candidates on the rayon pool. Failed fits and candidates not
/// started before the deadline are dropped with a warning.
fn run_candidates<P, F>(
    candidates: &[P],
    deadline: Instant,
    fit: F,
) -> Vec<Option<CandidateResult<P>>>
where
    P: fmt::Display + Send + Sync,
    F: Fn(&P) -> Result<CandidateResult<P>> + Sync,
{
    candidates
        .par_iter()
        .map(|params| {
            if Instant::now() >= deadline {
                warn!("skipping candidate {params}: search deadline exceeded");
                return None;
            }
            match fit(params) {
                Ok(candidate) => Some(candidate),
                Err(e) => {
                    warn!("skipping candidate {params}: {e}");
                    None
                }
            }
        })
        .collect()
}

/// Reduce scored candidates to the winner. Sequential and first-best-wins,
/// so the result is deterministic in candidate order.
fn select_best<P>(
    candidates: Vec<CandidateResult<P>>,
    complexity: impl Fn(&CandidateResult<P>) -> usize,
) -> CandidateResult<P> {
    let mut iter = candidates.into_iter();
    let mut best = iter.next().expect("select_best on empty candidate set");
    for candidate in iter {
        if ranks_above(&candidate, &best, &complexity) {
            best = candidate;
        }
    }
    best
}

/// Strictly-better comparison: silhouette, then Calinski-Harabasz, then
/// lower noise rate, then fewer clusters. Undefined scores rank below any
/// defined score.
fn ranks_above<P>(
    a: &CandidateResult<P>,
    b: &CandidateResult<P>,
    complexity: &impl Fn(&CandidateResult<P>) -> usize,
) -> bool {
    let ordering = cmp_score(a.report.silhouette, b.report.silhouette)
        .then_with(|| cmp_score(a.report.calinski_harabasz, b.report.calinski_harabasz))
        .then_with(|| {
            cmp_score(b.report.noise_rate, a.report.noise_rate) // lower is better
        })
        .then_with(|| complexity(b).cmp(&complexity(a))); // smaller is better
    ordering == Ordering::Greater
}

/// Higher-is-better comparison with `None` as the worst value and a small
/// tolerance for float ties.
fn cmp_score(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => {
            if (x - y).abs() <= SCORE_EPS {
                Ordering::Equal
            } else {
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        }
    }
}
