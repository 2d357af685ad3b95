//! Clustering quality metrics computed from features and labels alone

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayView1};

use crate::model::{ClusterAssignment, NOISE};

/// Quality scores for one labeling of the feature matrix.
///
/// Scores are `None` when mathematically undefined (fewer than two real
/// clusters, or too few non-noise points); undefined is an expected
/// condition, never an error. Optimizers rank `None` below every defined
/// score.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    /// Mean silhouette coefficient, in `[-1, 1]`, higher better.
    pub silhouette: Option<f64>,
    /// Davies-Bouldin index, `>= 0`, lower better.
    pub davies_bouldin: Option<f64>,
    /// Calinski-Harabasz index, `>= 0`, higher better.
    pub calinski_harabasz: Option<f64>,
    /// Fraction of points labeled noise; tracked for density clustering only.
    pub noise_rate: Option<f64>,
    /// Number of distinct non-noise clusters.
    pub n_clusters: usize,
}

/// Score a labeling. Noise-labeled rows are excluded from every cluster
/// metric; use [`evaluate_with_noise`] to also record the noise rate.
///
/// Deterministic in (features, assignment); no clustering-algorithm state
/// is involved.
pub fn evaluate(features: &Array2<f64>, assignment: &ClusterAssignment) -> QualityReport {
    debug_assert_eq!(features.nrows(), assignment.len());

    let clusters = cluster_members(assignment);
    let n_clusters = clusters.len();
    let n_valid: usize = clusters.values().map(Vec::len).sum();

    // Metrics need at least 2 clusters and, on average, 2 points per
    // cluster to say anything meaningful.
    if n_clusters < 2 || n_valid < n_clusters * 2 {
        return QualityReport {
            silhouette: None,
            davies_bouldin: None,
            calinski_harabasz: None,
            noise_rate: None,
            n_clusters,
        };
    }

    QualityReport {
        silhouette: Some(silhouette(features, &clusters)),
        davies_bouldin: davies_bouldin(features, &clusters),
        calinski_harabasz: calinski_harabasz(features, &clusters),
        noise_rate: None,
        n_clusters,
    }
}

/// [`evaluate`], plus the noise rate of the assignment.
pub fn evaluate_with_noise(
    features: &Array2<f64>,
    assignment: &ClusterAssignment,
) -> QualityReport {
    let mut report = evaluate(features, assignment);
    report.noise_rate = Some(assignment.noise_rate());
    report
}

/// Non-noise row indices grouped by label, in label order.
fn cluster_members(assignment: &ClusterAssignment) -> BTreeMap<i32, Vec<usize>> {
    let mut clusters: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (row, &label) in assignment.labels.iter().enumerate() {
        if label != NOISE {
            clusters.entry(label).or_default().push(row);
        }
    }
    clusters
}

fn euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn centroid(features: &Array2<f64>, members: &[usize]) -> Array1<f64> {
    let mut center = Array1::zeros(features.ncols());
    for &row in members {
        center += &features.row(row);
    }
    center / members.len() as f64
}

/// Mean silhouette over all non-noise points.
///
/// Per point: a = mean distance to its own cluster's other members, b =
/// smallest mean distance to another cluster; s = (b - a) / max(a, b).
/// Singleton-cluster points contribute 0.
fn silhouette(features: &Array2<f64>, clusters: &BTreeMap<i32, Vec<usize>>) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;

    for (label, members) in clusters {
        for &row in members {
            count += 1;
            if members.len() < 2 {
                continue; // singleton: s = 0
            }

            let point = features.row(row);
            let a = members
                .iter()
                .filter(|&&other| other != row)
                .map(|&other| euclidean(point, features.row(other)))
                .sum::<f64>()
                / (members.len() - 1) as f64;

            let b = clusters
                .iter()
                .filter(|(other_label, _)| *other_label != label)
                .map(|(_, others)| {
                    others
                        .iter()
                        .map(|&other| euclidean(point, features.row(other)))
                        .sum::<f64>()
                        / others.len() as f64
                })
                .fold(f64::INFINITY, f64::min);

            let denom = a.max(b);
            if denom > 0.0 {
                total += (b - a) / denom;
            }
        }
    }

    total / count as f64
}

/// Davies-Bouldin index: for each cluster, the worst ratio of combined
/// within-cluster scatter to centroid separation; averaged. Coincident
/// centroids are skipped rather than producing an infinite ratio.
fn davies_bouldin(features: &Array2<f64>, clusters: &BTreeMap<i32, Vec<usize>>) -> Option<f64> {
    let centroids: Vec<Array1<f64>> = clusters
        .values()
        .map(|members| centroid(features, members))
        .collect();
    let scatters: Vec<f64> = clusters
        .values()
        .zip(&centroids)
        .map(|(members, center)| {
            members
                .iter()
                .map(|&row| euclidean(features.row(row), center.view()))
                .sum::<f64>()
                / members.len() as f64
        })
        .collect();

    let k = centroids.len();
    let mut total = 0.0;
    for i in 0..k {
        let mut worst: f64 = 0.0;
        for j in 0..k {
            if i == j {
                continue;
            }
            let separation = euclidean(centroids[i].view(), centroids[j].view());
            if separation > 1e-12 {
                worst = worst.max((scatters[i] + scatters[j]) / separation);
            }
        }
        total += worst;
    }

    Some(total / k as f64)
}

/// Calinski-Harabasz index: between-cluster over within-cluster dispersion,
/// scaled by degrees of freedom. Undefined when within-cluster dispersion
/// vanishes or n == k.
fn calinski_harabasz(features: &Array2<f64>, clusters: &BTreeMap<i32, Vec<usize>>) -> Option<f64> {
    let k = clusters.len();
    let rows: Vec<usize> = clusters.values().flatten().copied().collect();
    let n = rows.len();
    if n <= k {
        return None;
    }

    let overall = centroid(features, &rows);

    let mut between = 0.0;
    let mut within = 0.0;
    for members in clusters.values() {
        let center = centroid(features, members);
        let gap = euclidean(center.view(), overall.view());
        between += members.len() as f64 * gap * gap;
        for &row in members {
            let d = euclidean(features.row(row), center.view());
            within += d * d;
        }
    }

    if within < 1e-12 {
        return None;
    }
    Some((between / (k - 1) as f64) / (within / (n - k) as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NOISE;

    fn assignment(labels: &[i32]) -> ClusterAssignment {
        ClusterAssignment {
            labels: labels.to_vec(),
        }
    }

    fn two_separated_clusters() -> Array2<f64> {
        Array2::from_shape_vec(
            (6, 2),
            vec![
                0.0, 0.0, //
                0.1, 0.1, //
                0.2, 0.0, //
                10.0, 10.0, //
                10.1, 10.1, //
                10.2, 10.0, //
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_well_separated_scores() {
        let features = two_separated_clusters();
        let report = evaluate(&features, &assignment(&[0, 0, 0, 1, 1, 1]));

        assert_eq!(report.n_clusters, 2);
        assert!(report.silhouette.unwrap() > 0.5);
        assert!(report.davies_bouldin.unwrap() < 1.0);
        assert!(report.calinski_harabasz.unwrap() > 1.0);
        assert_eq!(report.noise_rate, None);
    }

    #[test]
    fn test_duplicate_point_clusters_reach_silhouette_one() {
        // Two clusters of coincident points: a = 0, b > 0, so s = 1 exactly.
        let features = Array2::from_shape_vec(
            (4, 2),
            vec![0.0, 0.0, 0.0, 0.0, 5.0, 5.0, 5.0, 5.0],
        )
        .unwrap();
        let report = evaluate(&features, &assignment(&[0, 0, 1, 1]));

        assert!((report.silhouette.unwrap() - 1.0).abs() < 1e-12);
        // Zero within-cluster dispersion makes CH undefined, not infinite.
        assert_eq!(report.calinski_harabasz, None);
    }

    #[test]
    fn test_single_cluster_is_undefined() {
        let features = two_separated_clusters();
        let report = evaluate(&features, &assignment(&[0, 0, 0, 0, 0, 0]));

        assert_eq!(report.n_clusters, 1);
        assert_eq!(report.silhouette, None);
        assert_eq!(report.davies_bouldin, None);
        assert_eq!(report.calinski_harabasz, None);
    }

    #[test]
    fn test_noise_excluded_from_metrics() {
        // Same two clusters plus a far outlier marked noise: the scores must
        // match the noise-free labeling.
        let mut points = two_separated_clusters().into_raw_vec();
        points.extend_from_slice(&[100.0, 100.0]);
        let features = Array2::from_shape_vec((7, 2), points).unwrap();

        let with_noise = evaluate_with_noise(&features, &assignment(&[0, 0, 0, 1, 1, 1, NOISE]));
        let clean = evaluate(&two_separated_clusters(), &assignment(&[0, 0, 0, 1, 1, 1]));

        assert_eq!(with_noise.n_clusters, 2);
        assert_eq!(with_noise.silhouette, clean.silhouette);
        assert_eq!(with_noise.davies_bouldin, clean.davies_bouldin);
        assert!((with_noise.noise_rate.unwrap() - 1.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_all_noise_is_undefined() {
        let features = two_separated_clusters();
        let report = evaluate_with_noise(&features, &assignment(&[NOISE; 6]));

        assert_eq!(report.n_clusters, 0);
        assert_eq!(report.silhouette, None);
        assert!((report.noise_rate.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_too_few_points_per_cluster_is_undefined() {
        // 3 clusters over 5 points: below the 2-per-cluster average.
        let features = Array2::from_shape_vec(
            (5, 1),
            vec![0.0, 0.1, 5.0, 5.1, 10.0],
        )
        .unwrap();
        let report = evaluate(&features, &assignment(&[0, 0, 1, 1, 2]));

        assert_eq!(report.silhouette, None);
    }
}
