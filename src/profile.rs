//! Per-cluster summaries for presentation

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::features::FeatureMatrix;
use crate::model::{ClusterAssignment, NOISE};

/// One consumer inside a cluster's member sample.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSummary {
    pub consumer_id: String,
    pub purchase_count: usize,
    pub mean_price: f64,
    pub mean_discount: f64,
    pub total_spend: f64,
}

/// Aggregated view of one final cluster. Noise forms its own pseudo-cluster
/// with the [`NOISE`] label.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterProfile {
    pub label: i32,
    pub member_count: usize,
    /// Mean of member mean prices.
    pub mean_price: f64,
    /// Mean of member mean discounts.
    pub mean_discount: f64,
    /// Summed spend of every member.
    pub total_spend: f64,
    /// Up to top-N members by mean price, descending; ties broken by
    /// consumer id so the sample is stable across runs.
    pub top_members: Vec<MemberSummary>,
}

impl ClusterProfile {
    pub fn is_noise(&self) -> bool {
        self.label == NOISE
    }
}

/// Group rows by final label and aggregate each cluster.
///
/// Output ordering is fixed for presentation: descending member count,
/// ascending label on ties, and the noise pseudo-cluster always last.
/// Member counts across all profiles sum to the total row count.
pub fn aggregate(
    assignment: &ClusterAssignment,
    matrix: &FeatureMatrix,
    top_n: usize,
) -> Vec<ClusterProfile> {
    debug_assert_eq!(assignment.len(), matrix.n_consumers());

    let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (row, &label) in assignment.labels.iter().enumerate() {
        groups.entry(label).or_default().push(row);
    }

    let mut profiles: Vec<ClusterProfile> = groups
        .into_iter()
        .map(|(label, rows)| summarize(label, &rows, matrix, top_n))
        .collect();

    profiles.sort_by(|a, b| {
        a.is_noise()
            .cmp(&b.is_noise())
            .then(b.member_count.cmp(&a.member_count))
            .then(a.label.cmp(&b.label))
    });
    profiles
}

fn summarize(label: i32, rows: &[usize], matrix: &FeatureMatrix, top_n: usize) -> ClusterProfile {
    let count = rows.len();
    let mut mean_price = 0.0;
    let mut mean_discount = 0.0;
    let mut total_spend = 0.0;

    let mut members: Vec<MemberSummary> = Vec::with_capacity(count);
    for &row in rows {
        let profile = &matrix.profiles[row];
        mean_price += profile.mean_price;
        mean_discount += profile.mean_discount;
        total_spend += profile.total_spend;
        members.push(MemberSummary {
            consumer_id: profile.consumer_id.clone(),
            purchase_count: profile.purchase_count,
            mean_price: profile.mean_price,
            mean_discount: profile.mean_discount,
            total_spend: profile.total_spend,
        });
    }

    members.sort_by(|a, b| {
        b.mean_price
            .partial_cmp(&a.mean_price)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.consumer_id.cmp(&b.consumer_id))
    });
    members.truncate(top_n);

    ClusterProfile {
        label,
        member_count: count,
        mean_price: mean_price / count as f64,
        mean_discount: mean_discount / count as f64,
        total_spend,
        top_members: members,
    }
}
