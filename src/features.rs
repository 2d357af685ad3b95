//! Consumer feature engineering: profiles, category encoding, scaling

use std::collections::{BTreeMap, BTreeSet};

use ndarray::{Array1, Array2};

use crate::data::PurchaseRecord;
use crate::error::{Error, Result};

/// Aggregated purchase behavior of one consumer.
///
/// Derived once per analysis run from all of the consumer's purchase
/// records; immutable afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerProfile {
    pub consumer_id: String,
    pub purchase_count: usize,
    pub mean_price: f64,
    pub mean_discount: f64,
    pub total_spend: f64,
    /// Purchases per category, over the dataset-wide category vocabulary.
    pub category_counts: BTreeMap<String, usize>,
}

/// Per-column standardization (zero mean, unit scale), fit once on the whole
/// raw matrix. The fitted parameters are part of the pipeline output so a
/// run can be reproduced exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub means: Array1<f64>,
    pub scales: Array1<f64>,
}

impl StandardScaler {
    /// Fit per-column mean and population standard deviation.
    ///
    /// Columns with ~zero variance get scale 1.0 so the column layout stays
    /// fixed regardless of the data.
    pub fn fit(x: &Array2<f64>) -> Self {
        let n = x.nrows() as f64;
        let means = x.mean_axis(ndarray::Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
        let mut scales = Array1::zeros(x.ncols());
        for j in 0..x.ncols() {
            let var = x
                .column(j)
                .iter()
                .map(|v| (v - means[j]).powi(2))
                .sum::<f64>()
                / n;
            let std = var.sqrt();
            scales[j] = if std > 1e-12 { std } else { 1.0 };
        }
        Self { means, scales }
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = x.clone();
        for mut row in out.rows_mut() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = (*v - self.means[j]) / self.scales[j];
            }
        }
        out
    }
}

/// Per-consumer feature vectors plus everything needed to interpret and
/// reproduce them.
///
/// Column layout is fixed: `[mean_price, mean_discount, cat_0 .. cat_m-1]`
/// where category columns are relative purchase frequencies and the
/// category vocabulary is computed once over the full dataset. Rows are
/// ordered by consumer id; `consumer_ids[i]` names row `i`.
#[derive(Debug)]
pub struct FeatureMatrix {
    /// Standardized features, one row per unique consumer.
    pub features: Array2<f64>,
    /// Pre-scaling feature values.
    pub raw_features: Array2<f64>,
    pub consumer_ids: Vec<String>,
    /// Row-aligned consumer profiles.
    pub profiles: Vec<ConsumerProfile>,
    /// Category encoding schema: ordered category vocabulary.
    pub categories: Vec<String>,
    pub feature_names: Vec<String>,
    /// Fitted scaling parameters.
    pub scaler: StandardScaler,
}

impl FeatureMatrix {
    pub fn n_consumers(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Row index of a consumer id, if present. Rows are sorted by id.
    pub fn row_of(&self, consumer_id: &str) -> Option<usize> {
        self.consumer_ids
            .binary_search_by(|id| id.as_str().cmp(consumer_id))
            .ok()
    }
}

/// Build the feature matrix from raw purchase records.
///
/// Groups records by consumer id, aggregates one [`ConsumerProfile`] per
/// consumer, encodes category preference against the dataset-wide
/// vocabulary, and standardizes the resulting matrix. Any malformed record
/// aborts the whole run: partial profiles would corrupt every downstream
/// score.
pub fn build_features(records: &[PurchaseRecord]) -> Result<FeatureMatrix> {
    if records.is_empty() {
        return Err(Error::Data("no purchase records".to_string()));
    }
    validate(records)?;

    // Encoding schema: computed once over the full dataset so every
    // consumer's vector is comparable.
    let categories: Vec<String> = records
        .iter()
        .map(|r| r.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    // BTreeMap keeps row order deterministic (sorted by consumer id).
    let mut by_consumer: BTreeMap<&str, Vec<&PurchaseRecord>> = BTreeMap::new();
    for record in records {
        by_consumer
            .entry(record.consumer_id.as_str())
            .or_default()
            .push(record);
    }

    let n = by_consumer.len();
    let mut profiles = Vec::with_capacity(n);
    let mut consumer_ids = Vec::with_capacity(n);

    for (consumer_id, purchases) in &by_consumer {
        let count = purchases.len();
        let total_spend: f64 = purchases.iter().map(|r| r.price).sum();
        let mean_price = total_spend / count as f64;
        let mean_discount =
            purchases.iter().map(|r| r.discount).sum::<f64>() / count as f64;

        let mut category_counts: BTreeMap<String, usize> = BTreeMap::new();
        for record in purchases {
            *category_counts.entry(record.category.clone()).or_default() += 1;
        }

        consumer_ids.push(consumer_id.to_string());
        profiles.push(ConsumerProfile {
            consumer_id: consumer_id.to_string(),
            purchase_count: count,
            mean_price,
            mean_discount,
            total_spend,
            category_counts,
        });
    }

    let n_cols = 2 + categories.len();
    let mut raw = Array2::zeros((n, n_cols));
    for (i, profile) in profiles.iter().enumerate() {
        raw[[i, 0]] = profile.mean_price;
        raw[[i, 1]] = profile.mean_discount;
        for (j, category) in categories.iter().enumerate() {
            let count = profile.category_counts.get(category).copied().unwrap_or(0);
            raw[[i, 2 + j]] = count as f64 / profile.purchase_count as f64;
        }
    }

    let scaler = StandardScaler::fit(&raw);
    let features = scaler.transform(&raw);

    let mut feature_names = vec!["mean_price".to_string(), "mean_discount".to_string()];
    feature_names.extend(categories.iter().map(|c| format!("cat:{c}")));

    Ok(FeatureMatrix {
        features,
        raw_features: raw,
        consumer_ids,
        profiles,
        categories,
        feature_names,
        scaler,
    })
}

fn validate(records: &[PurchaseRecord]) -> Result<()> {
    for (i, record) in records.iter().enumerate() {
        if record.consumer_id.is_empty() {
            return Err(Error::Data(format!("record {i}: empty consumer id")));
        }
        if record.category.is_empty() {
            return Err(Error::Data(format!("record {i}: empty category")));
        }
        if !record.price.is_finite() || record.price <= 0.0 {
            return Err(Error::Data(format!(
                "record {i}: price {} is not a positive number",
                record.price
            )));
        }
        if !record.discount.is_finite() || record.discount < 0.0 {
            return Err(Error::Data(format!(
                "record {i}: discount {} is negative or not a number",
                record.discount
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(consumer_id: &str, price: f64, discount: f64, category: &str) -> PurchaseRecord {
        PurchaseRecord {
            consumer_id: consumer_id.to_string(),
            price,
            discount,
            category: category.to_string(),
        }
    }

    fn sample_records() -> Vec<PurchaseRecord> {
        vec![
            record("u2", 100.0, 10.0, "Electronics"),
            record("u1", 10.0, 50.0, "Home"),
            record("u1", 30.0, 30.0, "Electronics"),
            record("u3", 500.0, 0.0, "Electronics"),
        ]
    }

    #[test]
    fn test_build_features_shape_and_order() {
        let matrix = build_features(&sample_records()).unwrap();

        // Rows sorted by consumer id, columns = 2 numeric + 2 categories.
        assert_eq!(matrix.consumer_ids, vec!["u1", "u2", "u3"]);
        assert_eq!(matrix.features.shape(), &[3, 4]);
        assert_eq!(matrix.categories, vec!["Electronics", "Home"]);
        assert_eq!(
            matrix.feature_names,
            vec!["mean_price", "mean_discount", "cat:Electronics", "cat:Home"]
        );
        assert_eq!(matrix.row_of("u2"), Some(1));
        assert_eq!(matrix.row_of("u9"), None);
    }

    #[test]
    fn test_profile_aggregates() {
        let matrix = build_features(&sample_records()).unwrap();
        let u1 = &matrix.profiles[0];

        assert_eq!(u1.purchase_count, 2);
        assert!((u1.mean_price - 20.0).abs() < 1e-12);
        assert!((u1.mean_discount - 40.0).abs() < 1e-12);
        assert!((u1.total_spend - 40.0).abs() < 1e-12);
        assert_eq!(u1.category_counts.get("Electronics"), Some(&1));
        assert_eq!(u1.category_counts.get("Home"), Some(&1));

        // Category frequency columns are relative to the purchase count.
        assert!((matrix.raw_features[[0, 2]] - 0.5).abs() < 1e-12);
        assert!((matrix.raw_features[[0, 3]] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_standardization() {
        let matrix = build_features(&sample_records()).unwrap();

        // Standardized columns have ~zero mean and unit variance.
        for j in 0..matrix.n_features() {
            let col = matrix.features.column(j);
            let mean = col.mean().unwrap();
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / col.len() as f64;
            assert!(mean.abs() < 1e-9, "column {j} mean {mean}");
            assert!((var - 1.0).abs() < 1e-9 || var.abs() < 1e-9, "column {j} var {var}");
        }
    }

    #[test]
    fn test_zero_variance_column_kept() {
        // Every consumer buys only Electronics: the category column has zero
        // variance but must stay in the layout with scale 1.0.
        let records = vec![
            record("u1", 10.0, 5.0, "Electronics"),
            record("u2", 20.0, 15.0, "Electronics"),
        ];
        let matrix = build_features(&records).unwrap();

        assert_eq!(matrix.features.shape(), &[2, 3]);
        assert!((matrix.scaler.scales[2] - 1.0).abs() < 1e-12);
        assert!(matrix.features.column(2).iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(matches!(build_features(&[]), Err(Error::Data(_))));
    }

    #[test]
    fn test_malformed_record_aborts() {
        let mut records = sample_records();
        records.push(record("", 10.0, 0.0, "Home"));
        assert!(matches!(build_features(&records), Err(Error::Data(_))));

        let mut records = sample_records();
        records.push(record("u4", -5.0, 0.0, "Home"));
        assert!(matches!(build_features(&records), Err(Error::Data(_))));

        let mut records = sample_records();
        records.push(record("u4", 10.0, f64::NAN, "Home"));
        assert!(matches!(build_features(&records), Err(Error::Data(_))));
    }

    #[test]
    fn test_scaler_roundtrip() {
        let raw = Array2::from_shape_vec((3, 2), vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0]).unwrap();
        let scaler = StandardScaler::fit(&raw);
        let scaled = scaler.transform(&raw);

        // Middle row sits on the mean.
        assert!(scaled[[1, 0]].abs() < 1e-12);
        assert!(scaled[[1, 1]].abs() < 1e-12);
        assert!(scaled[[0, 0]] < 0.0 && scaled[[2, 0]] > 0.0);
    }
}
