//! Integration tests for Segmetric

use std::io::Write;

use segmetric::{
    aggregate, build_features, load_purchases, optimize_dbscan, optimize_kmeans,
    AnalysisConfig, Error, NOISE,
};
use tempfile::NamedTempFile;

/// Two tight price groups plus one extreme outlier, with the kind of dirty
/// values a real export carries.
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "product_id,user_id,discounted_price,discount_percentage,category"
    )
    .unwrap();

    // Group A: cheap electronics, heavy discounts
    writeln!(file, "P1,a1,\"₹10\",50%,Electronics|Audio").unwrap();
    writeln!(file, "P2,a2,10.00,50%,Electronics|Video").unwrap();
    writeln!(file, "P3,a3,10,50%,Electronics|Gadgets").unwrap();

    // Group B: mid-range home goods, small discounts
    writeln!(file, "P4,b1,\"₹100\",5%,Home|Kitchen").unwrap();
    writeln!(file, "P5,b2,100,5%,Home|Decor").unwrap();

    // Outlier: one luxury purchase far above everyone else
    writeln!(file, "P6,z9,\"₹10,000\",90%,Luxury|Watches").unwrap();

    file
}

fn test_config() -> AnalysisConfig {
    AnalysisConfig {
        k_range: 2..=5,
        min_samples_range: 2..=3,
        ..Default::default()
    }
}

#[test]
fn test_end_to_end_pipeline() {
    let file = create_test_csv();
    let records = load_purchases(file.path().to_str().unwrap()).unwrap();
    assert_eq!(records.len(), 6);

    let matrix = build_features(&records).unwrap();
    // 6 consumers, 2 numeric features + 3 categories.
    assert_eq!(matrix.features.shape(), &[6, 5]);
    assert_eq!(
        matrix.consumer_ids,
        vec!["a1", "a2", "a3", "b1", "b2", "z9"]
    );
    // Dirty values cleaned: the outlier's formatted price parses fully.
    let z9 = &matrix.profiles[5];
    assert!((z9.mean_price - 10_000.0).abs() < 1e-9);
    assert!((z9.mean_discount - 90.0).abs() < 1e-9);

    let config = test_config();

    // Centroid branch: two real groups, outlier may take its own centroid.
    let kmeans = optimize_kmeans(&matrix.features, &config).unwrap();
    assert!(
        [2, 3].contains(&kmeans.params.k),
        "selected k = {}",
        kmeans.params.k
    );
    assert!(kmeans.report.silhouette.unwrap() > 0.5);
    assert!(kmeans.assignment.labels.iter().all(|&l| l != NOISE));

    // Density branch: the outlier must end up as noise.
    let dbscan = optimize_dbscan(&matrix.features, &config).unwrap();
    assert_eq!(dbscan.report.n_clusters, 2);
    assert_eq!(dbscan.assignment.labels[matrix.row_of("z9").unwrap()], NOISE);
    assert!((dbscan.report.noise_rate.unwrap() - 1.0 / 6.0).abs() < 1e-12);

    // Aggregation: every consumer accounted for, noise presented last.
    for winner in [&kmeans.assignment, &dbscan.assignment] {
        let profiles = aggregate(winner, &matrix, config.top_n);
        let total: usize = profiles.iter().map(|p| p.member_count).sum();
        assert_eq!(total, 6);
        for profile in &profiles {
            assert!(profile.top_members.len() <= config.top_n);
            for pair in profile.top_members.windows(2) {
                assert!(pair[0].mean_price >= pair[1].mean_price);
            }
        }
        for pair in profiles.windows(2) {
            if !pair[0].is_noise() && !pair[1].is_noise() {
                assert!(pair[0].member_count >= pair[1].member_count);
            }
        }
        if let Some(last) = profiles.last() {
            assert!(profiles.iter().all(|p| !p.is_noise()) || last.is_noise());
        }
    }

    // The two tight groups land in distinct DBSCAN clusters.
    let labels = &dbscan.assignment.labels;
    assert_eq!(labels[0], labels[1]);
    assert_eq!(labels[0], labels[2]);
    assert_eq!(labels[3], labels[4]);
    assert_ne!(labels[0], labels[3]);
}

#[test]
fn test_fixed_seed_idempotence() {
    let file = create_test_csv();
    let path = file.path().to_str().unwrap();
    let config = test_config();

    let run = || {
        let records = load_purchases(path).unwrap();
        let matrix = build_features(&records).unwrap();
        let kmeans = optimize_kmeans(&matrix.features, &config).unwrap();
        let dbscan = optimize_dbscan(&matrix.features, &config).unwrap();
        let kmeans_profiles = aggregate(&kmeans.assignment, &matrix, config.top_n);
        let dbscan_profiles = aggregate(&dbscan.assignment, &matrix, config.top_n);
        (kmeans, dbscan, kmeans_profiles, dbscan_profiles)
    };

    let (kmeans_a, dbscan_a, kprof_a, dprof_a) = run();
    let (kmeans_b, dbscan_b, kprof_b, dprof_b) = run();

    assert_eq!(kmeans_a.params, kmeans_b.params);
    assert_eq!(kmeans_a.assignment, kmeans_b.assignment);
    assert_eq!(kmeans_a.report, kmeans_b.report);
    assert_eq!(dbscan_a.params, dbscan_b.params);
    assert_eq!(dbscan_a.assignment, dbscan_b.assignment);
    assert_eq!(dbscan_a.report, dbscan_b.report);
    assert_eq!(kprof_a, kprof_b);
    assert_eq!(dprof_a, dprof_b);
}

#[test]
fn test_density_branch_failure_leaves_centroid_branch_intact() {
    let file = create_test_csv();
    let records = load_purchases(file.path().to_str().unwrap()).unwrap();
    let matrix = build_features(&records).unwrap();

    // min_samples beyond the largest group: no cell can form two clusters.
    let config = AnalysisConfig {
        k_range: 2..=5,
        min_samples_range: 4..=6,
        ..Default::default()
    };

    let dbscan = optimize_dbscan(&matrix.features, &config);
    assert!(matches!(dbscan, Err(Error::Optimization(_))));

    // The centroid branch is unaffected.
    let kmeans = optimize_kmeans(&matrix.features, &config).unwrap();
    assert!(kmeans.report.silhouette.unwrap() > 0.5);
}

#[test]
fn test_malformed_row_aborts_run() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "product_id,user_id,discounted_price,discount_percentage,category"
    )
    .unwrap();
    writeln!(file, "P1,u1,\"₹10\",50%,Electronics").unwrap();
    writeln!(file, "P2,u2,free,10%,Electronics").unwrap();

    let result = load_purchases(file.path().to_str().unwrap());
    assert!(matches!(result, Err(Error::Data(_))));
}
