//! Segmetric: consumer segmentation CLI comparing K-Means and DBSCAN
//!
//! This is the main entrypoint that orchestrates data loading, feature
//! building, the two optimizer searches, profile aggregation and the
//! console report.

use std::fmt::Display;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use segmetric::{
    aggregate, build_features, load_purchases, optimize_dbscan, optimize_kmeans, viz, Args,
    CandidateResult, ClusterProfile,
};

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = args.to_config()?;

    if args.verbose {
        println!("Segmetric - Consumer Segmentation with K-Means and DBSCAN");
        println!("=========================================================\n");
    }

    let start_time = Instant::now();

    // Step 1: Load purchase records
    if args.verbose {
        println!("Step 1: Loading purchases");
        println!("  Input file: {}", args.input);
    }
    let load_start = Instant::now();
    let records = load_purchases(&args.input)?;
    println!("✓ Purchases loaded: {}", records.len());
    if args.verbose {
        println!("  Loading time: {:.2}s", load_start.elapsed().as_secs_f64());
    }

    // Step 2: Build consumer features
    if args.verbose {
        println!("\nStep 2: Building consumer features");
    }
    let matrix = build_features(&records)?;
    println!(
        "✓ Consumer profiles: {} ({} features, {} categories)",
        matrix.n_consumers(),
        matrix.n_features(),
        matrix.categories.len()
    );

    // Step 3: Run both optimizer branches. The branches are independent:
    // one failed search must not abort the other.
    if args.verbose {
        println!("\nStep 3: Searching clustering configurations");
    }
    let kmeans_start = Instant::now();
    let kmeans = optimize_kmeans(&matrix.features, &config);
    let kmeans_time = kmeans_start.elapsed();
    let dbscan_start = Instant::now();
    let dbscan = optimize_dbscan(&matrix.features, &config);
    let dbscan_time = dbscan_start.elapsed();

    if let Err(e) = &kmeans {
        eprintln!("✗ K-Means search failed: {e}");
    }
    if let Err(e) = &dbscan {
        eprintln!("✗ DBSCAN search failed: {e}");
    }
    if kmeans.is_err() && dbscan.is_err() {
        anyhow::bail!("both clustering searches failed");
    }

    // Step 4: Aggregate and report each surviving branch
    if let Ok(winner) = &kmeans {
        let profiles = aggregate(&winner.assignment, &matrix, config.top_n);
        if args.verbose {
            println!("  K-Means search time: {:.2}s", kmeans_time.as_secs_f64());
        }
        report_branch("K-Means", winner, &profiles, args.verbose);
    }
    if let Ok(winner) = &dbscan {
        let profiles = aggregate(&winner.assignment, &matrix, config.top_n);
        if args.verbose {
            println!("  DBSCAN search time: {:.2}s", dbscan_time.as_secs_f64());
        }
        report_branch("DBSCAN", winner, &profiles, args.verbose);
    }

    // Step 5: Charts, when requested
    if let Some(base) = &args.plot {
        if let Ok(winner) = &kmeans {
            viz::render_cluster_charts(&matrix, &winner.assignment, "kmeans", base)?;
        }
        if let Ok(winner) = &dbscan {
            viz::render_cluster_charts(&matrix, &winner.assignment, "dbscan", base)?;
        }
    }

    println!("\n=== Analysis Complete ===");
    println!(
        "Total processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Print one algorithm's winning configuration, scores and cluster table.
fn report_branch<P: Display>(
    name: &str,
    winner: &CandidateResult<P>,
    profiles: &[ClusterProfile],
    verbose: bool,
) {
    println!("\n=== {name} ===");
    println!("Selected configuration: {}", winner.params);
    println!("Clusters: {}", winner.report.n_clusters);
    println!("Silhouette score: {}", fmt_score(winner.report.silhouette));
    println!(
        "Davies-Bouldin index: {}",
        fmt_score(winner.report.davies_bouldin)
    );
    println!(
        "Calinski-Harabasz index: {}",
        fmt_score(winner.report.calinski_harabasz)
    );
    if let Some(noise_rate) = winner.report.noise_rate {
        println!("Noise rate: {:.1}%", noise_rate * 100.0);
    }

    let total: usize = profiles.iter().map(|p| p.member_count).sum();
    println!("\n  Cluster | Members | Avg Price | Avg Discount | Total Spend");
    println!("  --------|---------|-----------|--------------|------------");
    for profile in profiles {
        let label = if profile.is_noise() {
            "noise".to_string()
        } else {
            profile.label.to_string()
        };
        let share = profile.member_count as f64 / total as f64 * 100.0;
        println!(
            "  {:>7} | {:>3} ({:>4.1}%) | {:>9.2} | {:>11.1}% | {:>11.2}",
            label, profile.member_count, share, profile.mean_price, profile.mean_discount,
            profile.total_spend
        );
    }

    if verbose {
        for profile in profiles {
            let label = if profile.is_noise() {
                "noise".to_string()
            } else {
                format!("cluster {}", profile.label)
            };
            println!(
                "\n  Top {} members of {label} (by avg price):",
                profile.top_members.len()
            );
            for member in &profile.top_members {
                println!(
                    "    {:<12} purchases={:<3} avg_price={:<10.2} avg_discount={:<5.1}% total={:.2}",
                    member.consumer_id,
                    member.purchase_count,
                    member.mean_price,
                    member.mean_discount,
                    member.total_spend
                );
            }
        }
    }
}

fn fmt_score(score: Option<f64>) -> String {
    match score {
        Some(v) => format!("{v:.3}"),
        None => "undefined".to_string(),
    }
}
