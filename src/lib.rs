//! Segmetric: behavioral consumer segmentation from purchase records
//!
//! This library turns raw purchase records into per-consumer feature
//! profiles, searches for the best configuration of two clustering
//! strategies (a K-Means cluster-count sweep and a DBSCAN radius x
//! min-samples grid), scores every candidate with silhouette,
//! Davies-Bouldin and Calinski-Harabasz, and aggregates the winning
//! labelings into stable, ordered per-cluster summaries.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod metrics;
pub mod model;
pub mod optimize;
pub mod profile;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use config::AnalysisConfig;
pub use data::{load_purchases, PurchaseRecord};
pub use error::{Error, Result};
pub use features::{build_features, ConsumerProfile, FeatureMatrix, StandardScaler};
pub use metrics::{evaluate, evaluate_with_noise, QualityReport};
pub use model::{fit_dbscan, fit_kmeans, ClusterAssignment, NOISE};
pub use optimize::{
    optimize_dbscan, optimize_kmeans, CandidateResult, DbscanParams, KmeansParams,
};
pub use profile::{aggregate, ClusterProfile, MemberSummary};
