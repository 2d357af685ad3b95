use thiserror::Error;

/// Errors surfaced by the segmentation pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or empty input data. Aborts the run before any fitting.
    #[error("invalid input data: {0}")]
    Data(String),

    /// Invalid search or pipeline parameters, rejected before any computation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// No viable candidate found within an optimizer's search space.
    /// Fatal for that algorithm's branch only.
    #[error("optimization failed: {0}")]
    Optimization(String),

    /// A single candidate fit failed. The optimizers log these and drop the
    /// candidate; this variant never escapes a search.
    #[error("candidate fit failed: {0}")]
    Fit(String),

    /// Chart rendering failed.
    #[error("chart rendering failed: {0}")]
    Render(String),
}

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;
