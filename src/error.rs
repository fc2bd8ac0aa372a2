use thiserror::Error;

/// Errors surfaced by the fetch layer and the pipeline.
///
/// Per-listing extraction problems are not errors: a detail page missing a
/// field simply yields `None` for that field. Only transport-level failures
/// and configuration mistakes travel through this type.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid header in credentials file: {0:?}")]
    Header(String),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
