use thiserror::Error;

/// Why a retrieval produced no usable series. Every variant aborts the field
/// for the current pass.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {status}")]
    Status { status: u16 },
    #[error("malformed body: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("pipeline panicked: {0}")]
    Panicked(String),
}
