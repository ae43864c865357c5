//! Error types for the BRKGA-MP-IPR engine.

use thiserror::Error;

/// Result type alias using [`BrkgaError`].
pub type Result<T> = std::result::Result<T, BrkgaError>;

/// Errors reported by the engine.
///
/// Stagnation and timeouts are not errors: they are normal run outcomes
/// reported through [`crate::AlgorithmStatus::state`].
#[derive(Debug, Error)]
pub enum BrkgaError {
    /// Invalid parameter combination, detected before the run starts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The decoder failed on a chromosome. The run is aborted.
    #[error("Decoder error: {source}")]
    Decoder {
        #[source]
        source: anyhow::Error,
    },

    /// A caller-supplied argument is out of range for this engine.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The decode worker pool could not be created.
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl BrkgaError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        BrkgaError::Configuration(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        BrkgaError::InvalidArgument(msg.into())
    }
}

impl From<anyhow::Error> for BrkgaError {
    fn from(source: anyhow::Error) -> Self {
        BrkgaError::Decoder { source }
    }
}
