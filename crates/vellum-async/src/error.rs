//! Error type for the async façade: every synchronous [`vellum_core::Error`]
//! plus failures specific to dispatching onto a background worker.

/// Errors raised by the async façade.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The wrapped synchronous engine reported an error.
    #[error(transparent)]
    Core(#[from] vellum_core::Error),

    /// The `spawn_blocking` task panicked or was cancelled by the runtime.
    #[error("background worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type for the async façade.
pub type Result<T> = std::result::Result<T, Error>;
