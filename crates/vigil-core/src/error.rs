use thiserror::Error;

/// Trail store failures. A lost audit entry is a correctness violation, so
/// these always propagate to the caller.
#[derive(Debug, Error)]
pub enum TrailError {
    #[error("trail entry not found: {0}")]
    NotFound(String),

    #[error("invalid trail filter: {0}")]
    InvalidFilter(String),

    #[error("trail storage error: {0}")]
    Storage(#[source] anyhow::Error),
}

impl TrailError {
    pub fn storage(err: impl Into<anyhow::Error>) -> Self {
        TrailError::Storage(err.into())
    }
}

/// Pipeline-level failures. A gate rejecting an artifact is NOT an error —
/// that is a normal negative result carried in the `GateResult`.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Fatal before any gate runs (e.g. threshold outside [0, 100]).
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown gate: {0}")]
    UnknownGate(String),

    /// A gate blew up internally. The orchestrator logs this to the trail
    /// and re-raises; callers always see the failure.
    #[error("gate '{gate}' failed internally: {message}")]
    GateInternal { gate: String, message: String },

    #[error(transparent)]
    Trail(#[from] TrailError),
}
