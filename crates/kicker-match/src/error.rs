use thiserror::Error;

/// Failures surfaced by [`MatchController`](crate::MatchController).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MatchError {
    /// The operation needs an open match and none exists.
    #[error("no active match")]
    NoActiveMatch,

    /// Malformed or empty input to a lifecycle operation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The sensor log or the record store could not be reached.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// A store write failed; in-memory state was left unchanged.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
}

impl MatchError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            MatchError::NoActiveMatch => "NO_ACTIVE_MATCH",
            MatchError::InvalidRequest(_) => "INVALID_REQUEST",
            MatchError::SourceUnavailable(_) => "SOURCE_UNAVAILABLE",
            MatchError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
        }
    }
}
