use thiserror::Error;

/// Reasons a single query attempt is rejected. None of them produce partial results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// The query text produced no tokens.
    #[error("'{0}' is not a valid query")]
    InvalidQuery(String),

    #[error("invalid {name} value {value}: {reason}")]
    InvalidRankingParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// The ranking mode cannot be applied to this query/index combination.
    #[error("incompatible ranking request: {0}")]
    IncompatibleRankingRequest(String),
}

impl QueryError {
    pub fn incompatible(msg: impl Into<String>) -> Self {
        QueryError::IncompatibleRankingRequest(msg.into())
    }
}
