//! Error types for graph building and backend queries

use thiserror::Error;

/// A raw sample that cannot be turned into a `MetricSample`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    /// A required label was absent from the sample.
    #[error("missing required label '{0}'")]
    MissingLabel(&'static str),

    /// The `response_code` label is not an HTTP status code.
    #[error("invalid response code '{0}'")]
    InvalidResponseCode(String),

    /// The sample value is not a non-negative integer.
    #[error("invalid sample value '{0}'")]
    InvalidValue(String),
}

/// Errors that can occur when querying the metrics backend.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The backend did not answer within the configured timeout.
    #[error("query timed out")]
    Timeout,

    /// The backend could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The backend answered with a non-success status or the request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The response body is not a Prometheus query result.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The backend endpoint could not be built.
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Connection(err.to_string())
        } else if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else {
            FetchError::Http(err.to_string())
        }
    }
}

/// Errors surfaced while producing a traffic graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("malformed sample at index {index}: {source}")]
    Sample {
        index: usize,
        #[source]
        source: SampleError,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

pub type GraphResult<T> = Result<T, GraphError>;
