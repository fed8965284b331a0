//! Error types for the market data collector

use thiserror::Error;

/// Errors raised while talking to the upstream market-data API
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network request failed (connect, timeout, TLS, ...)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream answered with a non-2xx HTTP status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Upstream envelope carried a non-zero error code (even on HTTP 200)
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// Response body did not match the expected envelope shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors raised while normalizing raw payloads
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The top-level envelope is missing its `data` payload
    #[error("Malformed envelope: missing `data` key")]
    MissingData,
}

/// Errors raised while reading from or writing to the persistent store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network request to the store failed
    #[error("Store network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Store rejected the request
    #[error("Store rejected request (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    /// Store response could not be decoded
    #[error("Invalid store response: {0}")]
    InvalidResponse(String),
}

/// Errors raised while resolving the set of coin ids to fetch this tick
#[derive(Debug, Error)]
pub enum SourceError {
    /// Registry read failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Listings fetch failed
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Fatal configuration errors detected at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required environment variables are unset
    #[error("Missing environment variables: {}", .0.join(", "))]
    MissingVars(Vec<String>),

    /// A setting is present but unusable
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

/// Errors raised by the narrative report generator
#[derive(Debug, Error)]
pub enum ReportError {
    /// Network request to the AI service failed
    #[error("Report service network error: {0}")]
    Network(#[from] reqwest::Error),

    /// AI service answered with a non-2xx HTTP status
    #[error("Report service HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The reply did not contain a parseable report
    #[error("Invalid report payload: {0}")]
    InvalidPayload(String),
}
