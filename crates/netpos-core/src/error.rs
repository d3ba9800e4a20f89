//! Error types for the resolution layer
//!
//! This module defines all error types used throughout the crate.

use std::time::Duration;
use thiserror::Error;

use crate::kind::ResourceKind;

/// Result type alias for netpos operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the resolution layer
#[derive(Error, Debug)]
pub enum Error {
    /// One provider's attempt failed (transport, timeout, parse or validation)
    ///
    /// Only ever logged and used to advance the fallback chain.
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Every provider in a fallback chain failed
    #[error("all providers failed for {kind} ({attempted} attempted)")]
    AllProvidersExhausted {
        /// Resource kind that could not be resolved
        kind: ResourceKind,
        /// Number of providers that were attempted
        attempted: usize,
    },

    /// A caller-supplied parameter was rejected before any network call
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// All-or-nothing aggregation failed on one kind
    #[error("aggregate resolution failed on {kind}: {source}")]
    AggregateFailed {
        /// The kind whose failure aborted the aggregate
        kind: ResourceKind,
        /// The underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// An attempt exceeded its time budget
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Local interface enumeration errors
    #[error("Interface enumeration error: {0}")]
    Interfaces(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an exhaustion error for a kind
    pub fn exhausted(kind: ResourceKind, attempted: usize) -> Self {
        Self::AllProvidersExhausted { kind, attempted }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Wrap a kind failure for all-or-nothing aggregation
    pub fn aggregate(kind: ResourceKind, source: Error) -> Self {
        Self::AggregateFailed {
            kind,
            source: Box::new(source),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an interface enumeration error
    pub fn interfaces(msg: impl Into<String>) -> Self {
        Self::Interfaces(msg.into())
    }

    /// Whether this error is terminal for a kind (as opposed to a single
    /// provider attempt)
    pub fn is_exhaustion(&self) -> bool {
        matches!(self, Self::AllProvidersExhausted { .. })
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
