//! The `error` module defines the error type used across `subgate`.
//!
//! Every failure is local to the session or request that produced it. None of
//! these variants is fatal to the process: the server keeps accepting
//! connections and publish requests regardless of what one session hits.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The authorizer refused a connect, subscribe or unsubscribe.
    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),

    /// The broker could not allocate a subscriber.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Reading from or writing to an open connection failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// A client command or publish body could not be understood.
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::MalformedInput(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
