// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the WMex query executor.
//!
//! All fallible operations in this crate return [`Result<T>`], an alias for
//! `std::result::Result<T, QueryError>`. Application failures (the server
//! reported `errors`) and structural failures (the reply did not have the
//! expected shape) are distinct variants, but both expose a numeric status and
//! a diagnostic payload through [`QueryError::status`] and
//! [`QueryError::diagnostics`].

use serde_json::Value;
use thiserror::Error;
use wmex_node::BinaryNode;

use crate::transport::TransportError;

/// Status used when the server gives no usable error code.
pub const DEFAULT_ERROR_STATUS: u16 = 400;

/// Error type for WMex query operations.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The server returned a non-empty `errors` list.
    #[error("GraphQL server error: {message}")]
    Server {
        /// Taken from the first error's `extensions.error_code`.
        status: u16,
        /// All error messages joined with `", "`.
        message: String,
        /// The raw first error object.
        data: Value,
    },

    /// The reply had no payload, or the requested data field was absent.
    #[error("Failed to {action}, unexpected response structure.")]
    UnexpectedStructure {
        /// Always [`DEFAULT_ERROR_STATUS`] unless configured otherwise.
        status: u16,
        /// Human-readable action derived from the data path.
        action: String,
        /// The raw reply node.
        node: Box<BinaryNode>,
    },

    /// The transport failed to deliver the query or its reply.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Encoding the variables or decoding the reply payload failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QueryError {
    /// Numeric status carried by every failure kind.
    pub fn status(&self) -> u16 {
        match self {
            QueryError::Server { status, .. } => *status,
            QueryError::UnexpectedStructure { status, .. } => *status,
            QueryError::Transport(err) => err.status(),
            QueryError::Serialization(_) => DEFAULT_ERROR_STATUS,
        }
    }

    /// Diagnostic payload: the first server error object, or the raw reply
    /// node rendered as JSON.
    pub fn diagnostics(&self) -> Value {
        match self {
            QueryError::Server { data, .. } => data.clone(),
            QueryError::UnexpectedStructure { node, .. } => {
                serde_json::to_value(node.as_ref()).unwrap_or(Value::Null)
            }
            QueryError::Transport(_) | QueryError::Serialization(_) => Value::Null,
        }
    }

    /// Whether this is a server-reported application failure.
    pub fn is_server_error(&self) -> bool {
        matches!(self, QueryError::Server { .. })
    }
}

/// Crate-level result alias using [`QueryError`].
pub type Result<T> = std::result::Result<T, QueryError>;
