// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for newsletter operations.

use thiserror::Error;
use wmex_query::QueryError;

/// Failure reported by a [`MessageDecryptor`](crate::updates::MessageDecryptor).
#[derive(Error, Debug)]
pub enum DecryptError {
    #[error("No session for {0}")]
    MissingSession(String),

    #[error("Decryption failed: {0}")]
    Failed(String),
}

/// Newsletter errors
#[derive(Error, Debug)]
pub enum NewsletterError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to decrypt message {server_id}: {source}")]
    Decrypt {
        server_id: String,
        #[source]
        source: DecryptError,
    },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl NewsletterError {
    /// Numeric status, delegating to the query layer where it applies
    pub fn status(&self) -> u16 {
        match self {
            NewsletterError::Query(err) => err.status(),
            NewsletterError::Decrypt { .. } => 500,
            NewsletterError::Serialization(_) | NewsletterError::Validation(_) => {
                wmex_query::DEFAULT_ERROR_STATUS
            }
        }
    }
}

/// Crate-level result alias using [`NewsletterError`].
pub type Result<T> = std::result::Result<T, NewsletterError>;
