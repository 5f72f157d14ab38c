// SPDX-License-Identifier: PMPL-1.0-or-later

//! Transport contract consumed by the executor.
//!
//! Framing, correlation of a request with its reply, and transport-level
//! timeouts all live behind [`NodeTransport`]. The executor only sends one
//! node and awaits one reply.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;
use wmex_node::BinaryNode;

/// Failures surfaced by a [`NodeTransport`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Timed out after {0}ms")]
    Timeout(u64),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Transport failure: {0}")]
    Other(String),
}

impl TransportError {
    /// HTTP-style status for uniform error reporting
    pub fn status(&self) -> u16 {
        match self {
            TransportError::Timeout(_) => 408,
            TransportError::ConnectionClosed => 428,
            TransportError::Other(_) => 500,
        }
    }
}

/// Asynchronous binary-node transport.
///
/// Implementations guarantee at most one reply per correlation id.
#[async_trait]
pub trait NodeTransport: Send + Sync {
    /// Send a node and await its correlated reply
    async fn query(&self, node: BinaryNode) -> Result<BinaryNode, TransportError>;

    /// Produce a fresh correlation id
    fn generate_message_tag(&self) -> String;
}

/// Correlation tag source: a random `"<a>.<b>-"` prefix followed by a
/// monotonically increasing counter.
#[derive(Debug)]
pub struct MessageTagGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl MessageTagGenerator {
    /// Create a generator with a random prefix
    pub fn new() -> Self {
        let bytes = Uuid::new_v4().into_bytes();
        let a = u16::from_be_bytes([bytes[0], bytes[1]]);
        let b = u16::from_be_bytes([bytes[2], bytes[3]]);
        Self::with_prefix(format!("{a}.{b}-"))
    }

    /// Create a generator with a fixed prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Next tag; unique for the lifetime of this generator
    pub fn next_tag(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, n)
    }
}

impl Default for MessageTagGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Random outgoing message id (`3EB0` followed by 18 upper-case hex digits).
pub fn generate_message_id() -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("3EB0{}", &hex[..18])
}
