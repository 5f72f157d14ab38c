// SPDX-License-Identifier: PMPL-1.0-or-later
//! WMex Query
//!
//! Request/response query layer over an asynchronous binary-node transport.
//! A query id plus JSON variables is wrapped in an `iq` envelope, sent through
//! a [`NodeTransport`], and the reply's embedded JSON payload is decoded into
//! either the requested data field or a classified [`QueryError`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use wmex_query::{NodeTransport, QueryExecutor};
//!
//! # async fn run(transport: Arc<dyn NodeTransport>) -> wmex_query::Result<()> {
//! let executor = QueryExecutor::new(transport);
//! let result = executor
//!     .execute_query(&json!({"newsletter_id": "123@newsletter"}), "7871414976211147", Some("xwa2_newsletter_follow"))
//!     .await?;
//! println!("{result}");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod executor;
pub mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{QueryError, Result, DEFAULT_ERROR_STATUS};
pub use executor::{decode_result, describe_action, QueryConfig, QueryExecutor};
pub use transport::{generate_message_id, MessageTagGenerator, NodeTransport, TransportError};
