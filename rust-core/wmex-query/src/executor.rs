// SPDX-License-Identifier: PMPL-1.0-or-later

//! WMex query execution.
//!
//! A query is sent as
//!
//! ```text
//! iq { id, type: "get", to: "s.whatsapp.net", xmlns: "w:mex" }
//!   query { query_id }  <- UTF-8 JSON bytes of {"variables": ...}
//! ```
//!
//! and answered by an `iq` whose `result` child carries a JSON document with
//! optional `errors` and `data` members.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use wmex_node::{BinaryNode, S_WHATSAPP_NET};

use crate::error::{QueryError, Result, DEFAULT_ERROR_STATUS};
use crate::transport::NodeTransport;

/// Prefix stripped from data paths when describing a failed action.
const DATA_PATH_PREFIX: &str = "xwa2_";

/// Executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// `to` attribute of the envelope
    pub server: String,
    /// `xmlns` attribute of the envelope
    pub namespace: String,
    /// Status used when the server gives no error code
    pub default_status: u16,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            server: S_WHATSAPP_NET.to_string(),
            namespace: "w:mex".to_string(),
            default_status: DEFAULT_ERROR_STATUS,
        }
    }
}

#[derive(Serialize)]
struct QueryBody<'a, V: ?Sized> {
    variables: &'a V,
}

/// Sends WMex queries through a [`NodeTransport`] and classifies replies.
pub struct QueryExecutor<T: ?Sized> {
    transport: Arc<T>,
    config: QueryConfig,
}

impl<T: NodeTransport + ?Sized> QueryExecutor<T> {
    /// Create an executor with the default configuration
    pub fn new(transport: Arc<T>) -> Self {
        Self::with_config(transport, QueryConfig::default())
    }

    /// Create an executor with a custom configuration
    pub fn with_config(transport: Arc<T>, config: QueryConfig) -> Self {
        Self { transport, config }
    }

    /// The underlying transport
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// The active configuration
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Build the envelope for a query without sending it.
    pub fn build_envelope<V>(&self, variables: &V, query_id: &str) -> Result<BinaryNode>
    where
        V: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(&QueryBody { variables })?;

        Ok(BinaryNode::new("iq")
            .with_attr("id", self.transport.generate_message_tag())
            .with_attr("type", "get")
            .with_attr("to", self.config.server.as_str())
            .with_attr("xmlns", self.config.namespace.as_str())
            .with_children(vec![BinaryNode::new("query")
                .with_attr("query_id", query_id)
                .with_bytes(body)]))
    }

    /// Send a query and return the raw reply node.
    #[instrument(skip(self, variables), fields(query_id = %query_id))]
    pub async fn send_query<V>(&self, variables: &V, query_id: &str) -> Result<BinaryNode>
    where
        V: Serialize + ?Sized + Sync,
    {
        let envelope = self.build_envelope(variables, query_id)?;
        debug!(id = envelope.attr("id").unwrap_or_default(), "Sending WMex query");

        let reply = self.transport.query(envelope).await?;
        debug!("Received WMex reply");
        Ok(reply)
    }

    /// Send a query and return `data[data_path]`, or the whole `data` object
    /// when `data_path` is `None`.
    ///
    /// # Errors
    ///
    /// - [`QueryError::Server`] when the payload carries a non-empty `errors` list
    /// - [`QueryError::UnexpectedStructure`] when the payload or field is missing
    /// - [`QueryError::Serialization`] when the payload is not valid JSON
    /// - [`QueryError::Transport`] when the round trip fails
    #[instrument(skip(self, variables), fields(query_id = %query_id, data_path = ?data_path))]
    pub async fn execute_query<V>(
        &self,
        variables: &V,
        query_id: &str,
        data_path: Option<&str>,
    ) -> Result<Value>
    where
        V: Serialize + ?Sized + Sync,
    {
        let reply = self.send_query(variables, query_id).await?;
        decode_result(&reply, data_path, self.config.default_status)
    }
}

/// Decode the `result` payload of a WMex reply.
///
/// Pure counterpart of [`QueryExecutor::execute_query`] once the reply is in
/// hand.
pub fn decode_result(reply: &BinaryNode, data_path: Option<&str>, default_status: u16) -> Result<Value> {
    if let Some(content) = reply.child("result").and_then(BinaryNode::content_bytes) {
        let mut payload: Value = serde_json::from_slice(content)?;

        if let Some(err) = server_error(&payload, default_status) {
            warn!(status = err.status(), error = %err, "WMex query rejected by server");
            return Err(err);
        }

        let data = payload.get_mut("data");
        let response = match data_path {
            Some(path) => data.and_then(|d| d.get_mut(path)),
            None => data,
        };
        if let Some(value) = response {
            return Ok(value.take());
        }
    }

    let action = describe_action(data_path);
    warn!(action = %action, "Unexpected WMex response structure");
    Err(QueryError::UnexpectedStructure {
        status: default_status,
        action,
        node: Box::new(reply.clone()),
    })
}

fn server_error(payload: &Value, default_status: u16) -> Option<QueryError> {
    let errors = payload.get("errors")?.as_array()?;
    let first = errors.first()?;

    let message = errors
        .iter()
        .map(|e| {
            e.get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or("Unknown error")
        })
        .collect::<Vec<_>>()
        .join(", ");

    let status = first
        .get("extensions")
        .and_then(|ext| ext.get("error_code"))
        .and_then(error_code)
        .unwrap_or(default_status);

    Some(QueryError::Server {
        status,
        message,
        data: first.clone(),
    })
}

fn error_code(value: &Value) -> Option<u16> {
    let code = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    u16::try_from(code).ok().filter(|c| *c != 0)
}

/// Human-readable action for a data path: `xwa2_thread_unfollow` becomes
/// `thread unfollow`.
pub fn describe_action(data_path: Option<&str>) -> String {
    match data_path {
        Some(path) => path
            .strip_prefix(DATA_PATH_PREFIX)
            .unwrap_or(path)
            .replace('_', " "),
        None => "execute query".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply(payload: &str) -> BinaryNode {
        BinaryNode::new("iq")
            .with_attr("type", "result")
            .with_children(vec![BinaryNode::new("result").with_bytes(payload.as_bytes().to_vec())])
    }

    #[test]
    fn test_describe_action() {
        assert_eq!(describe_action(Some("xwa2_thread_unfollow")), "thread unfollow");
        assert_eq!(describe_action(Some("newsletter_mute")), "newsletter mute");
        assert_eq!(describe_action(Some("xwa2_")), "");
        assert_eq!(describe_action(None), "execute query");
    }

    #[test]
    fn test_returns_named_field() {
        let node = reply(r#"{"data":{"xwa2_newsletter_create":{"errors":[]}}}"#);
        let value = decode_result(&node, Some("xwa2_newsletter_create"), 400).unwrap();
        assert_eq!(value, json!({"errors": []}));
    }

    #[test]
    fn test_returns_falsy_values() {
        for (raw, expected) in [("0", json!(0)), ("false", json!(false)), ("null", Value::Null), ("\"\"", json!(""))] {
            let node = reply(&format!(r#"{{"data":{{"field":{raw}}}}}"#));
            assert_eq!(decode_result(&node, Some("field"), 400).unwrap(), expected);
        }
    }

    #[test]
    fn test_returns_whole_data_without_path() {
        let node = reply(r#"{"data":{"a":1,"b":2}}"#);
        assert_eq!(decode_result(&node, None, 400).unwrap(), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_server_error_short_circuits_data() {
        let node = reply(
            r#"{"errors":[{"message":"bad id","extensions":{"error_code":404}}],"data":{"field":1}}"#,
        );
        let err = decode_result(&node, Some("field"), 400).unwrap_err();
        assert_eq!(err.status(), 404);
        assert_eq!(err.to_string(), "GraphQL server error: bad id");
        assert_eq!(err.diagnostics()["extensions"]["error_code"], 404);
    }

    #[test]
    fn test_server_error_joins_messages_and_defaults_status() {
        let node = reply(r#"{"errors":[{"message":"first"},{},{"message":"third"}]}"#);
        let err = decode_result(&node, Some("field"), 400).unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(err.to_string(), "GraphQL server error: first, Unknown error, third");
    }

    #[test]
    fn test_string_and_zero_error_codes() {
        let node = reply(r#"{"errors":[{"message":"x","extensions":{"error_code":"429"}}]}"#);
        assert_eq!(decode_result(&node, None, 400).unwrap_err().status(), 429);

        let node = reply(r#"{"errors":[{"message":"x","extensions":{"error_code":0}}]}"#);
        assert_eq!(decode_result(&node, None, 400).unwrap_err().status(), 400);
    }

    #[test]
    fn test_empty_errors_is_not_failure() {
        let node = reply(r#"{"errors":[],"data":{"field":true}}"#);
        assert_eq!(decode_result(&node, Some("field"), 400).unwrap(), json!(true));
    }

    #[test]
    fn test_missing_field_is_structural() {
        let node = reply(r#"{"data":{}}"#);
        let err = decode_result(&node, Some("xwa2_thread_unfollow"), 400).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to thread unfollow, unexpected response structure."
        );
        assert_eq!(err.diagnostics()["tag"], "iq");
    }

    #[test]
    fn test_missing_result_is_structural() {
        let node = BinaryNode::new("iq");
        let err = decode_result(&node, Some("xwa2_newsletter"), 400).unwrap_err();
        assert!(matches!(err, QueryError::UnexpectedStructure { status: 400, .. }));

        let node = BinaryNode::new("iq").with_children(vec![BinaryNode::new("result")]);
        let err = decode_result(&node, None, 400).unwrap_err();
        assert_eq!(err.to_string(), "Failed to execute query, unexpected response structure.");
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let node = reply("{not json");
        let err = decode_result(&node, Some("field"), 400).unwrap_err();
        assert!(matches!(err, QueryError::Serialization(_)));
    }
}
