// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-memory transport for tests.
//!
//! Enabled with the `testing` feature. [`ScriptedTransport`] records every
//! node it is asked to send and answers from a queue of pre-loaded replies;
//! once the queue is empty it fails with [`TransportError::ConnectionClosed`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use wmex_node::BinaryNode;

use crate::transport::{MessageTagGenerator, NodeTransport, TransportError};

/// Records sent nodes and answers with queued replies.
pub struct ScriptedTransport {
    tags: MessageTagGenerator,
    replies: Mutex<VecDeque<Result<BinaryNode, TransportError>>>,
    sent: Mutex<Vec<BinaryNode>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Result<BinaryNode, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            tags: MessageTagGenerator::with_prefix("1.1-"),
            replies: Mutex::new(replies.into()),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Every node sent so far, oldest first
    pub fn sent(&self) -> Vec<BinaryNode> {
        self.sent.lock().expect("sent log poisoned").clone()
    }

    /// JSON `variables` of the n-th sent query envelope.
    ///
    /// # Panics
    ///
    /// If fewer than `n + 1` nodes were sent or the node carries no query
    /// payload.
    pub fn variables(&self, n: usize) -> Value {
        let sent = self.sent();
        let body = sent[n]
            .child("query")
            .and_then(BinaryNode::content_bytes)
            .expect("query payload");
        let decoded: Value = serde_json::from_slice(body).expect("query payload is JSON");
        decoded["variables"].clone()
    }
}

#[async_trait]
impl NodeTransport for ScriptedTransport {
    async fn query(&self, node: BinaryNode) -> Result<BinaryNode, TransportError> {
        self.sent.lock().expect("sent log poisoned").push(node);
        self.replies
            .lock()
            .expect("reply queue poisoned")
            .pop_front()
            .unwrap_or(Err(TransportError::ConnectionClosed))
    }

    fn generate_message_tag(&self) -> String {
        self.tags.next_tag()
    }
}

/// `iq` reply whose `result` child carries `payload` as JSON bytes
pub fn json_reply(payload: &Value) -> Result<BinaryNode, TransportError> {
    let bytes = serde_json::to_vec(payload).expect("JSON value serializes");
    Ok(BinaryNode::new("iq").with_children(vec![BinaryNode::new("result").with_bytes(bytes)]))
}
