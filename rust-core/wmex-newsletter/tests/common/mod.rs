// SPDX-License-Identifier: PMPL-1.0-or-later
//! Shared in-memory collaborators for newsletter integration tests.

#![allow(dead_code, unused_imports)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use wmex_newsletter::{DecryptError, LocalIdentity, MessageDecryptor, UpdateParser};
use wmex_node::BinaryNode;

pub use wmex_query::testing::{json_reply, ScriptedTransport};

// ---------------------------------------------------------------------------
// Decryption
// ---------------------------------------------------------------------------

/// Session store handed through to the decryptor untouched
#[derive(Debug, Default)]
pub struct FakeSessions {
    pub name: String,
}

/// What the decryptor observed for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptCall {
    pub server_id: String,
    pub from: Option<String>,
    pub me_id: String,
    pub me_lid: String,
    pub sessions: String,
}

/// Decryptor that records its inputs, optionally sleeps per message, and
/// fails for selected server ids.
#[derive(Default)]
pub struct RecordingDecryptor {
    pub calls: Mutex<Vec<DecryptCall>>,
    pub delays_ms: HashMap<String, u64>,
    pub fail_on: Option<String>,
}

impl RecordingDecryptor {
    pub fn calls(&self) -> Vec<DecryptCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageDecryptor for RecordingDecryptor {
    type Message = String;
    type Sessions = FakeSessions;

    async fn decrypt(
        &self,
        node: &BinaryNode,
        me_id: &str,
        me_lid: &str,
        sessions: &FakeSessions,
    ) -> Result<String, DecryptError> {
        let server_id = node.attr("server_id").unwrap_or_default().to_string();
        if let Some(ms) = self.delays_ms.get(&server_id) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }

        self.calls.lock().unwrap().push(DecryptCall {
            server_id: server_id.clone(),
            from: node.attr("from").map(str::to_owned),
            me_id: me_id.to_string(),
            me_lid: me_lid.to_string(),
            sessions: sessions.name.clone(),
        });

        if self.fail_on.as_deref() == Some(server_id.as_str()) {
            return Err(DecryptError::Failed(format!("bad mac on {server_id}")));
        }
        Ok(format!("plain:{server_id}"))
    }
}

pub fn parser(decryptor: Arc<RecordingDecryptor>, identity: LocalIdentity) -> UpdateParser<RecordingDecryptor> {
    UpdateParser::new(
        decryptor,
        Arc::new(FakeSessions {
            name: "signal".to_string(),
        }),
        identity,
    )
}

// ---------------------------------------------------------------------------
// Reply builders
// ---------------------------------------------------------------------------

/// A newsletter message node with views and reactions
pub fn message_node(server_id: &str, views: u64, reactions: &[(&str, u64)]) -> BinaryNode {
    BinaryNode::new("message")
        .with_attr("server_id", server_id)
        .with_children(vec![
            BinaryNode::new("views_count").with_attr("count", views.to_string()),
            BinaryNode::new("reactions").with_children(
                reactions
                    .iter()
                    .map(|(code, count)| {
                        BinaryNode::new("reaction")
                            .with_attr("code", *code)
                            .with_attr("count", count.to_string())
                    })
                    .collect(),
            ),
            BinaryNode::new("plaintext").with_bytes(vec![1, 2, 3]),
        ])
}

/// `iq` reply with a direct `messages` container
pub fn messages_reply(jid: &str, messages: Vec<BinaryNode>) -> BinaryNode {
    BinaryNode::new("iq").with_children(vec![BinaryNode::new("messages")
        .with_attr("jid", jid)
        .with_children(messages)])
}

/// `iq` reply with `message_updates` wrapping `messages`
pub fn updates_reply(jid: &str, messages: Vec<BinaryNode>) -> BinaryNode {
    BinaryNode::new("iq").with_children(vec![BinaryNode::new("message_updates")
        .with_children(vec![BinaryNode::new("messages")
            .with_attr("jid", jid)
            .with_children(messages)])])
}
