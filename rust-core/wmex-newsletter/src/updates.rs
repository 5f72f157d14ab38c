// SPDX-License-Identifier: PMPL-1.0-or-later

//! Batched message/update fetch parsing.
//!
//! A fetch reply carries a `messages` container (directly, or wrapped in
//! `message_updates`) whose children are individual newsletter messages. Each
//! one yields an [`UpdateItem`] with its view count and reactions; in
//! [`UpdateMode::Messages`] the encrypted payload is also decrypted.
//!
//! Items are produced concurrently but always returned in document order, and
//! a single decrypt failure fails the whole batch.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use wmex_node::{child_of, BinaryNode};

use crate::config::{NewsletterConfig, DEFAULT_DECRYPT_CONCURRENCY};
use crate::error::{DecryptError, NewsletterError, Result};
use crate::json::parse_int;

/// Which fetch the reply answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// `messages` fetch; payloads are decrypted
    Messages,
    /// `message_updates` fetch; counts only
    Updates,
}

/// A reaction tally on a newsletter message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub code: String,
    pub count: u64,
}

/// One entry of a batched fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateItem<M> {
    pub server_id: String,
    pub views: u64,
    pub reactions: Vec<Reaction>,
    /// Decrypted payload; only set for [`UpdateMode::Messages`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<M>,
}

/// The local account, as seen by the decryptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalIdentity {
    pub id: String,
    pub lid: Option<String>,
}

impl LocalIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            lid: None,
        }
    }

    pub fn with_lid(mut self, lid: impl Into<String>) -> Self {
        self.lid = Some(lid.into());
        self
    }

    /// The lid, or `""` when unset
    pub fn lid_or_empty(&self) -> &str {
        self.lid.as_deref().unwrap_or_default()
    }
}

/// Message decryption collaborator
#[async_trait]
pub trait MessageDecryptor: Send + Sync {
    /// Decrypted message payload
    type Message: Send;
    /// Cryptographic session store the decryptor reads from
    type Sessions: Send + Sync + ?Sized;

    /// Decrypt a message node. Completes only once the payload is fully
    /// materialized.
    async fn decrypt(
        &self,
        node: &BinaryNode,
        me_id: &str,
        me_lid: &str,
        sessions: &Self::Sessions,
    ) -> std::result::Result<Self::Message, DecryptError>;
}

/// Parses fetch replies into ordered [`UpdateItem`]s
pub struct UpdateParser<D: MessageDecryptor> {
    decryptor: Arc<D>,
    sessions: Arc<D::Sessions>,
    identity: LocalIdentity,
    concurrency: usize,
}

impl<D: MessageDecryptor> UpdateParser<D> {
    pub fn new(decryptor: Arc<D>, sessions: Arc<D::Sessions>, identity: LocalIdentity) -> Self {
        Self {
            decryptor,
            sessions,
            identity,
            concurrency: DEFAULT_DECRYPT_CONCURRENCY,
        }
    }

    /// Parser bounded by `config.decrypt_concurrency`
    pub fn from_config(
        decryptor: Arc<D>,
        sessions: Arc<D::Sessions>,
        identity: LocalIdentity,
        config: &NewsletterConfig,
    ) -> Self {
        Self::new(decryptor, sessions, identity).with_concurrency(config.decrypt_concurrency)
    }

    /// Bound the number of in-flight per-node parses (minimum 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Parse every message under the mode's container, in document order.
    ///
    /// A missing container yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`NewsletterError::Decrypt`] if any message fails to decrypt.
    #[instrument(skip(self, node))]
    pub async fn parse_updates(
        &self,
        node: &BinaryNode,
        mode: UpdateMode,
    ) -> Result<Vec<UpdateItem<D::Message>>> {
        let container = match mode {
            UpdateMode::Messages => node.child("messages"),
            UpdateMode::Updates => child_of(node.child("message_updates"), "messages"),
        };
        let Some(container) = container else {
            debug!("No messages container in reply");
            return Ok(Vec::new());
        };

        let from = container.attr("jid");
        let nodes: Vec<BinaryNode> = container
            .all_children()
            .iter()
            .map(|child| {
                let mut child = child.clone();
                if let Some(from) = from {
                    child.set_attr("from", from);
                }
                child
            })
            .collect();
        debug!(count = nodes.len(), "Parsing fetched messages");

        stream::iter(nodes)
            .map(|child| self.parse_node(child, mode))
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    async fn parse_node(&self, node: BinaryNode, mode: UpdateMode) -> Result<UpdateItem<D::Message>> {
        let mut item = count_item(&node);

        if mode == UpdateMode::Messages {
            let message = self
                .decryptor
                .decrypt(
                    &node,
                    &self.identity.id,
                    self.identity.lid_or_empty(),
                    &self.sessions,
                )
                .await
                .map_err(|source| {
                    warn!(server_id = %item.server_id, error = %source, "Message decryption failed");
                    NewsletterError::Decrypt {
                        server_id: item.server_id.clone(),
                        source,
                    }
                })?;
            item.message = Some(message);
        }

        Ok(item)
    }
}

/// Views and reactions of a single message node, without decryption.
pub fn count_item<M>(node: &BinaryNode) -> UpdateItem<M> {
    let views = node
        .child("views_count")
        .and_then(|v| v.attr("count"))
        .map(parse_count)
        .unwrap_or(0);

    let reactions: Vec<Reaction> = node
        .child("reactions")
        .map(|r| {
            r.children("reaction")
                .map(|reaction| Reaction {
                    code: reaction.attr("code").unwrap_or_default().to_string(),
                    count: reaction.attr("count").map(parse_count).unwrap_or(0),
                })
                .collect()
        })
        .unwrap_or_default();

    UpdateItem {
        server_id: node.attr("server_id").unwrap_or_default().to_string(),
        views,
        reactions,
        message: None,
    }
}

fn parse_count(raw: &str) -> u64 {
    u64::try_from(parse_int(raw)).unwrap_or(0)
}
