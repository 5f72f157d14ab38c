// SPDX-License-Identifier: PMPL-1.0-or-later

//! Newsletter operations over the WMex query executor.
//!
//! [`NewsletterClient`] owns a [`QueryExecutor`], the media URL resolver and an
//! [`UpdateParser`]. Mutations go through WMex queries; message fetches,
//! reactions and live-update subscriptions use plain `newsletter` iq / message
//! nodes on the same transport.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};
use wmex_node::{BinaryNode, S_WHATSAPP_NET};
use wmex_query::{decode_result, generate_message_id, NodeTransport, QueryError, QueryExecutor};

use crate::config::NewsletterConfig;
use crate::error::{NewsletterError, Result};
use crate::json::count_at;
use crate::media::{MediaHostResolver, MediaUrlResolver};
use crate::metadata::{extract_metadata, MetadataSource, NewsletterMetadata};
use crate::updates::{MessageDecryptor, UpdateItem, UpdateMode, UpdateParser};

// ---------------------------------------------------------------------------
// Protocol constants
// ---------------------------------------------------------------------------

/// Persisted query ids understood by the server.
pub mod query_ids {
    pub const JOB_MUTATION: &str = "7150902998257522";
    pub const METADATA: &str = "6620195908089573";
    pub const UNFOLLOW: &str = "7238632346214362";
    pub const FOLLOW: &str = "7871414976211147";
    pub const UNMUTE: &str = "7337137176362961";
    pub const MUTE: &str = "25151904754424642";
    pub const CREATE: &str = "6996806640408138";
    pub const ADMIN_COUNT: &str = "7130823597031706";
    pub const CHANGE_OWNER: &str = "7341777602580933";
    pub const DELETE: &str = "8316537688363079";
    pub const DEMOTE: &str = "6551828931592903";
}

/// Keys of the `data` object in WMex replies.
pub mod xwa_paths {
    pub use crate::metadata::{CREATE_PATH as CREATE, NEWSLETTER_PATH as NEWSLETTER};

    pub const FOLLOW: &str = "xwa2_newsletter_follow";
    pub const UNFOLLOW: &str = "xwa2_newsletter_unfollow";
    pub const MUTE: &str = "xwa2_newsletter_mute_v2";
    pub const UNMUTE: &str = "xwa2_newsletter_unmute_v2";
    pub const UPDATE: &str = "xwa2_newsletter_update";
    pub const ADMIN_COUNT: &str = "xwa2_newsletter_admin";
    pub const CHANGE_OWNER: &str = "xwa2_newsletter_change_owner";
    pub const DEMOTE: &str = "xwa2_newsletter_demote";
    pub const DELETE: &str = "xwa2_newsletter_delete_v2";
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// How a newsletter is addressed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewsletterKey {
    /// By newsletter jid (`<id>@newsletter`)
    Jid(String),
    /// By invite code
    Invite(String),
}

impl NewsletterKey {
    pub fn value(&self) -> &str {
        match self {
            NewsletterKey::Jid(v) | NewsletterKey::Invite(v) => v,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            NewsletterKey::Jid(_) => "jid",
            NewsletterKey::Invite(_) => "invite",
        }
    }
}

/// Role the metadata is viewed as
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ViewRole {
    Admin,
    #[default]
    Guest,
    Owner,
    Subscriber,
}

impl ViewRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewRole::Admin => "ADMIN",
            ViewRole::Guest => "GUEST",
            ViewRole::Owner => "OWNER",
            ViewRole::Subscriber => "SUBSCRIBER",
        }
    }
}

// ---------------------------------------------------------------------------
// NewsletterClient
// ---------------------------------------------------------------------------

/// Newsletter operations bound to one transport and one local identity.
pub struct NewsletterClient<T: ?Sized, D: MessageDecryptor> {
    executor: QueryExecutor<T>,
    updates: UpdateParser<D>,
    resolver: Arc<dyn MediaUrlResolver>,
    config: NewsletterConfig,
}

impl<T, D> NewsletterClient<T, D>
where
    T: NodeTransport + ?Sized,
    D: MessageDecryptor,
{
    /// Create a client; media paths resolve against `config.media_host`.
    ///
    /// The parser keeps its own concurrency bound; build it with
    /// [`UpdateParser::from_config`] to use `config.decrypt_concurrency`.
    pub fn new(transport: Arc<T>, updates: UpdateParser<D>, config: NewsletterConfig) -> Self {
        let resolver = Arc::new(MediaHostResolver::new(config.media_host.clone()));
        Self {
            executor: QueryExecutor::new(transport),
            updates,
            resolver,
            config,
        }
    }

    /// Replace the media URL resolver
    pub fn with_resolver(mut self, resolver: Arc<dyn MediaUrlResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn executor(&self) -> &QueryExecutor<T> {
        &self.executor
    }

    pub fn updates(&self) -> &UpdateParser<D> {
        &self.updates
    }

    pub fn config(&self) -> &NewsletterConfig {
        &self.config
    }

    // -- Metadata -----------------------------------------------------------

    /// Create a newsletter and return its normalized metadata.
    #[instrument(skip(self, description))]
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Option<NewsletterMetadata>> {
        if name.trim().is_empty() {
            return Err(NewsletterError::Validation(
                "newsletter name must not be empty".to_string(),
            ));
        }

        let variables = json!({
            "input": {
                "name": name,
                "description": description,
                "settings": null,
            }
        });
        let metadata = self
            .query_metadata(&variables, query_ids::CREATE, MetadataSource::Create)
            .await?;
        info!(id = ?metadata.as_ref().and_then(|m| m.id()), "Created newsletter");
        Ok(metadata)
    }

    /// Fetch normalized metadata by jid or invite code.
    #[instrument(skip(self))]
    pub async fn metadata(
        &self,
        key: &NewsletterKey,
        role: ViewRole,
    ) -> Result<Option<NewsletterMetadata>> {
        let variables = json!({
            "input": {
                "key": key.value(),
                "type": key.kind().to_uppercase(),
                "view_role": role.as_str(),
            },
            "fetch_viewer_metadata": true,
            "fetch_full_image": true,
            "fetch_creation_time": true,
        });
        self.query_metadata(&variables, query_ids::METADATA, MetadataSource::Fetch)
            .await
    }

    async fn query_metadata(
        &self,
        variables: &Value,
        query_id: &str,
        source: MetadataSource,
    ) -> Result<Option<NewsletterMetadata>> {
        let reply = self.executor.send_query(variables, query_id).await?;

        // Surface server-reported errors before normalizing; a reply without
        // the entity is still "no data" rather than a failure.
        match decode_result(&reply, Some(source.path()), self.executor.config().default_status) {
            Ok(_) | Err(QueryError::UnexpectedStructure { .. }) => {}
            Err(err) => return Err(err.into()),
        }

        extract_metadata(&reply, source, self.resolver.as_ref())
    }

    // -- Subscription -------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn follow(&self, jid: &str) -> Result<()> {
        self.newsletter_mutation(jid, query_ids::FOLLOW, xwa_paths::FOLLOW)
            .await
            .map(drop)
    }

    #[instrument(skip(self))]
    pub async fn unfollow(&self, jid: &str) -> Result<()> {
        self.newsletter_mutation(jid, query_ids::UNFOLLOW, xwa_paths::UNFOLLOW)
            .await
            .map(drop)
    }

    #[instrument(skip(self))]
    pub async fn mute(&self, jid: &str) -> Result<()> {
        self.newsletter_mutation(jid, query_ids::MUTE, xwa_paths::MUTE)
            .await
            .map(drop)
    }

    #[instrument(skip(self))]
    pub async fn unmute(&self, jid: &str) -> Result<()> {
        self.newsletter_mutation(jid, query_ids::UNMUTE, xwa_paths::UNMUTE)
            .await
            .map(drop)
    }

    // -- Settings -----------------------------------------------------------

    /// Apply a partial settings update; `settings` is always sent as null.
    #[instrument(skip(self, updates))]
    pub async fn update(&self, jid: &str, updates: Value) -> Result<Value> {
        let Value::Object(mut updates) = updates else {
            return Err(NewsletterError::Validation(
                "newsletter updates must be a JSON object".to_string(),
            ));
        };
        updates.insert("settings".to_string(), Value::Null);

        let variables = json!({ "newsletter_id": jid, "updates": updates });
        Ok(self
            .executor
            .execute_query(&variables, query_ids::JOB_MUTATION, Some(xwa_paths::UPDATE))
            .await?)
    }

    pub async fn update_name(&self, jid: &str, name: &str) -> Result<Value> {
        self.update(jid, json!({ "name": name })).await
    }

    pub async fn update_description(&self, jid: &str, description: &str) -> Result<Value> {
        self.update(jid, json!({ "description": description })).await
    }

    /// Set the picture from an already-encoded base64 image.
    pub async fn update_picture(&self, jid: &str, picture_base64: &str) -> Result<Value> {
        self.update(jid, json!({ "picture": picture_base64 })).await
    }

    pub async fn remove_picture(&self, jid: &str) -> Result<Value> {
        self.update(jid, json!({ "picture": "" })).await
    }

    // -- Administration -----------------------------------------------------

    /// Number of admins, 0 when the server omits it.
    #[instrument(skip(self))]
    pub async fn admin_count(&self, jid: &str) -> Result<u64> {
        let result = self
            .newsletter_mutation(jid, query_ids::ADMIN_COUNT, xwa_paths::ADMIN_COUNT)
            .await?;
        Ok(count_at(&result, &["admin_count"]))
    }

    #[instrument(skip(self))]
    pub async fn change_owner(&self, jid: &str, new_owner: &str) -> Result<()> {
        let variables = json!({ "newsletter_id": jid, "user_id": new_owner });
        self.executor
            .execute_query(&variables, query_ids::CHANGE_OWNER, Some(xwa_paths::CHANGE_OWNER))
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn demote(&self, jid: &str, user: &str) -> Result<()> {
        let variables = json!({ "newsletter_id": jid, "user_id": user });
        self.executor
            .execute_query(&variables, query_ids::DEMOTE, Some(xwa_paths::DEMOTE))
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, jid: &str) -> Result<()> {
        self.newsletter_mutation(jid, query_ids::DELETE, xwa_paths::DELETE)
            .await
            .map(drop)
    }

    async fn newsletter_mutation(&self, jid: &str, query_id: &str, path: &str) -> Result<Value> {
        let variables = json!({ "newsletter_id": jid });
        Ok(self
            .executor
            .execute_query(&variables, query_id, Some(path))
            .await?)
    }

    // -- Messages -----------------------------------------------------------

    /// React to a message, or remove the reaction when `code` is `None`.
    #[instrument(skip(self))]
    pub async fn react_message(&self, jid: &str, server_id: &str, code: Option<&str>) -> Result<()> {
        let mut message = BinaryNode::new("message")
            .with_attr("to", jid)
            .with_attr("type", "reaction")
            .with_attr("server_id", server_id)
            .with_attr("id", generate_message_id());
        if code.is_none() {
            message.set_attr("edit", "7");
        }
        let message = message.with_children(vec![
            BinaryNode::new("reaction").with_optional_attr("code", code)
        ]);

        self.executor
            .transport()
            .query(message)
            .await
            .map_err(QueryError::from)?;
        Ok(())
    }

    /// Fetch up to `count` messages, decrypting each payload.
    #[instrument(skip(self))]
    pub async fn fetch_messages(
        &self,
        key: &NewsletterKey,
        count: u32,
        after: Option<u64>,
    ) -> Result<Vec<UpdateItem<D::Message>>> {
        validate_count(count)?;

        let key_attr = match key {
            NewsletterKey::Jid(_) => "jid",
            NewsletterKey::Invite(_) => "key",
        };
        let request = BinaryNode::new("messages")
            .with_attr("type", key.kind())
            .with_attr(key_attr, key.value())
            .with_attr("count", count.to_string())
            .with_attr("after", after.unwrap_or(self.config.default_page_after).to_string());

        let reply = self.newsletter_query(S_WHATSAPP_NET, "get", request).await?;
        self.updates.parse_updates(&reply, UpdateMode::Messages).await
    }

    /// Fetch view/reaction updates for up to `count` messages.
    #[instrument(skip(self))]
    pub async fn fetch_updates(
        &self,
        jid: &str,
        count: u32,
        after: Option<u64>,
        since: Option<u64>,
    ) -> Result<Vec<UpdateItem<D::Message>>> {
        validate_count(count)?;

        let request = BinaryNode::new("message_updates")
            .with_attr("count", count.to_string())
            .with_attr("after", after.unwrap_or(self.config.default_page_after).to_string())
            .with_attr("since", since.unwrap_or(0).to_string());

        let reply = self.newsletter_query(jid, "get", request).await?;
        self.updates.parse_updates(&reply, UpdateMode::Updates).await
    }

    /// Subscribe to live updates; returns the subscription duration the
    /// server granted, if any.
    #[instrument(skip(self))]
    pub async fn subscribe_updates(&self, jid: &str) -> Result<Option<String>> {
        let reply = self
            .newsletter_query(jid, "set", BinaryNode::new("live_updates"))
            .await?;
        Ok(reply
            .child("live_updates")
            .and_then(|n| n.attr("duration"))
            .map(str::to_owned))
    }

    async fn newsletter_query(&self, to: &str, kind: &str, content: BinaryNode) -> Result<BinaryNode> {
        let transport = self.executor.transport();
        let iq = BinaryNode::new("iq")
            .with_attr("id", transport.generate_message_tag())
            .with_attr("type", kind)
            .with_attr("xmlns", "newsletter")
            .with_attr("to", to)
            .with_children(vec![content]);
        debug!(to, kind, "Sending newsletter iq");

        Ok(transport.query(iq).await.map_err(QueryError::from)?)
    }
}

fn validate_count(count: u32) -> Result<()> {
    if count == 0 {
        return Err(NewsletterError::Validation(
            "count must be at least 1".to_string(),
        ));
    }
    Ok(())
}
