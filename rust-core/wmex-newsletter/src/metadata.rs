// SPDX-License-Identifier: PMPL-1.0-or-later

//! Newsletter metadata normalization.
//!
//! Turns the nested, optional-heavy JSON in a reply's `result` payload into a
//! flat [`MetadataRecord`]. Missing fields fall back to defaults; only
//! malformed JSON is an error. An entity without both its thread and viewer
//! metadata is reported as [`DeletedNewsletter`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use wmex_node::BinaryNode;

use crate::error::Result;
use crate::json::{count_at, int_at, lookup, non_empty_text_at, text_at};
use crate::media::MediaUrlResolver;

/// Data path of a newsletter creation reply.
pub const CREATE_PATH: &str = "xwa2_newsletter_create";
/// Data path of a newsletter metadata fetch reply.
pub const NEWSLETTER_PATH: &str = "xwa2_newsletter";

/// Which kind of reply the metadata comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataSource {
    /// Reply to a creation request
    Create,
    /// Reply to a metadata fetch
    Fetch,
}

impl MetadataSource {
    /// Key of the entity inside the payload's `data` object
    pub fn path(self) -> &'static str {
        match self {
            MetadataSource::Create => CREATE_PATH,
            MetadataSource::Fetch => NEWSLETTER_PATH,
        }
    }
}

/// Normalized newsletter metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub id: Option<String>,
    pub state: Option<String>,
    pub creation_time: i64,
    pub name: Option<String>,
    #[serde(rename = "nameTime")]
    pub name_time: i64,
    pub description: Option<String>,
    #[serde(rename = "descriptionTime")]
    pub description_time: i64,
    pub invite: Option<String>,
    /// Resolved picture URL (resolver sentinel when absent)
    pub picture: String,
    pub picture_id: Option<String>,
    /// Resolved preview URL (resolver sentinel when absent)
    pub preview: String,
    pub reaction_codes: Option<String>,
    pub subscribers: u64,
    pub verification: Option<String>,
    /// Raw viewer metadata as sent by the server
    pub viewer_metadata: Option<Value>,
    /// Viewer role, e.g. `OWNER` or `SUBSCRIBER`
    pub owner: Option<String>,
    pub mute_state: String,
}

/// Minimal shape produced for a newsletter deleted upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedNewsletter {
    pub id: Option<String>,
    pub state: Option<String>,
    pub deleted: bool,
}

/// Result of normalizing a newsletter payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NewsletterMetadata {
    Deleted(DeletedNewsletter),
    Active(Box<MetadataRecord>),
}

impl NewsletterMetadata {
    pub fn id(&self) -> Option<&str> {
        match self {
            NewsletterMetadata::Deleted(d) => d.id.as_deref(),
            NewsletterMetadata::Active(r) => r.id.as_deref(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, NewsletterMetadata::Deleted(_))
    }

    /// The full record, unless the newsletter was deleted
    pub fn record(&self) -> Option<&MetadataRecord> {
        match self {
            NewsletterMetadata::Active(r) => Some(r.as_ref()),
            NewsletterMetadata::Deleted(_) => None,
        }
    }
}

/// Extract newsletter metadata from a reply node.
///
/// Returns `Ok(None)` only when the reply has no `result` payload. A payload
/// without an entity under `source.path()` normalizes to the deleted shape.
///
/// # Errors
///
/// Returns [`NewsletterError::Serialization`](crate::NewsletterError::Serialization)
/// when the payload is not valid JSON.
pub fn extract_metadata(
    node: &BinaryNode,
    source: MetadataSource,
    resolver: &dyn MediaUrlResolver,
) -> Result<Option<NewsletterMetadata>> {
    let Some(content) = node.child("result").and_then(BinaryNode::content_bytes) else {
        debug!("Reply has no result payload");
        return Ok(None);
    };

    let payload: Value = serde_json::from_slice(content)?;
    static ABSENT: Value = Value::Null;
    let entity = lookup(&payload, &["data", source.path()]).unwrap_or(&ABSENT);
    Ok(Some(normalize(entity, resolver)))
}

/// Project a single newsletter entity into [`NewsletterMetadata`].
pub fn normalize(entity: &Value, resolver: &dyn MediaUrlResolver) -> NewsletterMetadata {
    let id = text_at(entity, &["id"]);
    let state = non_empty_text_at(entity, &["state", "type"]);

    let (Some(thread), Some(viewer)) = (
        lookup(entity, &["thread_metadata"]),
        lookup(entity, &["viewer_metadata"]),
    ) else {
        return NewsletterMetadata::Deleted(DeletedNewsletter {
            id,
            state,
            deleted: true,
        });
    };

    let resolve = |key: &str| {
        let path = text_at(thread, &[key, "direct_path"]).unwrap_or_default();
        resolver.resolve(&path)
    };

    NewsletterMetadata::Active(Box::new(MetadataRecord {
        id,
        state,
        creation_time: int_at(thread, &["creation_time"]),
        name: non_empty_text_at(thread, &["name", "text"]),
        name_time: int_at(thread, &["name", "update_time"]),
        description: non_empty_text_at(thread, &["description", "text"]),
        description_time: int_at(thread, &["description", "update_time"]),
        invite: non_empty_text_at(thread, &["invite"]),
        picture: resolve("picture"),
        picture_id: text_at(thread, &["picture", "id"]),
        preview: resolve("preview"),
        reaction_codes: text_at(thread, &["settings", "reaction_codes", "value"]),
        subscribers: count_at(thread, &["subscribers_count"]),
        verification: text_at(thread, &["verification"]),
        viewer_metadata: Some(viewer.clone()),
        owner: non_empty_text_at(viewer, &["role"]),
        mute_state: non_empty_text_at(viewer, &["mute"]).unwrap_or_else(|| "OFF".to_string()),
    }))
}
