// SPDX-License-Identifier: PMPL-1.0-or-later
//! WMex Node
//!
//! Binary node model shared by the transport, the query executor and the
//! newsletter normalizer. A node is a labeled tree element with string
//! attributes and optional content (child nodes, raw bytes, or text).
//!
//! Lookups never fail: a missing child, attribute or payload is `None`, and
//! iterating the children of a node without child content yields nothing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Server address used as the `to` attribute of server-bound queries.
pub const S_WHATSAPP_NET: &str = "s.whatsapp.net";

/// Content carried by a [`BinaryNode`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeContent {
    /// Nested child nodes, in document order
    Nodes(Vec<BinaryNode>),
    /// Opaque payload bytes
    Bytes(Vec<u8>),
    /// UTF-8 text payload
    Text(String),
}

/// A labeled tree element exchanged with the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryNode {
    /// Element tag (e.g. `iq`, `result`, `message`)
    pub tag: String,
    /// String attributes, kept sorted for stable diagnostics
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    /// Optional content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<NodeContent>,
}

impl BinaryNode {
    /// Create an empty node with the given tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            content: None,
        }
    }

    /// Add an attribute
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Add an attribute only when a value is present
    pub fn with_optional_attr(self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.with_attr(key, value),
            None => self,
        }
    }

    /// Replace the content with child nodes
    pub fn with_children(mut self, children: Vec<BinaryNode>) -> Self {
        self.content = Some(NodeContent::Nodes(children));
        self
    }

    /// Replace the content with raw bytes
    pub fn with_bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.content = Some(NodeContent::Bytes(bytes.into()));
        self
    }

    /// Replace the content with text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.content = Some(NodeContent::Text(text.into()));
        self
    }

    /// Get an attribute value
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Set (or overwrite) an attribute in place
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(key.into(), value.into());
    }

    /// All child nodes in document order.
    ///
    /// Empty when the content is bytes, text, or absent.
    pub fn all_children(&self) -> &[BinaryNode] {
        match &self.content {
            Some(NodeContent::Nodes(children)) => children,
            _ => &[],
        }
    }

    /// First child with the given tag
    pub fn child(&self, tag: &str) -> Option<&BinaryNode> {
        self.all_children().iter().find(|c| c.tag == tag)
    }

    /// All children with the given tag, in document order
    pub fn children<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a BinaryNode> + 'a {
        self.all_children().iter().filter(move |c| c.tag == tag)
    }

    /// Payload bytes of this node.
    ///
    /// Text content is returned as its UTF-8 bytes. Child-node content and
    /// empty payloads are treated as "no payload".
    pub fn content_bytes(&self) -> Option<&[u8]> {
        let bytes = match &self.content {
            Some(NodeContent::Bytes(bytes)) => bytes.as_slice(),
            Some(NodeContent::Text(text)) => text.as_bytes(),
            _ => return None,
        };
        (!bytes.is_empty()).then_some(bytes)
    }
}

/// Child lookup that tolerates a missing parent, mirroring chained lookups
/// like `node.message_updates.messages` where any hop may be absent.
pub fn child_of<'a>(node: Option<&'a BinaryNode>, tag: &str) -> Option<&'a BinaryNode> {
    node.and_then(|n| n.child(tag))
}
