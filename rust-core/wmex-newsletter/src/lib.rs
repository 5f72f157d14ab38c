// SPDX-License-Identifier: PMPL-1.0-or-later
//! WMex Newsletter
//!
//! Newsletter operations on top of the WMex query executor, plus the pure
//! transforms that turn raw reply nodes into stable records:
//!
//! - [`metadata`]: single-entity metadata normalization with explicit
//!   defaults for every optional field.
//! - [`updates`]: batched message/update fetch parsing, with per-message
//!   decryption in messages mode.
//! - [`client`]: follow, mute, create, update, fetch and friends.

pub mod client;
pub mod config;
pub mod error;
pub mod json;
pub mod media;
pub mod metadata;
pub mod updates;

pub use client::{NewsletterClient, NewsletterKey, ViewRole};
pub use config::NewsletterConfig;
pub use error::{DecryptError, NewsletterError, Result};
pub use media::{MediaHostResolver, MediaUrlResolver};
pub use metadata::{
    extract_metadata, DeletedNewsletter, MetadataRecord, MetadataSource, NewsletterMetadata,
};
pub use updates::{LocalIdentity, MessageDecryptor, Reaction, UpdateItem, UpdateMode, UpdateParser};
