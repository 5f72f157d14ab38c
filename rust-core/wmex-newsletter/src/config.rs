// SPDX-License-Identifier: PMPL-1.0-or-later

//! Newsletter client configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Environment variable overriding [`NewsletterConfig::media_host`].
pub const ENV_MEDIA_HOST: &str = "WMEX_MEDIA_HOST";
/// Environment variable overriding [`NewsletterConfig::decrypt_concurrency`].
pub const ENV_DECRYPT_CONCURRENCY: &str = "WMEX_DECRYPT_CONCURRENCY";

/// Default bound on in-flight message decryptions.
pub const DEFAULT_DECRYPT_CONCURRENCY: usize = 16;

/// Configuration for the newsletter client and update parser
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsletterConfig {
    /// Host that media direct paths are resolved against
    pub media_host: String,
    /// Maximum in-flight message decryptions per fetch
    pub decrypt_concurrency: usize,
    /// `after` cursor sent when the caller gives none
    pub default_page_after: u64,
}

impl Default for NewsletterConfig {
    fn default() -> Self {
        Self {
            media_host: "https://mmg.whatsapp.net".to_string(),
            decrypt_concurrency: DEFAULT_DECRYPT_CONCURRENCY,
            default_page_after: 100,
        }
    }
}

impl NewsletterConfig {
    /// Defaults overridden by `WMEX_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by values from `lookup`; invalid values are
    /// logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(host) = lookup(ENV_MEDIA_HOST).filter(|h| !h.trim().is_empty()) {
            config.media_host = host.trim().trim_end_matches('/').to_string();
        }

        if let Some(raw) = lookup(ENV_DECRYPT_CONCURRENCY) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.decrypt_concurrency = n,
                _ => warn!(value = %raw, "Ignoring invalid {}", ENV_DECRYPT_CONCURRENCY),
            }
        }

        config
    }
}
