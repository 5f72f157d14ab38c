// SPDX-License-Identifier: PMPL-1.0-or-later

//! Resolution of server-relative media paths to fetchable URLs.

/// Maps a server-relative direct path to a URL.
///
/// Called with `""` when the payload has no path; implementations must return
/// a stable sentinel for that case rather than fail.
pub trait MediaUrlResolver: Send + Sync {
    fn resolve(&self, direct_path: &str) -> String;
}

/// Resolves direct paths by prefixing a media host. An empty path resolves
/// to the bare host.
#[derive(Debug, Clone)]
pub struct MediaHostResolver {
    host: String,
}

impl MediaHostResolver {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl MediaUrlResolver for MediaHostResolver {
    fn resolve(&self, direct_path: &str) -> String {
        format!("{}{}", self.host, direct_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let resolver = MediaHostResolver::new("https://mmg.whatsapp.net");
        assert_eq!(
            resolver.resolve("/v/t61.24694-24/abc?oh=1"),
            "https://mmg.whatsapp.net/v/t61.24694-24/abc?oh=1"
        );
        assert_eq!(resolver.resolve(""), "https://mmg.whatsapp.net");
    }
}
