#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! HTTP adapters for the claim and content endpoints.
//!
//! Claims are looked up with a JSON-RPC call keyed by tile index; payloads are
//! downloaded from `{host}/{x}.{z}.lnd`. Every transport failure, including a
//! non-success status and a client-side timeout, surfaces as
//! [`landstream_core::FetchError::Network`].

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

mod claim;
mod content;

pub use claim::{AssumeClaimed, RpcClaimSource, UNVERIFIED_CLAIM_HASH};
pub use content::{content_url, HttpContentSource};

/// Content host used while developing against a local tile server.
pub const DEBUG_CONTENT_HOST: &str = "http://lvh.me/tiles";

/// Content host serving the production world.
pub const PRODUCTION_CONTENT_HOST: &str = "https://decentraland.org/content";

/// JSON-RPC method used for claim lookups unless configured otherwise.
pub const DEFAULT_CLAIM_METHOD: &str = "landHash";

/// Fixed content hosts selectable by the debug/production switch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentHost {
    /// Local development server.
    Debug,
    /// Production content server.
    #[default]
    Production,
}

impl ContentHost {
    /// Base URL of the host.
    #[must_use]
    pub const fn base_url(self) -> &'static str {
        match self {
            Self::Debug => DEBUG_CONTENT_HOST,
            Self::Production => PRODUCTION_CONTENT_HOST,
        }
    }
}

/// Content endpoint settings, as found in the `[content]` config table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    /// Which fixed host to use.
    pub host: ContentHost,
    /// Explicit base URL overriding `host`.
    pub base_url: Option<String>,
}

impl ContentConfig {
    /// Base URL payloads are fetched from.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.host.base_url())
    }
}

/// Claim endpoint settings, as found in the `[claim]` config table.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClaimConfig {
    /// JSON-RPC endpoint; without one every tile is assumed claimed.
    pub url: Option<String>,
    /// JSON-RPC method name.
    pub method: String,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            url: None,
            method: DEFAULT_CLAIM_METHOD.to_owned(),
        }
    }
}

/// Builds the shared HTTP client, optionally bounding each request.
pub fn build_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(concat!(
        env!("CARGO_PKG_NAME"),
        "/",
        env!("CARGO_PKG_VERSION")
    ));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().context("failed to build HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_switch_selects_fixed_urls() {
        assert_eq!(ContentHost::Debug.base_url(), "http://lvh.me/tiles");
        assert_eq!(
            ContentConfig::default().base_url(),
            "https://decentraland.org/content"
        );

        let custom = ContentConfig {
            host: ContentHost::Debug,
            base_url: Some("http://localhost:8080/tiles".to_owned()),
        };
        assert_eq!(custom.base_url(), "http://localhost:8080/tiles");
    }

    #[test]
    fn claim_config_defaults_method() {
        let config = ClaimConfig::default();
        assert_eq!(config.url, None);
        assert_eq!(config.method, DEFAULT_CLAIM_METHOD);
    }

    #[test]
    fn client_builds_with_and_without_timeout() {
        assert!(build_client(None).is_ok());
        assert!(build_client(Some(Duration::from_secs(3))).is_ok());
    }
}
