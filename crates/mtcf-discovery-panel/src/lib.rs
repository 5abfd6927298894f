// # Panel Discovery
//
// This crate provides the cloudflare-mode `ServerDiscovery` source: it polls
// the exposure endpoint published by a moonlight-mode instance.
//
// ## Wire format
//
// ```http
// GET {MOONLIGHTAPIURL}/servers
// Authorization: Bearer {MOONLIGHTAPIKEY}
//
// [{"ipAddress": "203.0.113.7", "port": 25565, "domain": "example.com", "subdomain": "play"}]
// ```
//
// ## Failure handling
//
// - Transport error, non-2xx status or a body that is not a JSON array:
//   the registry is kept (`DiscoveryOutcome::Unchanged`)
// - Individual malformed entries are skipped with a warning; the rest of
//   the array still replaces the registry

use mtcf_core::traits::{DiscoveryOutcome, ServerDiscovery, SkippedEntry};
use mtcf_core::{CloudflareConfig, Error, Result, Server};
use serde_json::Value;
use std::time::Duration;

/// Request timeout for the exposure endpoint
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches the desired server set from a remote exposure endpoint
pub struct PanelDiscovery {
    /// `{base}/servers`
    url: String,

    /// Bearer token
    /// ⚠️ NEVER log this value
    api_key: String,

    /// HTTP client
    client: reqwest::Client,
}

impl std::fmt::Debug for PanelDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelDiscovery")
            .field("url", &self.url)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

impl PanelDiscovery {
    /// Create a discovery source polling `{base_url}/servers`
    ///
    /// # Errors
    ///
    /// `Error::Connection` when the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::connection(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: format!("{}/servers", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            client,
        })
    }

    /// Build from the cloudflare-mode configuration
    pub fn from_config(config: &CloudflareConfig) -> Result<Self> {
        Self::new(&config.moonlight_api_url, config.moonlight_api_key.clone())
    }

    /// Endpoint being polled
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Decode a `/servers` body entry by entry
///
/// `None` when the body is not a JSON array at all.
pub fn parse_servers(body: &str) -> Option<(Vec<Server>, Vec<SkippedEntry>)> {
    let entries = match serde_json::from_str::<Value>(body).ok()? {
        Value::Array(entries) => entries,
        _ => return None,
    };

    let mut servers = Vec::with_capacity(entries.len());
    let mut skipped = Vec::new();

    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<Server>(entry) {
            Ok(server) => servers.push(server),
            Err(e) => {
                let unit = format!("servers[{}]", index);
                tracing::warn!("Skipping malformed server entry {}: {}", unit, e);
                skipped.push(SkippedEntry::new(unit, e.to_string()));
            }
        }
    }

    Some((servers, skipped))
}

#[async_trait::async_trait]
impl ServerDiscovery for PanelDiscovery {
    async fn discover(&self) -> Result<DiscoveryOutcome> {
        let response = match self
            .client
            .get(&self.url)
            .bearer_auth(&self.api_key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Server list request failed: {}", e);
                return Ok(DiscoveryOutcome::unchanged(format!("Request failed: {}", e)));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!("Server list request returned HTTP {}", status);
            return Ok(DiscoveryOutcome::unchanged(format!("HTTP error: {}", status)));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Failed to read server list: {}", e);
                return Ok(DiscoveryOutcome::unchanged(format!(
                    "Failed to read response: {}",
                    e
                )));
            }
        };

        match parse_servers(&body) {
            Some((servers, skipped)) => {
                tracing::debug!(
                    "Fetched {} server(s) from {} ({} skipped)",
                    servers.len(),
                    self.url,
                    skipped.len()
                );
                Ok(DiscoveryOutcome::Replace { servers, skipped })
            }
            None => {
                tracing::warn!("Server list is not a JSON array, keeping previous list");
                Ok(DiscoveryOutcome::unchanged("Response is not a JSON array"))
            }
        }
    }

    fn source_name(&self) -> &'static str {
        "panel"
    }
}
