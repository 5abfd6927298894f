// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare implementation of `mtcf_core::DnsProvider`.
//
// ## Behaviour
//
// - One `POST /zones/:zone_id/dns_records` per upsert, no lookup beforehand
// - An identical existing record comes back as error 81058 and is classified
//   as `AlreadyExists` by the core
// - HTTP timeout configured (30 seconds)
// - No retry, backoff or caching: the next reconciliation cycle is the retry
//
// ## Security Requirements
//
// - API token NEVER appears in logs
// - Provider MUST fail fast if token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - Create DNS Record: POST `/zones/:zone_id/dns_records`

use async_trait::async_trait;
use mtcf_core::traits::{ApiMessage, DnsProvider, FailureDetails, ProviderResult};
use mtcf_core::{CloudflareConfig, DnsRecord, Error, Result};
use serde::Deserialize;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Envelope shared by every Cloudflare v4 response
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
}

/// Cloudflare DNS provider bound to a single zone
///
/// # Security
///
/// The Debug implementation does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone every record is created in
    zone_id: String,

    /// API root, overridable for tests
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_id`: Zone the records are created in
    ///
    /// # Errors
    ///
    /// `Error::Config` for an empty token or zone, `Error::Connection` when
    /// the HTTP client cannot be built.
    pub fn new(api_token: impl Into<String>, zone_id: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        let zone_id = zone_id.into();

        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }
        if zone_id.is_empty() {
            return Err(Error::config("Cloudflare zone ID cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::connection(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            zone_id,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
        })
    }

    /// Build from the cloudflare-mode configuration
    pub fn from_config(config: &CloudflareConfig) -> Result<Self> {
        Self::new(config.cloudflare_api_key.clone(), config.zone_id.clone())
    }

    /// Point the provider at another API root (mock servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone_id)
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// Create a DNS record in the configured zone
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// Authorization: Bearer <token>
    ///
    /// {"type": "SRV", "name": "_minecraft._tcp.play", "data": {...}, ...}
    /// ```
    ///
    /// Transport errors and undecodable bodies become
    /// `ProviderResult::Failure`; only a request that cannot even be built
    /// is reported as `Err(Error::Connection)`.
    async fn upsert_record(&self, record: &DnsRecord) -> Result<ProviderResult> {
        tracing::debug!(
            "Creating Cloudflare {} record: {}",
            record.record_type(),
            record.name()
        );

        let response = match self
            .client
            .post(self.records_url())
            .bearer_auth(&self.api_token)
            .json(record)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                return Err(Error::connection(format!(
                    "Cloudflare request could not be built: {}",
                    e
                )));
            }
            Err(e) => {
                tracing::debug!("Cloudflare request failed: {}", e);
                return Ok(ProviderResult::Failure(FailureDetails::transport(format!(
                    "HTTP request failed: {}",
                    e
                ))));
            }
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Ok(ProviderResult::Failure(FailureDetails {
                    status: Some(status),
                    message: Some(format!("Unable to read response: {}", e)),
                    ..FailureDetails::default()
                }));
            }
        };

        match serde_json::from_str::<ApiEnvelope>(&body) {
            Ok(envelope) => {
                let result = ProviderResult::classify(envelope.success, envelope.errors, Some(status));
                tracing::debug!(
                    "Cloudflare {} record {}: {}",
                    record.record_type(),
                    record.name(),
                    result
                );
                Ok(result)
            }
            Err(e) => Ok(ProviderResult::Failure(FailureDetails {
                status: Some(status),
                message: Some(format!("Failed to parse response: {}", e)),
                ..FailureDetails::default()
            })),
        }
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
