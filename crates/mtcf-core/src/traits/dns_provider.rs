// # DNS Provider Trait
//
// Defines the interface for pushing desired records to a DNS provider.
//
// ## Implementations
//
// - Cloudflare: `mtcf-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use mtcf_core::{DnsProvider, DnsRecord, ProviderResult};
//
// let result = provider.upsert_record(&DnsRecord::a_for(&server)).await?;
// if result.is_ok() {
//     // created, or already present
// }
// ```

use crate::records::DnsRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cloudflare error code meaning "an identical record already exists"
pub const RECORD_ALREADY_EXISTS: i64 = 81058;

/// One `{code, message}` entry of a provider error list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Everything known about a failed upsert
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureDetails {
    /// Structured errors returned by the provider
    pub errors: Vec<ApiMessage>,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    /// Transport or decoding problem, when no structured errors exist
    pub message: Option<String>,
}

impl FailureDetails {
    /// Failure with no response body to speak of
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Provider error codes joined with ", "
    pub fn codes(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.code.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for FailureDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.errors.is_empty() {
            return f.write_str(&self.codes());
        }
        match (&self.status, &self.message) {
            (Some(status), Some(message)) => write!(f, "HTTP {}: {}", status, message),
            (Some(status), None) => write!(f, "HTTP {}", status),
            (None, Some(message)) => f.write_str(message),
            (None, None) => f.write_str("unknown error"),
        }
    }
}

/// Classified outcome of a provider upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderResult {
    /// The record was created
    Success,
    /// The record is already present with acceptable content
    AlreadyExists,
    /// Anything else
    Failure(FailureDetails),
}

impl ProviderResult {
    /// Classify a provider response body.
    ///
    /// `AlreadyExists` requires the error list to be exactly one entry
    /// carrying [`RECORD_ALREADY_EXISTS`]; mixed error lists are failures.
    pub fn classify(success: bool, errors: Vec<ApiMessage>, status: Option<u16>) -> Self {
        if success {
            return Self::Success;
        }
        match errors.as_slice() {
            [only] if only.code == RECORD_ALREADY_EXISTS => Self::AlreadyExists,
            _ => Self::Failure(FailureDetails {
                errors,
                status,
                message: None,
            }),
        }
    }

    /// `Success` and `AlreadyExists` are equivalent for control flow
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success | Self::AlreadyExists)
    }

    /// Failure details, if any
    pub fn failure(&self) -> Option<&FailureDetails> {
        match self {
            Self::Failure(details) => Some(details),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("created"),
            Self::AlreadyExists => f.write_str("already exists"),
            Self::Failure(details) => write!(f, "failed [{}]", details),
        }
    }
}

/// Trait for DNS provider implementations
///
/// Providers are stateless and single-shot: one HTTP request per call, no
/// retries, no background tasks. Retrying is the next reconciliation cycle.
///
/// # Errors
///
/// Every provider-side problem is folded into [`ProviderResult::Failure`].
/// `Err` is reserved for a client that can no longer be used at all
/// ([`crate::Error::Connection`]); it terminates the reconciliation loop.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Create-or-confirm a single record in the configured zone
    async fn upsert_record(&self, record: &DnsRecord) -> crate::Result<ProviderResult>;

    /// Prove the configured credentials can write to the zone.
    ///
    /// The default upserts the verification record, which leaves a permanent
    /// marker that makes every later validation an `AlreadyExists`.
    async fn validate_credentials(&self) -> crate::Result<ProviderResult> {
        self.upsert_record(&DnsRecord::verification()).await
    }

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(code: i64) -> ApiMessage {
        ApiMessage {
            code,
            message: format!("error {}", code),
        }
    }

    #[test]
    fn success_flag_wins() {
        assert_eq!(ProviderResult::classify(true, vec![], Some(200)), ProviderResult::Success);
    }

    #[test]
    fn single_already_exists_code_is_tolerated() {
        let result = ProviderResult::classify(false, vec![msg(RECORD_ALREADY_EXISTS)], Some(400));
        assert_eq!(result, ProviderResult::AlreadyExists);
        assert!(result.is_ok());
    }

    #[test]
    fn already_exists_mixed_with_other_codes_is_a_failure() {
        let result = ProviderResult::classify(
            false,
            vec![msg(RECORD_ALREADY_EXISTS), msg(9000)],
            Some(400),
        );
        assert!(!result.is_ok());
        assert_eq!(result.failure().unwrap().codes(), "81058, 9000");
    }

    #[test]
    fn failure_without_errors_reports_status() {
        let result = ProviderResult::classify(false, vec![], Some(503));
        assert_eq!(result.to_string(), "failed [HTTP 503]");
    }

    #[test]
    fn transport_failure_display() {
        let details = FailureDetails::transport("timed out");
        assert_eq!(details.codes(), "");
        assert_eq!(details.to_string(), "timed out");
    }
}
