//! One-shot credential check performed before monitoring starts

use crate::error::{Error, Result};
use crate::traits::{DnsProvider, ProviderResult};
use std::sync::Arc;
use tracing::info;

/// Proves the DNS provider accepts writes to the configured zone
#[derive(Clone)]
pub struct BootstrapValidator {
    provider: Arc<dyn DnsProvider>,
}

impl BootstrapValidator {
    pub fn new(provider: Arc<dyn DnsProvider>) -> Self {
        Self { provider }
    }

    /// Upsert the verification record.
    ///
    /// `Success` and `AlreadyExists` pass. Any other outcome is an
    /// [`Error::Validation`]; this is the only place a provider failure is
    /// fatal instead of logged and skipped.
    pub async fn validate(&self) -> Result<ProviderResult> {
        let result = self.provider.validate_credentials().await?;

        match result {
            ProviderResult::Failure(details) => Err(Error::validation(format!(
                "Could not verify {} configuration [{}]",
                self.provider.provider_name(),
                details
            ))),
            ok => {
                info!(
                    "Verification record for {} {}",
                    self.provider.provider_name(),
                    ok
                );
                Ok(ok)
            }
        }
    }
}
