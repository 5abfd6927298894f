//! Per-server DNS synchronization
//!
//! For one [`Server`] the engine upserts the `A` record and then, always, the
//! `SRV` record. The two upserts are independent; only the *reporting* gives
//! the A record precedence.

use crate::error::Result;
use crate::records::DnsRecord;
use crate::server::Server;
use crate::traits::{DnsProvider, FailureDetails, ProviderResult};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What happened to one server during a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Both records are present
    Synced {
        a: ProviderResult,
        srv: ProviderResult,
    },
    /// The A record could not be written; SRV issues are not reported
    ARecordFailed(FailureDetails),
    /// The A record is fine, the SRV record could not be written
    SrvRecordFailed(FailureDetails),
}

impl SyncOutcome {
    /// Whether both records are in place
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced { .. })
    }
}

/// Drives the DNS provider for individual servers
#[derive(Clone)]
pub struct SyncEngine {
    provider: Arc<dyn DnsProvider>,
}

impl SyncEngine {
    pub fn new(provider: Arc<dyn DnsProvider>) -> Self {
        Self { provider }
    }

    /// Upsert both records for `server`.
    ///
    /// No retries: a server left unsynced is recomputed and retried on the
    /// next scheduled cycle.
    ///
    /// # Errors
    ///
    /// Only when the provider reports its client is unusable.
    pub async fn sync(&self, server: &Server) -> Result<SyncOutcome> {
        let a_result = self.provider.upsert_record(&DnsRecord::a_for(server)).await?;
        let srv_result = self.provider.upsert_record(&DnsRecord::srv_for(server)).await?;

        let outcome = match (a_result, srv_result) {
            (ProviderResult::Failure(details), _) => {
                warn!(
                    "Could not create A Record for: {} [{}]",
                    server.fqdn(),
                    details
                );
                SyncOutcome::ARecordFailed(details)
            }
            (_, ProviderResult::Failure(details)) => {
                error!(
                    "Could not create SRV Record for: {} [{}]",
                    server.fqdn(),
                    details
                );
                SyncOutcome::SrvRecordFailed(details)
            }
            (a, srv) => {
                info!("Updated records for {} (A: {}, SRV: {})", server.fqdn(), a, srv);
                SyncOutcome::Synced { a, srv }
            }
        };

        Ok(outcome)
    }

    /// Name of the provider behind this engine
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }
}
