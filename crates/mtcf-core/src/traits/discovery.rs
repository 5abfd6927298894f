// # Server Discovery Trait
//
// Defines the interface for producing the desired server set each cycle.
//
// ## Implementations
//
// - Remote panel (`GET {url}/servers`): `mtcf-discovery-panel` crate
// - Local containers (`{mount}/dns.json`): `mtcf-discovery-docker` crate
//
// The variant is chosen once at startup from the process mode.

use crate::server::Server;
use async_trait::async_trait;

/// An entry that could not be turned into a [`Server`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Identity of the offending entry (container name, array index, ...)
    pub unit: String,
    /// Why it was skipped
    pub reason: String,
}

impl SkippedEntry {
    pub fn new(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            reason: reason.into(),
        }
    }
}

/// Result of one discovery pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// Replace the registry wholesale with `servers`
    Replace {
        servers: Vec<Server>,
        /// Entries dropped from this pass (already logged by the source)
        skipped: Vec<SkippedEntry>,
    },
    /// Keep the current registry; nothing trustworthy was fetched
    Unchanged {
        reason: String,
    },
}

impl DiscoveryOutcome {
    /// Replacement without skipped entries
    pub fn replace(servers: Vec<Server>) -> Self {
        Self::Replace {
            servers,
            skipped: Vec::new(),
        }
    }

    /// No update this cycle
    pub fn unchanged(reason: impl Into<String>) -> Self {
        Self::Unchanged {
            reason: reason.into(),
        }
    }
}

/// Trait for discovery sources
///
/// A source must never let one malformed entry abort the whole pass: bad
/// entries are logged (warn, with their identity) and reported in the
/// `skipped` list of [`DiscoveryOutcome::Replace`].
///
/// # Errors
///
/// `Err` means the underlying connectivity handle is gone
/// ([`crate::Error::Connection`]) and terminates the loop. Transient
/// fetch problems are `Ok(DiscoveryOutcome::Unchanged)`.
#[async_trait]
pub trait ServerDiscovery: Send + Sync {
    /// Compute the current desired server set
    async fn discover(&self) -> crate::Result<DiscoveryOutcome>;

    /// Source name (for logging)
    fn source_name(&self) -> &'static str;
}
