//! Server registry
//!
//! The registry holds the desired server set as an immutable snapshot. Each
//! discovery cycle builds a brand new snapshot and swaps it in with a single
//! pointer assignment under the write guard, so a reader always sees either
//! the complete previous set or the complete new one.
//!
//! ## Ownership
//!
//! ```text
//! ┌────────────────────┐  replace()   ┌──────────────────────┐
//! │ reconciliation     │─────────────▶│ Arc<RwLock<Arc<[S]>>>│
//! │ loop (sole writer) │              └──────────────────────┘
//! └────────────────────┘                 ▲            ▲
//!                                snapshot()      snapshot()
//!                                        │            │
//!                              RegistryReader   RegistryReader
//!                              (exposure API)   (tests, logs)
//! ```
//!
//! [`ServerRegistry`] is not `Clone` and `replace` takes
//! `&mut self`: there is exactly one mutator.

use crate::server::Server;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Immutable view of the registry at one point in time
pub type Snapshot = Arc<[Server]>;

/// The writable registry, owned by the reconciliation loop
#[derive(Debug)]
pub struct ServerRegistry {
    shared: Arc<RwLock<Snapshot>>,
}

impl ServerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::with_servers(Vec::new())
    }

    /// Create a registry pre-populated with `servers`
    pub fn with_servers(servers: Vec<Server>) -> Self {
        Self {
            shared: Arc::new(RwLock::new(Arc::from(servers))),
        }
    }

    /// Replace the whole server set, returning the new count
    pub async fn replace(&mut self, servers: Vec<Server>) -> usize {
        let next: Snapshot = Arc::from(servers);
        let count = next.len();
        *self.shared.write().await = next;
        count
    }

    /// Current snapshot
    pub async fn snapshot(&self) -> Snapshot {
        self.shared.read().await.clone()
    }

    /// Number of servers in the current snapshot
    pub async fn len(&self) -> usize {
        self.shared.read().await.len()
    }

    /// Check if the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.shared.read().await.is_empty()
    }

    /// Read-only handle sharing this registry
    pub fn reader(&self) -> RegistryReader {
        RegistryReader {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Default for ServerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only registry handle for concurrent consumers
#[derive(Debug, Clone)]
pub struct RegistryReader {
    shared: Arc<RwLock<Snapshot>>,
}

impl RegistryReader {
    /// Current snapshot
    pub async fn snapshot(&self) -> Snapshot {
        self.shared.read().await.clone()
    }
}
