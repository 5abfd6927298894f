//! Reconciliation loop
//!
//! The [`Monitor`] is responsible for:
//! - Validating provider credentials once at startup
//! - Refreshing the [`ServerRegistry`] from a [`ServerDiscovery`] source
//! - Driving the [`SyncEngine`] over every server when the registry changed
//!
//! ## State machine
//!
//! ```text
//!  ┌──────┐  start   ┌────────────┐   ok    ┌────────────┐
//!  │ Idle │─────────▶│ Validating │────────▶│ Monitoring │──┐ every interval:
//!  └──────┘          └────────────┘         └────────────┘◀─┘ discover + sync
//!                          │ failure               │ connection lost
//!                          ▼                       ▼
//!                    ┌──────────────────────────────────┐
//!                    │            Terminated            │
//!                    └──────────────────────────────────┘
//! ```
//!
//! ## Cycle
//!
//! 1. Sleep the interval (30 seconds by default)
//! 2. Run discovery; on `Replace`, swap the registry snapshot
//! 3. If the server count differs from the previous cycle, sync every
//!    server sequentially in registry order
//!
//! Step 3 is count-gated: a cycle that swaps one server for another keeps
//! the same count and issues no upserts. Records of servers that vanished
//! are never deleted.

pub mod sync;
pub mod validator;

pub use sync::{SyncEngine, SyncOutcome};
pub use validator::BootstrapValidator;

use crate::error::{Error, Result};
use crate::registry::{RegistryReader, ServerRegistry};
use crate::traits::{DiscoveryOutcome, DnsProvider, ServerDiscovery};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Delay between discovery cycles
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Default capacity of the monitor event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Lifecycle of the reconciliation loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Validating,
    Monitoring,
    /// Final. The process must be restarted externally.
    Terminated,
}

/// Events emitted by the Monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Lifecycle transition
    StateChanged(LoopState),

    /// Discovery replaced the registry
    RegistryReplaced {
        count: usize,
        skipped: usize,
    },

    /// Discovery kept the previous registry
    RegistryUnchanged {
        reason: String,
    },

    /// One server went through the sync engine
    ServerSynced {
        server: String,
        outcome: SyncOutcome,
    },

    /// Cycle finished
    CycleCompleted(CycleReport),

    /// Loop stopped (shutdown or termination)
    Stopped {
        reason: String,
    },
}

/// Summary of a single cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Registry size after discovery
    pub servers: usize,
    /// Servers handed to the sync engine
    pub attempted: usize,
    /// Servers whose records are both in place
    pub synced: usize,
}

/// Discovery + DNS reconciliation loop
///
/// A monitor built with [`Monitor::discovery_only`] skips validation and
/// sync and only keeps the registry fresh (moonlight mode).
///
/// ## Threading
///
/// The monitor runs on a single task and is the sole writer of its
/// registry. Hand out [`RegistryReader`]s for concurrent consumers.
pub struct Monitor {
    /// Source of the desired server set
    discovery: Box<dyn ServerDiscovery>,

    /// DNS synchronization, absent in discovery-only mode
    sync: Option<SyncEngine>,

    /// Startup credential check, absent in discovery-only mode
    validator: Option<BootstrapValidator>,

    /// Desired servers (sole writer)
    registry: ServerRegistry,

    /// Delay between cycles
    interval: Duration,

    /// Registry size seen by the previous cycle
    last_count: usize,

    state: LoopState,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<MonitorEvent>,
}

impl Monitor {
    /// Create a full reconciliation loop
    ///
    /// # Returns
    ///
    /// A tuple of (monitor, event_receiver) where event_receiver yields monitor events
    pub fn reconciler(
        discovery: Box<dyn ServerDiscovery>,
        provider: Arc<dyn DnsProvider>,
    ) -> (Self, mpsc::Receiver<MonitorEvent>) {
        let (mut monitor, rx) = Self::discovery_only(discovery);
        monitor.validator = Some(BootstrapValidator::new(Arc::clone(&provider)));
        monitor.sync = Some(SyncEngine::new(provider));
        (monitor, rx)
    }

    /// Create a loop that only refreshes the registry
    pub fn discovery_only(
        discovery: Box<dyn ServerDiscovery>,
    ) -> (Self, mpsc::Receiver<MonitorEvent>) {
        let (tx, rx) = mpsc::channel(DEFAULT_EVENT_CHANNEL_CAPACITY);

        let monitor = Self {
            discovery,
            sync: None,
            validator: None,
            registry: ServerRegistry::new(),
            interval: DEFAULT_SYNC_INTERVAL,
            last_count: 0,
            state: LoopState::Idle,
            event_tx: tx,
        };

        (monitor, rx)
    }

    /// Override the delay between cycles
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Read-only handle on the registry this monitor writes
    pub fn reader(&self) -> RegistryReader {
        self.registry.reader()
    }

    /// Current lifecycle state
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run until SIGINT or a fatal error
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Validation failure or connectivity loss
    pub async fn run(&mut self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run until `shutdown_rx` fires (or its sender is dropped)
    ///
    /// **TESTING/EMBEDDING**: production binaries call [`Monitor::run`], or
    /// pass a receiver wired to their own signal handling.
    pub async fn run_with_shutdown(
        &mut self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(&mut self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        self.validate().await?;
        info!(
            "Monitoring {} every {:?}",
            self.discovery.source_name(),
            self.interval
        );

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        };
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(MonitorEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    return Ok(());
                }
                _ = tokio::time::sleep(self.interval) => {}
            }

            // Cycles are never interrupted; shutdown is only observed while sleeping
            self.run_cycle().await?;
        }
    }

    /// Transition out of `Idle`.
    ///
    /// Reconcilers validate credentials first; on failure the monitor is
    /// `Terminated` and no discovery or sync call is ever issued.
    pub async fn validate(&mut self) -> Result<()> {
        match self.state {
            LoopState::Idle => {}
            LoopState::Terminated => return Err(Error::other("monitor is terminated")),
            LoopState::Validating | LoopState::Monitoring => return Ok(()),
        }

        self.set_state(LoopState::Validating);

        let verdict = match self.validator.as_ref() {
            Some(validator) => Some(validator.validate().await),
            None => None,
        };

        if let Some(verdict) = verdict {
            match verdict {
                Ok(_) => info!("Configuration is valid. Monitoring..."),
                Err(e) => return Err(self.terminate(e)),
            }
        }

        self.set_state(LoopState::Monitoring);
        Ok(())
    }

    /// Run one discovery + sync cycle immediately (no sleep).
    ///
    /// # Errors
    ///
    /// Fatal errors only; the monitor is `Terminated` afterwards.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        match self.state {
            LoopState::Terminated => return Err(Error::other("monitor is terminated")),
            LoopState::Idle | LoopState::Validating => {
                return Err(Error::other("monitor has not been validated"));
            }
            LoopState::Monitoring => {}
        }

        match self.discovery.discover().await {
            Ok(DiscoveryOutcome::Replace { servers, skipped }) => {
                let count = self.registry.replace(servers).await;
                debug!(
                    "Registry replaced from {}: {} server(s), {} skipped",
                    self.discovery.source_name(),
                    count,
                    skipped.len()
                );
                self.emit_event(MonitorEvent::RegistryReplaced {
                    count,
                    skipped: skipped.len(),
                });
            }
            Ok(DiscoveryOutcome::Unchanged { reason }) => {
                debug!("Registry unchanged: {}", reason);
                self.emit_event(MonitorEvent::RegistryUnchanged { reason });
            }
            Err(e) if e.is_fatal() => return Err(self.terminate(e)),
            Err(e) => {
                warn!("Discovery failed, keeping previous registry: {}", e);
                self.emit_event(MonitorEvent::RegistryUnchanged {
                    reason: e.to_string(),
                });
            }
        }

        let mut report = CycleReport {
            servers: self.registry.len().await,
            ..CycleReport::default()
        };

        if report.servers == self.last_count {
            debug!("Server count unchanged ({}), skipping sync", report.servers);
            self.emit_event(MonitorEvent::CycleCompleted(report));
            return Ok(report);
        }

        let mut fatal = None;
        if let Some(engine) = self.sync.as_ref() {
            let snapshot = self.registry.snapshot().await;
            for server in snapshot.iter() {
                report.attempted += 1;
                match engine.sync(server).await {
                    Ok(outcome) => {
                        if outcome.is_synced() {
                            report.synced += 1;
                        }
                        self.emit_event(MonitorEvent::ServerSynced {
                            server: server.fqdn(),
                            outcome,
                        });
                    }
                    Err(e) if e.is_fatal() => {
                        fatal = Some(e);
                        break;
                    }
                    Err(e) => {
                        error!(
                            "Failed to sync {} via {}: {}",
                            server.fqdn(),
                            engine.provider_name(),
                            e
                        );
                    }
                }
            }
        }

        if let Some(e) = fatal {
            return Err(self.terminate(e));
        }

        self.last_count = report.servers;
        self.emit_event(MonitorEvent::CycleCompleted(report));
        Ok(report)
    }

    fn terminate(&mut self, e: Error) -> Error {
        error!("{}. Terminating.", e);
        self.set_state(LoopState::Terminated);
        self.emit_event(MonitorEvent::Stopped {
            reason: e.to_string(),
        });
        e
    }

    fn set_state(&mut self, state: LoopState) {
        self.state = state;
        self.emit_event(MonitorEvent::StateChanged(state));
    }

    /// Emit a monitor event
    fn emit_event(&self, event: MonitorEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Event channel closed, dropping event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_report_defaults_to_zero() {
        let report = CycleReport::default();
        assert_eq!(report.servers, 0);
        assert_eq!(report.attempted, 0);
        assert_eq!(report.synced, 0);
    }

    #[test]
    fn monitor_events_compare_by_value() {
        let event = MonitorEvent::StateChanged(LoopState::Monitoring);
        assert_eq!(event.clone(), event);
    }
}
