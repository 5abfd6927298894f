// # mtcf-core
//
// Core library keeping Cloudflare DNS records in sync with a changing set of
// game servers.
//
// ## Architecture Overview
//
// - **Server**: immutable desired-server value, identified by `subdomain.domain`
// - **DnsRecord**: A and SRV payloads derived from a Server, never stored
// - **ServerRegistry**: snapshot of desired servers, replaced wholesale
// - **ServerDiscovery**: trait producing the desired set each cycle
// - **DnsProvider**: trait for idempotent record upserts with classified results
// - **Monitor**: validation + discovery + count-gated sync loop
//
// ## Design Principles
//
// 1. **Idempotency**: upserts tolerate "already exists"; desired state is
//    recomputed from scratch every cycle
// 2. **Isolation**: one bad discovery entry or one failed record never
//    affects the others
// 3. **Single writer**: only the Monitor replaces the registry
// 4. **Library-First**: the daemon is a thin layer over this crate

pub mod config;
pub mod engine;
pub mod error;
pub mod records;
pub mod registry;
pub mod server;
pub mod traits;

// Re-export core types for convenience
pub use config::{AppConfig, CloudflareConfig, Mode, MoonlightConfig, RawConfig};
pub use engine::{
    BootstrapValidator, CycleReport, LoopState, Monitor, MonitorEvent, SyncEngine, SyncOutcome,
};
pub use error::{Error, Result};
pub use records::DnsRecord;
pub use registry::{RegistryReader, ServerRegistry, Snapshot};
pub use server::Server;
pub use traits::{DiscoveryOutcome, DnsProvider, ProviderResult, ServerDiscovery, SkippedEntry};
