// # Container Filesystem Discovery
//
// This crate provides the moonlight-mode `ServerDiscovery` source. Each
// managed container carries a `dns.json` file in its data mount describing
// the server it runs:
//
// ```json
// {"ipAddress": "203.0.113.7", "port": 25565, "domain": "example.com", "subdomain": "play"}
// ```
//
// ## Architecture
//
// - [`ContainerSource`] lists running units and where their mount lives on
//   the host. [`DockerContainers`] is the bollard-backed implementation.
// - [`FilesystemDiscovery`] reads `{mount}/dns.json` for every unit. A unit
//   without the mount, without the file or with an unparsable file is
//   skipped with a single warning; the others still make the pass.

pub mod docker;

pub use docker::DockerContainers;

use mtcf_core::traits::{DiscoveryOutcome, ServerDiscovery, SkippedEntry};
use mtcf_core::{Result, Server};
use std::path::{Path, PathBuf};

/// Name of the per-container descriptor file
pub const DNS_FILE_NAME: &str = "dns.json";

/// A running container as seen by discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeUnit {
    /// Container name without the leading `/`
    pub name: String,
    /// Host path backing the configured container mount, if present
    pub mount_source: Option<PathBuf>,
}

impl RuntimeUnit {
    pub fn new(name: impl Into<String>, mount_source: Option<PathBuf>) -> Self {
        Self {
            name: name.into(),
            mount_source,
        }
    }
}

/// Lists the managed units currently running
///
/// # Errors
///
/// `Error::Connection` when the container runtime cannot be reached.
#[async_trait::async_trait]
pub trait ContainerSource: Send + Sync {
    async fn running_units(&self) -> Result<Vec<RuntimeUnit>>;

    /// Source name (for logging)
    fn runtime_name(&self) -> &'static str;
}

/// Discovery over the `dns.json` files of running units
pub struct FilesystemDiscovery<S> {
    source: S,
}

impl<S: ContainerSource> FilesystemDiscovery<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Read one unit's descriptor
    async fn read_unit(unit: &RuntimeUnit) -> std::result::Result<Server, String> {
        let mount = unit
            .mount_source
            .as_deref()
            .ok_or_else(|| "container has no data mount".to_string())?;

        read_descriptor(mount).await
    }
}

async fn read_descriptor(mount: &Path) -> std::result::Result<Server, String> {
    let path = mount.join(DNS_FILE_NAME);
    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;

    serde_json::from_str::<Server>(&text)
        .map_err(|e| format!("invalid {}: {}", path.display(), e))
}

#[async_trait::async_trait]
impl<S: ContainerSource> ServerDiscovery for FilesystemDiscovery<S> {
    async fn discover(&self) -> Result<DiscoveryOutcome> {
        let units = self.source.running_units().await?;

        let mut servers = Vec::with_capacity(units.len());
        let mut skipped = Vec::new();

        for unit in &units {
            match Self::read_unit(unit).await {
                Ok(server) => servers.push(server),
                Err(reason) => {
                    tracing::warn!("Skipping container {}: {}", unit.name, reason);
                    skipped.push(SkippedEntry::new(unit.name.clone(), reason));
                }
            }
        }

        tracing::debug!(
            "Discovered {} server(s) from {} {} unit(s)",
            servers.len(),
            units.len(),
            self.source.runtime_name()
        );

        Ok(DiscoveryOutcome::Replace { servers, skipped })
    }

    fn source_name(&self) -> &'static str {
        "containers"
    }
}
