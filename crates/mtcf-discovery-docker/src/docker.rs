//! Docker implementation of [`ContainerSource`]

use crate::{ContainerSource, RuntimeUnit};
use bollard::Docker;
use bollard::models::ContainerSummary;
use bollard::query_parameters::ListContainersOptions;
use mtcf_core::{Error, MoonlightConfig, Result};
use std::path::PathBuf;

/// Running containers of the local Docker daemon
pub struct DockerContainers {
    docker: Docker,

    /// Managed containers are named `{prefix}{id}`
    prefix: String,

    /// Mount destination holding `dns.json` inside the container
    mount: String,
}

impl DockerContainers {
    /// Connect using the platform defaults (`DOCKER_HOST` or the local socket)
    ///
    /// Connecting is lazy in bollard; an unreachable daemon surfaces on the
    /// first listing.
    pub fn connect(prefix: impl Into<String>, mount: impl Into<String>) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| Error::connection(format!("Failed to connect to Docker: {}", e)))?;

        Ok(Self::with_client(docker, prefix, mount))
    }

    /// Build from the moonlight-mode configuration
    pub fn from_config(config: &MoonlightConfig) -> Result<Self> {
        Self::connect(config.container_prefix.clone(), config.container_mount.clone())
    }

    pub fn with_client(docker: Docker, prefix: impl Into<String>, mount: impl Into<String>) -> Self {
        Self {
            docker,
            prefix: prefix.into(),
            mount: mount.into(),
        }
    }
}

/// Turn a container listing entry into a unit, if it is managed
///
/// Docker prefixes container names with "/", which is stripped before the
/// prefix match.
pub fn unit_from_summary(summary: &ContainerSummary, prefix: &str, mount: &str) -> Option<RuntimeUnit> {
    let name = summary
        .names
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|name| name.trim_start_matches('/'))
        .find(|name| name.starts_with(prefix))?;

    let mount_source = summary
        .mounts
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|m| m.destination.as_deref() == Some(mount))
        .and_then(|m| m.source.as_deref())
        .map(PathBuf::from);

    Some(RuntimeUnit::new(name, mount_source))
}

#[async_trait::async_trait]
impl ContainerSource for DockerContainers {
    async fn running_units(&self) -> Result<Vec<RuntimeUnit>> {
        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions {
                all: false,
                ..Default::default()
            }))
            .await
            .map_err(|e| Error::connection(format!("Failed to list containers: {}", e)))?;

        Ok(containers
            .iter()
            .filter_map(|summary| unit_from_summary(summary, &self.prefix, &self.mount))
            .collect())
    }

    fn runtime_name(&self) -> &'static str {
        "docker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::MountPoint;

    const PREFIX: &str = "moonlight-runtime-";
    const MOUNT: &str = "/home/container";

    fn summary(name: &str, mounts: Vec<(&str, &str)>) -> ContainerSummary {
        ContainerSummary {
            names: Some(vec![format!("/{}", name)]),
            mounts: Some(
                mounts
                    .into_iter()
                    .map(|(source, destination)| MountPoint {
                        source: Some(source.to_string()),
                        destination: Some(destination.to_string()),
                        ..Default::default()
                    })
                    .collect(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn test_managed_container_with_mount() {
        let entry = summary(
            "moonlight-runtime-42",
            vec![("/tmp/other", "/data"), ("/srv/volumes/42", MOUNT)],
        );

        let unit = unit_from_summary(&entry, PREFIX, MOUNT).unwrap();

        assert_eq!(unit.name, "moonlight-runtime-42");
        assert_eq!(unit.mount_source, Some(PathBuf::from("/srv/volumes/42")));
    }

    #[test]
    fn test_unmanaged_container_is_ignored() {
        let entry = summary("postgres", vec![("/srv/pg", MOUNT)]);
        assert!(unit_from_summary(&entry, PREFIX, MOUNT).is_none());
    }

    #[test]
    fn test_managed_container_without_mount() {
        let entry = summary("moonlight-runtime-7", vec![("/srv/x", "/data")]);

        let unit = unit_from_summary(&entry, PREFIX, MOUNT).unwrap();

        assert_eq!(unit.mount_source, None);
    }

    #[test]
    fn test_missing_names_is_ignored() {
        let entry = ContainerSummary::default();
        assert!(unit_from_summary(&entry, PREFIX, MOUNT).is_none());
    }
}
