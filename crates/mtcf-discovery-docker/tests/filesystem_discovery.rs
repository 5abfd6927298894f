//! Filesystem discovery over a fake container runtime
//!
//! Constraints verified:
//! - One broken unit never aborts the pass
//! - Each broken unit yields exactly one skipped entry carrying its name
//! - Each broken unit logs exactly one warning naming it
//! - Runtime connectivity loss is fatal

use mtcf_core::traits::{DiscoveryOutcome, ServerDiscovery};
use mtcf_core::{Error, Result};
use mtcf_discovery_docker::{ContainerSource, DNS_FILE_NAME, FilesystemDiscovery, RuntimeUnit};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

struct FakeRuntime {
    units: Option<Vec<RuntimeUnit>>,
}

#[async_trait::async_trait]
impl ContainerSource for FakeRuntime {
    async fn running_units(&self) -> Result<Vec<RuntimeUnit>> {
        self.units
            .clone()
            .ok_or_else(|| Error::connection("docker socket closed"))
    }

    fn runtime_name(&self) -> &'static str {
        "fake"
    }
}

fn write_descriptor(dir: &Path, subdomain: &str) {
    let body = format!(
        r#"{{"ipAddress": "10.0.0.9", "port": 25565, "domain": "example.com", "subdomain": "{}"}}"#,
        subdomain
    );
    std::fs::write(dir.join(DNS_FILE_NAME), body).unwrap();
}

fn unit(name: &str, dir: &TempDir) -> RuntimeUnit {
    RuntimeUnit::new(name, Some(dir.path().to_path_buf()))
}

/// Log sink shared between the subscriber and the test
#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLog {
    fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn expect_replace(outcome: DiscoveryOutcome) -> (Vec<mtcf_core::Server>, Vec<mtcf_core::SkippedEntry>) {
    match outcome {
        DiscoveryOutcome::Replace { servers, skipped } => (servers, skipped),
        other => panic!("expected Replace, got {:?}", other),
    }
}

#[tokio::test]
async fn every_valid_unit_becomes_a_server() {
    let dirs: Vec<TempDir> = (0..3).map(|_| TempDir::new().unwrap()).collect();
    for (i, dir) in dirs.iter().enumerate() {
        write_descriptor(dir.path(), &format!("srv{}", i));
    }
    let units = dirs
        .iter()
        .enumerate()
        .map(|(i, dir)| unit(&format!("moonlight-runtime-{}", i), dir))
        .collect();

    let discovery = FilesystemDiscovery::new(FakeRuntime { units: Some(units) });
    let (servers, skipped) = expect_replace(discovery.discover().await.unwrap());

    assert_eq!(servers.len(), 3);
    assert_eq!(servers[2].subdomain, "srv2");
    assert!(skipped.is_empty());
}

#[tokio::test]
async fn one_unparsable_unit_is_skipped_alone() {
    let dirs: Vec<TempDir> = (0..4).map(|_| TempDir::new().unwrap()).collect();
    for (i, dir) in dirs.iter().enumerate() {
        if i == 2 {
            std::fs::write(dir.path().join(DNS_FILE_NAME), "{ not json").unwrap();
        } else {
            write_descriptor(dir.path(), &format!("srv{}", i));
        }
    }
    let units = dirs
        .iter()
        .enumerate()
        .map(|(i, dir)| unit(&format!("moonlight-runtime-{}", i), dir))
        .collect();

    let discovery = FilesystemDiscovery::new(FakeRuntime { units: Some(units) });
    let (servers, skipped) = expect_replace(discovery.discover().await.unwrap());

    assert_eq!(servers.len(), 3);
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].unit, "moonlight-runtime-2");
}

#[tokio::test]
async fn broken_unit_logs_one_warning_with_its_name() {
    let dirs: Vec<TempDir> = (0..3).map(|_| TempDir::new().unwrap()).collect();
    for (i, dir) in dirs.iter().enumerate() {
        if i == 1 {
            std::fs::write(dir.path().join(DNS_FILE_NAME), r#"{"port": 25565}"#).unwrap();
        } else {
            write_descriptor(dir.path(), &format!("srv{}", i));
        }
    }
    let units = dirs
        .iter()
        .enumerate()
        .map(|(i, dir)| unit(&format!("moonlight-runtime-{}", i), dir))
        .collect();

    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let discovery = FilesystemDiscovery::new(FakeRuntime { units: Some(units) });
    let (servers, skipped) = expect_replace(discovery.discover().await.unwrap());

    assert_eq!(servers.len(), 2);
    assert_eq!(skipped.len(), 1);

    let warnings: Vec<String> = log
        .lines()
        .into_iter()
        .filter(|line| line.contains("WARN"))
        .collect();
    assert_eq!(warnings.len(), 1, "got {:?}", warnings);
    assert!(warnings[0].contains("moonlight-runtime-1"));
    assert!(!warnings[0].contains("moonlight-runtime-0"));
}

#[tokio::test]
async fn missing_file_and_missing_mount_are_skipped() {
    let with_file = TempDir::new().unwrap();
    write_descriptor(with_file.path(), "play");
    let empty = TempDir::new().unwrap();

    let units = vec![
        unit("moonlight-runtime-a", &with_file),
        unit("moonlight-runtime-b", &empty),
        RuntimeUnit::new("moonlight-runtime-c", None),
    ];

    let discovery = FilesystemDiscovery::new(FakeRuntime { units: Some(units) });
    let (servers, skipped) = expect_replace(discovery.discover().await.unwrap());

    assert_eq!(servers.len(), 1);
    let names: Vec<_> = skipped.iter().map(|s| s.unit.as_str()).collect();
    assert_eq!(names, vec!["moonlight-runtime-b", "moonlight-runtime-c"]);
}

#[tokio::test]
async fn no_units_is_an_empty_replacement() {
    let discovery = FilesystemDiscovery::new(FakeRuntime { units: Some(vec![]) });

    assert_eq!(
        discovery.discover().await.unwrap(),
        DiscoveryOutcome::replace(vec![])
    );
}

#[tokio::test]
async fn runtime_loss_is_fatal() {
    let discovery = FilesystemDiscovery::new(FakeRuntime { units: None });

    let err = discovery.discover().await.unwrap_err();

    assert!(err.is_fatal());
}
