// # mtcfd - MTCF Daemon
//
// Thin integration layer over mtcf-core. No reconciliation logic lives here.
//
// The daemon is responsible for:
// 1. Parsing `mtcfd <CONFIG> <MODE>`
// 2. Loading and validating the `KEY=VALUE` configuration file
// 3. Initializing tracing and the tokio runtime
// 4. Wiring the mode's discovery source, provider and exposure endpoint
// 5. Mapping the outcome to an exit code
//
// ## Modes
//
// - `cloudflare`: validate the Cloudflare token, then poll
//   `{MOONLIGHTAPIURL}/servers` and create A + SRV records
// - `moonlight`: read `dns.json` from managed containers and serve the result
//   on `GET /servers` for a cloudflare-mode instance
//
// ## Logging
//
// - `MTCF_LOG_LEVEL`: trace, debug, info, warn or error (default: info)
//
// ## Example
//
// ```bash
// cat > mtcf.env <<EOF
// CLOUDFLAREAPIKEY=your_token
// CLOUDFLAREZONEID=your_zone
// MOONLIGHTAPIKEY=shared_secret
// MOONLIGHTAPIURL=http://panel.internal:5100
// EOF
//
// mtcfd mtcf.env cloudflare
// ```

use anyhow::Result;
use clap::Parser;
use mtcf_core::{AppConfig, CloudflareConfig, Monitor, MonitorEvent, MoonlightConfig, Mode, RawConfig};
use mtcf_discovery_docker::{DockerContainers, FilesystemDiscovery};
use mtcf_discovery_panel::PanelDiscovery;
use mtcf_provider_cloudflare::CloudflareProvider;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Environment variable selecting the log level
const LOG_LEVEL_ENV: &str = "MTCF_LOG_LEVEL";

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (connectivity lost)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MtcfExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error, startup failure or rejected credentials
    ConfigError = 1,
    /// Runtime error (loop terminated)
    RuntimeError = 2,
}

impl From<MtcfExitCode> for ExitCode {
    fn from(code: MtcfExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Keep Cloudflare DNS records in sync with panel game servers
#[derive(Parser, Debug)]
#[command(name = "mtcfd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the KEY=VALUE configuration file
    config: PathBuf,

    /// Application mode: cloudflare or moonlight
    mode: String,
}

fn main() -> ExitCode {
    let log_level = match parse_log_level(env::var(LOG_LEVEL_ENV).ok().as_deref()) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return MtcfExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return MtcfExitCode::ConfigError.into();
    }

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            use clap::error::ErrorKind;
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                let _ = e.print();
                return MtcfExitCode::CleanShutdown.into();
            }
            error!("Missing configuration file or application mode.");
            let _ = e.print();
            return MtcfExitCode::ConfigError.into();
        }
    };

    let config = match load_config(&args.config, &args.mode) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return MtcfExitCode::ConfigError.into();
        }
    };

    info!(
        "Starting {} Service",
        match config.mode() {
            Mode::Cloudflare => "Cloudflare",
            Mode::Moonlight => "Moonlight",
        }
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return MtcfExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => MtcfExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {}", e);
                exit_code_for(&e)
            }
        }
    });

    result.into()
}

/// `MTCF_LOG_LEVEL` value to a tracing level
fn parse_log_level(value: Option<&str>) -> Result<Level> {
    let Some(value) = value else {
        return Ok(Level::INFO);
    };

    match value.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "{} '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            LOG_LEVEL_ENV,
            value
        ),
    }
}

/// File check, mode check, then key validation, in that order
fn load_config(path: &Path, mode: &str) -> mtcf_core::Result<AppConfig> {
    if !path.is_file() {
        return Err(mtcf_core::Error::config(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let mode: Mode = mode.parse()?;
    let raw = RawConfig::load(path)?;
    AppConfig::from_raw(mode, &raw)
}

/// Startup failures exit 1, loop termination exits 2
fn exit_code_for(e: &anyhow::Error) -> MtcfExitCode {
    match e.downcast_ref::<mtcf_core::Error>() {
        Some(mtcf_core::Error::Config(_)) | Some(mtcf_core::Error::Validation(_)) => {
            MtcfExitCode::ConfigError
        }
        _ => MtcfExitCode::RuntimeError,
    }
}

/// Run the daemon for the configured mode
async fn run_daemon(config: AppConfig) -> Result<()> {
    match config {
        AppConfig::Cloudflare(config) => run_cloudflare(config).await,
        AppConfig::Moonlight(config) => run_moonlight(config).await,
    }
}

async fn run_cloudflare(config: CloudflareConfig) -> Result<()> {
    let provider = CloudflareProvider::from_config(&config)?;
    let discovery = PanelDiscovery::from_config(&config)?;

    info!("Cloudflare zone: {}", config.zone_id);
    info!("Server list: {}", discovery.url());

    let (mut monitor, events) = Monitor::reconciler(Box::new(discovery), Arc::new(provider));
    tokio::spawn(log_events(events));

    let shutdown_rx = spawn_shutdown_listener()?;
    monitor.run_with_shutdown(Some(shutdown_rx)).await?;

    info!("Shutting down daemon");
    Ok(())
}

async fn run_moonlight(config: MoonlightConfig) -> Result<()> {
    if let Some(ref panel_url) = config.panel_url {
        info!("Panel: {}", panel_url);
    }

    let containers = DockerContainers::from_config(&config)?;
    info!(
        "Watching containers named {}* (mount {})",
        config.container_prefix, config.container_mount
    );

    let (mut monitor, events) = Monitor::discovery_only(Box::new(FilesystemDiscovery::new(containers)));
    tokio::spawn(log_events(events));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| {
            mtcf_core::Error::config(format!("Cannot bind {}: {}", config.bind_addr, e))
        })?;

    let reader = monitor.reader();
    let api_key = config.moonlight_api_key.clone();
    let mut exposure =
        tokio::spawn(async move { mtcf_exposure::serve(listener, reader, &api_key).await });

    let shutdown_rx = spawn_shutdown_listener()?;

    tokio::select! {
        result = monitor.run_with_shutdown(Some(shutdown_rx)) => {
            exposure.abort();
            result?;
        }
        joined = &mut exposure => {
            match joined {
                Ok(Ok(())) => anyhow::bail!("Exposure endpoint stopped unexpectedly"),
                Ok(Err(e)) => return Err(e.into()),
                Err(e) => anyhow::bail!("Exposure endpoint task failed: {}", e),
            }
        }
    }

    info!("Shutting down daemon");
    Ok(())
}

/// Forward monitor events to the log
async fn log_events(mut events: mpsc::Receiver<MonitorEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            MonitorEvent::RegistryReplaced { count, skipped } if skipped > 0 => {
                warn!("Registry replaced: {} server(s), {} skipped", count, skipped);
            }
            MonitorEvent::CycleCompleted(report) if report.attempted > 0 => {
                info!(
                    "Cycle completed: {}/{} server(s) synced",
                    report.synced, report.attempted
                );
            }
            other => debug!("Monitor event: {:?}", other),
        }
    }
}

/// Translate SIGTERM/SIGINT into the monitor's shutdown channel
fn spawn_shutdown_listener() -> Result<oneshot::Receiver<()>> {
    let (tx, rx) = oneshot::channel();
    let signals = shutdown_signals()?;

    tokio::spawn(async move {
        let signal = signals.await;
        info!("Received shutdown signal: {}", signal);
        let _ = tx.send(());
    });

    Ok(rx)
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// Handlers are installed before returning so no signal is lost while the
/// monitor validates.
#[cfg(unix)]
fn shutdown_signals() -> Result<impl std::future::Future<Output = &'static str>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signals() -> Result<impl std::future::Future<Output = &'static str>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                std::future::pending::<&'static str>().await
            }
        }
    })
}
