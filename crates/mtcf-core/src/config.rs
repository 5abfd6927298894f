//! Configuration types for the MTCF system
//!
//! Configuration comes from a newline-delimited `KEY=VALUE` file. Which keys
//! are required depends on the process [`Mode`]; all of them are checked
//! before any network call is made, and every missing key is reported at
//! once.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

/// Cloudflare API token
pub const CLOUDFLARE_API_KEY: &str = "CLOUDFLAREAPIKEY";
/// Cloudflare zone identifier
pub const CLOUDFLARE_ZONE_ID: &str = "CLOUDFLAREZONEID";
/// Shared bearer key between the panel side and the DNS side
pub const MOONLIGHT_API_KEY: &str = "MOONLIGHTAPIKEY";
/// Base URL of the panel-side exposure endpoint (cloudflare mode)
pub const MOONLIGHT_API_URL: &str = "MOONLIGHTAPIURL";
/// Public URL of the panel itself (moonlight mode, informational)
pub const MOONLIGHT_PANEL_URL: &str = "MOONLIGHTPANELURL";
/// Listen address of the exposure endpoint (moonlight mode, optional)
pub const EXPOSURE_BIND_ADDR: &str = "EXPOSUREBINDADDR";
/// Container name prefix marking managed units (moonlight mode, optional)
pub const CONTAINER_PREFIX: &str = "CONTAINERPREFIX";
/// In-container path whose host mount holds `dns.json` (moonlight mode, optional)
pub const CONTAINER_MOUNT: &str = "CONTAINERMOUNT";

/// Default listen address of the exposure endpoint
pub const DEFAULT_EXPOSURE_BIND_ADDR: &str = "0.0.0.0:5100";
/// Default managed container name prefix
pub const DEFAULT_CONTAINER_PREFIX: &str = "moonlight-runtime-";
/// Default in-container data directory
pub const DEFAULT_CONTAINER_MOUNT: &str = "/home/container";

/// Process mode, selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Validate credentials, then reconcile panel servers into Cloudflare DNS
    Cloudflare,
    /// Discover local containers and expose them to the cloudflare side
    Moonlight,
}

impl Mode {
    /// Keys that must be present and non-empty for this mode
    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            Mode::Cloudflare => &[
                CLOUDFLARE_API_KEY,
                CLOUDFLARE_ZONE_ID,
                MOONLIGHT_API_KEY,
                MOONLIGHT_API_URL,
            ],
            Mode::Moonlight => &[MOONLIGHT_API_KEY],
        }
    }

    /// Mode name as accepted on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Cloudflare => "cloudflare",
            Mode::Moonlight => "moonlight",
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cloudflare" => Ok(Mode::Cloudflare),
            "moonlight" => Ok(Mode::Moonlight),
            other => Err(Error::config(format!(
                "Mode '{}' not supported. Use 'moonlight' or 'cloudflare'",
                other
            ))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Untyped `KEY=VALUE` settings as read from disk
#[derive(Clone, Default)]
pub struct RawConfig {
    values: HashMap<String, String>,
}

impl RawConfig {
    /// Parse `KEY=VALUE` lines.
    ///
    /// Lines are split at the first `=`; both sides are trimmed. Blank lines,
    /// `#` comments and lines without `=` are ignored. Later keys win.
    pub fn parse(text: &str) -> Self {
        let values = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();

        Self { values }
    }

    /// Read and parse a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// Non-empty value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.get(key)
            .map(str::to_string)
            .ok_or_else(|| Error::config(format!("Missing configuration values for: {}", key)))
    }

    /// Fail with every missing key named, in declaration order
    pub fn check_required(&self, mode: Mode) -> Result<()> {
        let missing: Vec<&str> = mode
            .required_keys()
            .iter()
            .copied()
            .filter(|key| self.get(key).is_none())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::config(format!(
                "Missing configuration values for: {}",
                missing.join(", ")
            )))
        }
    }
}

// Values may be secrets
impl fmt::Debug for RawConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("RawConfig").field("keys", &keys).finish()
    }
}

/// Settings for cloudflare mode
#[derive(Clone)]
pub struct CloudflareConfig {
    /// ⚠️ NEVER log this value
    pub cloudflare_api_key: String,
    pub zone_id: String,
    /// ⚠️ NEVER log this value
    pub moonlight_api_key: String,
    /// Base URL of the panel-side exposure endpoint, without trailing slash
    pub moonlight_api_url: String,
}

impl fmt::Debug for CloudflareConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareConfig")
            .field("cloudflare_api_key", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("moonlight_api_key", &"<REDACTED>")
            .field("moonlight_api_url", &self.moonlight_api_url)
            .finish()
    }
}

/// Settings for moonlight mode
#[derive(Clone)]
pub struct MoonlightConfig {
    /// ⚠️ NEVER log this value
    pub moonlight_api_key: String,
    pub panel_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub container_prefix: String,
    pub container_mount: String,
}

impl fmt::Debug for MoonlightConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoonlightConfig")
            .field("moonlight_api_key", &"<REDACTED>")
            .field("panel_url", &self.panel_url)
            .field("bind_addr", &self.bind_addr)
            .field("container_prefix", &self.container_prefix)
            .field("container_mount", &self.container_mount)
            .finish()
    }
}

/// Fully validated configuration for the active mode
#[derive(Debug, Clone)]
pub enum AppConfig {
    Cloudflare(CloudflareConfig),
    Moonlight(MoonlightConfig),
}

impl AppConfig {
    /// Validate `raw` against `mode`
    pub fn from_raw(mode: Mode, raw: &RawConfig) -> Result<Self> {
        raw.check_required(mode)?;

        match mode {
            Mode::Cloudflare => {
                let moonlight_api_url = raw.require(MOONLIGHT_API_URL)?;
                validate_url(MOONLIGHT_API_URL, &moonlight_api_url)?;

                Ok(AppConfig::Cloudflare(CloudflareConfig {
                    cloudflare_api_key: raw.require(CLOUDFLARE_API_KEY)?,
                    zone_id: raw.require(CLOUDFLARE_ZONE_ID)?,
                    moonlight_api_key: raw.require(MOONLIGHT_API_KEY)?,
                    moonlight_api_url: moonlight_api_url.trim_end_matches('/').to_string(),
                }))
            }
            Mode::Moonlight => {
                let bind_addr = raw
                    .get(EXPOSURE_BIND_ADDR)
                    .unwrap_or(DEFAULT_EXPOSURE_BIND_ADDR);
                let bind_addr: SocketAddr = bind_addr.parse().map_err(|e| {
                    Error::config(format!(
                        "{} must be a socket address like {}. Got: {} ({})",
                        EXPOSURE_BIND_ADDR, DEFAULT_EXPOSURE_BIND_ADDR, bind_addr, e
                    ))
                })?;

                let panel_url = raw.get(MOONLIGHT_PANEL_URL).map(str::to_string);
                if let Some(ref url) = panel_url {
                    validate_url(MOONLIGHT_PANEL_URL, url)?;
                }

                Ok(AppConfig::Moonlight(MoonlightConfig {
                    moonlight_api_key: raw.require(MOONLIGHT_API_KEY)?,
                    panel_url,
                    bind_addr,
                    container_prefix: raw
                        .get(CONTAINER_PREFIX)
                        .unwrap_or(DEFAULT_CONTAINER_PREFIX)
                        .to_string(),
                    container_mount: raw
                        .get(CONTAINER_MOUNT)
                        .unwrap_or(DEFAULT_CONTAINER_MOUNT)
                        .to_string(),
                }))
            }
        }
    }

    /// Mode this configuration was validated for
    pub fn mode(&self) -> Mode {
        match self {
            AppConfig::Cloudflare(_) => Mode::Cloudflare,
            AppConfig::Moonlight(_) => Mode::Moonlight,
        }
    }
}

fn validate_url(key: &str, url: &str) -> Result<()> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(Error::config(format!(
            "{} must use HTTP or HTTPS scheme. Got: {}",
            key, url
        )))
    }
}
