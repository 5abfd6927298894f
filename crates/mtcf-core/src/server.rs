//! The desired-server value type
//!
//! A [`Server`] is produced by a discovery provider each cycle and is never
//! mutated afterwards. Its JSON form is shared by the panel `/servers`
//! endpoint, the per-container `dns.json` file and the exposure endpoint.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A game server that must be reachable through DNS
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    /// IPv4 address the `A` record points at
    pub ip_address: String,
    /// Game port advertised through the `SRV` record
    pub port: u16,
    /// Zone apex (e.g. "example.com")
    pub domain: String,
    /// Record label inside the zone (e.g. "play")
    pub subdomain: String,
}

impl Server {
    /// Create a new server entry
    pub fn new(
        ip_address: impl Into<String>,
        port: u16,
        domain: impl Into<String>,
        subdomain: impl Into<String>,
    ) -> Self {
        Self {
            ip_address: ip_address.into(),
            port,
            domain: domain.into(),
            subdomain: subdomain.into(),
        }
    }

    /// Fully qualified host name, `subdomain.domain`
    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.subdomain, self.domain)
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}:{}", self.fqdn(), self.ip_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_json() {
        let server: Server = serde_json::from_str(
            r#"{"ipAddress":"10.0.0.5","port":25565,"domain":"example.com","subdomain":"play"}"#,
        )
        .unwrap();

        assert_eq!(server, Server::new("10.0.0.5", 25565, "example.com", "play"));
        assert_eq!(server.fqdn(), "play.example.com");
    }

    #[test]
    fn rejects_out_of_range_port() {
        let result = serde_json::from_str::<Server>(
            r#"{"ipAddress":"10.0.0.5","port":70000,"domain":"example.com","subdomain":"play"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_missing_fields() {
        let result = serde_json::from_str::<Server>(r#"{"ipAddress":"10.0.0.5","port":25565}"#);
        assert!(result.is_err());
    }
}
