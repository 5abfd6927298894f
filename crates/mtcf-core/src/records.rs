//! Desired DNS records derived from a [`Server`]
//!
//! Records are never stored. They are recomputed from the registry every
//! time a server is synchronized, which is what makes the whole pipeline
//! idempotent: the same server always yields the same payload.
//!
//! The serialized form is the Cloudflare `POST /dns_records` body.

use crate::server::Server;
use serde::Serialize;
use serde_with::{DisplayFromStr, serde_as};

/// Comment attached to every record this system manages
pub const MANAGED_COMMENT: &str = "Generated by MTCF";

/// Comment attached to the bootstrap verification record
pub const VERIFICATION_COMMENT: &str = "API Key Verification Record || Generated by MTCF";

/// Name of the bootstrap verification record
pub const VERIFICATION_RECORD_NAME: &str = "mtcf";

/// Address of the bootstrap verification record
pub const VERIFICATION_RECORD_CONTENT: &str = "127.0.0.1";

/// Service/protocol labels prepended to the SRV record name
pub const SRV_SERVICE_PREFIX: &str = "_minecraft._tcp";

/// TTL of 1 means "automatic" at Cloudflare
pub const AUTOMATIC_TTL: u32 = 1;

const SRV_PRIORITY: u16 = 0;
const SRV_WEIGHT: u16 = 5;

/// A record payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ARecord {
    pub name: String,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
    pub comment: String,
}

/// SRV `data` block
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SrvData {
    pub priority: u16,
    pub weight: u16,
    /// Sent as a string, the way the panel integration always has
    #[serde_as(as = "DisplayFromStr")]
    pub port: u16,
    pub target: String,
}

/// SRV record payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SrvRecord {
    pub name: String,
    pub data: SrvData,
    pub ttl: u32,
    pub proxied: bool,
    pub comment: String,
}

/// Any record the provider is asked to upsert
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum DnsRecord {
    #[serde(rename = "A")]
    A(ARecord),
    #[serde(rename = "SRV")]
    Srv(SrvRecord),
}

impl DnsRecord {
    /// Desired host record for a server
    pub fn a_for(server: &Server) -> Self {
        Self::A(ARecord {
            name: server.subdomain.clone(),
            content: server.ip_address.clone(),
            ttl: AUTOMATIC_TTL,
            proxied: false,
            comment: MANAGED_COMMENT.to_string(),
        })
    }

    /// Desired service record for a server
    pub fn srv_for(server: &Server) -> Self {
        Self::Srv(SrvRecord {
            name: format!("{}.{}", SRV_SERVICE_PREFIX, server.subdomain),
            data: SrvData {
                priority: SRV_PRIORITY,
                weight: SRV_WEIGHT,
                port: server.port,
                target: server.fqdn(),
            },
            ttl: AUTOMATIC_TTL,
            proxied: false,
            comment: MANAGED_COMMENT.to_string(),
        })
    }

    /// Throwaway record used to prove the credentials can write to the zone
    pub fn verification() -> Self {
        Self::A(ARecord {
            name: VERIFICATION_RECORD_NAME.to_string(),
            content: VERIFICATION_RECORD_CONTENT.to_string(),
            ttl: AUTOMATIC_TTL,
            proxied: false,
            comment: VERIFICATION_COMMENT.to_string(),
        })
    }

    /// Record type as used on the wire
    pub fn record_type(&self) -> &'static str {
        match self {
            Self::A(_) => "A",
            Self::Srv(_) => "SRV",
        }
    }

    /// Record name relative to the zone
    pub fn name(&self) -> &str {
        match self {
            Self::A(record) => &record.name,
            Self::Srv(record) => &record.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn play() -> Server {
        Server::new("10.0.0.5", 25565, "example.com", "play")
    }

    #[test]
    fn a_record_derivation() {
        let value = serde_json::to_value(DnsRecord::a_for(&play())).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "A",
                "name": "play",
                "content": "10.0.0.5",
                "ttl": 1,
                "proxied": false,
                "comment": "Generated by MTCF",
            })
        );
    }

    #[test]
    fn srv_record_derivation() {
        let value = serde_json::to_value(DnsRecord::srv_for(&play())).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "SRV",
                "name": "_minecraft._tcp.play",
                "data": {
                    "priority": 0,
                    "weight": 5,
                    "port": "25565",
                    "target": "play.example.com",
                },
                "ttl": 1,
                "proxied": false,
                "comment": "Generated by MTCF",
            })
        );
    }

    #[test]
    fn verification_record_uses_loopback() {
        let record = DnsRecord::verification();
        assert_eq!(record.record_type(), "A");
        assert_eq!(record.name(), "mtcf");

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["content"], "127.0.0.1");
        assert_eq!(value["comment"], VERIFICATION_COMMENT);
    }
}
