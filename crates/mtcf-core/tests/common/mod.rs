//! Test doubles and common utilities for reconciliation contract tests
//!
//! This module provides minimal test doubles that record how the core
//! drives its collaborators without talking to any network.

#![allow(dead_code)]

use mtcf_core::error::{Error, Result};
use mtcf_core::traits::{ApiMessage, DiscoveryOutcome, DnsProvider, ServerDiscovery};
use mtcf_core::{DnsRecord, ProviderResult, Server};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One scripted discovery answer
#[derive(Debug, Clone)]
pub enum Step {
    Outcome(DiscoveryOutcome),
    ConnectionLost,
    /// A non-fatal discovery error
    Failed,
}

/// A discovery source that replays a fixed script, then reports Unchanged
pub struct ScriptedDiscovery {
    steps: Mutex<VecDeque<Step>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedDiscovery {
    pub fn new(steps: Vec<Step>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Self {
            steps: Mutex::new(steps.into()),
            calls: Arc::clone(&calls),
        };
        (source, calls)
    }

    /// Convenience: one `Replace` per server list
    pub fn replacing(generations: Vec<Vec<Server>>) -> (Self, Arc<AtomicUsize>) {
        Self::new(
            generations
                .into_iter()
                .map(|servers| Step::Outcome(DiscoveryOutcome::replace(servers)))
                .collect(),
        )
    }
}

#[async_trait::async_trait]
impl ServerDiscovery for ScriptedDiscovery {
    async fn discover(&self) -> Result<DiscoveryOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Outcome(outcome)) => Ok(outcome),
            Some(Step::ConnectionLost) => Err(Error::connection("panel client dropped")),
            Some(Step::Failed) => Err(Error::other("panel timeout")),
            None => Ok(DiscoveryOutcome::unchanged("script exhausted")),
        }
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

type Responder = dyn Fn(&DnsRecord, usize) -> Result<ProviderResult> + Send + Sync;

/// A DnsProvider that records every upsert and answers through a closure
///
/// The closure receives the record and how many times an identical record was
/// upserted before this call.
#[derive(Clone)]
pub struct MockDnsProvider {
    upserts: Arc<Mutex<Vec<DnsRecord>>>,
    seen: Arc<Mutex<HashMap<String, usize>>>,
    responder: Arc<Responder>,
}

impl MockDnsProvider {
    pub fn with_responder(
        responder: impl Fn(&DnsRecord, usize) -> Result<ProviderResult> + Send + Sync + 'static,
    ) -> Self {
        Self {
            upserts: Arc::new(Mutex::new(Vec::new())),
            seen: Arc::new(Mutex::new(HashMap::new())),
            responder: Arc::new(responder),
        }
    }

    /// Behaves like Cloudflare: creates once, then answers 81058
    pub fn accepting() -> Self {
        Self::with_responder(|_, seen| {
            if seen == 0 {
                Ok(ProviderResult::Success)
            } else {
                Ok(already_exists())
            }
        })
    }

    /// Fails every record of `record_type` with `code`
    pub fn failing(record_type: &'static str, code: i64) -> Self {
        Self::with_responder(move |record, _| {
            if record.record_type() == record_type && record.name() != "mtcf" {
                Ok(failure(code))
            } else {
                Ok(ProviderResult::Success)
            }
        })
    }

    /// Rejects the verification record
    pub fn rejecting_credentials(code: i64) -> Self {
        Self::with_responder(move |record, _| {
            if *record == DnsRecord::verification() {
                Ok(failure(code))
            } else {
                Ok(ProviderResult::Success)
            }
        })
    }

    /// Accepts validation, then loses its client on the first server upsert
    pub fn losing_connection() -> Self {
        Self::with_responder(|record, _| {
            if *record == DnsRecord::verification() {
                Ok(ProviderResult::Success)
            } else {
                Err(Error::connection("cloudflare client closed"))
            }
        })
    }

    /// Every record upserted so far, in order
    pub fn upserts(&self) -> Vec<DnsRecord> {
        self.upserts.lock().unwrap().clone()
    }

    /// Upserts excluding the verification record
    pub fn server_upserts(&self) -> Vec<DnsRecord> {
        self.upserts()
            .into_iter()
            .filter(|record| *record != DnsRecord::verification())
            .collect()
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn upsert_record(&self, record: &DnsRecord) -> Result<ProviderResult> {
        self.upserts.lock().unwrap().push(record.clone());

        let key = format!("{:?}", record);
        let seen = {
            let mut seen = self.seen.lock().unwrap();
            let entry = seen.entry(key).or_insert(0);
            let before = *entry;
            *entry += 1;
            before
        };

        (self.responder)(record, seen)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

pub fn already_exists() -> ProviderResult {
    ProviderResult::classify(
        false,
        vec![ApiMessage {
            code: 81058,
            message: "An identical record already exists.".to_string(),
        }],
        Some(400),
    )
}

pub fn failure(code: i64) -> ProviderResult {
    ProviderResult::classify(
        false,
        vec![ApiMessage {
            code,
            message: format!("error {}", code),
        }],
        Some(400),
    )
}

pub fn server(subdomain: &str) -> Server {
    Server::new("10.0.0.5", 25565, "example.com", subdomain)
}

pub fn servers(subdomains: &[&str]) -> Vec<Server> {
    subdomains.iter().map(|s| server(s)).collect()
}
