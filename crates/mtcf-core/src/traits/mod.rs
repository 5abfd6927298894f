// # Core Traits
//
// This module defines the seams between the reconciliation core and its
// external collaborators.

pub mod discovery;
pub mod dns_provider;

pub use discovery::{DiscoveryOutcome, ServerDiscovery, SkippedEntry};
pub use dns_provider::{
    ApiMessage, DnsProvider, FailureDetails, ProviderResult, RECORD_ALREADY_EXISTS,
};
