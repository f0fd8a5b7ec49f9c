//! DNS validation for candidate target domains.
//!
//! Resolution is the authoritative validity test: a domain that does not
//! resolve is excluded from every downstream enrichment stage, since the
//! IP-based providers have nothing to work with.

use hickory_resolver::config::{LookupIpStrategy, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain_utils;

#[derive(Clone)]
pub struct DomainValidator {
    resolver: TokioAsyncResolver,
}

impl DomainValidator {
    /// Build a validator on the system resolver configuration, falling back
    /// to the library's default public resolvers when none is readable.
    pub fn new() -> Self {
        let resolver = match TokioAsyncResolver::tokio_from_system_conf() {
            Ok(resolver) => resolver,
            Err(e) => {
                warn!("System resolver config unavailable ({}), using defaults", e);
                TokioAsyncResolver::tokio(ResolverConfig::default(), Self::default_opts())
            }
        };
        DomainValidator { resolver }
    }

    fn default_opts() -> ResolverOpts {
        let mut opts = ResolverOpts::default();
        opts.timeout = Duration::from_secs(5);
        opts.attempts = 2;
        opts.ip_strategy = LookupIpStrategy::Ipv4thenIpv6;
        opts
    }

    /// Hard filter: true only when the host has at least one A/AAAA record.
    pub async fn is_resolvable(&self, domain: &str) -> bool {
        if !domain_utils::is_well_formed(domain) {
            debug!("Skipping DNS lookup for malformed candidate '{}'", domain);
            return false;
        }

        match self.resolver.lookup_ip(domain).await {
            Ok(lookup) => lookup.iter().next().is_some(),
            Err(e) => {
                debug!("DNS lookup failed for {}: {}", domain, e);
                false
            }
        }
    }

    /// First resolved address, used to key IP-intelligence lookups.
    pub async fn first_ip(&self, domain: &str) -> Option<IpAddr> {
        match self.resolver.lookup_ip(domain).await {
            Ok(lookup) => lookup.iter().next(),
            Err(e) => {
                debug!("Address lookup failed for {}: {}", domain, e);
                None
            }
        }
    }
}

impl Default for DomainValidator {
    fn default() -> Self {
        Self::new()
    }
}
