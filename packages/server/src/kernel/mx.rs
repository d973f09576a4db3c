//! Mail exchanger lookup using hickory-resolver.

use anyhow::{Context, Result};
use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::TokioAsyncResolver;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::BaseMxResolver;

/// Default bound on a single MX query (per attempt).
pub const DNS_TIMEOUT: Duration = Duration::from_secs(5);

/// Queries per lookup before the resolver gives up.
pub const DNS_ATTEMPTS: usize = 2;

/// DNS resolver wrapper for MX lookups
pub struct HickoryMxResolver {
    resolver: TokioAsyncResolver,
}

impl HickoryMxResolver {
    /// Create a resolver from the host's resolver configuration, falling
    /// back to Cloudflare when none can be read.
    pub fn new(timeout: Duration) -> Self {
        let (config, mut opts) = match hickory_resolver::system_conf::read_system_conf() {
            Ok(conf) => conf,
            Err(e) => {
                warn!(error = %e, "No system resolver configuration, using Cloudflare DNS");
                (ResolverConfig::cloudflare(), ResolverOpts::default())
            }
        };
        opts.timeout = timeout;
        opts.attempts = DNS_ATTEMPTS;

        info!(timeout_ms = timeout.as_millis() as u64, "DNS resolver initialized");

        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

impl Default for HickoryMxResolver {
    fn default() -> Self {
        Self::new(DNS_TIMEOUT)
    }
}

#[async_trait]
impl BaseMxResolver for HickoryMxResolver {
    async fn mail_exchangers(&self, domain: &str) -> Result<Vec<String>> {
        let lookup = match self.resolver.mx_lookup(domain).await {
            Ok(lookup) => lookup,
            Err(e) => {
                if let ResolveErrorKind::NoRecordsFound { .. } = e.kind() {
                    debug!(domain = %domain, "No MX records");
                    return Ok(Vec::new());
                }
                return Err(e).with_context(|| format!("MX lookup failed for {}", domain));
            }
        };

        let hosts: Vec<String> = lookup
            .iter()
            .map(|mx| mx.exchange().to_utf8().trim_end_matches('.').to_string())
            .filter(|host| !host.is_empty())
            .collect();

        debug!(domain = %domain, count = hosts.len(), "Resolved mail exchangers");
        Ok(hosts)
    }
}
