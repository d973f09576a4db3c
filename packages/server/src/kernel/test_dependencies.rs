// TestDependencies - mock implementations for testing
//
// Provides stub infrastructure that can be injected into ServerDeps for tests.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::BaseMxResolver;

// =============================================================================
// Stub MX Resolver
// =============================================================================

/// Canned MX answers. Unknown domains fail like an NXDOMAIN lookup.
#[derive(Clone, Default)]
pub struct StubMxResolver {
    answers: Arc<Mutex<HashMap<String, Vec<String>>>>,
    calls: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl StubMxResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `domain` with these exchangers, in this order.
    pub fn with_exchangers(self, domain: &str, hosts: &[&str]) -> Self {
        self.answers.lock().unwrap().insert(
            domain.to_string(),
            hosts.iter().map(|h| h.to_string()).collect(),
        );
        self
    }

    /// Answer `domain` with an empty record set.
    pub fn with_no_records(self, domain: &str) -> Self {
        self.answers
            .lock()
            .unwrap()
            .insert(domain.to_string(), Vec::new());
        self
    }

    /// Answer every lookup only after `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Domains looked up, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseMxResolver for StubMxResolver {
    async fn mail_exchangers(&self, domain: &str) -> Result<Vec<String>> {
        self.calls.lock().unwrap().push(domain.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.answers.lock().unwrap().get(domain) {
            Some(hosts) => Ok(hosts.clone()),
            None => Err(anyhow::anyhow!("NXDOMAIN: {}", domain)),
        }
    }
}
