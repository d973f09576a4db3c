//! Mock fetcher for testing.
//!
//! Returns canned pages per domain and records every lookup.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::FetchError;
use crate::fetcher::ArchiveFetcher;
use crate::types::{CapturedPage, FetchOutcome};

/// Canned [`ArchiveFetcher`].
///
/// # Example
///
/// ```rust
/// use cc_archive::testing::MockArchiveFetcher;
///
/// let fetcher = MockArchiveFetcher::new()
///     .with_page("example.com", "contact: info@example.com");
/// ```
#[derive(Default, Clone)]
pub struct MockArchiveFetcher {
    pages: Arc<RwLock<HashMap<String, Vec<CapturedPage>>>>,
    failing: Arc<RwLock<HashMap<String, u16>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockArchiveFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page returned for `domain` (builder pattern).
    pub fn with_page(self, domain: &str, content: &str) -> Self {
        self.pages
            .write()
            .unwrap()
            .entry(domain.to_string())
            .or_default()
            .push(CapturedPage::new(content));
        self
    }

    /// Make the index lookup for `domain` answer with `status`.
    pub fn with_index_status(self, domain: &str, status: u16) -> Self {
        self.failing
            .write()
            .unwrap()
            .insert(domain.to_string(), status);
        self
    }

    /// Domains looked up, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl ArchiveFetcher for MockArchiveFetcher {
    async fn fetch(&self, domain: &str) -> FetchOutcome {
        self.calls.write().unwrap().push(domain.to_string());

        if let Some(status) = self.failing.read().unwrap().get(domain) {
            return FetchOutcome {
                pages: Vec::new(),
                issues: vec![FetchError::IndexStatus {
                    domain: domain.to_string(),
                    status: *status,
                }],
            };
        }

        FetchOutcome {
            pages: self
                .pages
                .read()
                .unwrap()
                .get(domain)
                .cloned()
                .unwrap_or_default(),
            issues: Vec::new(),
        }
    }
}
