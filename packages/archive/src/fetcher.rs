//! Domain → captured pages, via the index service and ranged storage reads.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::header::RANGE;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{FetchError, FetchResult};
use crate::index::{parse_index_body, storage_url, DEFAULT_INDEX_URL, DEFAULT_STORAGE_URL};
use crate::types::{ArchiveRecordPointer, FetchOutcome};
use crate::warc::response_pages;

/// Source of archived pages for a domain.
///
/// Implementations never fail as a whole; problems are collected in
/// [`FetchOutcome::issues`].
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    async fn fetch(&self, domain: &str) -> FetchOutcome;
}

/// Settings for [`CommonCrawlFetcher`].
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub index_url: String,
    pub storage_url: String,
    /// Bound on the index GET
    pub index_timeout: Duration,
    /// Bound on each ranged GET
    pub range_timeout: Duration,
    /// Ranged GETs in flight per domain
    pub max_in_flight: usize,
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            storage_url: DEFAULT_STORAGE_URL.to_string(),
            index_timeout: Duration::from_secs(30),
            range_timeout: Duration::from_secs(60),
            max_in_flight: 4,
            user_agent: "crawlmail/0.1".to_string(),
        }
    }
}

impl FetcherConfig {
    pub fn with_index_url(mut self, url: impl Into<String>) -> Self {
        self.index_url = url.into();
        self
    }

    pub fn with_storage_url(mut self, url: impl Into<String>) -> Self {
        self.storage_url = url.into();
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }
}

/// Fetcher backed by the Common Crawl CDX index and S3 storage.
pub struct CommonCrawlFetcher {
    client: reqwest::Client,
    config: FetcherConfig,
}

impl CommonCrawlFetcher {
    pub fn new(config: FetcherConfig) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Query the index service for raw record objects.
    pub async fn lookup(&self, domain: &str) -> FetchResult<Vec<Value>> {
        let response = self
            .client
            .get(&self.config.index_url)
            .query(&[("url", domain), ("output", "json")])
            .timeout(self.config.index_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::IndexStatus {
                domain: domain.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        parse_index_body(domain, &body)
    }

    /// Read one record's bytes from storage.
    pub async fn fetch_record(&self, pointer: &ArchiveRecordPointer) -> FetchResult<Vec<u8>> {
        let url = storage_url(&self.config.storage_url, &pointer.location);
        let response = self
            .client
            .get(&url)
            .header(RANGE, pointer.range_header())
            .timeout(self.config.range_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::RangeStatus {
                location: pointer.location.clone(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ArchiveFetcher for CommonCrawlFetcher {
    async fn fetch(&self, domain: &str) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();

        let records = match self.lookup(domain).await {
            Ok(records) => records,
            Err(e) => {
                warn!(domain = %domain, error = %e, "Index lookup failed");
                outcome.issues.push(e);
                return outcome;
            }
        };

        let mut pointers = Vec::with_capacity(records.len());
        for record in &records {
            match ArchiveRecordPointer::from_index_record(record) {
                Ok(pointer) => pointers.push(pointer),
                Err(e) => {
                    debug!(domain = %domain, error = %e, "Skipping index record");
                    outcome.issues.push(e);
                }
            }
        }

        info!(
            domain = %domain,
            records = records.len(),
            pointers = pointers.len(),
            "Fetching archive records"
        );

        let fetched: Vec<_> = stream::iter(pointers)
            .map(|pointer| async move {
                let bytes = self.fetch_record(&pointer).await;
                (pointer, bytes)
            })
            .buffered(self.config.max_in_flight.max(1))
            .collect()
            .await;

        for (pointer, bytes) in fetched {
            let bytes = match bytes {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(domain = %domain, location = %pointer.location, error = %e, "Range fetch failed");
                    outcome.issues.push(e);
                    continue;
                }
            };

            let (pages, errors) = response_pages(&bytes);
            for source in errors {
                debug!(domain = %domain, location = %pointer.location, error = %source, "Skipping undecodable record");
                outcome.issues.push(FetchError::Decode {
                    location: pointer.location.clone(),
                    source,
                });
            }
            outcome.pages.extend(pages);
        }

        info!(
            domain = %domain,
            pages = outcome.pages.len(),
            issues = outcome.issues.len(),
            "Archive fetch complete"
        );
        outcome
    }
}
