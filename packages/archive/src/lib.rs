//! Common Crawl archive access.
//!
//! Looks a domain up in the CDX index service, reads each pointed-to record
//! from storage with an HTTP range request and decodes the WARC container
//! into the text of every captured HTTP response.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cc_archive::{ArchiveFetcher, CommonCrawlFetcher, FetcherConfig};
//!
//! let fetcher = CommonCrawlFetcher::new(FetcherConfig::default())?;
//! let outcome = fetcher.fetch("example.com").await;
//! for page in &outcome.pages {
//!     println!("{}", page.content.len());
//! }
//! ```
//!
//! # Modules
//!
//! - [`fetcher`] - The [`ArchiveFetcher`] trait and the Common Crawl implementation
//! - [`index`] - Index service response parsing
//! - [`warc`] - WARC container reader
//! - [`testing`] - Mock fetcher for testing

pub mod error;
pub mod fetcher;
pub mod index;
pub mod testing;
pub mod types;
pub mod warc;

pub use error::{FetchError, FetchResult, WarcError, WarcResult};
pub use fetcher::{ArchiveFetcher, CommonCrawlFetcher, FetcherConfig};
pub use types::{ArchiveRecordPointer, CapturedPage, FetchOutcome};
pub use warc::{response_pages, WarcReader, WarcRecord};
