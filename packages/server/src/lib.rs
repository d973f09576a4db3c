// Crawlmail - API Core
//
// Scans Common Crawl archives of a list of domains for email addresses,
// probes each address over SMTP and records the outcome.
//
// Business logic lives in domains/, infrastructure traits and adapters in
// kernel/, and the HTTP surface in server/.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
