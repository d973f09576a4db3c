//! Emails domain - archive scanning, address extraction and mailbox probing
//!
//! # Components
//!
//! - `actions/` - The run orchestrator
//! - `extractor` - Address-shaped substring matching
//! - `verifier` - MX lookup + SMTP RCPT probe
//! - `models/` - Verification results and their persisted rows
//! - `data/` - Domain list input and summary file output
//! - `events` - Progress events emitted during a run

pub mod actions;
pub mod data;
pub mod errors;
pub mod events;
pub mod extractor;
pub mod models;
pub mod verifier;

pub use errors::{PipelineError, RunFailure};
pub use events::ProgressEvent;
pub use models::{EmailRecord, VerificationResult};
pub use verifier::{EmailVerifier, SmtpSettings, VerificationOutcome};
