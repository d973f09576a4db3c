//! Email discovery actions
//!
//! Entry points called from the HTTP layer. Actions take the dependency
//! context explicitly and report progress through the reporter they are
//! given.

pub mod find_emails;

pub use find_emails::{find_emails, run_find_emails, RunReport, RunSettings};
