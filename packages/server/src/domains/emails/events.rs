//! Run progress events
//!
//! Events are advisory facts about a run, in the order they happened.
//! Losing one never changes what gets persisted.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    RunStarted {
        run_id: Uuid,
    },
    /// About to read the domain list
    ReadingInput {
        path: String,
    },
    InputLoaded {
        domains: usize,
    },
    DomainStarted {
        domain: String,
        position: usize,
        total: usize,
    },
    /// Archive fetch and extraction finished for a domain
    DomainScanned {
        domain: String,
        pages: usize,
        emails: usize,
    },
    /// Upstream or decode problem that was skipped
    FetchIssue {
        domain: String,
        message: String,
    },
    EmailVerified {
        domain: String,
        email: String,
        valid: bool,
        detail: String,
    },
    SummaryWritten {
        path: String,
        rows: usize,
    },
    RunFailed {
        message: String,
    },
    RunCompleted {
        results: usize,
        valid: usize,
    },
}

impl ProgressEvent {
    /// True for the last event a run emits.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::RunFailed { .. } | ProgressEvent::RunCompleted { .. }
        )
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::RunStarted { run_id } => write!(f, "Run {} started", run_id),
            ProgressEvent::ReadingInput { path } => write!(f, "Reading domains from {}", path),
            ProgressEvent::InputLoaded { domains } => write!(f, "Loaded {} domains", domains),
            ProgressEvent::DomainStarted {
                domain,
                position,
                total,
            } => write!(f, "[{}/{}] Searching archives for {}", position, total, domain),
            ProgressEvent::DomainScanned {
                domain,
                pages,
                emails,
            } => write!(
                f,
                "{}: {} archived pages, {} candidate emails",
                domain, pages, emails
            ),
            ProgressEvent::FetchIssue { domain, message } => {
                write!(f, "{}: skipped ({})", domain, message)
            }
            ProgressEvent::EmailVerified {
                domain,
                email,
                valid,
                detail,
            } => write!(
                f,
                "{}: {} is {} ({})",
                domain,
                email,
                if *valid { "valid" } else { "invalid" },
                detail
            ),
            ProgressEvent::SummaryWritten { path, rows } => {
                write!(f, "Wrote {} rows to {}", rows, path)
            }
            ProgressEvent::RunFailed { message } => write!(f, "Run failed: {}", message),
            ProgressEvent::RunCompleted { results, valid } => {
                write!(f, "Done: {} emails checked, {} valid", results, valid)
            }
        }
    }
}
