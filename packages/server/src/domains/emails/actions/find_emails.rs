//! Full run: domain list → archive pages → candidate emails → probes →
//! database rows → summary file.
//!
//! Domains run one after another in input order. Inside a domain the
//! archive fetcher bounds its own range reads and candidate probes run with
//! at most `verify_concurrency` in flight. Results are persisted one at a
//! time from a single consumer loop, so writes never race. The summary is
//! written only after every domain is finished.

use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{error, info, info_span, warn, Instrument};

use crate::domains::emails::data::{read_domains, write_summary};
use crate::domains::emails::errors::{PipelineError, RunFailure};
use crate::domains::emails::events::ProgressEvent;
use crate::domains::emails::extractor::extract_from_pages;
use crate::domains::emails::models::{EmailRecord, VerificationResult};
use crate::kernel::{ProgressReporter, ServerDeps};

/// Per-run settings
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub domains_csv: PathBuf,
    pub output_csv: PathBuf,
    pub verify_concurrency: usize,
}

/// What a run produced.
///
/// `results` holds everything gathered before a failure, in the order the
/// results were persisted.
#[derive(Debug, Default)]
pub struct RunReport {
    pub results: Vec<VerificationResult>,
    pub failure: Option<RunFailure>,
}

impl RunReport {
    pub fn valid_count(&self) -> usize {
        self.results.iter().filter(|r| r.valid).count()
    }
}

/// Results persisted so far, readable from outside the run task.
#[derive(Clone, Default)]
struct Gathered(Arc<Mutex<Vec<VerificationResult>>>);

impl Gathered {
    fn push(&self, result: VerificationResult) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).push(result);
    }

    fn snapshot(&self) -> Vec<VerificationResult> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Run the pipeline on a task of its own, one run at a time.
///
/// A panic inside the run is reported as a generic failure instead of
/// taking the caller down; results persisted before it are still returned.
pub async fn run_find_emails(
    deps: Arc<ServerDeps>,
    settings: RunSettings,
    progress: ProgressReporter,
) -> RunReport {
    let run_id = progress.run_id();
    let task_progress = progress.clone();
    let gathered = Gathered::default();
    let task_gathered = gathered.clone();

    let handle = tokio::spawn(
        async move {
            let _guard = deps.run_lock.lock().await;
            run(&deps, &settings, &task_progress, &task_gathered).await
        }
        .instrument(info_span!("find_emails", run_id = %run_id)),
    );

    match handle.await {
        Ok(report) => report,
        Err(e) => {
            error!(run_id = %run_id, error = %e, "Run task aborted");
            let failure = RunFailure::Crashed;
            progress
                .emit(ProgressEvent::RunFailed {
                    message: failure.to_string(),
                })
                .await;
            RunReport {
                results: gathered.snapshot(),
                failure: Some(failure),
            }
        }
    }
}

/// Drive one run to completion on the current task.
pub async fn find_emails(
    deps: &ServerDeps,
    settings: &RunSettings,
    progress: &ProgressReporter,
) -> RunReport {
    run(deps, settings, progress, &Gathered::default()).await
}

async fn run(
    deps: &ServerDeps,
    settings: &RunSettings,
    progress: &ProgressReporter,
    gathered: &Gathered,
) -> RunReport {
    let mut report = RunReport::default();

    progress
        .emit(ProgressEvent::RunStarted {
            run_id: progress.run_id(),
        })
        .await;
    progress
        .emit(ProgressEvent::ReadingInput {
            path: settings.domains_csv.display().to_string(),
        })
        .await;

    let domains = match read_domains(&settings.domains_csv) {
        Ok(domains) => domains,
        Err(e) => return fail(report, e, progress).await,
    };

    info!(domains = domains.len(), "Domain list loaded");
    progress
        .emit(ProgressEvent::InputLoaded {
            domains: domains.len(),
        })
        .await;

    let total = domains.len();
    for (idx, domain) in domains.iter().enumerate() {
        progress
            .emit(ProgressEvent::DomainStarted {
                domain: domain.clone(),
                position: idx + 1,
                total,
            })
            .await;

        if let Err(e) =
            process_domain(deps, settings, progress, domain, gathered, &mut report.results).await
        {
            return fail(report, e, progress).await;
        }
    }

    match write_summary(&settings.output_csv, &report.results) {
        Ok(rows) => {
            progress
                .emit(ProgressEvent::SummaryWritten {
                    path: settings.output_csv.display().to_string(),
                    rows,
                })
                .await;
        }
        Err(e) => return fail(report, e, progress).await,
    }

    info!(
        results = report.results.len(),
        valid = report.valid_count(),
        "Run complete"
    );
    progress
        .emit(ProgressEvent::RunCompleted {
            results: report.results.len(),
            valid: report.valid_count(),
        })
        .await;

    report
}

async fn process_domain(
    deps: &ServerDeps,
    settings: &RunSettings,
    progress: &ProgressReporter,
    domain: &str,
    gathered: &Gathered,
    results: &mut Vec<VerificationResult>,
) -> Result<(), PipelineError> {
    let outcome = deps.archive.fetch(domain).await;
    for issue in &outcome.issues {
        progress
            .emit(ProgressEvent::FetchIssue {
                domain: domain.to_string(),
                message: issue.to_string(),
            })
            .await;
    }

    let candidates = extract_from_pages(&outcome.pages);
    info!(
        domain = %domain,
        pages = outcome.pages.len(),
        emails = candidates.len(),
        "Domain scanned"
    );
    progress
        .emit(ProgressEvent::DomainScanned {
            domain: domain.to_string(),
            pages: outcome.pages.len(),
            emails: candidates.len(),
        })
        .await;

    let verifier = &deps.verifier;
    let mut checks = stream::iter(candidates)
        .map(|email| async move {
            let outcome = verifier.check(&email).await;
            (email, outcome)
        })
        .buffer_unordered(settings.verify_concurrency.max(1));

    while let Some((email, outcome)) = checks.next().await {
        let result = VerificationResult::new(domain, &email, outcome.is_valid());

        EmailRecord::insert(&result, &deps.db_pool)
            .await
            .map_err(|e| PipelineError::Persistence {
                email: email.clone(),
                reason: format!("{:#}", e),
            })?;
        gathered.push(result.clone());

        progress
            .emit(ProgressEvent::EmailVerified {
                domain: domain.to_string(),
                email,
                valid: result.valid,
                detail: outcome.to_string(),
            })
            .await;
        results.push(result);
    }

    Ok(())
}

async fn fail(
    mut report: RunReport,
    error: PipelineError,
    progress: &ProgressReporter,
) -> RunReport {
    warn!(error = %error, results = report.results.len(), "Run ended early");
    progress
        .emit(ProgressEvent::RunFailed {
            message: error.to_string(),
        })
        .await;
    report.failure = Some(error.into());
    report
}
