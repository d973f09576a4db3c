//! End-to-end runs: domain list in, rows and summary file out.

mod common;

use std::sync::Arc;

use crate::common::{SmtpScript, SmtpStub, TestHarness};
use async_trait::async_trait;
use cc_archive::testing::MockArchiveFetcher;
use cc_archive::{ArchiveFetcher, FetchOutcome};
use crawlmail_core::domains::emails::actions::run_find_emails;
use crawlmail_core::domains::emails::{EmailRecord, PipelineError, ProgressEvent, RunFailure};
use crawlmail_core::kernel::{ProgressReporter, StubMxResolver, RUN_SUBJECT_PREFIX};
use test_context::test_context;
use uuid::Uuid;

fn resolver() -> StubMxResolver {
    StubMxResolver::new()
        .with_exchangers("example.com", &["127.0.0.1"])
        .with_exchangers("acme.io", &["127.0.0.1"])
}

fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[test_context(TestHarness)]
#[tokio::test]
async fn single_address_yields_one_row(ctx: &TestHarness) {
    let smtp = SmtpStub::spawn(SmtpScript::Rcpt("250 2.1.5 Ok")).await;
    let archive = MockArchiveFetcher::new().with_page("example.com", "Contact info@example.com");
    let deps = ctx.deps(Arc::new(archive), resolver(), smtp.port);
    ctx.write_domains(&["example.com"]);

    let (progress, mut rx) = ProgressReporter::channel(Uuid::new_v4());
    let report = run_find_emails(deps, ctx.run_settings(), progress).await;

    assert!(report.failure.is_none());
    assert_eq!(report.results.len(), 1);
    assert!(report.results[0].valid);

    assert_eq!(
        ctx.read_output(),
        "Domain,Email,Valid\nexample.com,info@example.com,true\n"
    );

    let rows = EmailRecord::find_all(&ctx.db_pool).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].domain, "example.com");
    assert_eq!(rows[0].email, "info@example.com");
    assert!(rows[0].valid);

    let events = drain(&mut rx);
    assert!(matches!(events.first(), Some(ProgressEvent::RunStarted { .. })));
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::RunCompleted { results: 1, valid: 1 })
    ));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn addresses_are_attributed_to_the_crawled_domain(ctx: &TestHarness) {
    let smtp = SmtpStub::spawn(SmtpScript::Rcpt("550 5.1.1 No such user")).await;
    let archive = MockArchiveFetcher::new()
        .with_page("example.com", "sales@acme.io and sales@acme.io again")
        .with_page("acme.io", "nothing to see")
        .with_index_status("down.test", 503);
    let deps = ctx.deps(Arc::new(archive.clone()), resolver(), smtp.port);
    ctx.write_domains(&["example.com", "down.test", "acme.io"]);

    let report = run_find_emails(deps, ctx.run_settings(), ProgressReporter::new(Uuid::new_v4())).await;

    assert!(report.failure.is_none());
    assert_eq!(archive.calls(), vec!["example.com", "down.test", "acme.io"]);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].domain, "example.com");
    assert_eq!(report.results[0].email, "sales@acme.io");
    assert!(!report.results[0].valid);
    assert_eq!(
        ctx.read_output(),
        "Domain,Email,Valid\nexample.com,sales@acme.io,false\n"
    );
}

#[test_context(TestHarness)]
#[tokio::test]
async fn empty_domain_list_writes_header_only(ctx: &TestHarness) {
    let deps = ctx.deps(Arc::new(MockArchiveFetcher::new()), resolver(), 25);
    ctx.write_domains(&[]);

    let report = run_find_emails(deps, ctx.run_settings(), ProgressReporter::new(Uuid::new_v4())).await;

    assert!(report.failure.is_none());
    assert!(report.results.is_empty());
    assert_eq!(ctx.read_output(), "Domain,Email,Valid\n");
    assert_eq!(EmailRecord::count(&ctx.db_pool).await.unwrap(), 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn missing_domain_list_fails_before_any_work(ctx: &TestHarness) {
    let archive = MockArchiveFetcher::new();
    let deps = ctx.deps(Arc::new(archive.clone()), resolver(), 25);

    let (progress, mut rx) = ProgressReporter::channel(Uuid::new_v4());
    let report = run_find_emails(deps, ctx.run_settings(), progress).await;

    assert!(matches!(
        report.failure,
        Some(RunFailure::Pipeline(PipelineError::InputMissing(_)))
    ));
    assert!(report.failure.as_ref().unwrap().is_input_error());
    assert!(archive.calls().is_empty());
    assert!(!ctx.output_path().exists());
    assert_eq!(EmailRecord::count(&ctx.db_pool).await.unwrap(), 0);

    let events = drain(&mut rx);
    match events.last() {
        Some(ProgressEvent::RunFailed { message }) => {
            assert!(message.ends_with("domains.csv not found in the directory"))
        }
        other => panic!("expected RunFailed, got {:?}", other),
    }
}

#[test_context(TestHarness)]
#[tokio::test]
async fn rerun_appends_rows_and_rewrites_same_summary(ctx: &TestHarness) {
    let smtp = SmtpStub::spawn(SmtpScript::Rcpt("250 2.1.5 Ok")).await;
    let archive = MockArchiveFetcher::new()
        .with_page("example.com", "a@example.com b@example.com");
    let deps = ctx.deps(Arc::new(archive), resolver(), smtp.port);
    ctx.write_domains(&["example.com"]);

    let first = run_find_emails(deps.clone(), ctx.run_settings(), ProgressReporter::new(Uuid::new_v4())).await;
    let first_summary = ctx.read_output();
    let second = run_find_emails(deps, ctx.run_settings(), ProgressReporter::new(Uuid::new_v4())).await;

    let mut first_rows: Vec<_> = first.results.clone();
    let mut second_rows: Vec<_> = second.results.clone();
    first_rows.sort_by(|a, b| a.email.cmp(&b.email));
    second_rows.sort_by(|a, b| a.email.cmp(&b.email));
    assert_eq!(first_rows, second_rows);

    let mut first_lines: Vec<_> = first_summary.lines().collect();
    let second_summary = ctx.read_output();
    let mut second_lines: Vec<_> = second_summary.lines().collect();
    first_lines.sort();
    second_lines.sort();
    assert_eq!(first_lines, second_lines);

    // The store keeps every run's rows.
    assert_eq!(EmailRecord::count(&ctx.db_pool).await.unwrap(), 4);
    assert_eq!(
        EmailRecord::find_by_domain("example.com", &ctx.db_pool)
            .await
            .unwrap()
            .len(),
        4
    );
}

#[test_context(TestHarness)]
#[tokio::test]
async fn progress_is_mirrored_to_the_broker(ctx: &TestHarness) {
    let smtp = SmtpStub::spawn(SmtpScript::Rcpt("250 2.1.5 Ok")).await;
    let archive = MockArchiveFetcher::new().with_page("example.com", "info@example.com");
    let deps = ctx.deps(Arc::new(archive), resolver(), smtp.port);
    ctx.write_domains(&["example.com"]);

    let run_id = Uuid::new_v4();
    let progress = ProgressReporter::new(run_id).with_broker(deps.broker.clone());
    run_find_emails(deps, ctx.run_settings(), progress).await;

    let messages = ctx.broker.messages_with_prefix(RUN_SUBJECT_PREFIX);
    assert!(!messages.is_empty());
    assert!(messages
        .iter()
        .all(|m| m.subject == format!("{}.{}", RUN_SUBJECT_PREFIX, run_id)));

    let last: ProgressEvent = ctx
        .broker
        .deserialize_message(messages.last().unwrap())
        .unwrap();
    assert!(last.is_terminal());
    assert!(matches!(last, ProgressEvent::RunCompleted { results: 1, valid: 1 }));
}

/// Archive that blows up on one domain and defers to a mock for the rest.
struct PanickingArchive {
    inner: MockArchiveFetcher,
    panics_on: &'static str,
}

#[async_trait]
impl ArchiveFetcher for PanickingArchive {
    async fn fetch(&self, domain: &str) -> FetchOutcome {
        if domain == self.panics_on {
            panic!("archive client bug");
        }
        self.inner.fetch(domain).await
    }
}

#[test_context(TestHarness)]
#[tokio::test]
async fn crashed_run_still_returns_persisted_results(ctx: &TestHarness) {
    let smtp = SmtpStub::spawn(SmtpScript::Rcpt("250 2.1.5 Ok")).await;
    let archive = PanickingArchive {
        inner: MockArchiveFetcher::new().with_page("example.com", "info@example.com"),
        panics_on: "acme.io",
    };
    let deps = ctx.deps(Arc::new(archive), resolver(), smtp.port);
    ctx.write_domains(&["example.com", "acme.io"]);

    let (progress, mut rx) = ProgressReporter::channel(Uuid::new_v4());
    let report = run_find_emails(deps.clone(), ctx.run_settings(), progress).await;

    assert!(matches!(report.failure, Some(RunFailure::Crashed)));
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].email, "info@example.com");
    assert_eq!(EmailRecord::count(&ctx.db_pool).await.unwrap(), 1);
    assert!(!ctx.output_path().exists());

    let events = drain(&mut rx);
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::RunFailed { message }) if message == "run failed unexpectedly"
    ));

    // The run lock is released after a crash.
    assert!(deps.run_lock.try_lock().is_ok());
}
