//! Test harness for pipeline and route tests.
//!
//! Every test gets its own in-memory database, a scratch directory for the
//! domain list and summary files, and a recording broker.

use anyhow::{Context, Result};
use cc_archive::ArchiveFetcher;
use crawlmail_core::domains::emails::actions::RunSettings;
use crawlmail_core::domains::emails::{EmailVerifier, SmtpSettings};
use crawlmail_core::kernel::{NatsPublisher, ServerDeps, StubMxResolver, TestNats};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use test_context::AsyncTestContext;

/// Test harness that manages per-test infrastructure.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     ctx.write_domains(&["example.com"]);
///     // ... test code
/// }
/// ```
pub struct TestHarness {
    /// Database pool - single connection so the in-memory database is shared
    pub db_pool: SqlitePool,
    /// Scratch directory holding the domain list and summary
    pub workdir: TempDir,
    /// Recording broker handed to every run built from this harness
    pub broker: Arc<TestNats>,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        self.db_pool.close().await;
    }
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_pool,
            workdir: tempfile::tempdir().context("Failed to create scratch directory")?,
            broker: Arc::new(TestNats::new()),
        })
    }

    pub fn domains_path(&self) -> PathBuf {
        self.workdir.path().join("domains.csv")
    }

    pub fn output_path(&self) -> PathBuf {
        self.workdir.path().join("emails.csv")
    }

    /// Write the domain list, one per row.
    pub fn write_domains(&self, domains: &[&str]) {
        let mut contents = domains.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        std::fs::write(self.domains_path(), contents).expect("Failed to write domain list");
    }

    pub fn read_output(&self) -> String {
        std::fs::read_to_string(self.output_path()).expect("Failed to read summary")
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            domains_csv: self.domains_path(),
            output_csv: self.output_path(),
            verify_concurrency: 2,
        }
    }

    /// Dependencies wired to the given archive, resolver and SMTP port.
    pub fn deps(
        &self,
        archive: Arc<dyn ArchiveFetcher>,
        resolver: StubMxResolver,
        smtp_port: u16,
    ) -> Arc<ServerDeps> {
        let settings = SmtpSettings::default()
            .with_port(smtp_port)
            .with_command_timeout(Duration::from_millis(500))
            .with_session_timeout(Duration::from_secs(3));
        let verifier = EmailVerifier::new(Arc::new(resolver), settings);
        let broker: Arc<dyn NatsPublisher> = self.broker.clone();

        Arc::new(ServerDeps::new(
            self.db_pool.clone(),
            archive,
            verifier,
            Some(broker),
        ))
    }
}
