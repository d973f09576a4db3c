//! Server dependencies for pipeline runs (using traits for testability)
//!
//! One explicit context object replaces process-wide store and broker
//! handles. All external services sit behind trait objects so tests can
//! swap in stubs.

use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;

use cc_archive::ArchiveFetcher;

use crate::domains::emails::verifier::EmailVerifier;
use crate::kernel::NatsPublisher;

/// Server dependencies accessible to pipeline actions
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: SqlitePool,
    /// Archive lookup (Common Crawl in production)
    pub archive: Arc<dyn ArchiveFetcher>,
    pub verifier: EmailVerifier,
    /// Broker mirror for progress events; `None` when NATS is unreachable
    pub broker: Option<Arc<dyn NatsPublisher>>,
    /// Held for the whole of a run. Runs share the input and summary files.
    pub run_lock: Arc<Mutex<()>>,
}

impl ServerDeps {
    /// Create new ServerDeps with the given dependencies
    pub fn new(
        db_pool: SqlitePool,
        archive: Arc<dyn ArchiveFetcher>,
        verifier: EmailVerifier,
        broker: Option<Arc<dyn NatsPublisher>>,
    ) -> Self {
        Self {
            db_pool,
            archive,
            verifier,
            broker,
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}
