use std::time::Duration;

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::server::app::AxumAppState;

const DB_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    /// `"ok"` or the reason the store did not answer
    pub store: String,
    pub stored_results: Option<i64>,
    /// `"connected"` or `"disabled"`; progress mirroring is optional
    pub broker: &'static str,
    pub run_in_progress: bool,
}

/// GET /health
///
/// 503 only when the result store is unusable.
pub async fn health_handler(
    Extension(state): Extension<AxumAppState>,
) -> (StatusCode, Json<HealthReport>) {
    let deps = &state.deps;
    let stored = count_results(&deps.db_pool).await;

    let report = HealthReport {
        healthy: stored.is_ok(),
        store: match &stored {
            Ok(_) => "ok".to_string(),
            Err(reason) => reason.clone(),
        },
        stored_results: stored.ok(),
        broker: if deps.broker.is_some() { "connected" } else { "disabled" },
        run_in_progress: deps.run_lock.try_lock().is_err(),
    };

    let status = if report.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

async fn count_results(pool: &SqlitePool) -> Result<i64, String> {
    let query = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM emails").fetch_one(pool);
    match tokio::time::timeout(DB_PROBE_TIMEOUT, query).await {
        Ok(Ok(count)) => Ok(count),
        Ok(Err(e)) => Err(format!("query failed: {}", e)),
        Err(_) => Err("query timed out".to_string()),
    }
}
