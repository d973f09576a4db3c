use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domains::emails::actions::{run_find_emails, RunReport};
use crate::domains::emails::VerificationResult;
use crate::kernel::ProgressReporter;
use crate::server::app::AxumAppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct FindEmailsResponse {
    pub emails: Vec<VerificationResult>,
    /// Set when the run ended before writing its summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Run the whole pipeline and answer with every result gathered.
///
/// Returns 400 when the domain list is missing or unusable; any later
/// failure still answers 200 with the partial results and an `error`.
pub async fn find_emails_handler(Extension(state): Extension<AxumAppState>) -> Response {
    let progress = ProgressReporter::new(Uuid::new_v4()).with_broker(state.deps.broker.clone());

    let RunReport { results, failure } =
        run_find_emails(state.deps.clone(), state.run_settings.clone(), progress).await;

    match failure {
        Some(failure) if failure.is_input_error() => (
            StatusCode::BAD_REQUEST,
            Json(MessageResponse {
                message: failure.to_string(),
            }),
        )
            .into_response(),
        failure => (
            StatusCode::OK,
            Json(FindEmailsResponse {
                emails: results,
                error: failure.map(|f| f.to_string()),
            }),
        )
            .into_response(),
    }
}
