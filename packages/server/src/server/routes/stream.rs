//! Streaming variant of the find-emails run.
//!
//! GET /find_emails/stream
//!
//! Starts a run in the background and forwards its progress lines as SSE
//! `data:` events. The stream closes once the run ends, successfully or not.

use std::convert::Infallible;

use axum::{
    extract::Extension,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing::debug;
use uuid::Uuid;

use crate::domains::emails::actions::run_find_emails;
use crate::kernel::ProgressReporter;
use crate::server::app::AxumAppState;

pub async fn find_emails_stream_handler(
    Extension(state): Extension<AxumAppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let run_id = Uuid::new_v4();
    let (progress, rx) = ProgressReporter::channel(run_id);
    let progress = progress.with_broker(state.deps.broker.clone());

    // The run outlives a disconnected client; results are persisted either way.
    tokio::spawn(async move {
        let report = run_find_emails(state.deps, state.run_settings, progress).await;
        debug!(run_id = %run_id, results = report.results.len(), "Streamed run finished");
    });

    let events = UnboundedReceiverStream::new(rx)
        .map(|event| Ok::<_, Infallible>(Event::default().data(event.to_string())));

    Sse::new(events).keep_alive(KeepAlive::default())
}
