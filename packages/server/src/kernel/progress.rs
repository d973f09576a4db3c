//! Progress fan-out for pipeline runs.
//!
//! The orchestrator writes every event to a [`ProgressReporter`]; the
//! reporter forwards it to the requesting client's channel (if any) and to
//! the NATS broker (if connected). Both sinks are best-effort.

use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::nats::{run_subject, NatsPublisher};
use crate::domains::emails::events::ProgressEvent;

#[derive(Clone)]
pub struct ProgressReporter {
    run_id: Uuid,
    local: Option<mpsc::UnboundedSender<ProgressEvent>>,
    broker: Option<Arc<dyn NatsPublisher>>,
}

impl ProgressReporter {
    /// Reporter that only logs.
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            local: None,
            broker: None,
        }
    }

    /// Reporter plus the receiving end of its in-process channel.
    pub fn channel(run_id: Uuid) -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = Self {
            local: Some(tx),
            ..Self::new(run_id)
        };
        (reporter, rx)
    }

    pub fn with_broker(mut self, broker: Option<Arc<dyn NatsPublisher>>) -> Self {
        self.broker = broker;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub async fn emit(&self, event: ProgressEvent) {
        debug!(run_id = %self.run_id, progress = %event, "Run progress");

        if let Some(tx) = &self.local {
            if tx.send(event.clone()).is_err() {
                debug!(run_id = %self.run_id, "Progress receiver dropped");
            }
        }

        if let Some(broker) = &self.broker {
            let payload = match serde_json::to_vec(&event) {
                Ok(payload) => Bytes::from(payload),
                Err(e) => {
                    warn!(run_id = %self.run_id, error = %e, "Failed to serialize progress event");
                    return;
                }
            };
            if let Err(e) = broker.publish(run_subject(self.run_id), payload).await {
                warn!(run_id = %self.run_id, error = %e, "Failed to publish progress event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::nats::TestNats;

    #[tokio::test]
    async fn test_fans_out_to_channel_and_broker() {
        let run_id = Uuid::new_v4();
        let nats = Arc::new(TestNats::new());
        let (reporter, mut rx) = ProgressReporter::channel(run_id);
        let reporter = reporter.with_broker(Some(nats.clone() as Arc<dyn NatsPublisher>));

        reporter.emit(ProgressEvent::InputLoaded { domains: 2 }).await;

        assert_eq!(rx.recv().await, Some(ProgressEvent::InputLoaded { domains: 2 }));
        let published = nats.published_messages();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].subject, run_subject(run_id));
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_ignored() {
        let (reporter, rx) = ProgressReporter::channel(Uuid::new_v4());
        drop(rx);
        reporter.emit(ProgressEvent::InputLoaded { domains: 0 }).await;
    }
}
