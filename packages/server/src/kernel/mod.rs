//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod mx;
pub mod nats;
pub mod progress;
pub mod test_dependencies;
pub mod traits;

pub use deps::ServerDeps;
pub use mx::HickoryMxResolver;
pub use nats::{
    run_subject, NatsClientPublisher, NatsPublisher, PublishedMessage, TestNats, RUN_SUBJECT_PREFIX,
};
pub use progress::ProgressReporter;
pub use test_dependencies::StubMxResolver;
pub use traits::*;
