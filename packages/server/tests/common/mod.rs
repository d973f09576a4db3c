// Common test utilities

pub mod harness;
pub mod smtp_stub;

pub use harness::*;
pub use smtp_stub::*;
