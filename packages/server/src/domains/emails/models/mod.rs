pub mod email_record;

pub use email_record::{EmailRecord, VerificationResult};
