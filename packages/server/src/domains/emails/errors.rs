use std::path::PathBuf;
use thiserror::Error;

/// Failures that end a run early.
///
/// Upstream and verification problems never show up here; they are skipped
/// and reported as progress.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Domain list file does not exist
    #[error("{} not found in the directory", .0.display())]
    InputMissing(PathBuf),

    /// Domain list exists but could not be read or parsed
    #[error("failed to read {}: {reason}", .path.display())]
    InputRead { path: PathBuf, reason: String },

    /// A row without a usable domain in its first column
    #[error("row {row} of {} has no domain in its first column", .path.display())]
    InputMalformed { path: PathBuf, row: u64 },

    /// Writing a result row to the database failed
    #[error("failed to persist result for {email}: {reason}")]
    Persistence { email: String, reason: String },

    /// Writing the summary file failed
    #[error("failed to write {}: {reason}", .path.display())]
    SummaryWrite { path: PathBuf, reason: String },
}

impl PipelineError {
    /// Input problems are the caller's fault and abort before any work.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PipelineError::InputMissing(_)
                | PipelineError::InputRead { .. }
                | PipelineError::InputMalformed { .. }
        )
    }
}

/// Why a run ended before writing its summary.
#[derive(Debug, Error)]
pub enum RunFailure {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The run task panicked or was cancelled
    #[error("run failed unexpectedly")]
    Crashed,
}

impl RunFailure {
    pub fn is_input_error(&self) -> bool {
        matches!(self, RunFailure::Pipeline(e) if e.is_input_error())
    }
}
