use std::path::Path;

use crate::domains::emails::errors::PipelineError;
use crate::domains::emails::models::VerificationResult;

pub const SUMMARY_HEADER: [&str; 3] = ["Domain", "Email", "Valid"];

/// Rewrite the summary file: header plus one row per result, in order.
///
/// Returns the number of data rows written.
pub fn write_summary(path: &Path, results: &[VerificationResult]) -> Result<usize, PipelineError> {
    let write_error = |e: csv::Error| PipelineError::SummaryWrite {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut writer = csv::Writer::from_path(path).map_err(write_error)?;
    writer.write_record(SUMMARY_HEADER).map_err(write_error)?;
    for result in results {
        writer
            .write_record([
                result.domain.as_str(),
                result.email.as_str(),
                if result.valid { "true" } else { "false" },
            ])
            .map_err(write_error)?;
    }
    writer.flush().map_err(|e| PipelineError::SummaryWrite {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(results.len())
}
