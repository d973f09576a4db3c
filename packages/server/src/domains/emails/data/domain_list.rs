use std::path::Path;

use crate::domains::emails::errors::PipelineError;

/// Read the domain list: first column of every row, no header row.
///
/// Blank lines are skipped. A row whose first column is empty aborts the
/// read so a run never starts on a half-understood list.
pub fn read_domains(path: &Path) -> Result<Vec<String>, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::InputMissing(path.to_path_buf()));
    }

    let read_error = |e: csv::Error| PipelineError::InputRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(read_error)?;

    let mut domains = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(read_error)?;
        match record.get(0) {
            Some(domain) if !domain.is_empty() => domains.push(domain.to_string()),
            _ => {
                let row = record
                    .position()
                    .map(|pos| pos.line())
                    .unwrap_or(idx as u64 + 1);
                return Err(PipelineError::InputMalformed {
                    path: path.to_path_buf(),
                    row,
                });
            }
        }
    }

    Ok(domains)
}
