//! Index service response parsing.
//!
//! The CDX index answers `output=json` queries with one JSON object per
//! line. A single JSON array of objects is accepted as well.

use serde_json::Value;
use tracing::debug;

use crate::error::{FetchError, FetchResult};

/// Default Common Crawl index endpoint (one crawl snapshot).
pub const DEFAULT_INDEX_URL: &str = "https://index.commoncrawl.org/CC-MAIN-2023-06-index";

/// Default storage bucket that container locations are relative to.
pub const DEFAULT_STORAGE_URL: &str = "https://commoncrawl.s3.amazonaws.com";

/// Fields of which a capture record carries at least one.
const POINTER_FIELDS: [&str; 3] = ["filename", "offset", "length"];

fn is_record(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| POINTER_FIELDS.iter().any(|field| obj.contains_key(*field)))
}

/// Split an index body into raw record objects.
///
/// Anything that is neither an array of capture records nor
/// newline-delimited capture records is a malformed body. Status objects
/// such as `{"message": "No Captures found"}` count as malformed.
pub fn parse_index_body(domain: &str, body: &str) -> FetchResult<Vec<Value>> {
    let malformed = |reason: String| FetchError::MalformedIndex {
        domain: domain.to_string(),
        reason,
    };

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        let value: Value = serde_json::from_str(trimmed).map_err(|e| malformed(e.to_string()))?;
        let Value::Array(items) = value else {
            return Err(malformed("expected a list".to_string()));
        };
        if let Some(pos) = items.iter().position(|item| !is_record(item)) {
            return Err(malformed(format!("list item {} is not a capture record", pos)));
        }
        return Ok(items);
    }

    let mut records = Vec::new();
    for (line_no, line) in trimmed.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .map_err(|e| malformed(format!("line {}: {}", line_no + 1, e)))?;
        if !is_record(&value) {
            return Err(malformed(format!("line {} is not a capture record", line_no + 1)));
        }
        records.push(value);
    }

    debug!(domain = %domain, records = records.len(), "Parsed index response");
    Ok(records)
}

/// Join a storage base URL and a container location.
pub fn storage_url(base: &str, location: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        location.trim_start_matches('/')
    )
}
