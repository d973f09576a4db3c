//! Archive data types: index pointers and decoded pages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FetchError, FetchResult};

/// Where one captured record lives inside a storage container.
///
/// Produced from a single index-service record and consumed exactly once by
/// a ranged fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRecordPointer {
    /// Container path relative to the storage base URL
    pub location: String,
    /// First byte of the record inside the container
    pub offset: u64,
    /// Record length in bytes (always > 0)
    pub length: u64,
}

impl ArchiveRecordPointer {
    pub fn new(location: impl Into<String>, offset: u64, length: u64) -> Self {
        Self {
            location: location.into(),
            offset,
            length,
        }
    }

    /// Build a pointer from one index record.
    ///
    /// The index service emits `offset` and `length` as strings; plain JSON
    /// numbers are accepted too.
    pub fn from_index_record(record: &Value) -> FetchResult<Self> {
        let location = record
            .get("filename")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(FetchError::IncompletePointer { field: "filename" })?;
        let offset = numeric_field(record, "offset")?;
        let length = numeric_field(record, "length")?;

        if length == 0 {
            return Err(FetchError::IncompletePointer { field: "length" });
        }
        if offset.checked_add(length).is_none() {
            return Err(FetchError::IncompletePointer { field: "offset" });
        }

        Ok(Self::new(location, offset, length))
    }

    /// Inclusive byte range for the `Range` header.
    pub fn range_header(&self) -> String {
        format!("bytes={}-{}", self.offset, self.offset + self.length - 1)
    }
}

fn numeric_field(record: &Value, field: &'static str) -> FetchResult<u64> {
    let parsed = match record.get(field) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or(FetchError::IncompletePointer { field })
}

/// Decoded text of one archived HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedPage {
    /// `WARC-Target-URI` of the capture, when present
    pub target_uri: Option<String>,
    /// Response payload with the HTTP header block removed
    pub content: String,
}

impl CapturedPage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            target_uri: None,
            content: content.into(),
        }
    }

    pub fn with_target_uri(mut self, uri: impl Into<String>) -> Self {
        self.target_uri = Some(uri.into());
        self
    }
}

/// Everything one domain lookup produced.
///
/// Fetching never fails as a whole: unreachable services, bad records and
/// undecodable payloads land in `issues` and the rest of the work goes on.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub pages: Vec<CapturedPage>,
    pub issues: Vec<FetchError>,
}

impl FetchOutcome {
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
