//! Typed errors for archive lookups and container decoding.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so the server can
//! render each failure as a progress notice without string matching.

use thiserror::Error;

/// Errors raised while talking to the index service or the storage bucket.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Index service answered with a non-success status
    #[error("index service returned HTTP {status} for {domain}")]
    IndexStatus { domain: String, status: u16 },

    /// Index body was not a list of records
    #[error("malformed index response for {domain}: {reason}")]
    MalformedIndex { domain: String, reason: String },

    /// Record pointer lacked a usable filename, offset or length
    #[error("incomplete record pointer: missing or invalid {field}")]
    IncompletePointer { field: &'static str },

    /// Storage answered a range request with a non-success status
    #[error("range request for {location} returned HTTP {status}")]
    RangeStatus { location: String, status: u16 },

    /// Transport-level failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Container could not be decoded
    #[error("decode error in {location}: {source}")]
    Decode {
        location: String,
        #[source]
        source: WarcError,
    },
}

/// Errors raised while parsing a WARC container.
#[derive(Debug, Error)]
pub enum WarcError {
    /// gzip member could not be inflated
    #[error("gzip: {0}")]
    Gzip(#[from] std::io::Error),

    /// Record did not start with a `WARC/<version>` line
    #[error("missing WARC version line at byte {offset}")]
    MissingVersion { offset: usize },

    /// Header block ended before the blank separator line
    #[error("unterminated header block at byte {offset}")]
    UnterminatedHeaders { offset: usize },

    /// Header line without a `name: value` shape
    #[error("malformed header line: {line}")]
    MalformedHeader { line: String },

    /// Record had no parseable `Content-Length`
    #[error("missing or invalid Content-Length")]
    MissingContentLength,

    /// Declared block length runs past the end of the container
    #[error("truncated record: wanted {wanted} bytes, {available} available")]
    Truncated { wanted: usize, available: usize },

    /// Response payload was not valid UTF-8
    #[error("response payload is not valid UTF-8")]
    NotUtf8,
}

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for container decoding.
pub type WarcResult<T> = std::result::Result<T, WarcError>;
