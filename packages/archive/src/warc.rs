//! Minimal WARC container reader.
//!
//! A ranged fetch against Common Crawl storage returns one gzip member
//! holding a single record, but the reader handles any number of
//! concatenated members and any number of records per member.
//!
//! Record layout:
//!
//! ```text
//! WARC/1.0\r\n
//! WARC-Type: response\r\n
//! Content-Length: 1234\r\n
//! \r\n
//! <1234 bytes of block>\r\n
//! \r\n
//! ```

use std::borrow::Cow;
use std::io::Read;

use flate2::read::MultiGzDecoder;

use crate::error::{WarcError, WarcResult};
use crate::types::CapturedPage;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const HEADER_END: &[u8] = b"\r\n\r\n";

/// Inflate a container if it is gzip-compressed, otherwise borrow it as-is.
pub fn inflate(bytes: &[u8]) -> WarcResult<Cow<'_, [u8]>> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(bytes));
    }

    let mut decoded = Vec::with_capacity(bytes.len() * 4);
    MultiGzDecoder::new(bytes).read_to_end(&mut decoded)?;
    Ok(Cow::Owned(decoded))
}

/// One record of a WARC container.
#[derive(Debug, Clone)]
pub struct WarcRecord {
    headers: Vec<(String, String)>,
    block: Vec<u8>,
}

impl WarcRecord {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn record_type(&self) -> Option<&str> {
        self.header("WARC-Type")
    }

    /// True for records capturing an HTTP response.
    pub fn is_response(&self) -> bool {
        self.record_type()
            .is_some_and(|t| t.eq_ignore_ascii_case("response"))
    }

    pub fn target_uri(&self) -> Option<&str> {
        self.header("WARC-Target-URI")
    }

    pub fn block(&self) -> &[u8] {
        &self.block
    }

    /// Block with the HTTP status line and header block removed.
    pub fn http_payload(&self) -> &[u8] {
        if !self.block.starts_with(b"HTTP/") {
            return &self.block;
        }
        match find(&self.block, HEADER_END) {
            Some(idx) => &self.block[idx + HEADER_END.len()..],
            None => &[],
        }
    }

    /// Decode the HTTP payload as UTF-8 text.
    pub fn to_page(&self) -> WarcResult<CapturedPage> {
        let content = std::str::from_utf8(self.http_payload()).map_err(|_| WarcError::NotUtf8)?;
        let page = CapturedPage::new(content);
        Ok(match self.target_uri() {
            Some(uri) => page.with_target_uri(uri),
            None => page,
        })
    }
}

/// Iterator over the records of an inflated container.
///
/// Stops after the first structural error since record boundaries can no
/// longer be trusted.
pub struct WarcReader<'a> {
    data: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> WarcReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            failed: false,
        }
    }

    fn skip_separators(&mut self) {
        while self.pos < self.data.len() && matches!(self.data[self.pos], b'\r' | b'\n') {
            self.pos += 1;
        }
    }

    fn read_record(&mut self) -> WarcResult<WarcRecord> {
        let start = self.pos;
        let rest = &self.data[start..];
        let header_len =
            find(rest, HEADER_END).ok_or(WarcError::UnterminatedHeaders { offset: start })?;

        let header_text = String::from_utf8_lossy(&rest[..header_len]);
        let mut lines = header_text.split("\r\n");

        let version = lines.next().unwrap_or_default();
        if !version.starts_with("WARC/") {
            return Err(WarcError::MissingVersion { offset: start });
        }

        let mut headers: Vec<(String, String)> = Vec::new();
        for line in lines {
            if line.starts_with([' ', '\t']) {
                // folded continuation of the previous header
                if let Some((_, value)) = headers.last_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                    continue;
                }
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| WarcError::MalformedHeader {
                    line: line.to_string(),
                })?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        let content_length: usize = headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("Content-Length"))
            .and_then(|(_, value)| value.parse().ok())
            .ok_or(WarcError::MissingContentLength)?;

        let block_start = start + header_len + HEADER_END.len();
        let available = self.data.len() - block_start;
        if content_length > available {
            return Err(WarcError::Truncated {
                wanted: content_length,
                available,
            });
        }

        let block = self.data[block_start..block_start + content_length].to_vec();
        self.pos = block_start + content_length;

        Ok(WarcRecord { headers, block })
    }
}

impl Iterator for WarcReader<'_> {
    type Item = WarcResult<WarcRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.skip_separators();
        if self.pos >= self.data.len() {
            return None;
        }

        let record = self.read_record();
        if record.is_err() {
            self.failed = true;
        }
        Some(record)
    }
}

/// Decode every response record of a (possibly gzipped) container.
///
/// Records that fail to decode are reported and skipped; the remaining
/// records are still returned.
pub fn response_pages(container: &[u8]) -> (Vec<CapturedPage>, Vec<WarcError>) {
    let mut pages = Vec::new();
    let mut errors = Vec::new();

    let data = match inflate(container) {
        Ok(data) => data,
        Err(e) => {
            errors.push(e);
            return (pages, errors);
        }
    };

    for record in WarcReader::new(&data) {
        match record {
            Ok(record) if record.is_response() => match record.to_page() {
                Ok(page) => pages.push(page),
                Err(e) => errors.push(e),
            },
            Ok(_) => {}
            Err(e) => errors.push(e),
        }
    }

    (pages, errors)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
