use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

use cc_archive::CapturedPage;

lazy_static! {
    // Loose shape match: local@host.rest. Not RFC 5322; false positives are accepted.
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+").unwrap();
}

/// Every distinct email-shaped substring in `text`.
pub fn extract_emails(text: &str) -> HashSet<String> {
    EMAIL_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Union of the addresses found on all pages of one domain.
///
/// Sorted so verification and progress lines come out in a stable order.
pub fn extract_from_pages(pages: &[CapturedPage]) -> BTreeSet<String> {
    pages
        .iter()
        .flat_map(|page| extract_emails(&page.content))
        .collect()
}
