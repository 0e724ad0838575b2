//! Severity-label stripping for spoken replies.

use std::sync::LazyLock;

use regex::Regex;

/// Any recognized severity label at the start of a reply, plus the
/// separator that follows it.
static SEVERITY_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*\[?\s*(?:low|moderate|urgent)\s*\]?(?:\s*[:\-]\s*|\s+|$)").unwrap()
});

/// Remove a leading "LOW"/"MODERATE"/"URGENT" label from `text`.
///
/// Only a standalone leading token is removed, so words such as
/// "lower" are left alone.
pub fn strip_severity_label(text: &str) -> &str {
    match SEVERITY_LABEL_RE.find(text) {
        Some(m) => text[m.end()..].trim_start(),
        None => text.trim_start(),
    }
}
