//! URL detection in free-text queries and page attributes.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

/// Regex pattern for URLs embedded in text.
///
/// Accepts three prefixes: an explicit `http://`/`https://` scheme, a
/// `www.` host (optionally numbered, e.g. `www2.`), or a bare `host.tld/`.
/// The body tolerates balanced parentheses up to two levels deep (Wikipedia
/// style paths). The last character may not be whitespace, closing
/// punctuation, a quote, or a typographic quote, so sentence punctuation
/// after a URL is not captured.
#[allow(clippy::expect_used)]
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:https?://|www\d{0,3}[.]|[a-z0-9.\-]+[.][a-z]{2,4}/)",
        r"(?:[^\s()<>]+|\((?:[^\s()<>]+|\([^\s()<>]+\))*\))+",
        r#"(?:\((?:[^\s()<>]+|\([^\s()<>]+\))*\)|[^\s`!()\[\]{};:'".,<>?«»“”‘’])"#,
    ))
    .expect("URL regex is valid") // Static pattern, safe to panic
});

/// Finds the first URL-shaped substring in `input`.
///
/// The match is returned verbatim. Bare `host.tld/path` matches carry no
/// scheme; callers that need an absolute URL must add one.
///
/// # Examples
///
/// ```
/// use scihub_core::parser::find_url;
///
/// assert_eq!(
///     find_url("see https://example.com/paper.pdf."),
///     Some("https://example.com/paper.pdf")
/// );
/// assert_eq!(find_url("plain words only"), None);
/// ```
#[must_use]
pub fn find_url(input: &str) -> Option<&str> {
    let found = URL_PATTERN.find(input).map(|m| m.as_str());
    if let Some(url) = found {
        trace!(url = %url, "found URL candidate");
    }
    found
}

/// Returns `true` when `candidate` starts with an explicit HTTP(S) scheme.
#[must_use]
pub fn has_http_scheme(candidate: &str) -> bool {
    let lower = candidate
        .get(..8)
        .unwrap_or(candidate)
        .to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
