//! DOI detection in free-text queries.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

/// Regex pattern for DOIs: `10.XXXX/suffix`.
///
/// The registrant code is 4-9 digits. The suffix class is case-insensitive
/// and limited to letters, digits and `-._;()/:`, so a DOI embedded in a
/// citation stops at the first space or comma.
#[allow(clippy::expect_used)]
static DOI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)10\.\d{4,9}/[-._;()/:A-Z0-9]+").expect("DOI regex is valid") // Static pattern, safe to panic
});

/// Finds the first DOI-shaped substring in `input`.
///
/// The match is returned verbatim: no case folding, no trailing punctuation
/// cleanup, no `doi:` prefix handling beyond skipping it.
///
/// # Examples
///
/// ```
/// use scihub_core::parser::find_doi;
///
/// let text = "Cruz, F. (2017). Computers & OR, 79, 19-33. doi:10.1016/j.cor.2016.09.025";
/// assert_eq!(find_doi(text), Some("10.1016/j.cor.2016.09.025"));
/// assert_eq!(find_doi("no identifier here"), None);
/// ```
#[must_use]
pub fn find_doi(input: &str) -> Option<&str> {
    let found = DOI_PATTERN.find(input).map(|m| m.as_str());
    if let Some(doi) = found {
        trace!(doi = %doi, "found DOI candidate");
    }
    found
}
