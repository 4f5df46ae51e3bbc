//! Query classification for DOIs, URLs, and citation lines.
//!
//! This module turns an arbitrary free-text query into something a
//! document-delivery endpoint can look up.
//!
//! # Precedence
//!
//! 1. DOI pattern (anywhere in the text)
//! 2. URL pattern (anywhere in the text)
//! 3. Reference grammar (anchored at the start), yielding the title
//!
//! The first match wins outright: a citation that ends with
//! `doi:10.1016/...` is classified as a DOI even though the reference grammar
//! would also accept it.
//!
//! # Example
//!
//! ```
//! use scihub_core::parser::{ClassifiedQuery, classify};
//!
//! assert_eq!(
//!     classify("10.1016/j.cor.2016.09.025"),
//!     ClassifiedQuery::Doi("10.1016/j.cor.2016.09.025".to_string())
//! );
//! assert_eq!(classify(""), ClassifiedQuery::Unrecognized);
//! ```

mod doi;
mod query;
mod reference;
mod url;

pub use self::doi::find_doi;
pub use self::query::{ClassifiedQuery, QueryKind};
pub use self::reference::{ParsedReference, ReferenceParser, TerminalPeriod, parse_reference};
pub use self::url::{find_url, has_http_scheme};

use tracing::debug;

/// Classifies a raw query as a DOI, a URL, or a citation title.
///
/// Pure function of its input; safe to call concurrently.
///
/// # Behavior
///
/// - DOI and URL values are the matched substrings, unmodified
/// - For citations, only the title is returned; the author list is parsed
///   but not needed downstream
/// - Empty input returns [`ClassifiedQuery::Unrecognized`]
#[tracing::instrument(skip(raw), fields(input_len = raw.len()))]
#[must_use]
pub fn classify(raw: &str) -> ClassifiedQuery {
    classify_with(raw, &ReferenceParser::new())
}

/// Classifies a raw query using an explicitly configured reference parser.
#[must_use]
pub fn classify_with(raw: &str, parser: &ReferenceParser) -> ClassifiedQuery {
    if let Some(doi) = find_doi(raw) {
        debug!(doi = %doi, "classified as DOI");
        return ClassifiedQuery::Doi(doi.to_string());
    }

    if let Some(url) = find_url(raw) {
        debug!(url = %url, "classified as URL");
        return ClassifiedQuery::Url(url.to_string());
    }

    if let Some(parsed) = parser.parse(raw) {
        debug!(
            has_authors = parsed.authors.is_some(),
            "classified as citation title"
        );
        return ClassifiedQuery::Title(parsed.title);
    }

    debug!("query not recognized");
    ClassifiedQuery::Unrecognized
}
