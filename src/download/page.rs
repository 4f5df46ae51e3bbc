//! Mirror result-page inspection.
//!
//! A search answers with an HTML page that either describes the article
//! (citation, landing link, a button that opens the PDF) or says that
//! nothing was found or that a CAPTCHA must be solved first.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};
use url::Url;

use super::constants::{CAPTCHA_MARKER, NOT_FOUND_MARKER};
use crate::parser::{find_url, has_http_scheme};

#[allow(clippy::expect_used)]
static CITATION_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div#citation").expect("citation selector is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div#link a").expect("link selector is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static BUTTON_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div#buttons ul li a").expect("button selector is valid") // Static pattern, safe to panic
});

/// Quoted string inside a JavaScript handler such as `location.href='/x.pdf'`.
#[allow(clippy::expect_used)]
static QUOTED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]([^'"]+)['"]"#).expect("quoted string regex is valid") // Static pattern, safe to panic
});

/// What kind of page the mirror returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// The page describes an article.
    Ready,
    /// The mirror has no article for the query.
    NotFound,
    /// The mirror requires a CAPTCHA before showing the article.
    Captcha,
}

/// Fields scraped from an article page. Any of them may be missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticlePage {
    /// Citation text, whitespace-normalized.
    pub citation: Option<String>,
    /// Landing page of the article at its publisher.
    pub link: Option<String>,
    /// Absolute URL of the PDF.
    pub pdf: Option<Url>,
}

/// Classifies the page by looking for the mirror's markers in its text.
#[must_use]
pub fn page_status(html: &str) -> PageStatus {
    let document = Html::parse_document(html);
    let text: String = document.root_element().text().collect();

    if text.contains(NOT_FOUND_MARKER) {
        PageStatus::NotFound
    } else if text.contains(CAPTCHA_MARKER) {
        PageStatus::Captcha
    } else {
        PageStatus::Ready
    }
}

/// Scrapes citation, landing link and PDF URL from an article page.
///
/// The PDF URL comes from the `onclick` handler of the first download button.
/// The first URL-shaped substring is used, with `https://` added when it has
/// no scheme. A handler that only holds a quoted relative path is resolved
/// against `page_url`.
#[tracing::instrument(skip(html, page_url), fields(html_len = html.len()))]
#[must_use]
pub fn extract_article(html: &str, page_url: &Url) -> ArticlePage {
    let document = Html::parse_document(html);

    let citation = document
        .select(&CITATION_SELECTOR)
        .next()
        .map(normalized_text)
        .filter(|text| !text.is_empty());

    let link = document
        .select(&LINK_SELECTOR)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string);

    let pdf = document
        .select(&BUTTON_SELECTOR)
        .next()
        .and_then(|a| a.value().attr("onclick"))
        .and_then(|onclick| pdf_url_from_onclick(onclick, page_url));

    debug!(
        has_citation = citation.is_some(),
        has_link = link.is_some(),
        has_pdf = pdf.is_some(),
        "extracted article page"
    );
    ArticlePage {
        citation,
        link,
        pdf,
    }
}

fn normalized_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn pdf_url_from_onclick(onclick: &str, page_url: &Url) -> Option<Url> {
    if let Some(found) = find_url(onclick) {
        trace!(found = %found, "URL in onclick handler");
        let absolute = if has_http_scheme(found) {
            found.to_string()
        } else {
            format!("https://{found}")
        };
        return Url::parse(&absolute).ok();
    }

    let relative = QUOTED_PATTERN.captures(onclick)?.get(1)?.as_str();
    trace!(relative = %relative, "relative path in onclick handler");
    page_url.join(relative).ok()
}
