//! Scihub Core Library
//!
//! This library turns free-text bibliographic queries (DOIs, URLs, citation
//! lines) into PDFs fetched from a document-delivery mirror, named after the
//! article's citation.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`parser`] - Query classification and the citation grammar
//! - [`download`] - Mirror search, page scraping, filename sanitization, batch fetching
//! - [`index`] - The `pdf_paths.csv` record of completed queries

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod index;
pub mod parser;
mod user_agent;

// Re-export commonly used types
pub use download::{
    DownloadError, FetchError, FetchOutcome, FetchStats, Fetcher, HttpClient, PathLimits,
    sanitize_stem,
};
pub use index::{IndexError, PdfIndex};
pub use parser::{
    ClassifiedQuery, ParsedReference, QueryKind, ReferenceParser, TerminalPeriod, classify,
    parse_reference,
};
