//! Mirror search and PDF download.
//!
//! This module submits classified queries to a document-delivery mirror,
//! scrapes the result page, and streams the PDF to disk under a filename
//! derived from the article's citation.
//!
//! # Features
//!
//! - One pooled HTTP client with a cookie store per run
//! - Result-page inspection (not found, CAPTCHA, article)
//! - Citation-derived filenames clamped to host path limits
//! - Collision-safe output paths (adds numeric suffix)
//! - Streaming downloads with partial-file cleanup
//! - Interruptible batch processing with an incremental index
//!
//! # Example
//!
//! ```no_run
//! use scihub_core::download::{Fetcher, HttpClient};
//! use std::path::Path;
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Fetcher::new(
//!     HttpClient::new(),
//!     Url::parse("https://sci-hub.se/")?,
//!     Path::new("./output"),
//! )?;
//! let outcome = fetcher.fetch_one("10.1016/j.cor.2016.09.025").await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod engine;
mod error;
mod filename;
mod page;

pub use client::{HttpClient, SearchPage};
pub use engine::{FetchError, FetchOutcome, FetchStats, Fetcher, prepare_queries};
pub use error::DownloadError;
pub use filename::{
    DEFAULT_NAME_MAX, DEFAULT_PATH_MAX, PATH_SAFETY_MARGIN, PathLimits, resolve_unique_path,
    sanitize_stem, sanitize_stem_with_limits,
};
pub use page::{ArticlePage, PageStatus, extract_article, page_status};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
