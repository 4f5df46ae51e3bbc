//! Batch fetcher: classify, search, extract, save, record.
//!
//! The `Fetcher` walks a list of queries one at a time. Every query is
//! classified, submitted to the mirror, and, when the result page describes
//! an article, its PDF is streamed into the output directory. Outcomes are
//! recorded in the [`PdfIndex`] so a later run skips queries that already
//! have a file.
//!
//! # Example
//!
//! ```no_run
//! use scihub_core::download::{Fetcher, HttpClient};
//! use std::path::Path;
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mirror = Url::parse("https://sci-hub.se/")?;
//! let fetcher = Fetcher::new(HttpClient::new(), mirror, Path::new("./output"))?;
//! let (_tx, interrupt) = tokio::sync::watch::channel(false);
//! let stats = fetcher
//!     .download(vec!["10.1016/j.cor.2016.09.025".to_string()], interrupt)
//!     .await?;
//! println!("saved: {}, failed: {}", stats.saved(), stats.failed());
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use super::filename::sanitize_stem;
use super::page::{PageStatus, extract_article, page_status};
use super::{DownloadError, HttpClient};
use crate::index::{IndexError, PdfIndex};
use crate::parser::{ReferenceParser, classify_with};

/// Error type for batch operations that abort the whole run.
///
/// Per-query failures never surface here; they are counted in [`FetchStats`].
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The output directory could not be created or resolved.
    #[error("cannot prepare output directory {path}: {source}")]
    OutputDir {
        /// Requested output directory.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Index load or save failed.
    #[error("index error: {0}")]
    Index(#[from] IndexError),
}

/// What happened to one query that did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The PDF was written to this path.
    Saved(PathBuf),
    /// The query classified as unrecognized and was not submitted.
    Unrecognized,
    /// The mirror has no article for the query.
    NotFound,
    /// The mirror demanded a CAPTCHA.
    Captcha,
    /// The article page had no usable PDF link.
    MissingPdfLink,
    /// The article page had no citation to name the file after.
    MissingCitation,
}

/// Counts from one [`Fetcher::download`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    saved: usize,
    failed: usize,
    skipped: usize,
    already_present: usize,
    interrupted: bool,
}

impl FetchStats {
    /// Queries whose PDF was saved in this run.
    #[must_use]
    pub fn saved(&self) -> usize {
        self.saved
    }

    /// Queries that failed with a network, HTTP, or filesystem error.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Queries that were unrecognized, not found, behind a CAPTCHA, or
    /// whose page lacked a PDF link or citation.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Queries excluded up front because the index already had their file.
    #[must_use]
    pub fn already_present(&self) -> usize {
        self.already_present
    }

    /// Queries attempted in this run (saved + failed + skipped).
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.saved + self.failed + self.skipped
    }

    /// Returns `true` if the run stopped early on an interrupt.
    #[must_use]
    pub fn was_interrupted(&self) -> bool {
        self.interrupted
    }

    fn record(&mut self, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Saved(_) => self.saved += 1,
            _ => self.skipped += 1,
        }
    }
}

/// Sequential query processor bound to one mirror and one output directory.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: HttpClient,
    mirror: Url,
    output_dir: PathBuf,
    parser: ReferenceParser,
    show_progress: bool,
}

impl Fetcher {
    /// Creates a fetcher, creating `output_dir` (recursively) if needed.
    ///
    /// The directory is stored in absolute form, so index entries and
    /// filename limits refer to the absolute path.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::OutputDir`] if the directory cannot be created
    /// or resolved.
    pub fn new(client: HttpClient, mirror: Url, output_dir: &Path) -> Result<Self, FetchError> {
        let dir_error = |source| FetchError::OutputDir {
            path: output_dir.to_path_buf(),
            source,
        };
        if !output_dir.exists() {
            std::fs::create_dir_all(output_dir).map_err(dir_error)?;
            info!(dir = %output_dir.display(), "Created output directory");
        }
        let output_dir = std::fs::canonicalize(output_dir).map_err(dir_error)?;

        Ok(Self {
            client,
            mirror,
            output_dir,
            parser: ReferenceParser::new(),
            show_progress: false,
        })
    }

    /// Uses `parser` for citation queries instead of the default grammar policy.
    #[must_use]
    pub fn with_reference_parser(mut self, parser: ReferenceParser) -> Self {
        self.parser = parser;
        self
    }

    /// Enables or disables the progress bar on stderr.
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Absolute output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Mirror the queries are submitted to.
    #[must_use]
    pub fn mirror(&self) -> &Url {
        &self.mirror
    }

    /// Processes `queries` in order and writes the index afterwards.
    ///
    /// - Queries are trimmed; blank and duplicate queries are dropped.
    /// - Queries already in the index with an existing file are skipped.
    /// - A failing query is logged and recorded with an empty path; the batch
    ///   continues.
    /// - When `interrupt` turns `true` the batch stops at once, abandoning an
    ///   in-flight request.
    ///
    /// The index is written in every case, including interruption.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Index`] if the index cannot be loaded or saved.
    #[instrument(skip(self, queries, interrupt), fields(queries = queries.len()))]
    pub async fn download(
        &self,
        queries: Vec<String>,
        mut interrupt: watch::Receiver<bool>,
    ) -> Result<FetchStats, FetchError> {
        let queries = prepare_queries(queries);
        let mut index = PdfIndex::load(&self.output_dir)?;

        let total = queries.len();
        let pending = index.exclude_existing(queries);
        let mut stats = FetchStats {
            already_present: total - pending.len(),
            ..FetchStats::default()
        };
        if stats.already_present > 0 {
            info!(
                count = stats.already_present,
                "Skipping queries already in index"
            );
        }

        let progress = self.progress_bar(pending.len());
        for query in &pending {
            if *interrupt.borrow() {
                stats.interrupted = true;
                break;
            }
            progress.set_message(truncate_for_display(query));

            let result = tokio::select! {
                biased;
                () = wait_for_interrupt(&mut interrupt) => None,
                result = self.fetch_one(query) => Some(result),
            };
            let Some(result) = result else {
                stats.interrupted = true;
                break;
            };

            match result {
                Ok(outcome) => {
                    if let FetchOutcome::Saved(path) = &outcome {
                        index.record_success(query.as_str(), path);
                    }
                    stats.record(&outcome);
                }
                Err(err) => {
                    error!(query = %query, error = %err, "Something went wrong for query");
                    index.record_failure(query.as_str());
                    stats.failed += 1;
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        if stats.interrupted {
            info!(dir = %self.output_dir.display(), "Interrupted, saving index");
        }
        index.save()?;

        info!(
            saved = stats.saved,
            failed = stats.failed,
            skipped = stats.skipped,
            already_present = stats.already_present,
            "Batch complete"
        );
        Ok(stats)
    }

    /// Runs one query end to end.
    ///
    /// Outcomes that are not errors (unrecognized query, article not found,
    /// CAPTCHA, incomplete page) are logged as warnings and returned as
    /// [`FetchOutcome`] variants.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] on network, HTTP status, or filesystem failure.
    #[instrument(skip(self), fields(mirror = %self.mirror))]
    pub async fn fetch_one(&self, query: &str) -> Result<FetchOutcome, DownloadError> {
        let classified = classify_with(query, &self.parser);
        let Some(clean_query) = classified.value() else {
            warn!(
                query = %query,
                "Could not extract a valid query. Try providing a valid URL, DOI or title"
            );
            return Ok(FetchOutcome::Unrecognized);
        };
        debug!(kind = %classified.kind(), clean_query = %clean_query, "classified query");

        let page = self.client.search(&self.mirror, clean_query).await?;
        match page_status(&page.body) {
            PageStatus::Ready => {}
            PageStatus::NotFound => {
                warn!(query = %query, "Could not find article");
                return Ok(FetchOutcome::NotFound);
            }
            PageStatus::Captcha => {
                warn!(query = %query, "Could not open page due to CAPTCHA");
                return Ok(FetchOutcome::Captcha);
            }
        }

        let article = extract_article(&page.body, &page.url);
        let Some(pdf_url) = article.pdf else {
            warn!(query = %query, "No PDF link found on article page");
            return Ok(FetchOutcome::MissingPdfLink);
        };
        let Some(citation) = article.citation else {
            warn!(pdf = %pdf_url, "No citation found on article page");
            return Ok(FetchOutcome::MissingCitation);
        };

        let stem = self.stem_for(&citation, clean_query);
        let path = self
            .client
            .download_to_path(&pdf_url, &self.output_dir, &stem)
            .await?;
        Ok(FetchOutcome::Saved(path))
    }

    fn stem_for(&self, citation: &str, clean_query: &str) -> String {
        let stem = sanitize_stem(citation, &self.output_dir);
        if !stem.is_empty() {
            return stem;
        }
        debug!("citation sanitized to empty stem, using query");
        // An empty result here is replaced by `article` when the path is resolved.
        sanitize_stem(clean_query, &self.output_dir)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:30} {pos}/{len} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    }
}

/// Trims queries and drops blanks and duplicates, keeping first occurrences.
#[must_use]
pub fn prepare_queries<I, S>(queries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    queries
        .into_iter()
        .filter_map(|query| {
            let trimmed = query.as_ref().trim();
            (!trimmed.is_empty() && seen.insert(trimmed.to_string())).then(|| trimmed.to_string())
        })
        .collect()
}

async fn wait_for_interrupt(interrupt: &mut watch::Receiver<bool>) {
    if interrupt.wait_for(|interrupted| *interrupted).await.is_err() {
        // Sender gone: no interrupt can arrive any more.
        std::future::pending::<()>().await;
    }
}

fn truncate_for_display(query: &str) -> String {
    const MAX_CHARS: usize = 60;
    if query.chars().count() <= MAX_CHARS {
        query.to_string()
    } else {
        let head: String = query.chars().take(MAX_CHARS - 3).collect();
        format!("{head}...")
    }
}
