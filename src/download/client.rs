//! HTTP client wrapper for mirror searches and PDF downloads.
//!
//! This module provides the `HttpClient` struct, which owns one pooled
//! `reqwest::Client` with a cookie store, so the session the mirror sets on
//! the search request is reused for the PDF request that follows.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, PDF_EXTENSION, READ_TIMEOUT_SECS, SEARCH_FIELD};
use super::error::DownloadError;
use super::filename::{PathLimits, resolve_unique_path};
use crate::user_agent;

/// HTTP client for searching a mirror and streaming PDFs to disk.
///
/// Create once per run and reuse for every query.
///
/// # Example
///
/// ```no_run
/// use scihub_core::download::HttpClient;
/// use std::path::Path;
/// use url::Url;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let mirror = Url::parse("https://sci-hub.se/")?;
/// let page = client.search(&mirror, "10.1016/j.cor.2016.09.025").await?;
/// println!("{} bytes of markup from {}", page.body.len(), page.url);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

/// Markup returned by a mirror search, with the URL it was served from.
#[derive(Debug, Clone)]
pub struct SearchPage {
    /// Final URL after redirects; relative links on the page resolve against it.
    pub url: Url,
    /// Response body as text.
    pub body: String,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes (for large files)
    /// - Gzip decompression and cookie store: enabled
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Submits `query` to the mirror's search form.
    ///
    /// Sends `POST <mirror>` with the form body `request=<query>` and returns
    /// the result page markup.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the request fails (network error, timeout),
    /// the mirror answers with a non-success status, or the body cannot be
    /// read as text.
    #[instrument(skip(self, query), fields(mirror = %mirror, query_len = query.len()))]
    pub async fn search(&self, mirror: &Url, query: &str) -> Result<SearchPage, DownloadError> {
        let body = format!("{SEARCH_FIELD}={}", urlencoding::encode(query));
        let response = self
            .client
            .post(mirror.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| DownloadError::network(mirror.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(mirror.as_str(), status.as_u16()));
        }

        let url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| DownloadError::network(url.as_str(), e))?;
        debug!(final_url = %url, bytes = body.len(), "received search page");

        Ok(SearchPage { url, body })
    }

    /// Downloads `url` into `output_dir` as `<stem>.pdf`.
    ///
    /// The destination never overwrites an existing file: collisions get a
    /// numeric suffix (see [`resolve_unique_path`]). The body is streamed to
    /// `<stem>.pdf.part` and renamed on completion; the partial file is removed
    /// if the transfer fails or the download is cancelled.
    ///
    /// # Returns
    ///
    /// The path of the written file.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The request fails (network error, timeout)
    /// - The server returns an error status (4xx, 5xx)
    /// - Writing to disk fails
    #[must_use = "download result contains the path to the downloaded file"]
    #[instrument(skip(self, output_dir), fields(url = %url))]
    pub async fn download_to_path(
        &self,
        url: &Url,
        output_dir: &Path,
        stem: &str,
    ) -> Result<PathBuf, DownloadError> {
        debug!("starting download");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DownloadError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url.as_str(), status.as_u16()));
        }

        let limits = PathLimits::for_dir(output_dir);
        let file_path = resolve_unique_path(output_dir, stem, PDF_EXTENSION, limits);
        debug!(path = %file_path.display(), "resolved output path");

        // Removed on error and when this future is dropped mid-transfer.
        let partial = PartialFile::new(partial_path(&file_path));
        let mut file = File::create(partial.path())
            .await
            .map_err(|e| DownloadError::io(partial.path(), e))?;

        let bytes_written = stream_to_file(&mut file, response, url.as_str(), partial.path()).await?;
        drop(file);

        tokio::fs::rename(partial.path(), &file_path)
            .await
            .map_err(|e| DownloadError::io(file_path.clone(), e))?;
        partial.keep();

        info!(
            path = %file_path.display(),
            bytes = bytes_written,
            "download complete"
        );
        Ok(file_path)
    }
}

/// Path the body is streamed to before it is renamed to `final_path`.
fn partial_path(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// In-progress download file, deleted on drop unless [`PartialFile::keep`] ran.
struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// The file was renamed into place; nothing to clean up.
    fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.armed && std::fs::remove_file(&self.path).is_ok() {
            debug!(path = %self.path.display(), "removed partial download");
        }
    }
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;
    }

    // Ensure all data is flushed to disk
    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use tempfile::TempDir;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mirror_url(server: &MockServer) -> Url {
        Url::parse(&format!("{}/", server.uri())).unwrap()
    }

    // ==================== search ====================

    #[tokio::test]
    async fn test_search_posts_form_encoded_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string("request=10.1016%2Fj.cor.2016.09.025"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let page = client
            .search(&mirror_url(&mock_server), "10.1016/j.cor.2016.09.025")
            .await
            .unwrap();

        assert_eq!(page.body, "<html>ok</html>");
        assert_eq!(page.url.path(), "/");
    }

    #[tokio::test]
    async fn test_search_encodes_spaces_and_unicode() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_string("request=caf%C3%A9%20au%20lait"))
            .respond_with(ResponseTemplate::new(200).set_body_string("page"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let result = client
            .search(&mirror_url(&mock_server), "café au lait")
            .await;
        assert!(result.is_ok(), "Expected Ok, got: {result:?}");
    }

    #[tokio::test]
    async fn test_search_non_success_status_is_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let result = client.search(&mirror_url(&mock_server), "query").await;

        match result {
            Err(DownloadError::HttpStatus { status, .. }) => assert_eq!(status, 503),
            other => panic!("Expected HttpStatus error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_sends_identifying_user_agent() {
        use wiremock::{Match, Request};

        struct ScihubUaMatcher;

        impl Match for ScihubUaMatcher {
            fn matches(&self, request: &Request) -> bool {
                request
                    .headers
                    .get("User-Agent")
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|ua| {
                        ua.starts_with("scihub/") && ua.contains(env!("CARGO_PKG_VERSION"))
                    })
            }
        }

        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(ScihubUaMatcher)
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let result = client.search(&mirror_url(&mock_server), "q").await;
        assert!(result.is_ok(), "Client must send User-Agent; got: {result:?}");
    }

    #[tokio::test]
    async fn test_search_keeps_session_cookie_for_next_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Set-Cookie", "session=abc123; Path=/")
                    .set_body_string("page"),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/file.pdf"))
            .and(header("cookie", "session=abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let client = HttpClient::new();
        client.search(&mirror_url(&mock_server), "q").await.unwrap();

        let url = Url::parse(&format!("{}/file.pdf", mock_server.uri())).unwrap();
        let result = client.download_to_path(&url, temp_dir.path(), "paper").await;
        assert!(result.is_ok(), "Expected Ok, got: {result:?}");
    }

    // ==================== download_to_path ====================

    #[tokio::test]
    async fn test_download_to_path_writes_stem_pdf() {
        let mock_server = MockServer::start().await;
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/test.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PDF content here"))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = Url::parse(&format!("{}/test.pdf", mock_server.uri())).unwrap();

        let file_path = client
            .download_to_path(&url, temp_dir.path(), "a-heuristic-algorithm")
            .await
            .unwrap();

        assert_eq!(file_path, temp_dir.path().join("a-heuristic-algorithm.pdf"));
        assert_eq!(std::fs::read(&file_path).unwrap(), b"PDF content here");
    }

    #[tokio::test]
    async fn test_download_to_path_does_not_overwrite_existing() {
        let mock_server = MockServer::start().await;
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("paper.pdf"), b"old").unwrap();

        Mock::given(method("GET"))
            .and(path("/new.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new"))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = Url::parse(&format!("{}/new.pdf", mock_server.uri())).unwrap();
        let file_path = client
            .download_to_path(&url, temp_dir.path(), "paper")
            .await
            .unwrap();

        assert_eq!(file_path, temp_dir.path().join("paper-2.pdf"));
        assert_eq!(
            std::fs::read(temp_dir.path().join("paper.pdf")).unwrap(),
            b"old"
        );
        assert_eq!(std::fs::read(&file_path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_download_to_path_404_leaves_no_file() {
        let mock_server = MockServer::start().await;
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/missing.pdf"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = Url::parse(&format!("{}/missing.pdf", mock_server.uri())).unwrap();
        let result = client.download_to_path(&url, temp_dir.path(), "paper").await;

        match result {
            Err(DownloadError::HttpStatus { status, .. }) => assert_eq!(status, 404),
            other => panic!("Expected HttpStatus error, got: {other:?}"),
        }
        let entries: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert!(entries.is_empty(), "No files expected, found: {entries:?}");
    }

    #[tokio::test]
    async fn test_download_cleanup_on_read_timeout() {
        let mock_server = MockServer::start().await;
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"data")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let client = HttpClient::new_with_timeouts(30, 1);
        let url = Url::parse(&format!("{}/slow", mock_server.uri())).unwrap();

        let result = client.download_to_path(&url, temp_dir.path(), "slow").await;
        assert!(result.is_err(), "expected timeout or network error");

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert!(
            entries.is_empty(),
            "Partial file must be cleaned up after stream error, found: {entries:?}"
        );
    }

    #[tokio::test]
    async fn test_download_large_body_streams() {
        let mock_server = MockServer::start().await;
        let temp_dir = TempDir::new().unwrap();
        let body = vec![b'x'; 2 * 1024 * 1024];

        Mock::given(method("GET"))
            .and(path("/large.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = Url::parse(&format!("{}/large.pdf", mock_server.uri())).unwrap();
        let file_path = client
            .download_to_path(&url, temp_dir.path(), "large")
            .await
            .unwrap();

        assert_eq!(std::fs::metadata(&file_path).unwrap().len(), body.len() as u64);
        assert!(!temp_dir.path().join("large.pdf.part").exists());
    }

    /// Serves a PDF response that promises more bytes than it sends, then stalls.
    async fn stalling_pdf_server() -> String {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut request = [0_u8; 4096];
                    let _ = socket.read(&mut request).await;
                    let _ = socket
                        .write_all(
                            b"HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\n\
                              Content-Length: 100000\r\n\r\n%PDF-1.4 partial",
                        )
                        .await;
                    tokio::time::sleep(Duration::from_secs(60)).await;
                });
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_download_cancelled_mid_body_leaves_no_file() {
        let base = stalling_pdf_server().await;
        let temp_dir = TempDir::new().unwrap();
        let client = HttpClient::new();
        let url = Url::parse(&format!("{base}/stall.pdf")).unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            client.download_to_path(&url, temp_dir.path(), "stalled"),
        )
        .await;
        assert!(result.is_err(), "download should still be streaming");

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert!(
            entries.is_empty(),
            "Cancelled download must not leave files, found: {entries:?}"
        );
    }
}
