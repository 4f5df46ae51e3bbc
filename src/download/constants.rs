//! Constants for the download module (timeouts, page markers).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default mirror used when neither the CLI nor the config file names one.
pub const DEFAULT_MIRROR: &str = "https://sci-hub.se/";

/// Extension given to every saved article.
pub const PDF_EXTENSION: &str = "pdf";

/// Form field carrying the query in the mirror's search POST.
pub const SEARCH_FIELD: &str = "request";

/// Substring the mirror puts on its result page when nothing matched.
pub const NOT_FOUND_MARKER: &str = "article not found";

/// Substring the mirror puts on its result page when it demands a CAPTCHA.
pub const CAPTCHA_MARKER: &str = "Для просмотра статьи разгадайте капчу";
