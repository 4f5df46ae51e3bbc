//! User-Agent string sent with every mirror and download request.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/scihub";

/// Default User-Agent (identifies the tool and its version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("scihub/{version} (article-retrieval-tool; +{PROJECT_UA_URL})")
}
