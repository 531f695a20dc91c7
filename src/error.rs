//! Error types for the scanning core.
//!
//! Only two kinds of failure are allowed to end a run: [`ScanError::FeedFetch`]
//! (no matching is possible without the IOC list) and [`ScanError::Config`]
//! (contradictory options, rejected before any network activity). Everything
//! else is contained where it happens and logged.

/// Errors produced by the scanning core.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The IOC feed could not be downloaded.
    #[error("failed to fetch IOC feed from {url}: {reason}")]
    FeedFetch { url: String, reason: String },

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The hosting API answered with a non-success status.
    #[error("hosting API request failed: {url}: HTTP {status}")]
    Api { url: String, status: u16 },

    /// Contradictory or invalid run options.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A repository spec that is not `owner/repo`.
    #[error("invalid repository '{0}', expected owner/repo")]
    InvalidRepo(String),

    /// A locator was handed a target it does not know how to resolve.
    #[error("{locator} locator cannot resolve target {target}")]
    UnsupportedTarget {
        locator: &'static str,
        target: String,
    },

    /// A base URL could not be parsed.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ScanError {
    /// Returns true for errors that must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScanError::FeedFetch { .. } | ScanError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
