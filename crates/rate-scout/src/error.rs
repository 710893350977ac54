//! Error types for page rendering and scanning.

/// Failure to load a page.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("navigation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("navigation failed: {0}")]
    Failed(String),
}

/// Failure while querying or interacting with a loaded page.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("DOM query failed: {0}")]
    Query(String),

    #[error("element interaction failed: {0}")]
    Interaction(String),

    #[error("no page loaded")]
    NotLoaded,
}

/// Run-level failures. Per-date failures never surface here.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("failed to open browsing session: {0}")]
    Session(String),

    #[error("invalid hotel URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid extraction profile: {0}")]
    Profile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ScanResult<T> = Result<T, ScanError>;
