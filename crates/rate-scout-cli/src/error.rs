use rate_scout::ScanError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("usage error: {0}")]
    Usage(String),

    #[error(transparent)]
    Scan(ScanError),

    #[error("failed to launch browser: {0}")]
    Browser(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            Self::Scan(_) | Self::Browser(_) | Self::Serialization(_) | Self::Io(_) => 1,
        }
    }
}

// Bad caller input surfaces from the library as URL or profile errors.
impl From<ScanError> for CliError {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::InvalidUrl { .. } | ScanError::Profile(_) => Self::Usage(e.to_string()),
            other => Self::Scan(other),
        }
    }
}
