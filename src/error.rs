//! Error types for webprobe

use thiserror::Error;

/// Main error type for probe operations
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Transport failure or timeout. Always recoverable at the probe/task level.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("no form found in page")]
    NoFormFound,

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("no probe categories selected")]
    EmptyCategorySelection,

    #[error("unknown probe category '{0}'")]
    UnknownCategory(String),

    #[error("unsupported form method '{0}'")]
    UnsupportedMethod(String),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ProbeError {
    /// True for caller-input errors that abort a whole run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProbeError::InvalidTarget(_)
                | ProbeError::EmptyCategorySelection
                | ProbeError::UnknownCategory(_)
                | ProbeError::Config(_)
        )
    }
}

/// Result type alias for probe operations
pub type Result<T> = std::result::Result<T, ProbeError>;
