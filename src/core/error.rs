use std::fmt;

/// Error types for run-level linksentry failures.
///
/// Per-URL problems never surface here; they are recorded in the
/// `CheckOutcome` and classified. These variants cover startup,
/// configuration and consumer sink failures only.
#[derive(Debug)]
pub enum LinkSentryError {
    /// IO error (file operations, writing to a sink, etc.)
    Io(std::io::Error),

    /// Configuration error
    Config(String),

    /// HTTP client construction error
    Http(reqwest::Error),

    /// Regex compilation error
    Regex(regex::Error),

    /// TOML parsing error
    TomlParsing(toml::de::Error),

    /// JSON serialization error
    Json(serde_json::Error),

    /// Invalid argument error
    InvalidArgument(String),
}

impl fmt::Display for LinkSentryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkSentryError::Io(err) => write!(f, "IO error: {err}"),
            LinkSentryError::Config(msg) => write!(f, "Configuration error: {msg}"),
            LinkSentryError::Http(err) => write!(f, "HTTP error: {err}"),
            LinkSentryError::Regex(err) => write!(f, "Regex error: {err}"),
            LinkSentryError::TomlParsing(err) => write!(f, "TOML parsing error: {err}"),
            LinkSentryError::Json(err) => write!(f, "JSON error: {err}"),
            LinkSentryError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
        }
    }
}

impl std::error::Error for LinkSentryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LinkSentryError::Io(err) => Some(err),
            LinkSentryError::Http(err) => Some(err),
            LinkSentryError::Regex(err) => Some(err),
            LinkSentryError::TomlParsing(err) => Some(err),
            LinkSentryError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LinkSentryError {
    fn from(err: std::io::Error) -> Self {
        LinkSentryError::Io(err)
    }
}

impl From<reqwest::Error> for LinkSentryError {
    fn from(err: reqwest::Error) -> Self {
        LinkSentryError::Http(err)
    }
}

impl From<regex::Error> for LinkSentryError {
    fn from(err: regex::Error) -> Self {
        LinkSentryError::Regex(err)
    }
}

impl From<toml::de::Error> for LinkSentryError {
    fn from(err: toml::de::Error) -> Self {
        LinkSentryError::TomlParsing(err)
    }
}

impl From<serde_json::Error> for LinkSentryError {
    fn from(err: serde_json::Error) -> Self {
        LinkSentryError::Json(err)
    }
}

/// Type alias for Results using LinkSentryError
pub type Result<T> = std::result::Result<T, LinkSentryError>;
