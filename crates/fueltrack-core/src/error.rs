//! Error types for fueltrack-core.
//!
//! The projection engine itself is infallible apart from storage errors,
//! which it passes through untouched. The variants here come from the
//! outbound weather fetchers.
//!
//! # Retry classification
//!
//! | Error | Retried |
//! |-------|---------|
//! | [`Error::Http`] (timeout, connect) | yes |
//! | [`Error::Status`] with a 5xx code | yes |
//! | [`Error::Status`] otherwise | no |
//! | [`Error::Xml`], [`Error::Json`], [`Error::InvalidData`] | no |
//! | [`Error::InvalidRange`] | no |

use thiserror::Error;

/// Errors raised while fetching or decoding weather data.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream answered with a non-success status.
    #[error("Upstream returned HTTP {status} for {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// An observation document could not be parsed.
    #[error("Malformed XML: {0}")]
    Xml(String),

    /// A JSON payload could not be decoded.
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload decoded but its contents were unusable.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A date range was empty or reversed.
    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    /// A value failed to parse.
    #[error(transparent)]
    Parse(#[from] fueltrack_types::ParseError),
}

impl Error {
    /// Create a status error for a URL.
    pub fn status(status: u16, url: impl Into<String>) -> Self {
        Self::Status {
            status,
            url: url.into(),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }

    /// Whether repeating the request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::Status { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(err.to_string())
    }
}

/// Result type alias using fueltrack-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
