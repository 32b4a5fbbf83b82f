//! Error types for data parsing in fueltrack-types.

use thiserror::Error;

/// Errors that can occur when parsing fuel-tracking values.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A date string was not in `YYYY-MM-DD` form.
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    /// A weather source label was not recognised.
    #[error("Unknown weather source: {0}")]
    UnknownWeatherSource(String),

    /// A stored setting could not be interpreted.
    #[error("Invalid value '{value}' for setting '{key}'")]
    InvalidSetting { key: String, value: String },
}

/// Result type alias using fueltrack-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
