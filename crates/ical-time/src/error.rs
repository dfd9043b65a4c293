//! Error types for ical-time operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IcalTimeError {
    /// The literal does not match any accepted shape.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// The literal is well-formed but uses a component this dialect rejects
    /// (months in a duration).
    #[error("Unsupported component: {0}")]
    UnsupportedComponent(String),

    /// No resolution strategy recognised the zone identifier. Carries the
    /// identifier exactly as the caller supplied it.
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// A numeric or calendar field is outside its range (day 32, hour 24,
    /// a duration that overflows).
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, IcalTimeError>;
