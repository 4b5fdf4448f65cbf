//! Configuration error types.

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Port value is outside valid range (1-65535).
    #[error("invalid port '{value}': must be between 1 and 65535")]
    InvalidPort { value: String },

    /// Port string could not be parsed as a number.
    #[error("failed to parse port '{value}': {source}")]
    PortParseError {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Bind address string could not be parsed.
    #[error("failed to parse bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// Environment name is not one of the known environments.
    #[error("unknown environment '{value}': expected 'development' or 'production'")]
    UnknownEnvironment { value: String },

    /// A numeric setting could not be parsed.
    #[error("failed to parse {name}='{value}': {source}")]
    InvalidNumber {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// A boolean setting was not `true`/`false`/`1`/`0`.
    #[error("failed to parse {name}='{value}': expected a boolean")]
    InvalidBool { name: &'static str, value: String },

    /// A TTL was configured as zero.
    #[error("{name} must be greater than zero")]
    ZeroTtl { name: &'static str },

    /// A size limit was configured as zero.
    #[error("{name} must be greater than zero")]
    ZeroLimit { name: &'static str },
}
