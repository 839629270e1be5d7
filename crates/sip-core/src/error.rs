//! Error and diagnostic types for the SIP value models.
//!
//! Parsing either succeeds, possibly with [`Diagnostic`]s describing how a
//! non-compliant input was normalized, or fails with an [`Error`]. A failed
//! parse never leaves a partially updated value behind.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for sip-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while parsing or building SIP values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The URI scheme is not one of `sip`, `sips` or `tel`
    #[error("Unsupported scheme: {0}:")]
    UnsupportedScheme(String),

    /// A `tel:` URI was given while TEL to SIP conversion is disabled
    #[error("Unsupported scheme: tel: conversion to SIP is disabled")]
    TelConversionDisabled,

    /// The port token after the host could not be turned into a port number
    #[error("Malformed port: {0:?}")]
    MalformedPort(String),

    /// The host part is missing or its IPv6 literal is not terminated
    #[error("Malformed host: {0:?}")]
    MalformedHost(String),

    /// A `?name=value` URI header without `=`
    #[error("Malformed URI header: {0:?}")]
    MalformedUriHeader(String),

    /// A multipart Content-Type without a `boundary` parameter
    #[error("Multipart content type has no boundary parameter")]
    MissingBoundary,

    /// A multipart body that contains no boundary delimiter
    #[error("Malformed multipart body: {0}")]
    MalformedMultipart(String),

    /// A body part header line that is not `name: value`
    #[error("Malformed body part header: {0:?}")]
    MalformedPartHeader(String),

    /// A mandatory parameter is absent
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// A parameter value that does not have the expected form
    #[error("Invalid value for parameter {name}: {value:?}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Offending raw value
        value: String,
    },

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for both unknown schemes and a disabled `tel:` conversion.
    pub fn is_unsupported_scheme(&self) -> bool {
        matches!(self, Error::UnsupportedScheme(_) | Error::TelConversionDisabled)
    }

    /// True for errors that abort parsing of a value because its grammar
    /// cannot be recovered.
    pub fn is_fatal_grammar(&self) -> bool {
        !matches!(self, Error::Config(_))
    }

    pub(crate) fn invalid_param(name: impl Into<String>, value: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A normalization applied to a non-compliant input that was still accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// `host:` with nothing after the colon; the port was left unset
    EmptyPort,
    /// `host:5060:5060`; the repeated value was taken once
    DuplicatePort(u16),
    /// A body part without Content-Type was typed as `text/plain`
    DefaultPartContentType,
    /// A multipart body ended without its `--boundary--` line
    MissingCloseDelimiter,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::EmptyPort => f.write_str("empty port number, assuming default"),
            Diagnostic::DuplicatePort(port) => write!(f, "duplicate port number, taking {}", port),
            Diagnostic::DefaultPartContentType => {
                f.write_str("body part without Content-Type, assuming text/plain")
            }
            Diagnostic::MissingCloseDelimiter => {
                f.write_str("multipart body without close delimiter")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_scheme_family() {
        assert!(Error::UnsupportedScheme("http".into()).is_unsupported_scheme());
        assert!(Error::TelConversionDisabled.is_unsupported_scheme());
        assert!(!Error::MalformedPort("x".into()).is_unsupported_scheme());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::UnsupportedScheme("http".into()).to_string(),
            "Unsupported scheme: http:"
        );
        assert!(Error::MissingBoundary.is_fatal_grammar());
        assert!(!Error::Config("bad".into()).is_fatal_grammar());
    }

    #[test]
    fn test_diagnostic_display() {
        assert_eq!(
            Diagnostic::DuplicatePort(5060).to_string(),
            "duplicate port number, taking 5060"
        );
    }
}
