//! # SIP Reason Header
//!
//! The Reason header ([RFC 3326](https://datatracker.ietf.org/doc/html/rfc3326))
//! carries the protocol-level cause of a call release:
//!
//! ```text
//! Reason: Q.850;cause=16;text="Terminated"
//! Reason: SIP;cause=600;text="Busy Everywhere"
//! ```
//!
//! Peers differ in the order of `cause` and `text` and in the whitespace they
//! put around `;` and `=`. [`Reason`] accepts all of these and always writes
//! the canonical `protocol;cause=N;text="..."` form. The free text may contain
//! `;` inside its quotes.
//!
//! ## Examples
//!
//! ```rust
//! use sipwire_sip_core::prelude::*;
//! use std::str::FromStr;
//!
//! let reason = Reason::from_str(r#"Q.850 ; text= "Normal; clearing" ; cause= 16"#).unwrap();
//! assert_eq!(reason.cause, 16);
//! assert_eq!(reason.to_string(), r#"Q.850;cause=16;text="Normal; clearing""#);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::parser::quoted::{split_quoted, unquote};

/// Reason header value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
    /// Protocol token, e.g. `Q.850` or `SIP`
    pub protocol: String,
    /// Protocol cause code
    pub cause: u16,
    /// Free text, without its quotes
    pub text: Option<String>,
    /// Other `reason-extension` parameters, verbatim
    pub extensions: Vec<String>,
}

impl Reason {
    /// Create a Reason with a protocol and cause code
    pub fn new(protocol: impl Into<String>, cause: u16) -> Self {
        Reason {
            protocol: protocol.into(),
            cause,
            text: None,
            extensions: Vec::new(),
        }
    }

    /// Set the free text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Parse a Reason header value (without the `Reason:` name).
    ///
    /// # Errors
    ///
    /// [`Error::MissingParameter`] when there is no `cause`, and
    /// [`Error::InvalidParameter`] when it is not a number.
    pub fn parse(value: &str) -> Result<Self> {
        let mut segments = split_quoted(value, ';', None).into_iter();
        let protocol = segments.next().unwrap_or_default().trim();
        if protocol.is_empty() {
            return Err(Error::MissingParameter("protocol"));
        }

        let mut cause = None;
        let mut text = None;
        let mut extensions = Vec::new();
        for segment in segments.map(str::trim).filter(|s| !s.is_empty()) {
            let Some((name, raw)) = segment.split_once('=') else {
                extensions.push(segment.to_string());
                continue;
            };
            let (name, raw) = (name.trim(), raw.trim());
            if name.eq_ignore_ascii_case("cause") {
                cause = Some(
                    raw.parse::<u16>()
                        .map_err(|_| Error::invalid_param("cause", raw))?,
                );
            } else if name.eq_ignore_ascii_case("text") {
                text = Some(unquote(raw).to_string());
            } else {
                extensions.push(format!("{}={}", name, raw));
            }
        }

        let reason = Reason {
            protocol: protocol.to_string(),
            cause: cause.ok_or(Error::MissingParameter("cause"))?,
            text,
            extensions,
        };
        debug!(protocol = %reason.protocol, cause = reason.cause, "parsed Reason");
        Ok(reason)
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};cause={}", self.protocol, self.cause)?;
        if let Some(ref text) = self.text {
            write!(f, ";text=\"{}\"", text)?;
        }
        for ext in &self.extensions {
            write!(f, ";{}", ext)?;
        }
        Ok(())
    }
}

impl FromStr for Reason {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Reason::parse(s)
    }
}
