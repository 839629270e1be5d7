//! # SIP Content-Type
//!
//! The Content-Type header value ([RFC 3261 Section 20.15](https://datatracker.ietf.org/doc/html/rfc3261#section-20.15),
//! [RFC 2045](https://datatracker.ietf.org/doc/html/rfc2045)) describes the
//! message body:
//!
//! ```text
//! type/subtype;parameter=value;another=parameter
//! ```
//!
//! Parameters are open-ended and kept in insertion order, so a parsed value
//! serializes back the way it was written.
//!
//! ## Examples
//!
//! ```rust
//! use sipwire_sip_core::prelude::*;
//! use std::str::FromStr;
//!
//! let ct = ContentType::from_str("Multipart/Mixed; boundary=OSS-unique-boundary-42").unwrap();
//! assert!(ct.is_multipart());
//! assert_eq!(ct.boundary(), Some("OSS-unique-boundary-42"));
//! assert_eq!(ct.to_string(), "Multipart/Mixed;boundary=OSS-unique-boundary-42");
//!
//! let sdp = ContentType::new("application/sdp");
//! assert_eq!(sdp.subtype(), "sdp");
//! ```

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parser::quoted::{split_quoted, unquote};
use crate::types::param::{parse_generic_params, write_generic_params};

/// A MIME type with its parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentType {
    /// `type/subtype` as written; compare with [`ContentType::essence`]
    pub name: String,
    /// Parameters in insertion order
    pub params: IndexMap<String, String>,
}

impl ContentType {
    /// Create a content type without parameters
    pub fn new(name: impl Into<String>) -> Self {
        ContentType {
            name: name.into(),
            params: IndexMap::new(),
        }
    }

    /// `text/plain`, the MIME default for body parts without a Content-Type
    pub fn text_plain() -> Self {
        Self::new("text/plain")
    }

    /// Parse a Content-Type header value.
    ///
    /// The type name keeps its case so that a part's declared type is written
    /// back unchanged. An empty value is rejected.
    pub fn parse(value: &str) -> Result<Self> {
        let mut fields = split_quoted(value, ';', None).into_iter();
        let name = fields.next().unwrap_or_default().trim().to_string();
        if name.is_empty() {
            return Err(Error::invalid_param("content-type", value));
        }
        Ok(ContentType {
            name,
            params: parse_generic_params(fields),
        })
    }

    /// Add a parameter (builder style)
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_param(name, value);
        self
    }

    /// Type part of the name, e.g. `multipart`
    pub fn type_name(&self) -> &str {
        self.name.split_once('/').map_or(self.name.as_str(), |(t, _)| t)
    }

    /// Subtype part of the name, e.g. `mixed`
    pub fn subtype(&self) -> &str {
        self.name.split_once('/').map_or("", |(_, s)| s)
    }

    /// Lower-cased `type/subtype`, for comparisons
    pub fn essence(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    /// True for any `multipart/*` type
    pub fn is_multipart(&self) -> bool {
        self.type_name().eq_ignore_ascii_case("multipart")
    }

    /// The `boundary` parameter with surrounding quotes removed
    pub fn boundary(&self) -> Option<&str> {
        self.param("boundary").map(unquote)
    }

    /// Look up a parameter value. Names are compared case-insensitively.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a parameter, keeping its position if it already exists
    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), value.into());
    }

    /// Remove a parameter, preserving the order of the others
    pub fn remove_param(&mut self, name: &str) -> Option<String> {
        self.params.shift_remove(name)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        write_generic_params(f, &self.params)
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ContentType::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let ct = ContentType::parse(" Application/SDP").unwrap();
        assert_eq!(ct.name, "Application/SDP");
        assert_eq!(ct.essence(), "application/sdp");
        assert!(ct.params.is_empty());
        assert_eq!(ct.to_string(), "Application/SDP");

        let ct = ContentType::parse("text/plain; charset=utf-8 ;format=flowed").unwrap();
        assert_eq!(ct.param("charset"), Some("utf-8"));
        assert_eq!(ct.to_string(), "text/plain;charset=utf-8;format=flowed");
    }

    #[test]
    fn test_quoted_boundary() {
        let ct = ContentType::parse(r#"multipart/mixed;boundary="a;b""#).unwrap();
        assert_eq!(ct.boundary(), Some("a;b"));
        assert_eq!(ct.to_string(), r#"multipart/mixed;boundary="a;b""#);
    }

    #[test]
    fn test_type_and_subtype() {
        let ct = ContentType::new("application/EmergencyCallData.Control+xml");
        assert_eq!(ct.type_name(), "application");
        assert_eq!(ct.subtype(), "EmergencyCallData.Control+xml");
        assert_eq!(ct.to_string(), "application/EmergencyCallData.Control+xml");
        assert!(!ct.is_multipart());
        assert!(ContentType::new("Multipart/Related").is_multipart());
    }

    #[test]
    fn test_param_editing() {
        let mut ct = ContentType::text_plain().with_param("charset", "utf-8").with_param("a", "1");
        ct.set_param("charset", "latin1");
        assert_eq!(ct.to_string(), "text/plain;charset=latin1;a=1");
        assert_eq!(ct.remove_param("charset"), Some("latin1".to_string()));
        assert_eq!(ct.to_string(), "text/plain;a=1");
        assert_eq!(ct.remove_param("missing"), None);
    }

    #[test]
    fn test_copy_isolation() {
        let original = ContentType::parse("multipart/mixed;boundary=OSS-unique-boundary-42").unwrap();
        let mut copy = original.clone();
        copy.set_param("some", "value");
        assert_eq!(original.to_string(), "multipart/mixed;boundary=OSS-unique-boundary-42");
        assert_eq!(copy.to_string(), "multipart/mixed;boundary=OSS-unique-boundary-42;some=value");
    }

    #[test]
    fn test_empty_value() {
        assert!(ContentType::parse("").is_err());
        assert!(ContentType::parse(" ;charset=utf-8").is_err());
    }
}
