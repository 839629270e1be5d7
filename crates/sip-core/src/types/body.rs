//! # Message Bodies
//!
//! A [`MsgBody`] pairs the raw bytes of a SIP message body with its
//! [`ContentType`]. Parsing is explicit: `content` stays `None` until
//! [`MsgBody::parse`] is called, after which it holds either the raw bytes or,
//! for `multipart/*` types, the split [`MultipartMixBody`].
//!
//! ## Examples
//!
//! ```rust
//! use sipwire_sip_core::prelude::*;
//! use std::str::FromStr;
//!
//! let ct = ContentType::from_str("multipart/mixed;boundary=b1").unwrap();
//! let raw = "--b1\r\nContent-Type: application/sdp\r\n\r\nv=0\r\n--b1--\r\n";
//! let mut body = MsgBody::new(raw, ct);
//! body.parse().unwrap();
//!
//! let parts = body.multipart().unwrap();
//! assert_eq!(parts.parts.len(), 1);
//! assert_eq!(parts.parts[0].body.mtype.to_string(), "application/sdp");
//! ```

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Diagnostic, Error, Result};
use crate::types::content_type::ContentType;
use crate::types::multipart::MultipartMixBody;

/// Parsed form of a body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyContent {
    /// Any non-multipart body, unchanged
    Raw(Bytes),
    /// A split multipart body
    Multipart(MultipartMixBody),
}

/// A message body and its type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgBody {
    /// Body bytes as received
    pub raw: Bytes,
    /// Content type of the body
    pub mtype: ContentType,
    /// Parsed content, `None` until [`MsgBody::parse`] succeeds
    pub content: Option<BodyContent>,
    diagnostics: Vec<Diagnostic>,
}

impl MsgBody {
    /// Create an unparsed body
    pub fn new(raw: impl Into<Bytes>, mtype: ContentType) -> Self {
        MsgBody {
            raw: raw.into(),
            mtype,
            content: None,
            diagnostics: Vec::new(),
        }
    }

    /// Create a multipart body from parts. The content type is
    /// `multipart/mixed` with the parts' boundary.
    pub fn from_multipart(multipart: MultipartMixBody) -> Self {
        let mtype = ContentType::new("multipart/mixed").with_param("boundary", multipart.boundary.clone());
        MsgBody {
            raw: multipart.to_bytes(),
            mtype,
            content: Some(BodyContent::Multipart(multipart)),
            diagnostics: Vec::new(),
        }
    }

    /// Parse the body according to its content type.
    ///
    /// On error `content` is left as it was.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingBoundary`] for a multipart type without `boundary`
    /// - [`Error::MalformedMultipart`] when no delimiter line is present
    /// - [`Error::MalformedPartHeader`] for a broken part header block
    pub fn parse(&mut self) -> Result<()> {
        if !self.mtype.is_multipart() {
            debug!(content_type = %self.mtype.name, len = self.raw.len(), "raw body");
            self.content = Some(BodyContent::Raw(self.raw.clone()));
            self.diagnostics.clear();
            return Ok(());
        }

        let boundary = self.mtype.boundary().ok_or(Error::MissingBoundary)?;
        debug!(content_type = %self.mtype.name, boundary, "splitting multipart body");
        let mut diagnostics = Vec::new();
        let multipart = MultipartMixBody::parse(&self.raw, boundary, &mut diagnostics)?;
        self.content = Some(BodyContent::Multipart(multipart));
        self.diagnostics = diagnostics;
        Ok(())
    }

    /// True once [`MsgBody::parse`] has succeeded
    pub fn is_parsed(&self) -> bool {
        self.content.is_some()
    }

    /// The split body, if this is a parsed multipart body
    pub fn multipart(&self) -> Option<&MultipartMixBody> {
        match self.content {
            Some(BodyContent::Multipart(ref multipart)) => Some(multipart),
            _ => None,
        }
    }

    /// Normalizations applied while parsing, nested parts included
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut all = self.diagnostics.clone();
        if let Some(multipart) = self.multipart() {
            for part in &multipart.parts {
                all.extend(part.body.diagnostics());
            }
        }
        all
    }

    /// Serialized body. A multipart body is rebuilt from its parts.
    pub fn to_bytes(&self) -> Bytes {
        match self.content {
            Some(BodyContent::Multipart(ref multipart)) => multipart.to_bytes(),
            Some(BodyContent::Raw(ref raw)) => raw.clone(),
            None => self.raw.clone(),
        }
    }
}

impl fmt::Display for MsgBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::multipart::BodyPart;

    #[test]
    fn test_raw_body() {
        let mut body = MsgBody::new("v=0\r\n", ContentType::new("application/sdp"));
        assert!(!body.is_parsed());
        body.parse().unwrap();
        assert_eq!(body.content, Some(BodyContent::Raw(Bytes::from_static(b"v=0\r\n"))));
        assert!(body.multipart().is_none());
        assert_eq!(body.to_string(), "v=0\r\n");
    }

    #[test]
    fn test_missing_boundary_leaves_body_untouched() {
        let mut body = MsgBody::new("--x\r\n", ContentType::new("multipart/mixed"));
        assert_eq!(body.parse().unwrap_err(), Error::MissingBoundary);
        assert!(body.content.is_none());
    }

    #[test]
    fn test_quoted_boundary() {
        let ct = ContentType::new("multipart/mixed").with_param("boundary", "\"simple boundary\"");
        let mut body = MsgBody::new("--simple boundary\r\n\r\nhi\r\n--simple boundary--", ct);
        body.parse().unwrap();
        assert_eq!(body.multipart().map(|m| m.parts.len()), Some(1));
        assert_eq!(body.diagnostics(), vec![Diagnostic::DefaultPartContentType]);
    }

    #[test]
    fn test_nested_multipart() {
        let raw = "--outer\r\n\
                   Content-Type: multipart/alternative;boundary=inner\r\n\
                   \r\n\
                   --inner\r\n\
                   Content-Type: text/plain\r\n\
                   \r\n\
                   plain\r\n\
                   --inner\r\n\
                   \r\n\
                   untyped\r\n\
                   --inner--\r\n\
                   --outer--\r\n";
        let ct = ContentType::new("multipart/mixed").with_param("boundary", "outer");
        let mut body = MsgBody::new(raw, ct);
        body.parse().unwrap();

        let outer = body.multipart().unwrap();
        assert_eq!(outer.parts.len(), 1);
        let inner = outer.parts[0].body.multipart().unwrap();
        assert_eq!(inner.parts.len(), 2);
        assert_eq!(&inner.parts[0].body.raw[..], b"plain");
        assert_eq!(body.diagnostics(), vec![Diagnostic::DefaultPartContentType]);
    }

    #[test]
    fn test_from_multipart_round_trip() {
        let multipart = MultipartMixBody::new("sep")
            .with_part(BodyPart::new(MsgBody::new("v=0", ContentType::new("application/sdp"))))
            .with_part(
                BodyPart::new(MsgBody::new("<x/>", ContentType::new("application/pidf+xml")))
                    .with_header("Content-ID", "<p@example.com>"),
            );
        let built = MsgBody::from_multipart(multipart);
        assert_eq!(built.mtype.to_string(), "multipart/mixed;boundary=sep");

        let mut reparsed = MsgBody::new(built.to_bytes(), built.mtype.clone());
        reparsed.parse().unwrap();
        let parts = reparsed.multipart().unwrap();
        assert_eq!(parts.parts.len(), 2);
        assert_eq!(parts.parts[1].header("content-id"), Some("<p@example.com>"));
        assert_eq!(&parts.parts[1].body.raw[..], b"<x/>");
        assert_eq!(reparsed.to_bytes(), built.to_bytes());
    }
}
