//! # Multipart Bodies
//!
//! Splitting and rebuilding of `multipart/*` message bodies as defined in
//! [RFC 2046 Section 5.1](https://datatracker.ietf.org/doc/html/rfc2046#section-5.1):
//!
//! ```text
//! preamble (ignored)
//! --boundary
//! Content-Type: application/sdp
//!
//! v=0 ...
//! --boundary
//! Content-Type: application/pidf+xml
//! Content-ID: <target123@atlanta.example.com>
//!
//! <?xml version="1.0" ...
//! --boundary--
//! epilogue (ignored)
//! ```
//!
//! Each part becomes a [`BodyPart`]: its own [`MsgBody`], typed by the part's
//! Content-Type header, plus the remaining part headers in the order they
//! were declared. Part bodies are parsed recursively, so nested multiparts
//! are split as well.
//!
//! Bare LF line endings are accepted. A body that ends without the closing
//! `--boundary--` line keeps its last part and reports
//! [`Diagnostic::MissingCloseDelimiter`].

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Diagnostic, Error, Result};
use crate::parser::part_headers::parse_part_headers;
use crate::types::body::MsgBody;
use crate::types::content_type::ContentType;

/// One header of a body part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartHeader {
    /// Lower-cased header name, for lookups
    pub name: String,
    /// Header name as written, used when the part is serialized
    pub raw_name: String,
    /// Header value as written
    pub value: String,
}

impl PartHeader {
    /// Create a part header from its name as written
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let raw_name = name.into();
        PartHeader {
            name: raw_name.to_ascii_lowercase(),
            raw_name,
            value: value.into(),
        }
    }

    /// Header name as it appears on the wire, e.g. `Content-ID`
    pub fn display_name(&self) -> &str {
        &self.raw_name
    }
}

/// A single part of a multipart body.
///
/// The part's Content-Type lives in `body.mtype`; `headers` holds every
/// other header of the part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyPart {
    /// Part headers other than Content-Type, in declared order
    pub headers: Vec<PartHeader>,
    /// Part content
    pub body: MsgBody,
}

impl BodyPart {
    /// Create a part without extra headers
    pub fn new(body: MsgBody) -> Self {
        BodyPart {
            headers: Vec::new(),
            body,
        }
    }

    /// Add a part header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(PartHeader::new(name, value));
        self
    }

    /// First value of the named header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// The parts of a multipart body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipartMixBody {
    /// Boundary used when writing the body
    pub boundary: String,
    /// Parts in order of appearance
    pub parts: Vec<BodyPart>,
}

impl MultipartMixBody {
    /// Create an empty multipart body
    pub fn new(boundary: impl Into<String>) -> Self {
        MultipartMixBody {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    /// Append a part (builder style)
    pub fn with_part(mut self, part: BodyPart) -> Self {
        self.parts.push(part);
        self
    }

    /// Split `raw` on `boundary`. Normalizations are appended to `diagnostics`.
    pub fn parse(raw: &Bytes, boundary: &str, diagnostics: &mut Vec<Diagnostic>) -> Result<Self> {
        let delimiter = format!("--{}", boundary);
        let starts = delimiter_lines(raw, delimiter.as_bytes());
        if starts.is_empty() {
            return Err(Error::MalformedMultipart(format!(
                "no {} delimiter found",
                delimiter
            )));
        }

        let mut parts = Vec::new();
        let mut closed = false;
        for (i, &start) in starts.iter().enumerate() {
            let after = start + delimiter.len();
            if raw[after..].starts_with(b"--") {
                closed = true;
                break;
            }
            // Skip transport padding up to the end of the delimiter line
            let content_start = raw[after..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(raw.len(), |nl| after + nl + 1);
            let content_end = match starts.get(i + 1) {
                Some(&next) => strip_line_break(raw, next),
                None => raw.len(),
            };
            let segment = raw.slice(content_start..content_end.max(content_start));
            parts.push(Self::parse_part(segment, diagnostics)?);
        }

        if !closed {
            warn!(boundary, "multipart body has no close delimiter");
            diagnostics.push(Diagnostic::MissingCloseDelimiter);
        }

        Ok(MultipartMixBody {
            boundary: boundary.to_string(),
            parts,
        })
    }

    fn parse_part(segment: Bytes, diagnostics: &mut Vec<Diagnostic>) -> Result<BodyPart> {
        let (header_block, body) = split_header_block(&segment);
        let header_text = String::from_utf8_lossy(header_block);

        let mut mtype = None;
        let mut headers = Vec::new();
        for (name, value) in parse_part_headers(&header_text)? {
            if !name.eq_ignore_ascii_case("content-type") {
                headers.push(PartHeader::new(name, value));
            } else if mtype.is_none() && !value.is_empty() {
                mtype = Some(ContentType::parse(&value)?);
            }
        }

        let mtype = match mtype {
            Some(mtype) => mtype,
            None => {
                warn!("body part without Content-Type, assuming text/plain");
                diagnostics.push(Diagnostic::DefaultPartContentType);
                ContentType::text_plain()
            }
        };

        let mut body = MsgBody::new(segment.slice_ref(body), mtype);
        body.parse()?;
        Ok(BodyPart { headers, body })
    }

    /// Serialize the parts with CRLF line endings and a closing delimiter.
    pub fn to_bytes(&self) -> Bytes {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
            out.extend_from_slice(format!("Content-Type: {}\r\n", part.body.mtype).as_bytes());
            for header in &part.headers {
                out.extend_from_slice(
                    format!("{}: {}\r\n", header.display_name(), header.value).as_bytes(),
                );
            }
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(&part.body.to_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Bytes::from(out)
    }
}

/// Offsets of delimiter lines: `delimiter` at the start of the body or of a
/// line, followed by `--`, padding, a line break or the end of the body.
fn delimiter_lines(raw: &[u8], delimiter: &[u8]) -> Vec<usize> {
    if delimiter.len() > raw.len() {
        return Vec::new();
    }
    raw.windows(delimiter.len())
        .enumerate()
        .filter(|&(pos, window)| {
            window == delimiter
                && (pos == 0 || raw[pos - 1] == b'\n')
                && matches!(
                    raw.get(pos + delimiter.len()),
                    None | Some(b'-' | b' ' | b'\t' | b'\r' | b'\n')
                )
        })
        .map(|(pos, _)| pos)
        .collect()
}

/// The line break before a delimiter belongs to the delimiter.
fn strip_line_break(raw: &[u8], pos: usize) -> usize {
    let mut end = pos;
    if end > 0 && raw[end - 1] == b'\n' {
        end -= 1;
        if end > 0 && raw[end - 1] == b'\r' {
            end -= 1;
        }
    }
    end
}

/// Split a part at its first blank line into headers and body. A part that
/// starts with a blank line has no headers; a part without one has no body.
fn split_header_block(segment: &[u8]) -> (&[u8], &[u8]) {
    if let Some(body) = segment
        .strip_prefix(b"\r\n")
        .or_else(|| segment.strip_prefix(b"\n"))
    {
        return (&segment[..0], body);
    }

    for (i, _) in segment.iter().enumerate().filter(|&(_, &b)| b == b'\n') {
        let rest = &segment[i + 1..];
        let skip = if rest.starts_with(b"\r\n") {
            2
        } else if rest.starts_with(b"\n") {
            1
        } else {
            continue;
        };
        return (&segment[..i], &rest[skip..]);
    }
    (segment, &segment[segment.len()..])
}
