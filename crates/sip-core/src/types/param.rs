//! # SIP URI Parameters
//!
//! This module models the `;`-separated parameter list that follows the host
//! part of a SIP URI ([RFC 3261 Section 19.1.1](https://datatracker.ietf.org/doc/html/rfc3261#section-19.1.1)):
//!
//! ```text
//! sip:alice@atlanta.com;user=phone;transport=tcp;x-foo=bar;lr
//! ```
//!
//! The parameters RFC 3261 gives a meaning to (`user`, `transport`, `ttl`,
//! `maddr`, `method`, `tag` and the `lr` flag) are held in named fields of
//! [`UriParams`]; every other parameter is kept verbatim, in order.
//!
//! Serialization order is fixed: known parameters first in the fixed
//! order above, then unknown ones in their original order, then `lr`.
//!
//! A looser, open-ended list used by Content-Type values is available through
//! [`parse_generic_params`] and [`write_generic_params`].
//!
//! ## Examples
//!
//! ```rust
//! use sipwire_sip_core::types::param::UriParams;
//!
//! let params = UriParams::parse(["lr", "transport=tcp", "npdi", "user=phone"]);
//! assert_eq!(params.transport.as_deref(), Some("tcp"));
//! assert!(params.lr);
//! assert_eq!(params.to_vec(), vec!["user=phone", "transport=tcp", "npdi", "lr"]);
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single URI parameter as it appears between two `;`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Param {
    /// `user=phone`, `user=ip`, ...
    User(String),
    /// `transport=udp|tcp|sctp|tls|...`
    Transport(String),
    /// Multicast time-to-live, as written
    Ttl(String),
    /// Server address to contact instead of the host
    Maddr(String),
    /// Method of the request built from this URI
    Method(String),
    /// Dialog tag
    Tag(String),
    /// Loose routing flag
    Lr,
    /// Any other parameter, kept exactly as received
    Other(String),
}

impl Param {
    /// Classify one raw parameter.
    ///
    /// The name of a known parameter is matched case-insensitively. `lr` is
    /// recognised both bare and with a value, since many implementations send
    /// `lr=on` or `lr=true` although RFC 3261 defines it as a flag.
    pub fn parse(raw: &str) -> Self {
        let (name, value) = match raw.split_once('=') {
            Some((name, value)) => (name, value),
            None => {
                return if raw.eq_ignore_ascii_case("lr") {
                    Param::Lr
                } else {
                    Param::Other(raw.to_string())
                };
            }
        };

        match name.to_ascii_lowercase().as_str() {
            "user" => Param::User(value.to_string()),
            "transport" => Param::Transport(value.to_string()),
            "ttl" => Param::Ttl(value.to_string()),
            "maddr" => Param::Maddr(value.to_string()),
            "method" => Param::Method(value.to_string()),
            "tag" => Param::Tag(value.to_string()),
            "lr" => Param::Lr,
            _ => Param::Other(raw.to_string()),
        }
    }

    /// The parameter name
    pub fn key(&self) -> &str {
        match self {
            Param::User(_) => "user",
            Param::Transport(_) => "transport",
            Param::Ttl(_) => "ttl",
            Param::Maddr(_) => "maddr",
            Param::Method(_) => "method",
            Param::Tag(_) => "tag",
            Param::Lr => "lr",
            Param::Other(raw) => raw.split('=').next().unwrap_or(raw),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::User(val) => write!(f, "user={}", val),
            Param::Transport(val) => write!(f, "transport={}", val),
            Param::Ttl(val) => write!(f, "ttl={}", val),
            Param::Maddr(val) => write!(f, "maddr={}", val),
            Param::Method(val) => write!(f, "method={}", val),
            Param::Tag(val) => write!(f, "tag={}", val),
            Param::Lr => write!(f, "lr"),
            Param::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// The parameter list of a SIP URI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UriParams {
    /// `user` parameter
    pub user: Option<String>,
    /// `transport` parameter
    pub transport: Option<String>,
    /// `ttl` parameter
    pub ttl: Option<String>,
    /// `maddr` parameter
    pub maddr: Option<String>,
    /// `method` parameter
    pub method: Option<String>,
    /// `tag` parameter
    pub tag: Option<String>,
    /// Unrecognized parameters, verbatim and in order
    pub other: Vec<String>,
    /// Loose routing flag
    pub lr: bool,
}

impl UriParams {
    /// Create an empty parameter list
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a parameter list from raw `name[=value]` strings.
    pub fn parse<'a, I>(raw: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut params = Self::new();
        for p in raw {
            params.insert(Param::parse(p));
        }
        params
    }

    /// Replace the whole list with the parsed `raw` parameters.
    pub fn set_params<'a, I>(&mut self, raw: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        *self = Self::parse(raw);
    }

    /// Store one parameter, overwriting a previous value of a known one.
    pub fn insert(&mut self, param: Param) {
        match param {
            Param::User(v) => self.user = Some(v),
            Param::Transport(v) => self.transport = Some(v),
            Param::Ttl(v) => self.ttl = Some(v),
            Param::Maddr(v) => self.maddr = Some(v),
            Param::Method(v) => self.method = Some(v),
            Param::Tag(v) => self.tag = Some(v),
            Param::Lr => self.lr = true,
            Param::Other(raw) => self.other.push(raw),
        }
    }

    /// Parameters in wire order
    pub fn iter(&self) -> impl Iterator<Item = Param> + '_ {
        let known = [
            self.user.clone().map(Param::User),
            self.transport.clone().map(Param::Transport),
            self.ttl.clone().map(Param::Ttl),
            self.maddr.clone().map(Param::Maddr),
            self.method.clone().map(Param::Method),
            self.tag.clone().map(Param::Tag),
        ];
        known
            .into_iter()
            .flatten()
            .chain(self.other.iter().cloned().map(Param::Other))
            .chain(self.lr.then_some(Param::Lr))
    }

    /// Serialized parameters in wire order, without the leading `;`
    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(|p| p.to_string()).collect()
    }

    /// True when no parameter is set
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl fmt::Display for UriParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for param in self.iter() {
            write!(f, ";{}", param)?;
        }
        Ok(())
    }
}

/// Parse open-ended `name=value` parameters, keeping names and values
/// exactly as written (surrounding whitespace aside). A parameter without
/// `=` is stored with an empty value.
pub fn parse_generic_params<'a, I>(raw: I) -> IndexMap<String, String>
where
    I: IntoIterator<Item = &'a str>,
{
    raw.into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| match p.split_once('=') {
            Some((name, value)) => (name.trim().to_string(), value.trim().to_string()),
            None => (p.to_string(), String::new()),
        })
        .collect()
}

/// Write parameters as `;name=value` in insertion order; empty values are
/// written as a bare `;name`.
pub fn write_generic_params(f: &mut fmt::Formatter<'_>, params: &IndexMap<String, String>) -> fmt::Result {
    for (name, value) in params {
        if value.is_empty() {
            write!(f, ";{}", name)?;
        } else {
            write!(f, ";{}={}", name, value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_parse() {
        assert_eq!(Param::parse("transport=tcp"), Param::Transport("tcp".into()));
        assert_eq!(Param::parse("Transport=TCP"), Param::Transport("TCP".into()));
        assert_eq!(Param::parse("ttl=15"), Param::Ttl("15".into()));
        assert_eq!(Param::parse("lr"), Param::Lr);
        assert_eq!(Param::parse("lr=on"), Param::Lr);
        assert_eq!(Param::parse("npdi"), Param::Other("npdi".into()));
        assert_eq!(Param::parse("x-a=b=c"), Param::Other("x-a=b=c".into()));
        assert_eq!(Param::parse("x-a=b").key(), "x-a");
    }

    #[test]
    fn test_ttl_kept_as_written() {
        assert_eq!(Param::parse("ttl=015"), Param::Ttl("015".into()));
        assert_eq!(Param::parse("TTL=300").to_string(), "ttl=300");
        assert_eq!(Param::parse("ttl=abc"), Param::Ttl("abc".into()));
    }

    #[test]
    fn test_wire_order() {
        let params = UriParams::parse(["lr", "tag=9817--94", "npdi", "maddr=239.255.255.1", "ttl=15", "x=1"]);
        assert_eq!(
            params.to_vec(),
            vec!["ttl=15", "maddr=239.255.255.1", "tag=9817--94", "npdi", "x=1", "lr"]
        );
        assert_eq!(params.to_string(), ";ttl=15;maddr=239.255.255.1;tag=9817--94;npdi;x=1;lr");
    }

    #[test]
    fn test_set_params_resets() {
        let mut params = UriParams::parse(["transport=udp", "foo"]);
        params.set_params(["method=INVITE"]);
        assert_eq!(params.to_vec(), vec!["method=INVITE"]);

        params.set_params(["user=phone", "ttl=999"]);
        assert_eq!(params.to_vec(), vec!["user=phone", "ttl=999"]);
    }

    #[test]
    fn test_empty() {
        assert!(UriParams::new().is_empty());
        assert_eq!(UriParams::new().to_string(), "");
    }

    #[test]
    fn test_generic_params() {
        let params = parse_generic_params(["boundary=OSS-unique-boundary-42", " charset = utf-8 ", "flag"]);
        assert_eq!(params.get("boundary").map(String::as_str), Some("OSS-unique-boundary-42"));
        assert_eq!(params.get("charset").map(String::as_str), Some("utf-8"));
        assert_eq!(params.get("flag").map(String::as_str), Some(""));
        let keys: Vec<&String> = params.keys().collect();
        assert_eq!(keys, vec!["boundary", "charset", "flag"]);
    }
}
