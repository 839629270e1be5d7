//! # SIP URL Implementation
//!
//! This module provides [`SipUrl`], a model of SIP, SIPS and TEL URIs as
//! defined in [RFC 3261 Section 19.1](https://tools.ietf.org/html/rfc3261#section-19.1)
//! and [RFC 3966](https://tools.ietf.org/html/rfc3966).
//!
//! ## URI Structure
//!
//! ```text
//! sip:user;user-params:password@host:port;uri-parameters?headers
//! ```
//!
//! - the scheme is `sip`, `sips` or `tel` (case-insensitive, `sip` when absent)
//! - the userinfo (user, user parameters, password) ends at the last `@`
//! - an IPv6 host keeps its brackets: `[2001:db8::10]`
//! - URI parameters are handled by [`UriParams`]
//! - headers follow `?` as `name=value` pairs joined by `&`
//!
//! `tel:` URIs are turned into SIP URLs whose user is the subscriber number
//! and whose host is this element (see [`SipConfig`]).
//!
//! ## Leniency
//!
//! Some peers send broken port numbers. `host:` (empty port) leaves the port
//! unset and `host:5060:5060` takes the repeated value; both are reported as
//! [`Diagnostic`]s. Anything else that is not a number is an error.
//!
//! ## Usage Examples
//!
//! ```rust
//! use sipwire_sip_core::prelude::*;
//! use std::str::FromStr;
//!
//! let uri = SipUrl::from_str("sip:alice:secretword@atlanta.com;transport=tcp").unwrap();
//! assert_eq!(uri.username.as_deref(), Some("alice"));
//! assert_eq!(uri.password.as_deref(), Some("secretword"));
//! assert_eq!(uri.params.transport.as_deref(), Some("tcp"));
//! assert_eq!(uri.to_string(), "sip:alice:secretword@atlanta.com;transport=tcp");
//!
//! let uri = SipUrl::new("example.com").with_user("bob").with_port(5070).with_lr();
//! assert_eq!(uri.to_string(), "sip:bob@example.com:5070;lr");
//! ```

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::config::SipConfig;
use crate::error::{Diagnostic, Error, Result};
use crate::parser::quoted::split_quoted;
use crate::parser::utils::{
    escape_uri_component, unescape_uri_component, HEADER_VALUE_SAFE, USERNAME_SAFE,
};
use crate::types::param::{Param, UriParams};

/// URI scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    /// `sip:`
    Sip,
    /// `sips:` (secure SIP)
    Sips,
    /// `tel:` (telephone number, RFC 3966)
    Tel,
}

impl Scheme {
    /// Lower-case scheme name
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Sip => "sip",
            Scheme::Sips => "sips",
            Scheme::Tel => "tel",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sip" => Ok(Scheme::Sip),
            "sips" => Ok(Scheme::Sips),
            "tel" => Ok(Scheme::Tel),
            other => Err(Error::UnsupportedScheme(other.to_string())),
        }
    }
}

/// Host part of a URL.
///
/// `Local` marks a URL that points at this element. Its text is the address
/// from the configuration in effect when the URL was built, and it may be
/// replaced by the actual local address at serialization time
/// (see [`SipUrl::local_str`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Host {
    /// A host name, IPv4 address or bracketed IPv6 literal, as written
    Literal(String),
    /// This element's own address
    Local(String),
}

impl Host {
    /// Host text
    pub fn as_str(&self) -> &str {
        match self {
            Host::Literal(host) | Host::Local(host) => host,
        }
    }

    /// True for the local-address placeholder
    pub fn is_local(&self) -> bool {
        matches!(self, Host::Local(_))
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Port part of a URL, with the same local placeholder as [`Host`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Port {
    /// A port number taken from the URL text or set explicitly
    Literal(u16),
    /// This element's own port
    Local(u16),
}

impl Port {
    /// Port number
    pub fn value(&self) -> u16 {
        match self {
            Port::Literal(port) | Port::Local(port) => *port,
        }
    }
}

/// Why a port token could not be read as a plain number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PortError {
    Empty,
    Duplicate(u16),
    Malformed,
}

fn parse_port_number(token: &str) -> std::result::Result<u16, PortError> {
    let token = token.trim();
    if let Ok(port) = token.parse::<u16>() {
        return Ok(port);
    }
    if token.is_empty() {
        return Err(PortError::Empty);
    }
    match token.split_once(':') {
        Some((first, second)) if first == second => match first.parse::<u16>() {
            Ok(port) => Err(PortError::Duplicate(port)),
            Err(_) => Err(PortError::Malformed),
        },
        _ => Err(PortError::Malformed),
    }
}

/// A SIP or SIPS URL.
///
/// Parsing a compliant URL and serializing it again reproduces the input.
/// `Clone` gives a fully independent copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SipUrl {
    /// URI scheme (`tel:` input is converted to `sip`)
    pub scheme: Scheme,
    /// User part, percent-decoded
    pub username: Option<String>,
    /// Password (deprecated by RFC 3261 but still seen)
    pub password: Option<String>,
    /// Raw parameters attached to the user part (`user;par=x@host`)
    pub user_params: Vec<String>,
    /// Host
    pub host: Host,
    /// Port
    pub port: Option<Port>,
    /// URI parameters
    pub params: UriParams,
    /// URI headers, values percent-decoded
    pub headers: IndexMap<String, String>,
}

impl SipUrl {
    /// Create a `sip:` URL for the given host
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_parts(Host::Literal(host.into()), None)
    }

    /// Create a `sip:` URL that points at this element
    pub fn local(config: &SipConfig) -> Self {
        Self::with_parts(
            Host::Local(config.my_address.clone()),
            Some(Port::Local(config.my_port)),
        )
    }

    fn with_parts(host: Host, port: Option<Port>) -> Self {
        SipUrl {
            scheme: Scheme::Sip,
            username: None,
            password: None,
            user_params: Vec::new(),
            host,
            port,
            params: UriParams::new(),
            headers: IndexMap::new(),
        }
    }

    /// Parse a SIP, SIPS or TEL URI.
    ///
    /// Normalizations of non-compliant input are logged; use
    /// [`SipUrl::parse_with_diagnostics`] to inspect them.
    pub fn parse(url: &str, config: &SipConfig) -> Result<Self> {
        Self::parse_with_diagnostics(url, config).map(|(url, _)| url)
    }

    /// Parse a URI and return the normalizations applied to it.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedScheme`] for a scheme other than sip/sips/tel
    /// - [`Error::TelConversionDisabled`] for `tel:` when the configuration
    ///   does not allow converting it
    /// - [`Error::MalformedPort`] for a port token that cannot be recovered
    /// - [`Error::MalformedHost`] and [`Error::MalformedUriHeader`] for other
    ///   broken components
    pub fn parse_with_diagnostics(url: &str, config: &SipConfig) -> Result<(Self, Vec<Diagnostic>)> {
        let (scheme, rest) = url.split_once(':').unwrap_or(("sip", url));
        let scheme: Scheme = scheme.parse()?;

        let mut diagnostics = Vec::new();
        let parsed = match scheme {
            Scheme::Tel if !config.autoconvert_tel_url => return Err(Error::TelConversionDisabled),
            Scheme::Tel => Self::convert_tel_url(rest, config),
            Scheme::Sip | Scheme::Sips => Self::parse_sip_url(scheme, rest, config, &mut diagnostics)?,
        };

        for diagnostic in &diagnostics {
            warn!(uri = url, "non-compliant URI detected: {}", diagnostic);
        }
        trace!(uri = url, "parsed URI");
        Ok((parsed, diagnostics))
    }

    fn convert_tel_url(rest: &str, config: &SipConfig) -> Self {
        let mut url = if config.relaxed_parser {
            Self::with_parts(Host::Literal(String::new()), None)
        } else {
            Self::local(config)
        };

        let (number, params) = rest.split_once(';').unwrap_or((rest, ""));
        url.username = Some(unescape_uri_component(number));
        // RFC 3261 Section 19.1.6: parameter names are compared in lower case
        url.user_params = params
            .split(';')
            .filter(|p| !p.is_empty())
            .map(|p| match p.split_once('=') {
                Some((name, value)) => format!("{}={}", name.to_ascii_lowercase(), value),
                None => p.to_ascii_lowercase(),
            })
            .collect();
        url
    }

    fn parse_sip_url(
        scheme: Scheme,
        rest: &str,
        config: &SipConfig,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Self> {
        let ear = rest.rfind('@').map_or(0, |at| at + 1);
        let (userinfo, hostpart) = rest.split_at(ear);

        let mut segments = split_quoted(hostpart, ';', None);
        let mut hostport = segments.remove(0);
        let mut headers = IndexMap::new();
        if segments.is_empty() {
            if let Some((hp, raw_headers)) = hostport.split_once('?') {
                headers = parse_uri_headers(raw_headers)?;
                hostport = hp;
            }
        } else if let Some(last) = segments.last_mut() {
            let segment: &str = *last;
            if let Some((param, raw_headers)) = segment.split_once('?') {
                headers = parse_uri_headers(raw_headers)?;
                *last = param;
            }
        }

        let mut url = Self::with_parts(Host::Literal(String::new()), None);
        url.scheme = scheme;
        url.headers = headers;

        if let Some(userpass) = userinfo.strip_suffix('@') {
            let (user, password) = match userpass.split_once(':') {
                Some((user, password)) => (user, Some(password)),
                None => (userpass, None),
            };
            let mut user_parts = user.split(';');
            let name = user_parts.next().unwrap_or_default();
            url.username = Some(unescape_uri_component(name));
            url.user_params = user_parts.map(str::to_string).collect();
            url.password = password.map(str::to_string);
        }

        let (host, port_token) = split_host_port(hostport, config)?;
        url.host = Host::Literal(host.to_string());
        url.port = match port_token.map(parse_port_number) {
            None => None,
            Some(Ok(port)) => Some(Port::Literal(port)),
            Some(Err(PortError::Empty)) => {
                diagnostics.push(Diagnostic::EmptyPort);
                None
            }
            Some(Err(PortError::Duplicate(port))) => {
                diagnostics.push(Diagnostic::DuplicatePort(port));
                Some(Port::Literal(port))
            }
            Some(Err(PortError::Malformed)) => {
                return Err(Error::MalformedPort(port_token.unwrap_or_default().to_string()));
            }
        };

        url.params = UriParams::parse(segments);
        Ok(url)
    }

    /// Serialize the URL, writing `local_addr`/`local_port` in place of the
    /// local-address placeholders when given.
    pub fn local_str(&self, local_addr: Option<&str>, local_port: Option<u16>) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_url(&mut out, local_addr, local_port);
        out
    }

    fn write_url<W: fmt::Write>(
        &self,
        w: &mut W,
        local_addr: Option<&str>,
        local_port: Option<u16>,
    ) -> fmt::Result {
        write!(w, "{}:", self.scheme)?;

        if let Some(ref user) = self.username {
            w.write_str(&escape_uri_component(user, USERNAME_SAFE))?;
            for param in &self.user_params {
                write!(w, ";{}", param)?;
            }
            if let Some(ref password) = self.password {
                write!(w, ":{}", password)?;
            }
            w.write_char('@')?;
        }

        match (&self.host, local_addr) {
            (Host::Local(_), Some(addr)) => w.write_str(addr)?,
            (host, _) => w.write_str(host.as_str())?,
        }

        match (self.port, local_port) {
            (Some(Port::Local(_)), Some(port)) => write!(w, ":{}", port)?,
            (Some(port), _) => write!(w, ":{}", port.value())?,
            (None, _) => {}
        }

        write!(w, "{}", self.params)?;

        let mut first = true;
        for (name, value) in &self.headers {
            w.write_char(if first { '?' } else { '&' })?;
            first = false;
            write!(w, "{}={}", name, escape_uri_component(value, HEADER_VALUE_SAFE))?;
        }
        Ok(())
    }

    /// URI parameters as serialized, in wire order
    pub fn get_params(&self) -> Vec<String> {
        self.params.to_vec()
    }

    /// Host text
    pub fn get_host(&self) -> &str {
        self.host.as_str()
    }

    /// Port, or the configured default port when the URL has none
    pub fn get_port(&self, config: &SipConfig) -> u16 {
        self.port.map_or(config.default_port, |p| p.value())
    }

    /// Host and port for the transport layer
    pub fn get_addr(&self, config: &SipConfig) -> (&str, u16) {
        (self.get_host(), self.get_port(config))
    }

    /// Replace host and port, e.g. to substitute a resolved address
    pub fn set_addr(&mut self, host: impl Into<String>, port: Option<u16>) {
        self.host = Host::Literal(host.into());
        self.port = port.map(Port::Literal);
    }

    /// The `ttl` parameter as a number, `None` when absent or out of range
    pub fn ttl_value(&self) -> Option<u8> {
        self.params.ttl.as_deref()?.parse().ok()
    }

    /// Set the scheme
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Set the user part
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.username = Some(user.into());
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Append a raw user parameter such as `isub=1234`
    pub fn with_user_param(mut self, param: impl Into<String>) -> Self {
        self.user_params.push(param.into());
        self
    }

    /// Set a literal port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(Port::Literal(port));
        self
    }

    /// Add a URI parameter
    pub fn with_param(mut self, param: Param) -> Self {
        self.params.insert(param);
        self
    }

    /// Set the `transport` parameter
    pub fn with_transport(self, transport: impl Into<String>) -> Self {
        self.with_param(Param::Transport(transport.into()))
    }

    /// Set the `tag` parameter
    pub fn with_tag(self, tag: impl Into<String>) -> Self {
        self.with_param(Param::Tag(tag.into()))
    }

    /// Set the loose routing flag
    pub fn with_lr(self) -> Self {
        self.with_param(Param::Lr)
    }

    /// Add a URI header; the value is percent-encoded on output
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Parse `name=value&name=value`, decoding the values.
fn parse_uri_headers(raw: &str) -> Result<IndexMap<String, String>> {
    raw.split('&')
        .map(|header| {
            header
                .split_once('=')
                .map(|(name, value)| (name.to_string(), unescape_uri_component(value)))
                .ok_or_else(|| Error::MalformedUriHeader(header.to_string()))
        })
        .collect()
}

/// Split `host[:port]`; IPv6 literals keep their brackets.
fn split_host_port<'a>(hostport: &'a str, config: &SipConfig) -> Result<(&'a str, Option<&'a str>)> {
    if hostport.is_empty() {
        return if config.relaxed_parser {
            Ok(("", None))
        } else {
            Err(Error::MalformedHost(String::new()))
        };
    }

    if hostport.starts_with('[') {
        let end = hostport
            .find(']')
            .ok_or_else(|| Error::MalformedHost(hostport.to_string()))?;
        let (host, tail) = hostport.split_at(end + 1);
        return match tail {
            "" => Ok((host, None)),
            _ => tail
                .strip_prefix(':')
                .map(|port| (host, Some(port)))
                .ok_or_else(|| Error::MalformedHost(hostport.to_string())),
        };
    }

    Ok(match hostport.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (hostport, None),
    })
}

impl fmt::Display for SipUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_url(f, None, None)
    }
}

impl FromStr for SipUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SipUrl::parse(s, &SipConfig::default())
    }
}
