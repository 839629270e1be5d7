//! Parser configuration
//!
//! Every operation that needs to know this element's own address, the default
//! SIP port or the `tel:` conversion policy takes a [`SipConfig`] explicitly.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default SIP port (RFC 3261 Section 19.1.2)
pub const DEFAULT_SIP_PORT: u16 = 5060;

/// Configuration shared by URI parsing and serialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SipConfig {
    /// Address of this element, used for local-address placeholders
    pub my_address: String,
    /// Port of this element, used for local-port placeholders
    pub my_port: u16,
    /// Port assumed when a URL carries none
    pub default_port: u16,
    /// Convert `tel:` URIs into SIP URLs at this element
    pub autoconvert_tel_url: bool,
    /// Accept an empty host and leave converted `tel:` hosts empty
    pub relaxed_parser: bool,
}

impl Default for SipConfig {
    fn default() -> Self {
        Self {
            my_address: "127.0.0.1".to_string(),
            my_port: DEFAULT_SIP_PORT,
            default_port: DEFAULT_SIP_PORT,
            autoconvert_tel_url: true,
            relaxed_parser: false,
        }
    }
}

impl SipConfig {
    /// Set this element's own address
    pub fn with_my_address(mut self, address: impl Into<String>) -> Self {
        self.my_address = address.into();
        self
    }

    /// Set this element's own port
    pub fn with_my_port(mut self, port: u16) -> Self {
        self.my_port = port;
        self
    }

    /// Set the port reported for URLs without one
    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    /// Enable or disable `tel:` to SIP conversion
    pub fn with_tel_conversion(mut self, enabled: bool) -> Self {
        self.autoconvert_tel_url = enabled;
        self
    }

    /// Switch on the relaxed parser
    pub fn relaxed(mut self) -> Self {
        self.relaxed_parser = true;
        self
    }

    /// Load configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path, e)))?;
        Self::from_json(&contents)
    }

    /// Parse configuration from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// Build a configuration from `SIPWIRE_*` environment variables on top
    /// of the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(address) = lookup("SIPWIRE_MY_ADDRESS") {
            config.my_address = address;
        }
        if let Some(port) = lookup("SIPWIRE_MY_PORT") {
            config.my_port = parse_env_port("SIPWIRE_MY_PORT", &port)?;
        }
        if let Some(port) = lookup("SIPWIRE_DEFAULT_PORT") {
            config.default_port = parse_env_port("SIPWIRE_DEFAULT_PORT", &port)?;
        }
        if let Some(flag) = lookup("SIPWIRE_TEL_CONVERSION") {
            config.autoconvert_tel_url = parse_env_bool("SIPWIRE_TEL_CONVERSION", &flag)?;
        }
        if let Some(flag) = lookup("SIPWIRE_RELAXED_PARSER") {
            config.relaxed_parser = parse_env_bool("SIPWIRE_RELAXED_PARSER", &flag)?;
        }
        Ok(config)
    }
}

fn parse_env_port(key: &str, value: &str) -> Result<u16> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("Invalid port in {}: {}", key, value)))
}

fn parse_env_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("Invalid boolean in {}: {}", key, value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SipConfig::default();
        assert_eq!(config.my_address, "127.0.0.1");
        assert_eq!(config.default_port, 5060);
        assert!(config.autoconvert_tel_url);
        assert!(!config.relaxed_parser);
    }

    #[test]
    fn test_builder() {
        let config = SipConfig::default()
            .with_my_address("192.0.2.7")
            .with_my_port(5070)
            .with_tel_conversion(false)
            .relaxed();
        assert_eq!(config.my_address, "192.0.2.7");
        assert_eq!(config.my_port, 5070);
        assert!(!config.autoconvert_tel_url);
        assert!(config.relaxed_parser);
    }

    #[test]
    fn test_from_json_partial() {
        let config = SipConfig::from_json(r#"{"my_address": "10.0.0.1", "relaxed_parser": true}"#).unwrap();
        assert_eq!(config.my_address, "10.0.0.1");
        assert_eq!(config.my_port, 5060);
        assert!(config.relaxed_parser);

        assert!(matches!(SipConfig::from_json("{"), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_lookup() {
        let vars = HashMap::from([
            ("SIPWIRE_MY_PORT", "5080"),
            ("SIPWIRE_TEL_CONVERSION", "off"),
        ]);
        let config = SipConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.my_port, 5080);
        assert!(!config.autoconvert_tel_url);

        let bad = HashMap::from([("SIPWIRE_DEFAULT_PORT", "http")]);
        let err = SipConfig::from_lookup(|k| bad.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
