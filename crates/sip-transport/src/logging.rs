//! Logging setup for processes hosting a SIP element
//!
//! The subscriber filters on a base level plus optional per-target
//! directives such as `sipwire_sip_core=warn`, with `RUST_LOG` applied on
//! top. Every event logged inside [`app_span`] carries the application name.
//!
//! ```rust,no_run
//! use sipwire_sip_transport::logging::{app_span, setup_logging, LoggingConfig};
//!
//! # fn main() -> sipwire_sip_transport::Result<()> {
//! let config = LoggingConfig::from_env()?.with_directive("sipwire_sip_core=warn")?;
//! setup_logging(&config)?;
//! let _guard = app_span(&config).entered();
//! tracing::info!("ready");
//! # Ok(())
//! # }
//! ```

use std::str::FromStr;

use tracing::{info, info_span, Level, Span};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Error, Result};

/// Configuration for the logging system
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Base log level
    pub level: Level,
    /// Extra `target=level` directives, already validated
    pub directives: Vec<String>,
    /// Whether to enable JSON formatting
    pub json: bool,
    /// Whether to include file and line information
    pub file_info: bool,
    /// Whether to log span enter/exit
    pub log_spans: bool,
    /// Application name, attached to events through [`app_span`]
    pub app_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: Level::INFO,
            directives: Vec::new(),
            json: false,
            file_info: false,
            log_spans: false,
            app_name: "sipwire".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration
    pub fn new(level: Level, app_name: impl Into<String>) -> Self {
        LoggingConfig {
            level,
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    /// Build a configuration from `SIPWIRE_LOG_LEVEL`, `SIPWIRE_LOG_JSON`,
    /// `SIPWIRE_LOG_DIRECTIVES` (comma-separated) and `SIPWIRE_APP_NAME`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(level) = lookup("SIPWIRE_LOG_LEVEL") {
            config.level = parse_log_level(&level)?;
        }
        if let Some(json) = lookup("SIPWIRE_LOG_JSON") {
            config.json = matches!(json.trim(), "1" | "true" | "yes" | "on");
        }
        if let Some(directives) = lookup("SIPWIRE_LOG_DIRECTIVES") {
            for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                config = config.with_directive(directive)?;
            }
        }
        if let Some(app_name) = lookup("SIPWIRE_APP_NAME") {
            config.app_name = app_name;
        }
        Ok(config)
    }

    /// Add a `target=level` filter directive
    pub fn with_directive(mut self, directive: &str) -> Result<Self> {
        parse_directive(directive)?;
        self.directives.push(directive.to_string());
        Ok(self)
    }

    /// Enable JSON formatting
    pub fn with_json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Enable file and line information in logs
    pub fn with_file_info(mut self) -> Self {
        self.file_info = true;
        self
    }

    /// Enable span logging
    pub fn with_spans(mut self) -> Self {
        self.log_spans = true;
        self
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        let mut filter = EnvFilter::from_default_env().add_directive(self.level.into());
        for directive in &self.directives {
            filter = filter.add_directive(parse_directive(directive)?);
        }
        Ok(filter)
    }
}

/// Install a global subscriber for the given configuration.
///
/// Fails if a global subscriber is already installed.
pub fn setup_logging(config: &LoggingConfig) -> Result<()> {
    let span_events = if config.log_spans {
        FmtSpan::ACTIVE
    } else {
        FmtSpan::NONE
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(config.env_filter()?)
        .with_span_events(span_events)
        .with_file(config.file_info)
        .with_line_number(config.file_info);

    let installed = if config.json {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    installed.map_err(|e| Error::Config(format!("Cannot install logger: {}", e)))?;

    info!(app = %config.app_name, level = %config.level, "logging initialized");
    Ok(())
}

/// Root span naming the application; enter it around the element's work.
pub fn app_span(config: &LoggingConfig) -> Span {
    info_span!("app", name = %config.app_name)
}

/// Parse a log level from a string
pub fn parse_log_level(level: &str) -> Result<Level> {
    Level::from_str(level.trim()).map_err(|_| Error::Config(format!("Invalid log level: {}", level)))
}

fn parse_directive(directive: &str) -> Result<Directive> {
    directive
        .parse()
        .map_err(|e| Error::Config(format!("Invalid log directive {:?}: {}", directive, e)))
}

/// Log a startup line with the application name and version
pub fn log_welcome(config: &LoggingConfig, version: &str) {
    info!(app = %config.app_name, "Starting {} v{}", config.app_name, version);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level(" WARN ").unwrap(), Level::WARN);
        assert!(matches!(parse_log_level("loud"), Err(Error::Config(_))));
    }

    #[test]
    fn test_config_builders() {
        let config = LoggingConfig::new(Level::TRACE, "proxy")
            .with_json()
            .with_file_info()
            .with_spans()
            .with_directive("sipwire_sip_core=warn")
            .unwrap();
        assert_eq!(config.level, Level::TRACE);
        assert_eq!(config.app_name, "proxy");
        assert_eq!(config.directives, vec!["sipwire_sip_core=warn"]);
        assert!(config.json && config.file_info && config.log_spans);
    }

    #[test]
    fn test_invalid_directive() {
        let err = LoggingConfig::default().with_directive("sipwire=loudest").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_lookup() {
        let config = LoggingConfig::from_lookup(lookup(&[
            ("SIPWIRE_LOG_LEVEL", "debug"),
            ("SIPWIRE_LOG_JSON", "yes"),
            ("SIPWIRE_LOG_DIRECTIVES", "sipwire_sip_core=warn, ,sipwire_sip_transport=trace"),
            ("SIPWIRE_APP_NAME", "registrar"),
        ]))
        .unwrap();
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.json);
        assert_eq!(
            config.directives,
            vec!["sipwire_sip_core=warn", "sipwire_sip_transport=trace"]
        );
        assert_eq!(config.app_name, "registrar");

        let defaults = LoggingConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(defaults.level, Level::INFO);
        assert_eq!(defaults.app_name, "sipwire");

        assert!(LoggingConfig::from_lookup(lookup(&[("SIPWIRE_LOG_LEVEL", "loud")])).is_err());
    }

    #[test]
    fn test_setup_twice_fails() {
        let config = LoggingConfig::new(Level::DEBUG, "sipwire-test");
        let _ = setup_logging(&config);
        let second = setup_logging(&config.clone().with_json());
        assert!(matches!(second, Err(Error::Config(_))));
        let _guard = app_span(&config).entered();
        log_welcome(&config, env!("CARGO_PKG_VERSION"));
    }
}
