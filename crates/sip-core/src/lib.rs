//! SIP building blocks for the sipwire stack
//!
//! This crate provides the value models a SIP element needs before it can
//! handle messages: SIP/SIPS/TEL URLs, Content-Type and Reason header
//! values, message bodies with multipart splitting, and the quote-aware
//! splitter they share. Everything here is synchronous and free of global
//! state; the element's own address and parsing policy are passed in as a
//! [`SipConfig`].

pub mod config;
pub mod error;
pub mod parser;
pub mod types;

pub use config::{SipConfig, DEFAULT_SIP_PORT};
pub use error::{Diagnostic, Error, Result};
pub use parser::split_quoted;
pub use types::{
    BodyContent, BodyPart, ContentType, Host, MsgBody, MultipartMixBody, Param, PartHeader, Port,
    Reason, Scheme, SipUrl, UriParams,
};

/// Re-export of common types for easier use
pub mod prelude {
    pub use crate::config::SipConfig;
    pub use crate::error::{Diagnostic, Error, Result};
    pub use crate::parser::{split_quoted, unquote};
    pub use crate::types::{
        BodyContent, BodyPart, ContentType, Host, MsgBody, MultipartMixBody, Param, PartHeader,
        Port, Reason, Scheme, SipUrl, UriParams,
    };
}
