//! Value models for SIP header and body content

pub mod body;
pub mod content_type;
pub mod multipart;
pub mod param;
pub mod reason;
pub mod uri;

pub use body::{BodyContent, MsgBody};
pub use content_type::ContentType;
pub use multipart::{BodyPart, MultipartMixBody, PartHeader};
pub use param::{Param, UriParams};
pub use reason::Reason;
pub use uri::{Host, Port, Scheme, SipUrl};
