//! Low-level text helpers shared by the value models
//!
//! - [`quoted`]: quote-aware splitting of delimited values
//! - [`utils`]: percent-encoding of URI components
//! - [`part_headers`]: MIME body part header blocks
//! - [`whitespace`]: nom whitespace primitives

pub mod part_headers;
pub mod quoted;
pub mod utils;
pub mod whitespace;

pub use quoted::{split_quoted, unquote};
pub use utils::{escape_uri_component, unescape_uri_component};
pub use whitespace::ParseResult;
