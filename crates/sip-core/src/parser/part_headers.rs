//! Header blocks of MIME body parts

use nom::{
    bytes::complete::take_while1,
    character::complete::char,
    sequence::tuple,
};

use super::whitespace::{is_wsp, owsp, ParseResult};
use crate::error::{Error, Result};

// token = 1*(alphanum / "-" / "." / "!" / "%" / "*" / "_" / "+" / "`" / "'" / "~")
fn is_token_char(c: u8) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, b'-' | b'.' | b'!' | b'%' | b'*' | b'_' | b'+' | b'`' | b'\'' | b'~')
}

/// Parses one unfolded `name: value` line into its name and value.
/// Whitespace around the colon and at the end of the value is dropped.
pub fn header_line(input: &[u8]) -> ParseResult<(&[u8], &[u8])> {
    let (rest, name) = take_while1(is_token_char)(input)?;
    let (rest, _) = tuple((owsp, char(':'), owsp))(rest)?;
    let end = rest
        .iter()
        .rposition(|c| !is_wsp(*c))
        .map_or(0, |p| p + 1);
    Ok((&rest[rest.len()..], (name, &rest[..end])))
}

/// Parses a MIME part header block into `(name, value)` pairs in the order
/// they appear, names as written. Folded continuation lines are joined to the line
/// they continue with a single space.
pub fn parse_part_headers(block: &str) -> Result<Vec<(String, String)>> {
    let mut logical: Vec<String> = Vec::new();
    for line in block.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        if line.as_bytes()[0] == b' ' || line.as_bytes()[0] == b'\t' {
            match logical.last_mut() {
                Some(previous) => {
                    previous.push(' ');
                    previous.push_str(line.trim_start());
                }
                None => return Err(Error::MalformedPartHeader(line.to_string())),
            }
            continue;
        }
        logical.push(line.to_string());
    }

    logical
        .iter()
        .map(|line| match header_line(line.as_bytes()) {
            Ok((_, (name, value))) => Ok((
                String::from_utf8_lossy(name).into_owned(),
                String::from_utf8_lossy(value).into_owned(),
            )),
            Err(_) => Err(Error::MalformedPartHeader(line.clone())),
        })
        .collect()
}
