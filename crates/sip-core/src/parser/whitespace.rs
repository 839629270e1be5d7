//! Whitespace combinators (RFC 3261 Section 25.1 `WSP`) used by the
//! header-line parsers

use nom::{
    branch::alt,
    bytes::complete::tag,
    combinator::recognize,
    multi::many0,
    IResult,
};

// Parser result over raw header bytes
pub type ParseResult<'a, O> = IResult<&'a [u8], O>;

/// Parses a single whitespace character (SP or HTAB)
pub fn wsp(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(alt((tag(b" "), tag(b"\t"))))(input)
}

/// Parses optional whitespace (0 or more SP or HTAB)
pub fn owsp(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(many0(wsp))(input)
}

/// True for SP and HTAB
pub fn is_wsp(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wsp() {
        let (rem, val) = wsp(b" rest").unwrap();
        assert_eq!(rem, b"rest");
        assert_eq!(val, b" ");
        assert!(wsp(b"rest").is_err());
    }

    #[test]
    fn test_owsp() {
        let (rem, val) = owsp(b" \t value").unwrap();
        assert_eq!(rem, b"value");
        assert_eq!(val, b" \t ");

        let (rem, val) = owsp(b"value").unwrap();
        assert_eq!(rem, b"value");
        assert!(val.is_empty());
    }
}
