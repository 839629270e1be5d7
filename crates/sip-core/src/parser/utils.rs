//! Percent-encoding helpers for URI components

/// RFC 3261 `user-unreserved` characters
pub const RFC3261_USER_UNRESERVED: &str = "&=+$,;?/#";

/// RFC 3261 `mark` characters (inherited from RFC 2396)
pub const RFC3261_MARK: &str = "-_.!~*'()";

/// Characters left unescaped in the user part, on top of alphanumerics.
pub const USERNAME_SAFE: &str = "&=+$,;?/#-_.!~*'()";

/// Characters left unescaped in URI header values, on top of alphanumerics
/// and `_.-~`.
pub const HEADER_VALUE_SAFE: &str = "/";

/// Percent-encode every byte of `input` that is neither alphanumeric, one of
/// `_.-~`, nor listed in `safe`. Hex digits are upper case.
pub fn escape_uri_component(input: &str, safe: &str) -> String {
    let mut escaped = String::with_capacity(input.len() * 3);
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric()
            || matches!(byte, b'_' | b'.' | b'-' | b'~')
            || safe.as_bytes().contains(&byte)
        {
            escaped.push(byte as char);
        } else {
            escaped.push('%');
            escaped.push_str(&format!("{:02X}", byte));
        }
    }
    escaped
}

/// Decodes URI percent-encoding (%HH).
///
/// Decoding is lenient: a `%` not followed by two hex digits is kept as is,
/// and byte sequences that are not valid UTF-8 are replaced with U+FFFD.
pub fn unescape_uri_component(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut unescaped: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(h), Some(l)) = (
                bytes.get(i + 1).copied().and_then(hex_val),
                bytes.get(i + 2).copied().and_then(hex_val),
            ) {
                unescaped.push((h << 4) | l);
                i += 3;
                continue;
            }
        }
        unescaped.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&unescaped).into_owned()
}

// Helper to convert a hex character (byte) to its value (0-15)
fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
