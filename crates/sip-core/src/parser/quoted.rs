//! Quote-aware field splitting
//!
//! SIP header values and URI parameter lists are `;`-separated, but a quoted
//! string may itself contain the separator:
//!
//! ```text
//! Q.850;cause=31;text="busy; try later"
//! ```
//!
//! [`split_quoted`] splits such values while leaving delimiters inside a
//! quoted section alone.

/// Split `input` on `delim`, ignoring delimiters enclosed in double quotes.
///
/// Quotes are paired strictly left to right; a quote preceded by a backslash
/// does not count. If the number of quotes is odd, the last one is taken as a
/// literal character and does not stop splitting. At most `max_split` splits
/// are made when a limit is given, the remainder ending up in the last field.
///
/// Splitting never fails; every input yields at least one field. `delim`
/// must not be `"`.
///
/// # Examples
///
/// ```
/// use sipwire_sip_core::parser::split_quoted;
///
/// let fields = split_quoted(r#"Q.850;text="a;b";cause=16"#, ';', None);
/// assert_eq!(fields, vec!["Q.850", r#"text="a;b""#, "cause=16"]);
///
/// assert_eq!(split_quoted("a=b=c", '=', Some(1)), vec!["a", "b=c"]);
/// ```
pub fn split_quoted(input: &str, delim: char, max_split: Option<usize>) -> Vec<&str> {
    let quotes = quote_positions(input);
    // An odd trailing quote is dropped by chunks_exact
    let mut sections = quotes.chunks_exact(2).map(|p| (p[0], p[1])).peekable();

    let mut fields = Vec::new();
    let mut start = 0;
    for (pos, c) in input.char_indices() {
        if max_split.map_or(false, |max| fields.len() >= max) {
            break;
        }
        if c != delim {
            continue;
        }
        while let Some(&(_, close)) = sections.peek() {
            if close < pos {
                sections.next();
            } else {
                break;
            }
        }
        if let Some(&(open, close)) = sections.peek() {
            if open < pos && pos < close {
                continue;
            }
        }
        fields.push(&input[start..pos]);
        start = pos + c.len_utf8();
    }
    fields.push(&input[start..]);
    fields
}

/// Byte offsets of all unescaped double quotes
fn quote_positions(input: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut escaped = false;
    for (i, b) in input.bytes().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' => escaped = true,
            b'"' => positions.push(i),
            _ => {}
        }
    }
    positions
}

/// Remove one pair of surrounding double quotes, if present.
pub fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split_plain() {
        assert_eq!(split_quoted("a;b;c", ';', None), vec!["a", "b", "c"]);
        assert_eq!(split_quoted("", ';', None), vec![""]);
        assert_eq!(split_quoted(";", ';', None), vec!["", ""]);
    }

    #[test]
    fn test_split_respects_quotes() {
        let fields = split_quoted(r#"text="x;y=z";cause=3"#, ';', None);
        assert_eq!(fields, vec![r#"text="x;y=z""#, "cause=3"]);
    }

    #[test]
    fn test_split_escaped_quote() {
        let fields = split_quoted(r#"t="a\";b";c"#, ';', None);
        assert_eq!(fields, vec![r#"t="a\";b""#, "c"]);
    }

    #[test]
    fn test_unmatched_trailing_quote_is_literal() {
        let fields = split_quoted(r#"a;b"c;d"#, ';', None);
        assert_eq!(fields, vec!["a", "b\"c", "d"]);

        let fields = split_quoted(r#""x;y";it"s;z"#, ';', None);
        assert_eq!(fields, vec![r#""x;y""#, "it\"s", "z"]);
    }

    #[test]
    fn test_max_split() {
        assert_eq!(split_quoted("a:b:c", ':', Some(1)), vec!["a", "b:c"]);
        assert_eq!(split_quoted("a:b:c", ':', Some(0)), vec!["a:b:c"]);
        assert_eq!(split_quoted("abc", ':', Some(1)), vec!["abc"]);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("\"abc"), "\"abc");
        assert_eq!(unquote("\""), "\"");
        assert_eq!(unquote("abc"), "abc");
    }

    proptest! {
        #[test]
        fn prop_rejoin_reproduces_input(s in "[a-z;\"=\\\\ ]{0,40}") {
            let fields = split_quoted(&s, ';', None);
            prop_assert_eq!(fields.join(";"), s);
        }

        #[test]
        fn prop_unquoted_input_matches_str_split(s in "[a-z;= ]{0,40}") {
            let fields = split_quoted(&s, ';', None);
            let expected: Vec<&str> = s.split(';').collect();
            prop_assert_eq!(fields, expected);
        }
    }
}
