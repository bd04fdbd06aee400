//! Path segment escaping.
//!
//! Values are escaped like a URL path segment: unreserved characters and the
//! sub-delimiters `$ & + = : @` stay as they are, everything else (including
//! `/`, `?`, `#`, `;`, `,` and non-ASCII bytes) becomes `%XX`.

use std::borrow::Cow;
use std::fmt::Write;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Bytes escaped inside a path segment.
pub const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

/// Escapes one path segment.
///
/// ```
/// use hermes_router::escape::escape_segment;
///
/// assert_eq!(escape_segment("a@b.com"), "a@b.com");
/// assert_eq!(escape_segment("big world?"), "big%20world%3F");
/// ```
pub fn escape_segment(segment: &str) -> Cow<'_, str> {
    utf8_percent_encode(segment, PATH_SEGMENT).into()
}

/// Decodes `%XX` sequences, keeping the input if the result is not UTF-8.
pub fn unescape(raw: &str) -> Cow<'_, str> {
    match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(raw),
    }
}

/// Builds a regex matching `literal` in a raw request path.
///
/// Every character other than the unreserved ones may arrive either as
/// itself or percent-encoded, in either hex case.
pub(crate) fn literal_regex(literal: &str) -> String {
    let mut source = String::with_capacity(literal.len());
    let mut buf = [0_u8; 4];

    for ch in literal.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '~') {
            source.push(ch);
            continue;
        }

        let mut encoded = String::new();
        for byte in ch.encode_utf8(&mut buf).bytes() {
            let _ = write!(encoded, "%{byte:02X}");
        }
        let _ = write!(
            source,
            "(?:{}|(?i:{}))",
            regex::escape(ch.encode_utf8(&mut buf)),
            encoded
        );
    }

    source
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_sub_delimiters_are_kept() {
        assert_eq!(escape_segment("a@b.com"), "a@b.com");
        assert_eq!(escape_segment("k=v&x+y:$z"), "k=v&x+y:$z");
        assert_eq!(escape_segment("-_.~"), "-_.~");
    }

    #[test]
    fn test_reserved_characters_are_escaped() {
        assert_eq!(escape_segment("a/b"), "a%2Fb");
        assert_eq!(escape_segment("a b"), "a%20b");
        assert_eq!(escape_segment("?#;,"), "%3F%23%3B%2C");
        assert_eq!(escape_segment("100%"), "100%25");
        assert_eq!(escape_segment("é"), "%C3%A9");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("a%20b%40c"), "a b@c");
        assert_eq!(unescape("plain"), "plain");
        assert_eq!(unescape("%FF"), "%FF");
    }

    #[test]
    fn test_literal_regex_accepts_raw_and_encoded_forms() {
        let re = Regex::new(&format!("^{}$", literal_regex("items:batch (v2)"))).unwrap();

        assert!(re.is_match("items:batch%20(v2)"));
        assert!(re.is_match("items%3Abatch%20%28v2%29"));
        assert!(re.is_match("items%3abatch%20(v2)"));
        assert!(!re.is_match("items-batch%20(v2)"));
    }
}
