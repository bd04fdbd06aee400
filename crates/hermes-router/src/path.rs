//! Reverse routing.
//!
//! [`build_path`] fills a route pattern with positional values. Values are
//! consumed in order of appearance of the variables and wildcards, left to
//! right. Every `/`-separated piece of a filled segment is escaped on its own
//! (see [`escape_segment`]), so a wildcard value such as `css/site.css` keeps
//! its slashes.

use crate::error::PathError;
use crate::escape::escape_segment;
use crate::pattern::{self, Token};

/// Builds a concrete path from `pattern` and `values`.
///
/// # Example
///
/// ```
/// use hermes_router::build_path;
///
/// let path = build_path("/user/{user}/post/{post}", &["abc123", "77"]).unwrap();
/// assert_eq!(path, "/user/abc123/post/77");
///
/// let err = build_path(r"/search/date/{date:\d\d\d\d-\d\d-\d\d}", &["bad"]).unwrap_err();
/// assert_eq!(err.to_string(), r#"hermes: value for variable "date" does not match regex"#);
/// ```
pub fn build_path<S: AsRef<str>>(pattern: &str, values: &[S]) -> Result<String, PathError> {
    let segments = pattern::segments(pattern)?;

    let mut path = String::with_capacity(pattern.len());
    let mut markers = 0_usize;

    for segment in segments {
        path.push('/');
        let mut filled = String::new();

        for token in pattern::tokenize(segment)? {
            let (name, regex, wildcard) = match token {
                Token::Literal(text) => {
                    filled.push_str(text);
                    continue;
                }
                Token::Variable { name, regex } => (name, regex, false),
                Token::Wildcard => ("*", None, true),
            };

            markers += 1;
            // Keep counting once values run out so the mismatch error is exact.
            let Some(value) = values.get(markers - 1).map(AsRef::as_ref) else {
                continue;
            };

            if !wildcard && value.contains('/') {
                return Err(PathError::ValueContainsSlash(name.to_string()));
            }
            if let Some(regex) = regex {
                check_regex(name, regex, value)?;
            }
            filled.push_str(value);
        }

        let mut pieces = filled.split('/');
        if let Some(first) = pieces.next() {
            path.push_str(&escape_segment(first));
        }
        for piece in pieces {
            path.push('/');
            path.push_str(&escape_segment(piece));
        }
    }

    if markers != values.len() {
        return Err(PathError::CountMismatch {
            expected: markers,
            received: values.len(),
        });
    }

    Ok(path)
}

/// Requires `value` to match `regex` in full.
fn check_regex(name: &str, regex: &str, value: &str) -> Result<(), PathError> {
    pattern::compile_regex(name, regex)?;
    let anchored = pattern::compile_regex(name, &format!("^(?:{regex})$"))?;

    if anchored.is_match(value) {
        Ok(())
    } else {
        Err(PathError::RegexMismatch(name.to_string()))
    }
}
