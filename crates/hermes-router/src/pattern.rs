//! Route pattern tokenizer.
//!
//! Pattern grammar, per `/`-separated segment:
//!
//! | Marker          | Meaning                                        |
//! |-----------------|------------------------------------------------|
//! | `{name}`        | Named variable, one value without `/`          |
//! | `{name:regex}`  | Named variable constrained by a regex          |
//! | `{:regex}`      | Anonymous variable constrained by a regex      |
//! | `{}`            | Anonymous unconstrained variable               |
//! | `*`             | Wildcard, one value that may contain `/`       |
//!
//! Anything else is literal text. Markers are scanned left to right and a
//! variable ends at the first `}` after its `{`, so a regex that itself
//! contains `}` (such as `\d{4}`) is not supported.

use regex::Regex;

use crate::error::PathError;

/// One piece of a pattern segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Literal text.
    Literal(&'a str),
    /// A `{name}` or `{name:regex}` variable. `name` may be empty.
    Variable {
        /// The variable name.
        name: &'a str,
        /// The regex constraint, if any.
        regex: Option<&'a str>,
    },
    /// A `*` wildcard.
    Wildcard,
}

impl Token<'_> {
    /// Returns `true` if this token consumes a value.
    pub const fn is_marker(&self) -> bool {
        !matches!(self, Self::Literal(_))
    }
}

/// Checks the pattern prefix and returns its segments.
///
/// The leading `/` is stripped before splitting, so `/a/b` yields `a`, `b`
/// and `/` yields a single empty segment.
pub fn segments(pattern: &str) -> Result<std::str::Split<'_, char>, PathError> {
    if pattern.is_empty() {
        return Err(PathError::EmptyPattern);
    }
    match pattern.strip_prefix('/') {
        Some(rest) => Ok(rest.split('/')),
        None => Err(PathError::MissingLeadingSlash),
    }
}

/// Splits one segment into tokens.
pub fn tokenize(segment: &str) -> Result<Vec<Token<'_>>, PathError> {
    let mut tokens = Vec::new();
    let mut rest = segment;

    while !rest.is_empty() {
        let Some(start) = rest.find(['{', '*']) else {
            tokens.push(Token::Literal(rest));
            break;
        };
        if start > 0 {
            tokens.push(Token::Literal(&rest[..start]));
        }

        if rest.as_bytes()[start] == b'*' {
            tokens.push(Token::Wildcard);
            rest = &rest[start + 1..];
            continue;
        }

        let Some(len) = rest[start..].find('}') else {
            return Err(PathError::InvalidPattern);
        };
        let end = start + len;
        let inner = &rest[start + 1..end];
        let (name, regex) = match inner.split_once(':') {
            Some((name, regex)) => (name, Some(regex).filter(|r| !r.is_empty())),
            None => (inner, None),
        };
        tokens.push(Token::Variable { name, regex });
        rest = &rest[end + 1..];
    }

    Ok(tokens)
}

/// Checks that a pattern is well formed and that its regexes compile.
pub fn validate(pattern: &str) -> Result<(), PathError> {
    for segment in segments(pattern)? {
        for token in tokenize(segment)? {
            if let Token::Variable {
                name,
                regex: Some(regex),
            } = token
            {
                compile_regex(name, regex)?;
            }
        }
    }
    Ok(())
}

/// Compiles the regex of variable `name`.
pub(crate) fn compile_regex(name: &str, regex: &str) -> Result<Regex, PathError> {
    Regex::new(regex).map_err(|err| PathError::InvalidRegex {
        name: name.to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_validate_prefix() {
        assert_eq!(segments("").err(), Some(PathError::EmptyPattern));
        assert_eq!(
            segments("pattern").err(),
            Some(PathError::MissingLeadingSlash)
        );
        assert_eq!(segments("/").unwrap().collect::<Vec<_>>(), vec![""]);
        assert_eq!(
            segments("/a/b").unwrap().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_tokenize_mixed_segment() {
        assert_eq!(
            tokenize("{first}_*").unwrap(),
            vec![
                Token::Variable {
                    name: "first",
                    regex: None
                },
                Token::Literal("_"),
                Token::Wildcard,
            ]
        );
    }

    #[test]
    fn test_tokenize_regex_and_anonymous() {
        assert_eq!(
            tokenize(r"{date:\d\d\d\d-\d\d-\d\d}").unwrap(),
            vec![Token::Variable {
                name: "date",
                regex: Some(r"\d\d\d\d-\d\d-\d\d")
            }]
        );
        assert_eq!(
            tokenize("{:[a-z]+}").unwrap(),
            vec![Token::Variable {
                name: "",
                regex: Some("[a-z]+")
            }]
        );
        assert_eq!(
            tokenize("{}").unwrap(),
            vec![Token::Variable {
                name: "",
                regex: None
            }]
        );
    }

    #[test]
    fn test_tokenize_trailing_literal() {
        assert_eq!(
            tokenize("{id}.json").unwrap(),
            vec![
                Token::Variable {
                    name: "id",
                    regex: None
                },
                Token::Literal(".json"),
            ]
        );
    }

    #[test]
    fn test_validate() {
        assert_eq!(validate("/user/{id:[0-9]+}/static/*"), Ok(()));
        assert_eq!(validate("user"), Err(PathError::MissingLeadingSlash));
        assert!(matches!(
            validate("/bad/{id:[}"),
            Err(PathError::InvalidRegex { name, .. }) if name == "id"
        ));
    }

    #[test]
    fn test_unterminated_variable() {
        assert_eq!(tokenize("{user").err(), Some(PathError::InvalidPattern));
    }
}
