//! Router error types.

use thiserror::Error;

/// A route set that cannot be served.
///
/// Returned when building a [`RouteTable`](crate::RouteTable); a server
/// cannot be constructed from a route set that produces one of these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteError {
    /// A route has an empty name.
    #[error("hermes: route must have a name")]
    MissingName,

    /// Two routes share a name.
    #[error("hermes: routes must have unique names (duplicate \"{0}\")")]
    DuplicateName(String),

    /// A route has no handler.
    #[error("hermes: route \"{0}\" must have a handler")]
    MissingHandler(String),

    /// A route pattern cannot be compiled.
    #[error("hermes: route \"{name}\" has an invalid pattern: {source}")]
    InvalidPattern {
        /// The route name.
        name: String,
        /// Why the pattern was rejected.
        #[source]
        source: PathError,
    },
}

/// Failure to build a path from a pattern and values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    /// The pattern is empty.
    #[error("hermes: route pattern must not be empty")]
    EmptyPattern,

    /// The pattern does not start with `/`.
    #[error("hermes: route pattern must begin with /")]
    MissingLeadingSlash,

    /// A `{` is never closed.
    #[error("hermes: invalid route pattern")]
    InvalidPattern,

    /// The number of values differs from the number of variables.
    #[error("hermes: must provide the expected number of values (expected {expected} received {received})")]
    CountMismatch {
        /// Variables and wildcards in the pattern.
        expected: usize,
        /// Values supplied.
        received: usize,
    },

    /// A value for a non-wildcard variable contains `/`.
    #[error("hermes: value for variable \"{0}\" must not contain /")]
    ValueContainsSlash(String),

    /// A variable's regex does not compile.
    #[error("hermes: variable \"{name}\" must have valid regex: {message}")]
    InvalidRegex {
        /// The variable name, empty for anonymous variables.
        name: String,
        /// The regex compilation error message.
        message: String,
    },

    /// A value does not fully match its variable's regex.
    #[error("hermes: value for variable \"{0}\" does not match regex")]
    RegexMismatch(String),

    /// No route is registered under the name.
    #[error("hermes: route \"{0}\" not found")]
    UnknownRoute(String),
}
