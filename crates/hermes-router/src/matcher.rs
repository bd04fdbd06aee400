//! Request-to-route matching.
//!
//! The dispatcher only depends on [`RouteMatcher`], so the matching strategy
//! can be replaced. [`PatternMatcher`] is the default: every route pattern is
//! compiled into one anchored regex and routes are tried in registration
//! order.

use hermes_core::PathVars;
use http::Method;
use regex::Regex;

use crate::error::{PathError, RouteError};
use crate::escape::{literal_regex, unescape};
use crate::pattern::{self, Token};
use crate::table::RouteTable;

/// Key under which a wildcard's value is stored in [`PathVars`].
pub const WILDCARD_VAR: &str = "*";

/// Outcome of matching a request against the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMatch {
    /// The route at `index` in the table matched.
    Found {
        /// Position of the route in the table.
        index: usize,
        /// Decoded path variables.
        vars: PathVars,
    },
    /// The path matched but the method did not.
    MethodNotAllowed {
        /// Methods registered for the path.
        allowed: Vec<Method>,
    },
    /// No route matched the path.
    NotFound,
}

/// Finds the route for a request.
pub trait RouteMatcher: Send + Sync + 'static {
    /// Matches a method and a raw (still percent-encoded) path.
    fn find(&self, method: &Method, path: &str) -> RouteMatch;
}

struct Compiled {
    method: Option<Method>,
    regex: Regex,
    // Capture group name -> variable name; anonymous variables map to `None`.
    vars: Vec<(String, Option<String>)>,
}

/// The default regex-backed matcher.
///
/// # Example
///
/// ```
/// use hermes_core::{Request, ResponseWriter};
/// use hermes_router::{PatternMatcher, Route, RouteMatch, RouteMatcher, RouteTable};
/// use http::Method;
///
/// let ok = |_req: Request, _rw: ResponseWriter| async {};
/// let table = RouteTable::register(vec![Route::get("show_user", "/user/{user}").handle(ok)]).unwrap();
/// let matcher = PatternMatcher::new(&table).unwrap();
///
/// match matcher.find(&Method::GET, "/user/ada%20l") {
///     RouteMatch::Found { index, vars } => {
///         assert_eq!(index, 0);
///         assert_eq!(vars["user"], "ada l");
///     }
///     other => panic!("unexpected {other:?}"),
/// }
/// assert_eq!(matcher.find(&Method::GET, "/user"), RouteMatch::NotFound);
/// ```
pub struct PatternMatcher {
    routes: Vec<Compiled>,
}

impl PatternMatcher {
    /// Compiles every route of `table`.
    pub fn new(table: &RouteTable) -> Result<Self, RouteError> {
        let routes = table
            .routes()
            .iter()
            .map(|route| {
                compile(route.pattern())
                    .map(|(regex, vars)| Compiled {
                        method: route.method().cloned(),
                        regex,
                        vars,
                    })
                    .map_err(|source| RouteError::InvalidPattern {
                        name: route.name().to_string(),
                        source,
                    })
            })
            .collect::<Result<_, _>>()?;

        Ok(Self { routes })
    }
}

impl RouteMatcher for PatternMatcher {
    fn find(&self, method: &Method, path: &str) -> RouteMatch {
        let mut allowed: Vec<Method> = Vec::new();

        for (index, route) in self.routes.iter().enumerate() {
            let Some(captures) = route.regex.captures(path) else {
                continue;
            };

            match &route.method {
                Some(expected) if expected != method => {
                    if !allowed.contains(expected) {
                        allowed.push(expected.clone());
                    }
                }
                _ => {
                    let vars = route
                        .vars
                        .iter()
                        .filter_map(|(group, name)| {
                            let name = name.as_ref()?;
                            let raw = captures.name(group)?.as_str();
                            Some((name.clone(), unescape(raw).into_owned()))
                        })
                        .collect();
                    return RouteMatch::Found { index, vars };
                }
            }
        }

        if allowed.is_empty() {
            RouteMatch::NotFound
        } else {
            RouteMatch::MethodNotAllowed { allowed }
        }
    }
}

impl std::fmt::Debug for PatternMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|r| r.regex.as_str()))
            .finish()
    }
}

/// Compiles a pattern into an anchored regex over the raw request path.
fn compile(pattern: &str) -> Result<(Regex, Vec<(String, Option<String>)>), PathError> {
    let mut source = String::from("^");
    let mut vars = Vec::new();

    for segment in pattern::segments(pattern)? {
        source.push('/');
        for token in pattern::tokenize(segment)? {
            let group = format!("hermes_v{}", vars.len());
            match token {
                Token::Literal(text) => {
                    source.push_str(&literal_regex(text));
                }
                Token::Variable { name, regex } => {
                    if let Some(regex) = regex {
                        pattern::compile_regex(name, regex)?;
                        source.push_str(&format!("(?P<{group}>(?:{regex}))"));
                    } else {
                        source.push_str(&format!("(?P<{group}>[^/]+)"));
                    }
                    let name = Some(name.to_string()).filter(|n| !n.is_empty());
                    vars.push((group, name));
                }
                Token::Wildcard => {
                    source.push_str(&format!("(?P<{group}>.*)"));
                    vars.push((group, Some(WILDCARD_VAR.to_string())));
                }
            }
        }
    }
    source.push('$');

    let regex = pattern::compile_regex("", &source)?;
    Ok((regex, vars))
}
