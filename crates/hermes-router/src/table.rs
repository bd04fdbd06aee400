//! Validated route set.

use std::collections::HashMap;

use crate::error::{PathError, RouteError};
use crate::pattern;
use crate::route::Route;

/// An immutable, validated set of routes indexed by name.
///
/// # Example
///
/// ```
/// use hermes_core::{Request, ResponseWriter};
/// use hermes_router::{Route, RouteError, RouteTable};
///
/// let ok = |_req: Request, _rw: ResponseWriter| async {};
/// let table = RouteTable::register(vec![
///     Route::get("status", "/status").handle(ok),
///     Route::get("show_user", "/user/{user}").handle(ok),
/// ])
/// .unwrap();
/// assert_eq!(table.path("show_user", &["ada"]).unwrap(), "/user/ada");
///
/// let err = RouteTable::register(vec![Route::get("", "/").handle(ok)]).unwrap_err();
/// assert_eq!(err, RouteError::MissingName);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    by_name: HashMap<String, usize>,
}

impl RouteTable {
    /// Validates `routes` and builds the name index.
    ///
    /// Registration order is kept; it is the order in which the default
    /// matcher tries routes.
    ///
    /// # Errors
    ///
    /// Fails on the first route with an empty name, a name already taken, no
    /// handler, or a malformed pattern.
    pub fn register(routes: impl IntoIterator<Item = Route>) -> Result<Self, RouteError> {
        let routes: Vec<Route> = routes.into_iter().collect();
        let mut by_name = HashMap::with_capacity(routes.len());

        for (index, route) in routes.iter().enumerate() {
            let name = route.name();
            if name.is_empty() {
                return Err(RouteError::MissingName);
            }
            if by_name.insert(name.to_string(), index).is_some() {
                return Err(RouteError::DuplicateName(name.to_string()));
            }
            if !route.has_handler() {
                return Err(RouteError::MissingHandler(name.to_string()));
            }
            pattern::validate(route.pattern()).map_err(|source| RouteError::InvalidPattern {
                name: name.to_string(),
                source,
            })?;
        }

        tracing::debug!(routes = routes.len(), "Route table built");
        Ok(Self { routes, by_name })
    }

    /// Looks up a route by name.
    pub fn get(&self, name: &str) -> Option<&Route> {
        self.by_name.get(name).map(|&index| &self.routes[index])
    }

    /// Builds a concrete path for the route called `name`.
    ///
    /// # Errors
    ///
    /// [`PathError::UnknownRoute`] if no such route exists, otherwise any
    /// error of [`build_path`](crate::build_path).
    pub fn path<S: AsRef<str>>(&self, name: &str, values: &[S]) -> Result<String, PathError> {
        self.get(name)
            .ok_or_else(|| PathError::UnknownRoute(name.to_string()))?
            .path(values)
    }

    /// Returns the routes in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Returns the number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if the table holds no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
