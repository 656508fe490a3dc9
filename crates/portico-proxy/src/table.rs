//! Path-prefix route table.
//!
//! Routes are matched in declaration order and the first prefix match
//! wins, so more specific prefixes must be declared before broader ones.
//! Matching is boundary-aware: prefix `/order` matches `/order` and
//! `/order/42` but not `/orders`.

use portico_middleware::RoutePolicy;

/// A single route declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Stable identifier, used for breaker state and fallback lookup.
    pub id: String,
    /// Path prefix this route claims.
    pub prefix: String,
    /// Upstream base URL, e.g. `http://order-service:8081`.
    pub target: String,
    /// Whether requests to this route must be authenticated.
    pub requires_auth: bool,
    /// Optional display name used in the fallback message.
    pub fallback: Option<String>,
}

impl Route {
    /// Creates a route.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        prefix: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            prefix: prefix.into(),
            target: target.into(),
            requires_auth: false,
            fallback: None,
        }
    }

    /// Marks this route as requiring authentication.
    #[must_use]
    pub fn protected(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    /// Sets the fallback display name.
    #[must_use]
    pub fn with_fallback(mut self, name: impl Into<String>) -> Self {
        self.fallback = Some(name.into());
        self
    }

    /// Returns `true` if `path` falls under this route's prefix.
    ///
    /// The match must end at a path segment boundary unless the prefix
    /// itself ends with `/`.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => {
                rest.is_empty() || rest.starts_with('/') || self.prefix.ends_with('/')
            }
            None => false,
        }
    }
}

/// Ordered collection of routes.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Creates a table from routes in declaration order.
    #[must_use]
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Returns the first route whose prefix matches `path`.
    #[must_use]
    pub fn match_route(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(path))
    }

    /// Returns all routes in declaration order.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if the table has no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl RoutePolicy for RouteTable {
    fn requires_auth(&self, path: &str) -> bool {
        self.match_route(path).is_some_and(|route| route.requires_auth)
    }
}
