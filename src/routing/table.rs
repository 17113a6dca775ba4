//! Route lookup per HTTP method.
//!
//! # Responsibilities
//! - Own one trie root per method
//! - Register routes, reporting conflicts at registration time
//! - Return the matched route and its bound parameters, or explicit no-match
//!
//! # Design Decisions
//! - Method is the first dimension: GET and POST tries never share nodes
//! - Mutation needs `&mut self`; once frozen behind an `Arc` the table is
//!   read concurrently without locks

use std::collections::HashMap;

use axum::http::Method;

use crate::routing::params::PathParams;
use crate::routing::pattern::{split_path, Pattern};
use crate::routing::trie::Node;
use crate::routing::RouteError;

/// A successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'t, T> {
    pub value: &'t T,
    pub pattern: &'t str,
    pub params: PathParams,
}

/// Registered routes keyed by method.
pub struct RouteTable<T> {
    trees: HashMap<Method, Node<T>>,
    len: usize,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self {
            trees: HashMap::new(),
            len: 0,
        }
    }
}

impl<T> RouteTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` for `method` + `pattern`.
    ///
    /// Re-registering an identical shape replaces the previous value and
    /// returns it.
    pub fn insert(&mut self, method: Method, pattern: &str, value: T) -> Result<Option<T>, RouteError> {
        let pattern = Pattern::parse(pattern)?;
        let previous = self.trees.entry(method).or_default().insert(&pattern, value)?;
        if previous.is_none() {
            self.len += 1;
        }
        Ok(previous)
    }

    /// Find the route for `method` + `path`.
    pub fn search(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, T>> {
        let root = self.trees.get(method)?;
        let segments = split_path(path)?;
        let mut params = PathParams::new();
        let route = root.search(&segments, &mut params)?;
        Some(RouteMatch {
            value: &route.value,
            pattern: &route.pattern,
            params,
        })
    }

    /// Number of distinct routes registered.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Methods that have at least one route.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.trees.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_methods_are_isolated() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, "/users/:id", "get-user").unwrap();
        table.insert(Method::DELETE, "/users/:id", "delete-user").unwrap();

        let matched = table.search(&Method::GET, "/users/9").unwrap();
        assert_eq!(*matched.value, "get-user");
        assert_eq!(matched.pattern, "/users/:id");
        assert_eq!(matched.params.get("id"), Some("9"));

        assert_eq!(*table.search(&Method::DELETE, "/users/9").unwrap().value, "delete-user");
        assert!(table.search(&Method::POST, "/users/9").is_none());
    }

    #[test]
    fn test_reregistration_does_not_duplicate() {
        let mut table = RouteTable::new();
        assert!(table.insert(Method::GET, "/", 1).unwrap().is_none());
        assert_eq!(table.insert(Method::GET, "/", 2).unwrap(), Some(1));
        assert_eq!(table.len(), 1);
        assert_eq!(*table.search(&Method::GET, "/").unwrap().value, 2);
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let mut table: RouteTable<()> = RouteTable::new();
        assert!(table.insert(Method::GET, "no-slash", ()).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_path_without_leading_slash_never_matches() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, "/", ()).unwrap();
        assert!(table.search(&Method::GET, "").is_none());
        assert!(table.search(&Method::GET, "*").is_none());
    }
}
