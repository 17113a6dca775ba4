//! Segment trie for a single HTTP method.
//!
//! # Lookup Order
//! At every node the children are tried in this order:
//! 1. the literal child equal to the current segment, percent-decoded
//! 2. the parameter child (never binds an empty segment)
//! 3. the wildcard child, which binds everything that is left
//!
//! A class is only abandoned when nothing below it reaches a terminal route,
//! so `/users/active` beats `/users/:id` while `/users/:id/posts` still
//! matches `/users/active/posts` when no literal branch finishes the path.

use std::borrow::Cow;
use std::collections::HashMap;

use percent_encoding::percent_decode_str;

use crate::routing::params::PathParams;
use crate::routing::pattern::{Pattern, Segment};
use crate::routing::RouteError;

/// A terminal entry: the pattern that was registered and its value.
pub struct Route<T> {
    pub pattern: String,
    pub value: T,
}

struct ParamEdge<T> {
    name: String,
    child: Box<Node<T>>,
}

struct WildcardEdge<T> {
    name: String,
    route: Route<T>,
}

/// One segment position in the trie.
pub struct Node<T> {
    literals: HashMap<String, Node<T>>,
    param: Option<ParamEdge<T>>,
    wildcard: Option<WildcardEdge<T>>,
    route: Option<Route<T>>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            literals: HashMap::new(),
            param: None,
            wildcard: None,
            route: None,
        }
    }
}

impl<T> Node<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a route, returning the value it replaced if the exact same
    /// shape was already registered.
    pub fn insert(&mut self, pattern: &Pattern, value: T) -> Result<Option<T>, RouteError> {
        let mut node = self;

        for segment in pattern.segments() {
            match segment {
                Segment::Literal(text) => {
                    node = node.literals.entry(text.clone()).or_default();
                }
                Segment::Param(name) => {
                    let edge = node.param.get_or_insert_with(|| ParamEdge {
                        name: name.clone(),
                        child: Box::default(),
                    });
                    if edge.name != *name {
                        return Err(RouteError::ParamConflict {
                            pattern: pattern.to_string(),
                            name: name.clone(),
                            existing: edge.name.clone(),
                        });
                    }
                    node = edge.child.as_mut();
                }
                Segment::Wildcard(name) => {
                    if let Some(edge) = &node.wildcard {
                        if edge.name != *name {
                            return Err(RouteError::WildcardConflict {
                                pattern: pattern.to_string(),
                                name: name.clone(),
                                existing: edge.name.clone(),
                            });
                        }
                    }
                    let previous = node.wildcard.replace(WildcardEdge {
                        name: name.clone(),
                        route: Route {
                            pattern: pattern.to_string(),
                            value,
                        },
                    });
                    // Pattern::parse guarantees nothing follows a wildcard.
                    return Ok(previous.map(|edge| edge.route.value));
                }
            }
        }

        let previous = node.route.replace(Route {
            pattern: pattern.to_string(),
            value,
        });
        Ok(previous.map(|route| route.value))
    }

    /// Depth-first search with backtracking. On success `params` holds the
    /// bindings of the matched path only.
    pub fn search<'n>(&'n self, segments: &[&str], params: &mut PathParams) -> Option<&'n Route<T>> {
        let Some((&segment, rest)) = segments.split_first() else {
            return self.route.as_ref();
        };

        let decoded = decode(segment);
        if let Some(child) = self.literals.get(&*decoded) {
            if let Some(found) = child.search(rest, params) {
                return Some(found);
            }
        }

        if let Some(edge) = &self.param {
            if !segment.is_empty() {
                params.push(&edge.name, decoded.to_string());
                if let Some(found) = edge.child.search(rest, params) {
                    return Some(found);
                }
                params.pop();
            }
        }

        if let Some(edge) = &self.wildcard {
            params.push(&edge.name, segments.join("/"));
            return Some(&edge.route);
        }

        None
    }
}

/// Percent-decode a request segment; undecodable input stays raw.
fn decode(segment: &str) -> Cow<'_, str> {
    percent_decode_str(segment)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(segment))
}
