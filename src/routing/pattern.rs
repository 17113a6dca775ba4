//! Route pattern parsing.
//!
//! # Syntax
//! - `/users/active`: literal segments, matched byte-for-byte
//! - `/users/:id`: named parameter, binds exactly one non-empty segment
//! - `/static/*filepath`: trailing wildcard, binds the rest of the path
//!
//! # Design Decisions
//! - Patterns must start with `/`
//! - Empty segments are literals, so `/a` and `/a/` are distinct routes
//! - A wildcard anywhere but the last segment is a registration error

use std::fmt;
use std::str::FromStr;

use crate::routing::RouteError;

/// One `/`-delimited token of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
    Wildcard(String),
}

/// A parsed route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parse a pattern such as `/users/:id/files/*path`.
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        let invalid = |reason: &'static str| RouteError::InvalidPattern {
            pattern: raw.to_string(),
            reason,
        };

        let body = raw.strip_prefix('/').ok_or_else(|| invalid("must start with '/'"))?;
        let parts: Vec<&str> = body.split('/').collect();
        let last = parts.len() - 1;

        let mut segments = Vec::with_capacity(parts.len());
        for (i, part) in parts.into_iter().enumerate() {
            let segment = if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(invalid("parameter segment needs a name"));
                }
                Segment::Param(name.to_string())
            } else if let Some(name) = part.strip_prefix('*') {
                if name.is_empty() {
                    return Err(invalid("wildcard segment needs a name"));
                }
                if i != last {
                    return Err(invalid("wildcard must be the final segment"));
                }
                Segment::Wildcard(name.to_string())
            } else {
                Segment::Literal(part.to_string())
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The pattern as registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of the parameter and wildcard segments, left to right.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) | Segment::Wildcard(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

impl FromStr for Pattern {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Split a request path into segments the same way patterns are split.
///
/// Returns `None` for paths that do not start with `/`.
pub fn split_path(path: &str) -> Option<Vec<&str>> {
    path.strip_prefix('/').map(|body| body.split('/').collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segment_kinds() {
        let pattern = Pattern::parse("/users/:id/files/*path").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Literal("users".into()),
                Segment::Param("id".into()),
                Segment::Literal("files".into()),
                Segment::Wildcard("path".into()),
            ]
        );
        assert_eq!(pattern.param_names().collect::<Vec<_>>(), vec!["id", "path"]);
    }

    #[test]
    fn test_root_and_trailing_slash() {
        let root = Pattern::parse("/").unwrap();
        assert_eq!(root.segments(), &[Segment::Literal(String::new())]);

        let trailing = Pattern::parse("/a/").unwrap();
        assert_eq!(
            trailing.segments(),
            &[Segment::Literal("a".into()), Segment::Literal(String::new())]
        );
    }

    #[test]
    fn test_invalid_patterns() {
        for raw in ["users", "", "/users/:", "/files/*", "/files/*path/more"] {
            let err = Pattern::parse(raw).unwrap_err();
            assert!(matches!(err, RouteError::InvalidPattern { .. }), "{raw} should be rejected");
        }
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("/"), Some(vec![""]));
        assert_eq!(split_path("/a/b/"), Some(vec!["a", "b", ""]));
        assert_eq!(split_path("a/b"), None);
    }
}
